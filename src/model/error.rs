// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Error types for the distribution provider boundary.

use thiserror::Error;

use super::TokenId;

/// Errors raised by a [`DistributionProvider`](super::DistributionProvider)
/// implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The inference backend failed for a backend-specific reason.
    #[error("inference backend failure: {0}")]
    Backend(String),
    /// A previous holder of the backend lock panicked mid-inference.
    #[error("inference backend lock poisoned")]
    Poisoned,
    /// The cache claims to have consumed more tokens than the context holds.
    #[error(
        "provider cache is ahead of the context ({consumed} consumed, context has {context_len})"
    )]
    CacheAhead { consumed: usize, context_len: usize },
    /// A context token is outside the provider's vocabulary.
    #[error("token {0} is outside the vocabulary")]
    UnknownToken(TokenId),
    /// The provider has no vocabulary to distribute over.
    #[error("provider vocabulary is empty")]
    EmptyVocabulary,
}
