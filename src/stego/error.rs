// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Error types for the steganographic codec.
//!
//! [`StegoError`] covers every failure an encode or decode call can return.
//! Running out of payload before the length budget is not an error; it is
//! reported as an [`ExhaustionPoint`](super::state::ExhaustionPoint) in the
//! encode output.

use thiserror::Error;

use crate::model::{ProviderError, TokenId};

/// Errors that can occur during steganographic encoding or decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StegoError {
    /// Filtering removed every candidate token. Indicates a misconfigured
    /// disallow-set or a degenerate model output.
    #[error("no candidate tokens left after filtering at step {step}")]
    EmptyDistribution { step: usize },
    /// Temperature, top-p, or a length setting is out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    /// The payload did not fit in `max_length` tokens. Retry with a larger
    /// length on a fresh operation.
    #[error(
        "payload does not fit: {bits_embedded} of {payload_bits} bits in {max_length} tokens, \
         {bits_remaining} remaining"
    )]
    Fit {
        payload_bits: usize,
        bits_embedded: usize,
        bits_remaining: usize,
        max_length: usize,
    },
    /// The observed token is not a leaf of the reconstructed tree, so the
    /// decoder's distribution differs from the encoder's at this step.
    #[error(
        "token {token} not in reconstructed code at step {step} (after {} recovered bits)",
        .recovered.len()
    )]
    DecodeMismatch {
        step: usize,
        token: TokenId,
        /// Bits recovered before the failing step.
        recovered: Vec<u8>,
    },
    /// The payload description is malformed.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    /// The distribution provider failed.
    #[error("distribution provider failed: {0}")]
    Provider(#[from] ProviderError),
    /// The operation was cancelled by the caller.
    #[error("operation cancelled by caller")]
    Cancelled,
}

impl StegoError {
    /// Bit offset of the first problem, when the error is tied to one.
    pub fn bit_offset(&self) -> Option<usize> {
        match self {
            Self::DecodeMismatch { recovered, .. } => Some(recovered.len()),
            Self::Fit { bits_embedded, .. } => Some(*bits_embedded),
            _ => None,
        }
    }

    /// Step index of the first problem, when the error is tied to one.
    pub fn step(&self) -> Option<usize> {
        match self {
            Self::DecodeMismatch { step, .. } | Self::EmptyDistribution { step } => Some(*step),
            Self::Fit { max_length, .. } => Some(*max_length),
            _ => None,
        }
    }
}
