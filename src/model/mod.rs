// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Distribution provider boundary.
//!
//! The generative model is an external collaborator. The codec only sees it
//! through [`DistributionProvider::step`]: given a context and an opaque
//! cache, return the next-token distribution and the updated cache. The cache
//! is owned by the caller's operation state, never by the provider, so two
//! operations sharing one provider cannot observe each other's memory.
//!
//! Backends that are not reentrant implement [`InferenceBackend`] instead and
//! are wrapped in a [`LockedProvider`], which serializes the inference call
//! itself and nothing else.

pub mod distribution;
pub mod error;
pub mod locked;
pub mod toy;
pub mod vocab;

pub use distribution::{Distribution, TokenId};
pub use error::ProviderError;
pub use locked::{InferenceBackend, LockedProvider};
pub use toy::{ToyBackend, ToyCache, ToyModel};
pub use vocab::{DisallowSet, Vocabulary};

use crate::stego::settings::Settings;

/// Opaque incremental state threaded through successive provider calls.
pub trait ProviderCache: Clone + Send {
    /// Number of retained steps.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all but the `window` most recent steps.
    fn retain_recent(&mut self, window: usize);
}

/// A source of next-token distributions.
pub trait DistributionProvider {
    type Cache: ProviderCache;

    /// Number of entries in the full vocabulary.
    fn vocab_size(&self) -> usize;

    /// Tokens that must be removed before any probability math.
    fn disallowed(&self) -> &DisallowSet;

    /// A cache that has consumed nothing yet.
    fn new_cache(&self) -> Self::Cache;

    /// Produce the distribution over the full vocabulary for the token that
    /// follows `context`, consuming and returning the cache.
    ///
    /// After ingesting the new suffix of `context`, implementations keep at
    /// most `settings.cache_window` steps and condition only on those.
    fn step(
        &self,
        context: &[TokenId],
        cache: Self::Cache,
        settings: &Settings,
    ) -> Result<(Distribution, Self::Cache), ProviderError>;
}

impl<P: DistributionProvider + ?Sized> DistributionProvider for &P {
    type Cache = P::Cache;

    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn disallowed(&self) -> &DisallowSet {
        (**self).disallowed()
    }

    fn new_cache(&self) -> Self::Cache {
        (**self).new_cache()
    }

    fn step(
        &self,
        context: &[TokenId],
        cache: Self::Cache,
        settings: &Settings,
    ) -> Result<(Distribution, Self::Cache), ProviderError> {
        (**self).step(context, cache, settings)
    }
}
