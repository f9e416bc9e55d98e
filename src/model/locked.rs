// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Mutual exclusion around non-reentrant inference backends.
//!
//! The lock is taken for exactly one inference call. Operations interleave
//! freely between calls, and because each call receives the operation's own
//! cache, interleaving cannot leak one operation's state into another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{Distribution, DisallowSet, DistributionProvider, ProviderCache, ProviderError, TokenId};
use crate::stego::settings::Settings;

/// A backend that needs exclusive access while it runs (scratch buffers,
/// device handles, singleton attention memory).
pub trait InferenceBackend: Send {
    type Cache: ProviderCache;

    fn vocab_size(&self) -> usize;

    fn disallowed(&self) -> &DisallowSet;

    fn new_cache(&self) -> Self::Cache;

    fn infer(
        &mut self,
        context: &[TokenId],
        cache: Self::Cache,
        settings: &Settings,
    ) -> Result<(Distribution, Self::Cache), ProviderError>;
}

/// Shares one [`InferenceBackend`] between any number of operations.
pub struct LockedProvider<B: InferenceBackend> {
    backend: Mutex<B>,
    disallow: DisallowSet,
    vocab_size: usize,
    calls: AtomicU64,
}

impl<B: InferenceBackend> LockedProvider<B> {
    pub fn new(backend: B) -> Self {
        let disallow = backend.disallowed().clone();
        let vocab_size = backend.vocab_size();
        Self {
            backend: Mutex::new(backend),
            disallow,
            vocab_size,
            calls: AtomicU64::new(0),
        }
    }

    /// Number of inference calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> Result<B, ProviderError> {
        self.backend.into_inner().map_err(|_| ProviderError::Poisoned)
    }
}

impl<B: InferenceBackend> DistributionProvider for LockedProvider<B> {
    type Cache = B::Cache;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn disallowed(&self) -> &DisallowSet {
        &self.disallow
    }

    fn new_cache(&self) -> Self::Cache {
        match self.backend.lock() {
            Ok(guard) => guard.new_cache(),
            // new_cache does not mutate, so a poisoned guard is still usable.
            Err(poisoned) => poisoned.into_inner().new_cache(),
        }
    }

    fn step(
        &self,
        context: &[TokenId],
        cache: Self::Cache,
        settings: &Settings,
    ) -> Result<(Distribution, Self::Cache), ProviderError> {
        let mut guard = self.backend.lock().map_err(|_| ProviderError::Poisoned)?;
        self.calls.fetch_add(1, Ordering::Relaxed);
        guard.infer(context, cache, settings)
    }
}
