// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Per-operation state.
//!
//! One [`OperationState`] is created per encode, decode or capacity call and
//! dropped when that call returns. It owns the growing context, the
//! provider's incremental cache, the step counter, the exhaustion point and
//! the fallback RNG. The provider itself is only borrowed, so any number of
//! operations may share it without seeing each other's state.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use super::error::StegoError;
use super::settings::Settings;
use super::truncate::prepare_distribution;
use crate::model::{Distribution, DistributionProvider, ProviderCache, TokenId};

/// Where the payload ran out during encode. Informational, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhaustionPoint {
    /// Step during which the last payload bit was consumed.
    pub step: usize,
    /// Payload bits consumed at that point (the full payload length).
    pub bit_offset: usize,
}

pub struct OperationState<'a, P: DistributionProvider> {
    provider: &'a P,
    settings: &'a Settings,
    context: Vec<TokenId>,
    prompt_len: usize,
    cache: Option<P::Cache>,
    step: usize,
    exhausted: Option<ExhaustionPoint>,
    rng: ChaCha20Rng,
}

impl<'a, P: DistributionProvider> OperationState<'a, P> {
    /// Fresh state over `context`. The RNG is seeded from
    /// `settings.random_seed`, or zero when unset.
    pub fn new(provider: &'a P, context: &[TokenId], settings: &'a Settings) -> Self {
        Self {
            provider,
            settings,
            context: context.to_vec(),
            prompt_len: context.len(),
            cache: None,
            step: 0,
            exhausted: None,
            rng: ChaCha20Rng::seed_from_u64(settings.random_seed.unwrap_or(0)),
        }
    }

    /// Query the provider for the current step and run it through the
    /// filter and truncator.
    ///
    /// The cache is cut to `settings.cache_window` steps before the call;
    /// the provider trims again after ingesting the new tokens, so the
    /// distribution is conditioned on at most that many steps.
    pub fn next_distribution(&mut self) -> Result<Distribution, StegoError> {
        let mut cache = match self.cache.take() {
            Some(cache) => cache,
            None => self.provider.new_cache(),
        };
        cache.retain_recent(self.settings.cache_window);
        let (raw, cache) = self.provider.step(&self.context, cache, self.settings)?;
        self.cache = Some(cache);
        prepare_distribution(&raw, self.provider.disallowed(), self.settings, self.step)
    }

    /// Append the emitted or observed token and advance to the next step.
    pub fn commit(&mut self, token: TokenId) {
        self.context.push(token);
        self.step += 1;
    }

    /// Record payload exhaustion. Only the first call has an effect.
    pub fn mark_exhausted(&mut self, bit_offset: usize) {
        if self.exhausted.is_none() {
            self.exhausted = Some(ExhaustionPoint { step: self.step, bit_offset });
        }
    }

    pub fn exhausted(&self) -> Option<ExhaustionPoint> {
        self.exhausted
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted.is_some()
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha20Rng {
        &mut self.rng
    }

    /// Tokens produced or observed by this operation, excluding the prompt.
    pub fn generated(&self) -> &[TokenId] {
        &self.context[self.prompt_len..]
    }

    /// Steps currently held by the provider cache.
    pub fn cache_len(&self) -> usize {
        self.cache.as_ref().map_or(0, ProviderCache::len)
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToyModel;

    #[test]
    fn commit_advances_context_and_step() {
        let model = ToyModel::new(1);
        let settings = Settings::default();
        let mut state = OperationState::new(&model, &[0, 1], &settings);
        let dist = state.next_distribution().unwrap();
        let token = dist.entries()[0].0;
        state.commit(token);
        assert_eq!(state.step(), 1);
        assert_eq!(state.generated(), &[token]);
        assert_eq!(state.cache_len(), 2);
    }

    #[test]
    fn cache_is_trimmed_to_window() {
        let model = ToyModel::new(1);
        let settings = Settings::default().with_cache_window(3);
        let mut state = OperationState::new(&model, &[0, 1, 2, 3, 4], &settings);
        for _ in 0..4 {
            let dist = state.next_distribution().unwrap();
            state.commit(dist.entries()[0].0);
        }
        state.next_distribution().unwrap();
        assert_eq!(state.cache_len(), 3);
    }

    #[test]
    fn long_prompt_is_trimmed_on_first_call() {
        let model = ToyModel::new(1);
        let settings = Settings::default().with_cache_window(2);
        let prompt: Vec<TokenId> = (0..40).collect();
        let mut state = OperationState::new(&model, &prompt, &settings);
        let windowed = state.next_distribution().unwrap();
        assert_eq!(state.cache_len(), 2);

        // Only the last two prompt tokens matter.
        let mut short = OperationState::new(&model, &prompt[38..], &settings);
        assert!(windowed.bit_identical(&short.next_distribution().unwrap()));
    }

    #[test]
    fn exhaustion_is_recorded_once() {
        let model = ToyModel::new(1);
        let settings = Settings::default();
        let mut state = OperationState::new(&model, &[], &settings);
        state.commit(0);
        state.mark_exhausted(7);
        state.commit(0);
        state.mark_exhausted(9);
        assert_eq!(state.exhausted(), Some(ExhaustionPoint { step: 1, bit_offset: 7 }));
    }

    #[test]
    fn states_over_one_provider_are_independent() {
        let model = ToyModel::new(5);
        let settings = Settings::default();
        let mut a = OperationState::new(&model, &[3], &settings);
        let mut b = OperationState::new(&model, &[3], &settings);
        let first = a.next_distribution().unwrap();
        a.commit(first.entries()[1].0);
        a.mark_exhausted(1);
        a.next_distribution().unwrap();
        // `b` is untouched by `a`'s progress.
        let again = b.next_distribution().unwrap();
        assert!(first.bit_identical(&again));
        assert!(!b.is_exhausted());
        assert_eq!(b.step(), 0);
    }
}
