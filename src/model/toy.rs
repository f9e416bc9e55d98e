// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! A small deterministic context-conditioned language model.
//!
//! Stands in for a real generative model in tests and demos. The next-token
//! distribution is a Zipf-shaped prior over a fixed English word list,
//! perturbed by logit jitter drawn from a ChaCha20 stream keyed on the
//! retained context. Everything is computed with [`det_math`](crate::det_math),
//! so two instances built with the same seed agree bit-for-bit.

use std::collections::VecDeque;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::{
    Distribution, DisallowSet, DistributionProvider, InferenceBackend, ProviderCache, ProviderError,
    TokenId, Vocabulary,
};
use crate::det_math::{det_exp, det_ln, ordered_sum};
use crate::stego::settings::Settings;

/// Words in descending prior frequency.
const WORDS: &[&str] = &[
    "the", ".", ",", "and", "a", "to", "of", "was", "in", "he", "she", "it", "that", "her",
    "his", "with", "they", "on", "had", "for", "as", "at", "but", "said", "not", "there",
    "one", "all", "time", "from", "were", "so", "we", "when", "old", "little", "would", "up",
    "out", "into", "could", "day", "upon", "once", "king", "house", "forest", "night", "long",
    "away", "girl", "boy", "went", "saw", "came", "back", "very", "then", "who", "what",
    "village", "river", "road", "door", "mother", "father", "friend", "dark", "bright",
    "small", "great", "young", "quiet", "found", "looked", "walked", "heard", "knew",
    "thought", "told", "morning", "evening", "window", "garden", "tree", "stone", "light",
    "wind", "rain", "snow", "sea", "ship", "castle", "dragon", "wolf", "bird", "fox", "cat",
    "dog", "horse", "bread", "gold", "book", "letter", "secret", "story", "lived", "far",
    "near", "beyond", "under", "over", "through", "again", "never", "always", "soon",
];

/// Tokens the model knows but that must never reach a text transport.
const CONTROL_TOKENS: &[&str] = &["\u{0}", "\u{7}", "\r", "\u{1b}[0m"];

const UNK: &str = "<unk>";

/// Zipf exponent applied to word rank.
const ZIPF_EXPONENT: f64 = 1.1;
/// Prior logit for control tokens (rare but present in the raw output).
const CONTROL_LOGIT: f64 = -4.0;
/// Prior logit for the unknown token.
const UNK_LOGIT: f64 = -6.0;
/// Half-width of the context-dependent logit jitter.
const JITTER: f64 = 2.5;

/// Per-operation memory of the toy model: one hash per consumed token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToyCache {
    consumed: usize,
    states: VecDeque<u64>,
}

impl ToyCache {
    /// Total tokens ingested, including any dropped from the window.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl ProviderCache for ToyCache {
    fn len(&self) -> usize {
        self.states.len()
    }

    fn retain_recent(&mut self, window: usize) {
        while self.states.len() > window {
            self.states.pop_front();
        }
    }
}

/// Deterministic toy model; see the module docs.
#[derive(Debug, Clone)]
pub struct ToyModel {
    vocab: Vocabulary,
    disallow: DisallowSet,
    prior: Vec<f64>,
    seed: u64,
}

impl ToyModel {
    /// Build the model over the built-in word list.
    pub fn new(seed: u64) -> Self {
        let tokens = WORDS.iter().chain(CONTROL_TOKENS).copied();
        Self::with_vocabulary(Vocabulary::new(tokens, UNK), seed)
    }

    /// Build the model over a caller-supplied vocabulary. Prior rank follows
    /// vocabulary order; control-character tokens and the unknown token get
    /// fixed low priors.
    pub fn with_vocabulary(vocab: Vocabulary, seed: u64) -> Self {
        let disallow = vocab.transport_unsafe();
        let mut rank = 0usize;
        let prior = (0..vocab.len() as TokenId)
            .map(|id| {
                if id == vocab.unk() {
                    UNK_LOGIT
                } else if disallow.contains(id) {
                    CONTROL_LOGIT
                } else {
                    rank += 1;
                    -ZIPF_EXPONENT * det_ln(rank as f64)
                }
            })
            .collect();
        Self { vocab, disallow, prior, seed }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Advance `cache` over the unconsumed suffix of `context`.
    fn ingest(&self, context: &[TokenId], mut cache: ToyCache) -> Result<ToyCache, ProviderError> {
        if cache.consumed > context.len() {
            return Err(ProviderError::CacheAhead {
                consumed: cache.consumed,
                context_len: context.len(),
            });
        }
        for &token in &context[cache.consumed..] {
            if token as usize >= self.vocab.len() {
                return Err(ProviderError::UnknownToken(token));
            }
            cache.states.push_back(mix(self.seed, token as u64));
            cache.consumed += 1;
        }
        Ok(cache)
    }

    /// Compute the softmax over jittered logits into `out`.
    fn distribution_into(&self, cache: &ToyCache, out: &mut Vec<f64>) -> Result<(), ProviderError> {
        if self.prior.is_empty() {
            return Err(ProviderError::EmptyVocabulary);
        }
        // Position-sensitive fold over the retained window.
        let key = cache
            .states
            .iter()
            .fold(self.seed ^ cache.states.len() as u64, |acc, &s| mix(acc, s));
        let mut rng = ChaCha20Rng::seed_from_u64(key);

        out.clear();
        out.extend(self.prior.iter().map(|&base| {
            // u32 draws keep the stream identical on 32- and 64-bit targets.
            let u = rng.next_u32() as f64 / u32::MAX as f64;
            base + JITTER * (2.0 * u - 1.0)
        }));

        let max = out.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        for l in out.iter_mut() {
            *l = det_exp(*l - max);
        }
        let total = ordered_sum(out);
        for p in out.iter_mut() {
            *p /= total;
        }
        Ok(())
    }

    /// Ingest, trim to `window`, then condition on what is left.
    fn step_with_scratch(
        &self,
        context: &[TokenId],
        cache: ToyCache,
        window: usize,
        scratch: &mut Vec<f64>,
    ) -> Result<(Distribution, ToyCache), ProviderError> {
        let mut cache = self.ingest(context, cache)?;
        cache.retain_recent(window);
        self.distribution_into(&cache, scratch)?;
        Ok((Distribution::from_probs(scratch), cache))
    }
}

impl DistributionProvider for ToyModel {
    type Cache = ToyCache;

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    fn disallowed(&self) -> &DisallowSet {
        &self.disallow
    }

    fn new_cache(&self) -> ToyCache {
        ToyCache::default()
    }

    fn step(
        &self,
        context: &[TokenId],
        cache: ToyCache,
        settings: &Settings,
    ) -> Result<(Distribution, ToyCache), ProviderError> {
        let mut scratch = Vec::with_capacity(self.prior.len());
        self.step_with_scratch(context, cache, settings.cache_window, &mut scratch)
    }
}

/// The toy model behind a reusable scratch buffer, which makes it
/// non-reentrant in the same way a real inference backend is.
#[derive(Debug, Clone)]
pub struct ToyBackend {
    model: ToyModel,
    scratch: Vec<f64>,
}

impl ToyBackend {
    pub fn new(model: ToyModel) -> Self {
        Self { model, scratch: Vec::new() }
    }

    pub fn model(&self) -> &ToyModel {
        &self.model
    }
}

impl InferenceBackend for ToyBackend {
    type Cache = ToyCache;

    fn vocab_size(&self) -> usize {
        self.model.vocab_size()
    }

    fn disallowed(&self) -> &DisallowSet {
        self.model.disallowed()
    }

    fn new_cache(&self) -> ToyCache {
        ToyCache::default()
    }

    fn infer(
        &mut self,
        context: &[TokenId],
        cache: ToyCache,
        settings: &Settings,
    ) -> Result<(Distribution, ToyCache), ProviderError> {
        self.model
            .step_with_scratch(context, cache, settings.cache_window, &mut self.scratch)
    }
}

/// SplitMix64-style combiner.
fn mix(acc: u64, v: u64) -> u64 {
    let mut z = acc ^ v.wrapping_add(0x9E37_79B9_7F4A_7C15).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_once(model: &ToyModel, text: &str) -> (Distribution, ToyCache) {
        let ctx = model.vocabulary().tokenize(text);
        model.step(&ctx, model.new_cache(), &Settings::default()).unwrap()
    }

    #[test]
    fn distribution_is_normalized_over_full_vocab() {
        let model = ToyModel::new(1);
        let (d, cache) = step_once(&model, "once upon a time");
        assert_eq!(d.len(), model.vocab_size());
        assert!((d.total() - 1.0).abs() < 1e-12);
        assert!(d.entries().iter().all(|&(_, p)| p > 0.0));
        assert_eq!(cache.consumed(), 4);
    }

    #[test]
    fn same_seed_same_bits() {
        let (a, _) = step_once(&ToyModel::new(3), "the old king");
        let (b, _) = step_once(&ToyModel::new(3), "the old king");
        assert!(a.bit_identical(&b));
    }

    #[test]
    fn context_changes_distribution() {
        let model = ToyModel::new(3);
        let (a, _) = step_once(&model, "the old king");
        let (b, _) = step_once(&model, "the young king");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn incremental_matches_from_scratch() {
        let model = ToyModel::new(5);
        let s = Settings::default();
        let ctx = model.vocabulary().tokenize("there was a little house");
        let (_, cache) = model.step(&ctx[..3], model.new_cache(), &s).unwrap();
        let (inc, _) = model.step(&ctx, cache, &s).unwrap();
        let (full, _) = model.step(&ctx, model.new_cache(), &s).unwrap();
        assert!(inc.bit_identical(&full));
    }

    #[test]
    fn cache_ahead_rejected() {
        let model = ToyModel::new(5);
        let s = Settings::default();
        let ctx = model.vocabulary().tokenize("there was a little house");
        let (_, cache) = model.step(&ctx, model.new_cache(), &s).unwrap();
        let err = model.step(&ctx[..2], cache, &s).unwrap_err();
        assert!(matches!(err, ProviderError::CacheAhead { consumed: 5, context_len: 2 }));
    }

    #[test]
    fn window_truncation_bounds_memory() {
        let mut cache = ToyCache::default();
        cache.states.extend([1, 2, 3, 4, 5]);
        cache.consumed = 5;
        cache.retain_recent(2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.states, VecDeque::from(vec![4, 5]));
        assert_eq!(cache.consumed(), 5);
    }

    #[test]
    fn conditions_on_window_only() {
        let model = ToyModel::new(5);
        let s = Settings::default().with_cache_window(3);
        let a = model.vocabulary().tokenize("the old king saw a dragon");
        let b = model.vocabulary().tokenize("once upon time she saw a dragon");
        let (da, ca) = model.step(&a, model.new_cache(), &s).unwrap();
        let (db, cb) = model.step(&b, model.new_cache(), &s).unwrap();
        assert!(da.bit_identical(&db));
        assert_eq!(ca.len(), 3);
        assert_eq!(cb.len(), 3);
        assert_eq!(cb.consumed(), b.len());

        // A wider window sees the differing prefix.
        let wide = Settings::default().with_cache_window(5);
        let (wa, _) = model.step(&a, model.new_cache(), &wide).unwrap();
        let (wb, _) = model.step(&b, model.new_cache(), &wide).unwrap();
        assert!(!wa.bit_identical(&wb));
    }

    #[test]
    fn control_tokens_are_disallowed() {
        let model = ToyModel::new(0);
        let vocab = model.vocabulary();
        for t in CONTROL_TOKENS {
            assert!(model.disallowed().contains(vocab.id_of(t).unwrap()));
        }
        assert!(model.disallowed().contains(vocab.unk()));
        assert!(!model.disallowed().contains(vocab.id_of("the").unwrap()));
    }
}
