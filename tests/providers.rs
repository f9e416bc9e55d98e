// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Behavior against hand-written providers: malformed output and
//! cancellation in the middle of a run.

use std::sync::atomic::{AtomicUsize, Ordering};

use lmstego_core::model::ToyCache;
use lmstego_core::{
    decode, encode, encode_with, CancelToken, DecodeOptions, DisallowSet, Distribution,
    DistributionProvider, EncodeOptions, PayloadMessage, ProviderCache, ProviderError, Settings,
    StegoError, TokenId, ToyModel,
};

// ---------------------------------------------------------------------------
// Repeated token ids
// ---------------------------------------------------------------------------

/// Cache that only counts how much context it has seen.
#[derive(Debug, Clone, Default)]
struct Seen(usize);

impl ProviderCache for Seen {
    fn len(&self) -> usize {
        self.0
    }

    fn retain_recent(&mut self, window: usize) {
        self.0 = self.0.min(window);
    }
}

/// Returns the same raw entries at every step, token 0 listed twice.
struct RepeatedIds {
    disallow: DisallowSet,
}

impl DistributionProvider for RepeatedIds {
    type Cache = Seen;

    fn vocab_size(&self) -> usize {
        3
    }

    fn disallowed(&self) -> &DisallowSet {
        &self.disallow
    }

    fn new_cache(&self) -> Seen {
        Seen::default()
    }

    fn step(
        &self,
        context: &[TokenId],
        _cache: Seen,
        settings: &Settings,
    ) -> Result<(Distribution, Seen), ProviderError> {
        let raw = Distribution::new(vec![(0, 0.25), (1, 0.25), (0, 0.25), (2, 0.25)]);
        Ok((raw, Seen(context.len().min(settings.cache_window))))
    }
}

#[test]
fn repeated_ids_share_one_codeword() {
    let provider = RepeatedIds { disallow: DisallowSet::empty() };
    let payload = PayloadMessage::from_bits(&[0, 0, 0, 1, 1, 0, 1, 1]).unwrap();
    let settings = Settings::default().with_top_p(1.0).with_seed(1).with_max_length(8);

    let out = encode(&provider, &payload, &[], &settings).unwrap();
    // Merged masses {0: 0.5, 1: 0.25, 2: 0.25} give codes 0, 10, 11.
    assert_eq!(&out.tokens[..6], &[0, 0, 0, 2, 0, 2]);
    assert_eq!(out.exhausted_at.map(|e| e.step), Some(5));

    let back = decode(&provider, &out.tokens, &[], &out.settings_used, &DecodeOptions::expecting(8))
        .unwrap();
    assert_eq!(back.recovered_bits, payload.to_bits());
    assert!(back.is_complete());
}

// ---------------------------------------------------------------------------
// Cancellation mid-run
// ---------------------------------------------------------------------------

/// Toy model that fires a cancel token once it has served `after` steps.
struct CancelAfter<'a> {
    model: &'a ToyModel,
    cancel: CancelToken,
    after: usize,
    calls: AtomicUsize,
}

impl<'a> CancelAfter<'a> {
    fn new(model: &'a ToyModel, after: usize) -> Self {
        Self { model, cancel: CancelToken::new(), after, calls: AtomicUsize::new(0) }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl DistributionProvider for CancelAfter<'_> {
    type Cache = ToyCache;

    fn vocab_size(&self) -> usize {
        self.model.vocab_size()
    }

    fn disallowed(&self) -> &DisallowSet {
        self.model.disallowed()
    }

    fn new_cache(&self) -> ToyCache {
        self.model.new_cache()
    }

    fn step(
        &self,
        context: &[TokenId],
        cache: ToyCache,
        settings: &Settings,
    ) -> Result<(Distribution, ToyCache), ProviderError> {
        if self.calls.fetch_add(1, Ordering::Relaxed) + 1 == self.after {
            self.cancel.cancel();
        }
        self.model.step(context, cache, settings)
    }
}

#[test]
fn encode_cancelled_between_steps() {
    let model = ToyModel::new(42);
    let ctx = model.vocabulary().tokenize("the dragon slept");
    let payload = PayloadMessage::from_text("cancel me");
    let settings = Settings::default().with_seed(7).with_max_length(120);

    let provider = CancelAfter::new(&model, 5);
    let options = EncodeOptions { cancel: Some(provider.cancel.clone()) };
    let err = encode_with(&provider, &payload, &ctx, &settings, &options).unwrap_err();
    assert_eq!(err, StegoError::Cancelled);
    // Stopped right after the fifth step completed.
    assert_eq!(provider.calls(), 5);

    // The abandoned run leaves nothing behind on the shared model.
    let after = encode(&model, &payload, &ctx, &settings).unwrap();
    let fresh = encode(&ToyModel::new(42), &payload, &ctx, &settings).unwrap();
    assert_eq!(after.tokens, fresh.tokens);
    assert_eq!(after.steps, fresh.steps);
}

#[test]
fn decode_cancelled_between_steps() {
    let model = ToyModel::new(42);
    let ctx = model.vocabulary().tokenize("the dragon slept");
    let settings = Settings::default().with_seed(7).with_max_length(60);
    let out = encode(&model, &PayloadMessage::from_text("hold"), &ctx, &settings).unwrap();

    let provider = CancelAfter::new(&model, 3);
    let options = DecodeOptions::expecting(32).with_cancel(provider.cancel.clone());
    let err = decode(&provider, &out.tokens, &ctx, &out.settings_used, &options).unwrap_err();
    assert_eq!(err, StegoError::Cancelled);
    assert_eq!(provider.calls(), 3);

    let back = decode(&model, &out.tokens, &ctx, &out.settings_used, &DecodeOptions::expecting(32))
        .unwrap();
    assert_eq!(back.text(), "hold");
}
