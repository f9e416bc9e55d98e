// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! # lmstego-core
//!
//! Hides a binary payload in text generated by a language model. At every
//! step the model's next-token distribution is turned into a Huffman code;
//! payload bits choose the path through it and the leaf becomes the next
//! token. The receiver replays the same model over the same context and
//! reads the bits back from the observed tokens.
//!
//! - `model` is the provider boundary: the distribution trait, the locked
//!   wrapper for non-reentrant backends and a small deterministic toy model.
//! - `stego` is the codec: filtering, truncation, code trees, the
//!   encode/decode pipeline and capacity estimation.
//! - `det_math` holds the libm-free `exp`/`ln` every probability transform
//!   goes through, so both sides agree bit-for-bit.
//!
//! No encryption is applied. Anyone holding the context and settings can
//! recover the payload.
//!
//! # Quick start
//!
//! ```rust
//! use lmstego_core::{decode, encode, DecodeOptions, PayloadMessage, Settings, ToyModel};
//!
//! let model = ToyModel::new(7);
//! let context = model.vocabulary().tokenize("Once upon a time");
//! let payload = PayloadMessage::from_text("Hi");
//! let settings = Settings::default().with_max_length(50);
//!
//! let out = encode(&model, &payload, &context, &settings).unwrap();
//! let back = decode(
//!     &model,
//!     &out.tokens,
//!     &context,
//!     &out.settings_used,
//!     &DecodeOptions::expecting(payload.bit_len()),
//! )
//! .unwrap();
//! assert_eq!(back.text(), "Hi");
//! ```

pub mod det_math;
pub mod model;
pub mod stego;

pub use model::{
    DisallowSet, Distribution, DistributionProvider, InferenceBackend, LockedProvider,
    ProviderCache, ProviderError, ToyBackend, ToyModel, TokenId, Vocabulary,
};
pub use stego::{
    decode, encode, encode_batch, encode_with, encode_with_retry, estimate_capacity,
    suggest_length, AlgorithmVariant, CancelToken, CapacityEstimate, CodeTree, DecodeOptions,
    DecodeOutput, EncodeJob, EncodeOptions, EncodeOutput, EncodeStats, ExhaustionPoint,
    MismatchPolicy, PayloadMessage, Settings, StegoError, StegoRecord, StepResult,
};
