// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Steganographic encoding and decoding over model token distributions.
//!
//! Every generation step derives a prefix-free code from the model's current
//! distribution and lets payload bits pick a path through it:
//!
//! - **filter** removes transport-unsafe tokens,
//! - **truncate** applies temperature and the top-p cutoff reproducibly,
//! - **tree** builds the Huffman code with fixed tie-breaks,
//! - **codec** walks it (encode) or looks the observed token up (decode).
//!
//! The algorithm variant (full codec, simplified codec or plain sampling) is
//! chosen once per call through [`Settings::algorithm`]. All per-call state
//! lives in an [`OperationState`](state::OperationState) owned by that call.

pub mod bitstream;
pub mod cancel;
pub mod capacity;
mod codec;
pub mod error;
pub mod filter;
pub mod payload;
mod pipeline;
pub mod settings;
pub mod state;
pub mod stats;
pub mod tree;
pub mod truncate;

pub use cancel::CancelToken;
pub use capacity::{estimate_capacity, suggest_length, CapacityEstimate};
pub use error::StegoError;
pub use filter::{filter_distribution, EmptyDistributionError};
pub use payload::{
    bits_to_string, bits_to_text, parse_bit_string, text_to_bits, unpack, PayloadMessage,
};
pub use pipeline::{
    decode, encode, encode_batch, encode_with, encode_with_retry, first_divergence, DecodeOptions,
    DecodeOutput, EncodeJob, EncodeOptions, EncodeOutput, MismatchPolicy, StepResult,
};
pub use settings::{
    AlgorithmVariant, Settings, StegoRecord, DEFAULT_CACHE_WINDOW, DEFAULT_MAX_LENGTH,
};
pub use state::ExhaustionPoint;
pub use stats::{entropy_bits, EncodeStats};
pub use tree::CodeTree;
pub use truncate::{prepare_distribution, truncate, TOP_P_EPSILON};
