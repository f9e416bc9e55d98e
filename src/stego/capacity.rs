// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Capacity estimation.
//!
//! Estimates how many payload bits a generation of `settings.max_length`
//! tokens can carry, so callers can pick a length before encoding. The
//! estimate is a dry run: the same provider, filter, truncator and tree as
//! a real encode, with tokens sampled from the truncated distribution using
//! the settings' seed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{DistributionProvider, TokenId};
use crate::stego::codec::sample_direct;
use crate::stego::error::StegoError;
use crate::stego::settings::{AlgorithmVariant, Settings};
use crate::stego::state::OperationState;
use crate::stego::stats::entropy_bits;
use crate::stego::tree::CodeTree;

/// Average embedding rate assumed by [`suggest_length`], in bits per token.
const TARGET_RATE_TENTHS: usize = 36;

/// Extra tokens added on top of the rate-based estimate.
const SAFETY_TOKENS: usize = 8;

/// Lower bound on any suggested length.
const MIN_SUGGESTED_LENGTH: usize = 32;

/// Result of a capacity dry run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CapacityEstimate {
    /// Sum over the sampled path of the most bits each step could carry.
    /// Not a bound over every path: an encode follows its own trajectory.
    pub path_max_bits: usize,
    /// Sum over steps of the expected bits per step.
    pub expected_bits: f64,
    /// Sum over steps of the truncated distribution's entropy.
    pub entropy_bits: f64,
    pub steps: usize,
}

/// Dry-run `settings.max_length` steps and total the per-step capacity.
///
/// Every figure is measured along the one trajectory sampled with
/// `settings.random_seed` (zero when unset). A real encode follows a
/// different trajectory, so `path_max_bits` is a planning figure, not a
/// guarantee in either direction.
///
/// # Errors
/// [`StegoError::InvalidSettings`], [`StegoError::EmptyDistribution`] or
/// [`StegoError::Provider`].
pub fn estimate_capacity<P: DistributionProvider>(
    provider: &P,
    context: &[TokenId],
    settings: &Settings,
) -> Result<CapacityEstimate, StegoError> {
    settings.validate()?;
    let mut state = OperationState::new(provider, context, settings);
    let mut estimate = CapacityEstimate::default();

    for _ in 0..settings.max_length {
        let step = state.step();
        let dist = state.next_distribution()?;
        let tree = CodeTree::build(&dist).ok_or(StegoError::EmptyDistribution { step })?;

        let (most, expected) = match settings.algorithm {
            AlgorithmVariant::FullCodec => (tree.max_depth(), tree.mean_codeword_len()),
            AlgorithmVariant::SimplifiedCodec if tree.leaf_count() > 1 => (1, 1.0),
            AlgorithmVariant::SimplifiedCodec | AlgorithmVariant::PlainSample => (0, 0.0),
        };
        estimate.path_max_bits += most;
        estimate.expected_bits += expected;
        estimate.entropy_bits += entropy_bits(&dist);
        estimate.steps += 1;

        let token = sample_direct(&dist, state.rng_mut())
            .ok_or(StegoError::EmptyDistribution { step })?;
        state.commit(token);
    }

    debug!(
        path_max_bits = estimate.path_max_bits,
        expected_bits = estimate.expected_bits,
        steps = estimate.steps,
        "capacity estimated"
    );
    Ok(estimate)
}

/// Generation length likely to fit `payload_bits`: one token per 3.6 bits
/// plus a safety margin, never below 32.
pub fn suggest_length(payload_bits: usize) -> usize {
    let base = (payload_bits * 10).div_ceil(TARGET_RATE_TENTHS);
    (base + SAFETY_TOKENS).max(MIN_SUGGESTED_LENGTH)
}
