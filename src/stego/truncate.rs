// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Temperature scaling and nucleus (top-p) truncation.
//!
//! Bit-identical inputs and settings must give bit-identical outputs on any
//! machine. Three rules make that hold:
//!
//! 1. Inputs are first put in token-id order, so the provider's entry order
//!    never influences a summation.
//! 2. Every sum is a single left-to-right pass ([`ordered_sum`]) and every
//!    transcendental goes through [`det_math`](crate::det_math).
//! 3. The cutoff compares against `top_p - TOP_P_EPSILON`, so a cumulative
//!    sum that lands a rounding error away from `top_p` falls on the same
//!    side every time.

use super::error::StegoError;
use super::filter::filter_distribution;
use super::settings::Settings;
use crate::det_math::{det_exp, det_ln, ordered_sum};
use crate::model::{DisallowSet, Distribution, TokenId};

/// Protocol constant: slack subtracted from `top_p` before the cutoff test.
///
/// Part of the wire contract. Changing it changes which tokens survive
/// truncation and breaks decoding of sequences produced with the old value.
pub const TOP_P_EPSILON: f64 = 1e-7;

/// Apply temperature, sort canonically, cut at `top_p`, renormalize.
///
/// `filtered` must hold positive finite probabilities (see
/// [`filter_distribution`]); it need not be normalized. An empty input gives
/// an empty output.
///
/// # Errors
/// [`StegoError::InvalidSettings`] if `temperature <= 0` (or not finite) or
/// `top_p` is outside `(0, 1]`.
pub fn truncate(
    filtered: Distribution,
    temperature: f64,
    top_p: f64,
) -> Result<Distribution, StegoError> {
    if !temperature.is_finite() || temperature <= 0.0 {
        return Err(StegoError::InvalidSettings(format!(
            "temperature must be a positive finite number, got {temperature}"
        )));
    }
    if !(top_p > 0.0 && top_p <= 1.0) {
        return Err(StegoError::InvalidSettings(format!("top_p must be in (0, 1], got {top_p}")));
    }

    let mut entries = filtered.into_entries();
    if entries.is_empty() {
        return Ok(Distribution::default());
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
    merge_duplicates(&mut entries);

    let entries = apply_temperature(entries, temperature);
    if entries.is_empty() {
        return Ok(Distribution::default());
    }

    let mut dist = Distribution::new(entries);
    dist.sort_canonical();
    let entries = dist.into_entries();

    // Single sequential accumulation; `cumulative` holds the mass of the kept
    // prefix when the loop exits.
    let threshold = top_p - TOP_P_EPSILON;
    let mut cumulative = 0.0f64;
    let mut k = entries.len();
    for (i, &(_, p)) in entries.iter().enumerate() {
        cumulative += p;
        if cumulative > threshold {
            k = i + 1;
            break;
        }
    }

    let kept = entries[..k]
        .iter()
        .map(|&(token, p)| (token, p / cumulative))
        .collect();
    Ok(Distribution::new(kept))
}

/// Fold repeated token ids into one entry carrying their summed mass.
///
/// `entries` must be sorted by token id; each run is summed in ascending
/// probability order. A token that appeared twice would otherwise become two
/// leaves sharing one codeword slot.
fn merge_duplicates(entries: &mut Vec<(TokenId, f64)>) {
    entries.dedup_by(|next, kept| {
        if next.0 == kept.0 {
            kept.1 += next.1;
            true
        } else {
            false
        }
    });
}

/// Re-softmax `log(p) / T` in token-id order and normalize.
///
/// At `T == 1` the input is only normalized, so the common case never pays
/// for a log/exp round trip. Entries whose weight underflows to zero are
/// dropped.
fn apply_temperature(entries: Vec<(TokenId, f64)>, temperature: f64) -> Vec<(TokenId, f64)> {
    let weights: Vec<f64> = if temperature == 1.0 {
        entries.iter().map(|&(_, p)| p).collect()
    } else {
        let scaled: Vec<f64> = entries.iter().map(|&(_, p)| det_ln(p) / temperature).collect();
        let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        scaled.iter().map(|&l| det_exp(l - max)).collect()
    };

    let total = ordered_sum(&weights);
    entries
        .iter()
        .zip(&weights)
        .filter(|(_, w)| **w > 0.0)
        .map(|(&(token, _), &w)| (token, w / total))
        .collect()
}

/// Filter then truncate: the per-step distribution both sides rebuild.
///
/// # Errors
/// [`StegoError::EmptyDistribution`] if nothing survives filtering, or
/// [`StegoError::InvalidSettings`] from [`truncate`].
pub fn prepare_distribution(
    raw: &Distribution,
    disallow: &DisallowSet,
    settings: &Settings,
    step: usize,
) -> Result<Distribution, StegoError> {
    let filtered = filter_distribution(raw, disallow).map_err(|e| e.at_step(step))?;
    let dist = truncate(filtered, settings.temperature, settings.top_p)?;
    if dist.is_empty() {
        return Err(StegoError::EmptyDistribution { step });
    }
    Ok(dist)
}
