// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Token filtering ahead of any probability math.
//!
//! A pure function of the raw distribution and the disallow-set, so encoder
//! and decoder derive the same survivor set from the same provider output.

use thiserror::Error;

use super::error::StegoError;
use crate::model::{DisallowSet, Distribution};

/// Every token was removed by filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("filtering removed every candidate token")]
pub struct EmptyDistributionError;

impl EmptyDistributionError {
    /// Attach the generation step at which the distribution ran dry.
    pub fn at_step(self, step: usize) -> StegoError {
        StegoError::EmptyDistribution { step }
    }
}

/// Remove disallowed tokens and entries that cannot carry probability mass
/// (non-finite or non-positive). The result is not renormalized and keeps the
/// provider's entry order.
pub fn filter_distribution(
    raw: &Distribution,
    disallow: &DisallowSet,
) -> Result<Distribution, EmptyDistributionError> {
    let kept: Vec<_> = raw
        .entries()
        .iter()
        .copied()
        .filter(|&(token, p)| p.is_finite() && p > 0.0 && !disallow.contains(token))
        .collect();
    if kept.is_empty() {
        return Err(EmptyDistributionError);
    }
    Ok(Distribution::new(kept))
}
