// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Entropy and embedding statistics.

use serde::{Deserialize, Serialize};

use crate::det_math::{det_exp, det_ln, det_log2, ordered_sum};
use crate::model::{Distribution, TokenId};

/// Shannon entropy of `dist` in bits.
pub fn entropy_bits(dist: &Distribution) -> f64 {
    let terms: Vec<f64> = dist
        .entries()
        .iter()
        .filter(|&&(_, p)| p > 0.0)
        .map(|&(_, p)| -p * det_log2(p))
        .collect();
    ordered_sum(&terms)
}

/// Summary numbers for one encode call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EncodeStats {
    pub tokens: usize,
    pub bits_embedded: usize,
    /// Bits per generated token.
    pub embedding_rate: f64,
    /// Embedded bits over the summed entropy of every step.
    pub utilization_rate: f64,
    /// Perplexity of the emitted tokens under the truncated distributions.
    pub perplexity: f64,
    pub entropy_bits: f64,
}

/// Collects per-step terms; sums happen once in step order.
#[derive(Debug, Default)]
pub(crate) struct StatsAccumulator {
    entropies: Vec<f64>,
    neg_log_probs: Vec<f64>,
}

impl StatsAccumulator {
    pub(crate) fn observe(&mut self, dist: &Distribution, token: TokenId) {
        self.entropies.push(entropy_bits(dist));
        if let Some(p) = dist.probability(token) {
            self.neg_log_probs.push(-det_ln(p));
        }
    }

    pub(crate) fn finish(self, bits_embedded: usize) -> EncodeStats {
        let tokens = self.entropies.len();
        let entropy = ordered_sum(&self.entropies);
        let perplexity = if self.neg_log_probs.is_empty() {
            1.0
        } else {
            det_exp(ordered_sum(&self.neg_log_probs) / self.neg_log_probs.len() as f64)
        };
        EncodeStats {
            tokens,
            bits_embedded,
            embedding_rate: if tokens == 0 { 0.0 } else { bits_embedded as f64 / tokens as f64 },
            utilization_rate: if entropy > 0.0 { bits_embedded as f64 / entropy } else { 0.0 },
            perplexity,
            entropy_bits: entropy,
        }
    }
}
