// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Token probability distributions.

use core::cmp::Ordering;

use crate::det_math::ordered_sum;

/// Index of a vocabulary entry.
pub type TokenId = u32;

/// An ordered list of `(token_id, probability)` pairs.
///
/// Providers may return entries in any order. The truncator produces the
/// canonical order (descending probability, ties by ascending token id),
/// which is what the code tree builder relies on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    entries: Vec<(TokenId, f64)>,
}

impl Distribution {
    pub fn new(entries: Vec<(TokenId, f64)>) -> Self {
        Self { entries }
    }

    /// Build a distribution from a dense probability vector (index = token id).
    pub fn from_probs(probs: &[f64]) -> Self {
        let entries = probs
            .iter()
            .enumerate()
            .map(|(i, &p)| (i as TokenId, p))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[(TokenId, f64)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(TokenId, f64)> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Probability of `token`, if it is present.
    pub fn probability(&self, token: TokenId) -> Option<f64> {
        self.entries.iter().find(|(t, _)| *t == token).map(|&(_, p)| p)
    }

    /// Sum of all probabilities, accumulated in entry order.
    pub fn total(&self) -> f64 {
        let probs: Vec<f64> = self.entries.iter().map(|&(_, p)| p).collect();
        ordered_sum(&probs)
    }

    /// Sort into canonical order: descending probability, ties by ascending id.
    pub fn sort_canonical(&mut self) {
        self.entries.sort_by(canonical_cmp);
    }

    /// Whether the entries are already in canonical order.
    pub fn is_canonical(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| canonical_cmp(&w[0], &w[1]) != Ordering::Greater)
    }

    /// True when both distributions hold the same ids and the same
    /// probability bit patterns in the same order.
    pub fn bit_identical(&self, other: &Distribution) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| a.0 == b.0 && a.1.to_bits() == b.1.to_bits())
    }

    /// CRC-32 over token ids and probability bit patterns.
    ///
    /// Encode and decode traces carry this per step so the first step at
    /// which two environments disagree can be located.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for &(token, p) in &self.entries {
            hasher.update(&token.to_be_bytes());
            hasher.update(&p.to_bits().to_be_bytes());
        }
        hasher.finalize()
    }
}

/// Canonical ordering: higher probability first, then lower token id.
pub(crate) fn canonical_cmp(a: &(TokenId, f64), b: &(TokenId, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_sort_breaks_ties_by_id() {
        let mut d = Distribution::new(vec![(5, 0.25), (2, 0.5), (9, 0.25), (1, 0.0)]);
        assert!(!d.is_canonical());
        d.sort_canonical();
        assert_eq!(d.entries(), &[(2, 0.5), (5, 0.25), (9, 0.25), (1, 0.0)]);
        assert!(d.is_canonical());
    }

    #[test]
    fn fingerprint_tracks_bits() {
        let a = Distribution::new(vec![(0, 0.5), (1, 0.5)]);
        let b = Distribution::new(vec![(0, 0.5), (1, 0.5)]);
        let c = Distribution::new(vec![(0, 0.5), (1, f64::from_bits(0.5f64.to_bits() + 1))]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert!(a.bit_identical(&b));
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert!(!a.bit_identical(&c));
    }

    #[test]
    fn dense_constructor_and_lookup() {
        let d = Distribution::from_probs(&[0.1, 0.6, 0.3]);
        assert_eq!(d.len(), 3);
        assert_eq!(d.probability(1), Some(0.6));
        assert_eq!(d.probability(7), None);
        assert!((d.total() - 1.0).abs() < 1e-12);
    }
}
