// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Per-step encode and decode for each algorithm variant.
//!
//! The variant is chosen once per operation and dispatched here with a
//! single `match`. Every variant obeys the same contract: encode turns the
//! truncated distribution plus payload bits into one token, decode turns the
//! same distribution plus the observed token back into the bits it carried.
//!
//! Randomness only enters through the operation's RNG, and only where the
//! payload does not determine the choice:
//!
//! - fallback completion once the payload runs out inside a codeword,
//! - the unconstrained branches of the simplified codec,
//! - direct sampling after exhaustion and in plain-sample mode.
//!
//! All three pick a branch with probability proportional to its mass, so the
//! emitted token follows the truncated distribution.

use rand::Rng;

use super::bitstream::BitReader;
use super::error::StegoError;
use super::settings::AlgorithmVariant;
use super::tree::{CodeTree, NodeId};
use crate::model::{Distribution, TokenId};

/// What one encode step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EncodedStep {
    pub token: TokenId,
    /// Payload bits consumed by this step.
    pub bits: usize,
    /// Length of the emitted token's codeword; zero when no tree was built.
    pub codeword_len: usize,
}

/// Emit one token for `dist`.
///
/// When `bypass` is set (payload already exhausted) or the variant does not
/// embed, the token is sampled directly and no bits are read.
pub(crate) fn encode_step<R: Rng>(
    variant: AlgorithmVariant,
    dist: &Distribution,
    payload: &mut BitReader<'_>,
    rng: &mut R,
    bypass: bool,
    step: usize,
) -> Result<EncodedStep, StegoError> {
    if bypass || !variant.embeds() {
        let token = sample_direct(dist, rng).ok_or(StegoError::EmptyDistribution { step })?;
        return Ok(EncodedStep { token, bits: 0, codeword_len: 0 });
    }

    let tree = CodeTree::build(dist).ok_or(StegoError::EmptyDistribution { step })?;
    let mut node = tree.root();
    let mut bits = 0usize;

    // Bits the payload is allowed to decide at this step.
    let budget = match variant {
        AlgorithmVariant::FullCodec => usize::MAX,
        AlgorithmVariant::SimplifiedCodec => 1,
        AlgorithmVariant::PlainSample => 0,
    };

    while tree.leaf_token(node).is_none() {
        let next = match (bits < budget).then(|| payload.read_bit()).flatten() {
            Some(bit) => {
                bits += 1;
                tree.child(node, bit)
            }
            None => Some(fallback_child(&tree, node, rng)),
        };
        node = next.ok_or(StegoError::EmptyDistribution { step })?;
    }

    let token = tree.leaf_token(node).ok_or(StegoError::EmptyDistribution { step })?;
    let codeword_len = tree.codeword(token).map_or(0, <[u8]>::len);
    Ok(EncodedStep { token, bits, codeword_len })
}

/// Bits carried by `token` under `dist`, or `None` if the token is not in
/// the reconstructed code.
pub(crate) fn decode_step(
    variant: AlgorithmVariant,
    dist: &Distribution,
    token: TokenId,
) -> Option<DecodedStep> {
    match variant {
        AlgorithmVariant::PlainSample => {
            dist.probability(token)?;
            Some(DecodedStep { bits: Vec::new(), codeword_len: 0 })
        }
        AlgorithmVariant::FullCodec | AlgorithmVariant::SimplifiedCodec => {
            let tree = CodeTree::build(dist)?;
            let codeword = tree.codeword(token)?;
            let bits = if variant == AlgorithmVariant::FullCodec {
                codeword.to_vec()
            } else {
                codeword.first().copied().into_iter().collect()
            };
            Some(DecodedStep { bits, codeword_len: codeword.len() })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecodedStep {
    pub bits: Vec<u8>,
    pub codeword_len: usize,
}

/// Pick a child of the internal node `node` in proportion to subtree mass.
fn fallback_child<R: Rng>(tree: &CodeTree, node: NodeId, rng: &mut R) -> NodeId {
    match (tree.child(node, 0), tree.child(node, 1)) {
        (Some(zero), Some(one)) => {
            let u: f64 = rng.gen();
            if u * tree.prob(node) < tree.prob(zero) {
                zero
            } else {
                one
            }
        }
        _ => node,
    }
}

/// Sample a token from `dist` by inverse CDF in entry order.
pub(crate) fn sample_direct<R: Rng>(dist: &Distribution, rng: &mut R) -> Option<TokenId> {
    let (last, _) = *dist.entries().last()?;
    let target = rng.gen::<f64>() * dist.total();
    let mut cumulative = 0.0;
    for &(token, p) in dist.entries() {
        cumulative += p;
        if target < cumulative {
            return Some(token);
        }
    }
    Some(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn dist4() -> Distribution {
        Distribution::new(vec![(0, 0.25), (1, 0.25), (2, 0.25), (3, 0.25)])
    }

    #[test]
    fn full_codec_consumes_whole_codeword() {
        let bits = [1, 0, 1, 1];
        let mut payload = BitReader::new(&bits);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let step =
            encode_step(AlgorithmVariant::FullCodec, &dist4(), &mut payload, &mut rng, false, 0)
                .unwrap();
        assert_eq!(step, EncodedStep { token: 2, bits: 2, codeword_len: 2 });
        let decoded = decode_step(AlgorithmVariant::FullCodec, &dist4(), 2).unwrap();
        assert_eq!(decoded.bits, vec![1, 0]);
    }

    #[test]
    fn exhaustion_inside_codeword_keeps_prefix() {
        let bits = [1];
        for seed in 0..16 {
            let mut payload = BitReader::new(&bits);
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let step =
                encode_step(AlgorithmVariant::FullCodec, &dist4(), &mut payload, &mut rng, false, 0)
                    .unwrap();
            assert_eq!(step.bits, 1);
            assert!(step.token == 2 || step.token == 3, "seed {seed}");
            assert!(payload.is_exhausted());
        }
    }

    #[test]
    fn single_leaf_consumes_nothing() {
        let d = Distribution::new(vec![(7, 1.0)]);
        let bits = [1, 1];
        let mut payload = BitReader::new(&bits);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let step =
            encode_step(AlgorithmVariant::FullCodec, &d, &mut payload, &mut rng, false, 0).unwrap();
        assert_eq!(step, EncodedStep { token: 7, bits: 0, codeword_len: 0 });
        assert_eq!(payload.position(), 0);
        assert_eq!(decode_step(AlgorithmVariant::FullCodec, &d, 7).unwrap().bits, Vec::<u8>::new());
    }

    #[test]
    fn simplified_codec_reads_one_bit() {
        let bits = [1, 1, 1];
        let mut payload = BitReader::new(&bits);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let variant = AlgorithmVariant::SimplifiedCodec;
        let step = encode_step(variant, &dist4(), &mut payload, &mut rng, false, 0).unwrap();
        assert_eq!(step.bits, 1);
        assert_eq!(payload.position(), 1);
        let decoded = decode_step(AlgorithmVariant::SimplifiedCodec, &dist4(), step.token).unwrap();
        assert_eq!(decoded.bits, vec![1]);
        assert_eq!(decoded.codeword_len, 2);
    }

    #[test]
    fn plain_sample_reads_nothing() {
        let bits = [1, 0];
        let mut payload = BitReader::new(&bits);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let step =
            encode_step(AlgorithmVariant::PlainSample, &dist4(), &mut payload, &mut rng, false, 0)
                .unwrap();
        assert_eq!(step.bits, 0);
        assert_eq!(payload.position(), 0);
        assert!(decode_step(AlgorithmVariant::PlainSample, &dist4(), step.token)
            .unwrap()
            .bits
            .is_empty());
    }

    #[test]
    fn unknown_token_is_a_mismatch() {
        assert!(decode_step(AlgorithmVariant::FullCodec, &dist4(), 99).is_none());
        assert!(decode_step(AlgorithmVariant::SimplifiedCodec, &dist4(), 99).is_none());
        assert!(decode_step(AlgorithmVariant::PlainSample, &dist4(), 99).is_none());
    }

    #[test]
    fn direct_sampling_follows_distribution() {
        let d = Distribution::new(vec![(0, 0.7), (1, 0.2), (2, 0.1)]);
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let mut counts = [0usize; 3];
        for _ in 0..10_000 {
            counts[sample_direct(&d, &mut rng).unwrap() as usize] += 1;
        }
        assert!((6700..7300).contains(&counts[0]), "{counts:?}");
        assert!((1700..2300).contains(&counts[1]), "{counts:?}");
        assert!(sample_direct(&Distribution::default(), &mut rng).is_none());
    }

    #[test]
    fn fallback_completion_follows_subtree_mass() {
        let d = Distribution::new(vec![(0, 0.6), (1, 0.3), (2, 0.1)]);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut counts = [0usize; 3];
        for _ in 0..10_000 {
            let mut payload = BitReader::new(&[]);
            let s = encode_step(AlgorithmVariant::FullCodec, &d, &mut payload, &mut rng, false, 0)
                .unwrap();
            counts[s.token as usize] += 1;
        }
        assert!((5700..6300).contains(&counts[0]), "{counts:?}");
        assert!((700..1300).contains(&counts[2]), "{counts:?}");
    }
}
