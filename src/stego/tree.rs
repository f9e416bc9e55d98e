// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Deterministic Huffman code tree over a truncated distribution.
//!
//! Nodes live in an arena and the tree is immutable once built. Merge order
//! is a total order on `(probability, smallest token id in subtree)`: the
//! lighter node is popped first and becomes the `0` child, the heavier one
//! the `1` child. Token ids are unique in a distribution, so the key never
//! ties and tree shape plus every codeword is a function of the input alone.

use core::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::model::{Distribution, TokenId};

/// Index of a node inside a [`CodeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum Node {
    Leaf { token: TokenId, prob: f64 },
    Internal { children: [usize; 2], prob: f64 },
}

impl Node {
    fn prob(&self) -> f64 {
        match *self {
            Node::Leaf { prob, .. } | Node::Internal { prob, .. } => prob,
        }
    }
}

/// Min-heap entry: ordering is reversed so `BinaryHeap` pops the lightest.
struct HeapEntry {
    prob: f64,
    min_token: TokenId,
    node: usize,
}

impl HeapEntry {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.prob
            .total_cmp(&other.prob)
            .then(self.min_token.cmp(&other.min_token))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key_cmp(self)
    }
}

/// Prefix-free code over one step's distribution.
#[derive(Debug, Clone)]
pub struct CodeTree {
    nodes: Vec<Node>,
    root: usize,
    codewords: HashMap<TokenId, Vec<u8>>,
    /// Leaf tokens in the order of the source distribution.
    leaves: Vec<TokenId>,
}

impl CodeTree {
    /// Build the tree. Returns `None` for an empty distribution.
    ///
    /// A single-entry distribution gives a lone leaf with an empty codeword.
    /// Token ids must be unique, which [`truncate`](super::truncate::truncate)
    /// guarantees for every distribution the codec sees.
    pub fn build(dist: &Distribution) -> Option<Self> {
        if dist.is_empty() {
            return None;
        }

        let n = dist.len();
        let mut nodes = Vec::with_capacity(2 * n - 1);
        let mut heap = BinaryHeap::with_capacity(n);
        for &(token, prob) in dist.entries() {
            heap.push(HeapEntry { prob, min_token: token, node: nodes.len() });
            nodes.push(Node::Leaf { token, prob });
        }

        let root = loop {
            let first = heap.pop()?;
            let Some(second) = heap.pop() else {
                break first.node;
            };
            let prob = first.prob + second.prob;
            heap.push(HeapEntry {
                prob,
                min_token: first.min_token.min(second.min_token),
                node: nodes.len(),
            });
            nodes.push(Node::Internal { children: [first.node, second.node], prob });
        };

        let codewords = assign_codewords(&nodes, root);
        let leaves = dist.entries().iter().map(|&(t, _)| t).collect();
        Some(Self { nodes, root, codewords, leaves })
    }

    pub fn root(&self) -> NodeId {
        NodeId(self.root)
    }

    /// Token at `node`, if it is a leaf.
    pub fn leaf_token(&self, node: NodeId) -> Option<TokenId> {
        match self.nodes[node.0] {
            Node::Leaf { token, .. } => Some(token),
            Node::Internal { .. } => None,
        }
    }

    /// Child of an internal node, or `None` at a leaf.
    pub fn child(&self, node: NodeId, bit: u8) -> Option<NodeId> {
        match self.nodes[node.0] {
            Node::Internal { children, .. } => Some(NodeId(children[(bit & 1) as usize])),
            Node::Leaf { .. } => None,
        }
    }

    /// Aggregate probability of the subtree under `node`.
    pub fn prob(&self, node: NodeId) -> f64 {
        self.nodes[node.0].prob()
    }

    pub fn codeword(&self, token: TokenId) -> Option<&[u8]> {
        self.codewords.get(&token).map(Vec::as_slice)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Length of the longest codeword.
    pub fn max_depth(&self) -> usize {
        self.codewords.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Expected codeword length under the leaf probabilities.
    pub fn mean_codeword_len(&self) -> f64 {
        let mut acc = 0.0;
        for node in &self.nodes {
            if let Node::Leaf { token, prob } = *node {
                acc += prob * self.codewords[&token].len() as f64;
            }
        }
        acc
    }

    /// `Σ 2^-len` over all leaves, in floating point.
    pub fn kraft_sum(&self) -> f64 {
        let mut acc = 0.0;
        for token in &self.leaves {
            acc += 0.5f64.powi(self.codewords[token].len() as i32);
        }
        acc
    }

    /// Exact Kraft-equality check for trees up to depth 127.
    pub fn satisfies_kraft_equality(&self) -> bool {
        let depth = self.max_depth();
        if depth > 127 {
            return (self.kraft_sum() - 1.0).abs() < 1e-12;
        }
        let total: u128 = self
            .codewords
            .values()
            .map(|c| 1u128 << (depth - c.len()))
            .sum();
        total == 1u128 << depth
    }
}

/// Depth-first walk recording the bit path to every leaf.
fn assign_codewords(nodes: &[Node], root: usize) -> HashMap<TokenId, Vec<u8>> {
    let mut out = HashMap::new();
    let mut stack = vec![(root, Vec::new())];
    while let Some((idx, path)) = stack.pop() {
        match nodes[idx] {
            Node::Leaf { token, .. } => {
                out.insert(token, path);
            }
            Node::Internal { children, .. } => {
                let mut one = path.clone();
                one.push(1);
                let mut zero = path;
                zero.push(0);
                stack.push((children[1], one));
                stack.push((children[0], zero));
            }
        }
    }
    out
}
