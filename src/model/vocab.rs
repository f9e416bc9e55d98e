// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Vocabulary tables and the static token disallow-set.
//!
//! The vocabulary here is word-level and deliberately simple: it exists so
//! demos and tests can move between text and token ids. Real deployments
//! tokenize with the model's own tokenizer and only hand the codec ids.

use std::collections::{BTreeSet, HashMap};

use super::TokenId;

/// Word-level vocabulary with an unknown-token fallback.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, TokenId>,
    unk: TokenId,
}

impl Vocabulary {
    /// Build a vocabulary from its token strings.
    ///
    /// `unk` is appended if it is not already present. Duplicate entries keep
    /// their first id for lookups.
    pub fn new<I, S>(tokens: I, unk: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = tokens.into_iter().map(Into::into).collect();
        if !list.iter().any(|t| t == unk) {
            list.push(unk.to_string());
        }
        let mut index = HashMap::with_capacity(list.len());
        for (i, t) in list.iter().enumerate() {
            index.entry(t.clone()).or_insert(i as TokenId);
        }
        let unk = index[unk];
        Self { tokens: list, index, unk }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn unk(&self) -> TokenId {
        self.unk
    }

    pub fn token_text(&self, id: TokenId) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    pub fn id_of(&self, text: &str) -> Option<TokenId> {
        self.index.get(text).copied()
    }

    /// Whitespace tokenization with case-insensitive lookup.
    ///
    /// Words that are not in the vocabulary map to the unknown token.
    pub fn tokenize(&self, text: &str) -> Vec<TokenId> {
        text.split_whitespace()
            .map(|w| {
                self.id_of(w)
                    .or_else(|| self.id_of(&w.to_lowercase()))
                    .unwrap_or(self.unk)
            })
            .collect()
    }

    /// Join token texts with single spaces. Unknown ids are skipped.
    pub fn detokenize(&self, ids: &[TokenId]) -> String {
        let words: Vec<&str> = ids.iter().filter_map(|&id| self.token_text(id)).collect();
        words.join(" ")
    }

    /// All ids whose text contains a control character, plus the unknown token.
    pub fn transport_unsafe(&self) -> DisallowSet {
        let ids = self
            .tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.chars().any(char::is_control))
            .map(|(i, _)| i as TokenId)
            .chain(std::iter::once(self.unk));
        DisallowSet::new(ids)
    }
}

/// Tokens that must never be emitted, fixed for the lifetime of a provider.
///
/// Kept ordered so iteration and debug output are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisallowSet {
    ids: BTreeSet<TokenId>,
}

impl DisallowSet {
    pub fn new<I: IntoIterator<Item = TokenId>>(ids: I) -> Self {
        Self { ids: ids.into_iter().collect() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.ids.iter().copied()
    }
}
