// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Bit cursors over unpacked payload bits.
//!
//! Bits are stored one per `u8` (values 0 or 1), MSB-first relative to the
//! packed payload bytes. The encoder reads payload bits with [`BitReader`];
//! the decoder accumulates recovered bits with [`BitWriter`].

/// Sequential reader over a bit slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bits: &'a [u8]) -> Self {
        Self { bits, pos: 0 }
    }

    /// Read the next bit, or `None` once the stream is exhausted.
    pub fn read_bit(&mut self) -> Option<u8> {
        let bit = *self.bits.get(self.pos)?;
        self.pos += 1;
        Some(bit & 1)
    }

    /// Bits consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.bits.len()
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

/// Append-only bit accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitWriter {
    bits: Vec<u8>,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bit(&mut self, bit: u8) {
        self.bits.push(bit & 1);
    }

    pub fn write_bits(&mut self, bits: &[u8]) {
        self.bits.extend(bits.iter().map(|b| b & 1));
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn as_bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn into_bits(self) -> Vec<u8> {
        self.bits
    }
}
