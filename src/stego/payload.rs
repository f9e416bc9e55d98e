// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Payload packing and unpacking.
//!
//! A payload is a byte buffer plus a declared bit length. Bits are taken
//! most-significant-first from each byte:
//!
//! ```text
//! bytes  0x48       0x69
//! bits   01001000   01101001
//! ```
//!
//! The declared length travels out of band next to the settings (see
//! [`StegoRecord`](super::settings::StegoRecord)); nothing is written in-band.

use crate::stego::error::StegoError;

/// Bytes to embed together with the number of meaningful bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadMessage {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl PayloadMessage {
    /// Whole bytes, `8 * bytes.len()` bits.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let bit_len = bytes.len() * 8;
        Self { bytes, bit_len }
    }

    /// Bytes with an explicit bit length. Trailing bits of the last byte
    /// beyond `bit_len` are ignored.
    ///
    /// # Errors
    /// [`StegoError::InvalidPayload`] if `bit_len` exceeds the buffer.
    pub fn with_bit_len(bytes: impl Into<Vec<u8>>, bit_len: usize) -> Result<Self, StegoError> {
        let bytes = bytes.into();
        if bit_len > bytes.len() * 8 {
            return Err(StegoError::InvalidPayload(format!(
                "declared {bit_len} bits but buffer holds only {}",
                bytes.len() * 8
            )));
        }
        Ok(Self { bytes, bit_len })
    }

    /// Pack unpacked bits (one per element, 0 or 1).
    ///
    /// # Errors
    /// [`StegoError::InvalidPayload`] if any element is not 0 or 1.
    pub fn from_bits(bits: &[u8]) -> Result<Self, StegoError> {
        if let Some(pos) = bits.iter().position(|&b| b > 1) {
            return Err(StegoError::InvalidPayload(format!(
                "bit {pos} has value {}, expected 0 or 1",
                bits[pos]
            )));
        }
        Ok(Self { bytes: pack_bits(bits), bit_len: bits.len() })
    }

    /// UTF-8 bytes of `text`.
    pub fn from_text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Unpack into one bit per element, MSB-first.
    pub fn to_bits(&self) -> Vec<u8> {
        (0..self.bit_len)
            .map(|i| (self.bytes[i / 8] >> (7 - i % 8)) & 1)
            .collect()
    }
}

/// Truncate recovered bits to `expected` when given.
///
/// Returns the raw bits unchanged when `expected` is `None` or not smaller
/// than what was recovered.
pub fn unpack(mut bits: Vec<u8>, expected: Option<usize>) -> Vec<u8> {
    if let Some(n) = expected {
        bits.truncate(n);
    }
    bits
}

/// Pack bits MSB-first. The last byte is zero-padded.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, &b) in bits.iter().enumerate() {
        out[i / 8] |= (b & 1) << (7 - i % 8);
    }
    out
}

/// Render bits as a `'0'`/`'1'` string.
pub fn bits_to_string(bits: &[u8]) -> String {
    bits.iter().map(|&b| if b & 1 == 1 { '1' } else { '0' }).collect()
}

/// Parse a `'0'`/`'1'` string. ASCII whitespace is skipped.
///
/// # Errors
/// [`StegoError::InvalidPayload`] on any other character.
pub fn parse_bit_string(s: &str) -> Result<Vec<u8>, StegoError> {
    s.chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '0' => Ok(0),
            '1' => Ok(1),
            other => Err(StegoError::InvalidPayload(format!(
                "unexpected character {other:?} in bit string"
            ))),
        })
        .collect()
}

/// UTF-8 text as bits, 8 per byte.
pub fn text_to_bits(text: &str) -> Vec<u8> {
    PayloadMessage::from_text(text).to_bits()
}

/// Decode whole bytes back to text. A trailing partial byte is dropped and
/// invalid UTF-8 is replaced.
pub fn bits_to_text(bits: &[u8]) -> String {
    let whole = bits.len() - bits.len() % 8;
    String::from_utf8_lossy(&pack_bits(&bits[..whole])).into_owned()
}
