// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Codec settings and the persisted companion record.
//!
//! Every field here influences the reconstructed distributions, so the
//! decoder must see exactly the `settings_used` that the encoder returned.
//! Callers store them next to the token sequence as a [`StegoRecord`].

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::StegoError;

/// Default number of provider cache steps retained between calls.
pub const DEFAULT_CACHE_WINDOW: usize = 256;

/// Default generation length when the caller does not choose one.
pub const DEFAULT_MAX_LENGTH: usize = 64;

/// Algorithm variant, selected once per operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmVariant {
    /// Payload bits walk the full prefix-code tree each step.
    #[default]
    #[serde(alias = "Discop")]
    FullCodec,
    /// One payload bit per step picks the root branch; the rest is sampled.
    #[serde(alias = "Discop_baseline")]
    SimplifiedCodec,
    /// No embedding at all. Statistical baseline.
    #[serde(alias = "sample")]
    PlainSample,
}

impl AlgorithmVariant {
    pub const fn name(self) -> &'static str {
        match self {
            Self::FullCodec => "full-codec",
            Self::SimplifiedCodec => "simplified-codec",
            Self::PlainSample => "plain-sample",
        }
    }

    /// Whether this variant carries payload bits at all.
    pub const fn embeds(self) -> bool {
        !matches!(self, Self::PlainSample)
    }
}

impl fmt::Display for AlgorithmVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmVariant {
    type Err = StegoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full-codec" | "Discop" => Ok(Self::FullCodec),
            "simplified-codec" | "Discop_baseline" => Ok(Self::SimplifiedCodec),
            "plain-sample" | "sample" => Ok(Self::PlainSample),
            other => {
                Err(StegoError::InvalidSettings(format!("unknown algorithm variant `{other}`")))
            }
        }
    }
}

/// Codec configuration. Must be replayed verbatim to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "algo", default)]
    pub algorithm: AlgorithmVariant,
    #[serde(rename = "temp")]
    pub temperature: f64,
    pub top_p: f64,
    #[serde(rename = "length")]
    pub max_length: usize,
    #[serde(rename = "seed", default)]
    pub random_seed: Option<u64>,
    #[serde(default = "default_cache_window")]
    pub cache_window: usize,
}

fn default_cache_window() -> usize {
    DEFAULT_CACHE_WINDOW
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmVariant::FullCodec,
            temperature: 1.0,
            top_p: 0.9,
            max_length: DEFAULT_MAX_LENGTH,
            random_seed: None,
            cache_window: DEFAULT_CACHE_WINDOW,
        }
    }
}

impl Settings {
    pub fn with_algorithm(mut self, algorithm: AlgorithmVariant) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_cache_window(mut self, window: usize) -> Self {
        self.cache_window = window;
        self
    }

    /// Check ranges.
    ///
    /// # Errors
    /// [`StegoError::InvalidSettings`] if temperature is not a positive finite
    /// number, `top_p` is outside `(0, 1]`, or `max_length` / `cache_window`
    /// is zero.
    pub fn validate(&self) -> Result<(), StegoError> {
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(StegoError::InvalidSettings(format!(
                "temperature must be a positive finite number, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(StegoError::InvalidSettings(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        if self.max_length == 0 {
            return Err(StegoError::InvalidSettings("max_length must be greater than 0".into()));
        }
        if self.cache_window == 0 {
            return Err(StegoError::InvalidSettings("cache_window must be greater than 0".into()));
        }
        Ok(())
    }
}

/// What a caller persists next to a generated token sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StegoRecord {
    pub settings: Settings,
    /// Declared payload length in bits; carried out of band.
    pub payload_bits: usize,
}

impl StegoRecord {
    pub fn new(settings: Settings, payload_bits: usize) -> Self {
        Self { settings, payload_bits }
    }

    pub fn to_json(&self) -> Result<String, StegoError> {
        serde_json::to_string(self).map_err(|e| StegoError::InvalidSettings(e.to_string()))
    }

    /// Parse and validate a stored record.
    pub fn from_json(json: &str) -> Result<Self, StegoError> {
        let record: Self =
            serde_json::from_str(json).map_err(|e| StegoError::InvalidSettings(e.to_string()))?;
        record.settings.validate()?;
        Ok(record)
    }
}
