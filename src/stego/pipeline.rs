// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Encode/decode pipeline.
//!
//! Each call runs one loop over generation steps:
//! 1. ask the provider for the next distribution (through the operation's
//!    own cache),
//! 2. filter and truncate it,
//! 3. build the code tree and encode or decode one token,
//! 4. append the token to the context.
//!
//! Nothing outlives the call except the returned output, so operations can
//! run back to back or concurrently against one provider.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::model::{DistributionProvider, TokenId};
use crate::stego::bitstream::{BitReader, BitWriter};
use crate::stego::cancel::CancelToken;
use crate::stego::codec::{decode_step, encode_step};
use crate::stego::error::StegoError;
use crate::stego::payload::{bits_to_text, unpack, PayloadMessage};
use crate::stego::settings::{Settings, StegoRecord};
use crate::stego::state::{ExhaustionPoint, OperationState};
use crate::stego::stats::{EncodeStats, StatsAccumulator};

/// Trace entry for one generation step, on either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: usize,
    pub token: TokenId,
    /// Payload bits consumed (encode) or recovered (decode) at this step.
    pub bits: usize,
    pub codeword_len: usize,
    /// Encode: the payload has been fully consumed by the end of this step.
    /// Decode: at least `expected_bits` have been recovered.
    pub exhausted: bool,
    /// Decode only: the observed token was not in the reconstructed code.
    pub mismatch: bool,
    /// CRC-32 of the truncated distribution.
    pub fingerprint: u32,
}

/// First step at which two traces saw different distributions.
///
/// Compare an encode trace with the decode trace of the same sequence to
/// find where the two environments stopped agreeing.
pub fn first_divergence(a: &[StepResult], b: &[StepResult]) -> Option<usize> {
    a.iter()
        .zip(b)
        .find(|(x, y)| x.fingerprint != y.fingerprint || x.token != y.token)
        .map(|(x, _)| x.step)
}

#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub cancel: Option<CancelToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MismatchPolicy {
    /// Stop at the first mismatch and return [`StegoError::DecodeMismatch`].
    #[default]
    Strict,
    /// Skip unmatched steps and list them in the output.
    Degraded,
}

#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Truncate the recovered bits to this length.
    pub expected_bits: Option<usize>,
    pub policy: MismatchPolicy,
    pub cancel: Option<CancelToken>,
}

impl DecodeOptions {
    pub fn expecting(bits: usize) -> Self {
        Self { expected_bits: Some(bits), ..Self::default() }
    }

    pub fn degraded(mut self) -> Self {
        self.policy = MismatchPolicy::Degraded;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutput {
    pub tokens: Vec<TokenId>,
    pub bits_embedded: usize,
    pub payload_bits: usize,
    /// Fully concrete settings; replay these to decode.
    pub settings_used: Settings,
    pub exhausted_at: Option<ExhaustionPoint>,
    pub steps: Vec<StepResult>,
    pub stats: EncodeStats,
}

impl EncodeOutput {
    /// Companion record to store next to `tokens`.
    pub fn record(&self) -> StegoRecord {
        StegoRecord::new(self.settings_used.clone(), self.payload_bits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOutput {
    pub recovered_bits: Vec<u8>,
    pub bits_recovered: usize,
    /// First skipped step in degraded mode.
    pub mismatch_step: Option<usize>,
    /// Every skipped step in degraded mode; empty otherwise.
    pub skipped_steps: Vec<usize>,
    pub steps: Vec<StepResult>,
}

impl DecodeOutput {
    /// Recovered bits read as UTF-8 text.
    pub fn text(&self) -> String {
        bits_to_text(&self.recovered_bits)
    }

    /// No step was skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped_steps.is_empty()
    }
}

/// Embed `payload` into a token sequence that continues `context`.
///
/// # Errors
/// - [`StegoError::InvalidSettings`] if `settings` fail validation.
/// - [`StegoError::Fit`] if the payload is not fully consumed within
///   `settings.max_length` tokens.
/// - [`StegoError::EmptyDistribution`] or [`StegoError::Provider`] from a
///   generation step.
pub fn encode<P: DistributionProvider>(
    provider: &P,
    payload: &PayloadMessage,
    context: &[TokenId],
    settings: &Settings,
) -> Result<EncodeOutput, StegoError> {
    encode_with(provider, payload, context, settings, &EncodeOptions::default())
}

/// [`encode`] with cancellation.
///
/// # Errors
/// As [`encode`], plus [`StegoError::Cancelled`].
pub fn encode_with<P: DistributionProvider>(
    provider: &P,
    payload: &PayloadMessage,
    context: &[TokenId],
    settings: &Settings,
    options: &EncodeOptions,
) -> Result<EncodeOutput, StegoError> {
    settings.validate()?;
    let settings_used = concrete_settings(settings);
    let variant = settings_used.algorithm;
    let bits = payload.to_bits();

    info!(
        algorithm = %variant,
        payload_bits = bits.len(),
        max_length = settings_used.max_length,
        context_len = context.len(),
        "encode started"
    );

    let mut reader = BitReader::new(&bits);
    let mut state = OperationState::new(provider, context, &settings_used);
    let mut steps = Vec::with_capacity(settings_used.max_length);
    let mut stats = StatsAccumulator::default();

    if variant.embeds() && reader.is_exhausted() {
        state.mark_exhausted(0);
    }

    for _ in 0..settings_used.max_length {
        if let Some(cancel) = &options.cancel {
            cancel.check()?;
        }
        let step = state.step();
        let dist = state.next_distribution()?;
        let bypass = state.is_exhausted();
        let out = encode_step(variant, &dist, &mut reader, state.rng_mut(), bypass, step)?;

        if variant.embeds() && reader.is_exhausted() {
            state.mark_exhausted(reader.position());
        }

        let fingerprint = dist.fingerprint();
        debug!(
            step,
            candidates = dist.len(),
            token = out.token,
            bits = out.bits,
            codeword_len = out.codeword_len,
            fingerprint,
            "encode step"
        );
        stats.observe(&dist, out.token);
        steps.push(StepResult {
            step,
            token: out.token,
            bits: out.bits,
            codeword_len: out.codeword_len,
            exhausted: state.is_exhausted(),
            mismatch: false,
            fingerprint,
        });
        state.commit(out.token);
    }

    let bits_embedded = reader.position();
    if variant.embeds() && !reader.is_exhausted() {
        warn!(
            payload_bits = bits.len(),
            bits_embedded,
            max_length = settings_used.max_length,
            "payload does not fit"
        );
        return Err(StegoError::Fit {
            payload_bits: bits.len(),
            bits_embedded,
            bits_remaining: reader.remaining(),
            max_length: settings_used.max_length,
        });
    }

    let tokens = state.generated().to_vec();
    let exhausted_at = state.exhausted();
    let stats = stats.finish(bits_embedded);

    info!(
        tokens = tokens.len(),
        bits_embedded,
        exhausted_step = exhausted_at.map(|e| e.step),
        embedding_rate = stats.embedding_rate,
        "encode finished"
    );

    Ok(EncodeOutput {
        tokens,
        bits_embedded,
        payload_bits: bits.len(),
        settings_used,
        exhausted_at,
        steps,
        stats,
    })
}

/// Recover the bits carried by `tokens`.
///
/// `context` and `settings_used` must be exactly what the encoder used.
///
/// # Errors
/// - [`StegoError::DecodeMismatch`] in strict mode when an observed token is
///   not in the reconstructed code. Carries the step and the bits recovered
///   before it.
/// - [`StegoError::InvalidSettings`], [`StegoError::EmptyDistribution`],
///   [`StegoError::Provider`] or [`StegoError::Cancelled`].
pub fn decode<P: DistributionProvider>(
    provider: &P,
    tokens: &[TokenId],
    context: &[TokenId],
    settings_used: &Settings,
    options: &DecodeOptions,
) -> Result<DecodeOutput, StegoError> {
    settings_used.validate()?;
    let variant = settings_used.algorithm;

    info!(
        algorithm = %variant,
        tokens = tokens.len(),
        expected_bits = options.expected_bits,
        policy = ?options.policy,
        "decode started"
    );

    let mut state = OperationState::new(provider, context, settings_used);
    let mut recovered = BitWriter::new();
    let mut skipped = Vec::new();
    let mut steps = Vec::with_capacity(tokens.len());

    for &token in tokens {
        if let Some(cancel) = &options.cancel {
            cancel.check()?;
        }
        let step = state.step();
        let dist = state.next_distribution()?;
        let fingerprint = dist.fingerprint();

        match decode_step(variant, &dist, token) {
            Some(decoded) => {
                recovered.write_bits(&decoded.bits);
                debug!(step, token, bits = decoded.bits.len(), fingerprint, "decode step");
                steps.push(StepResult {
                    step,
                    token,
                    bits: decoded.bits.len(),
                    codeword_len: decoded.codeword_len,
                    exhausted: options.expected_bits.is_some_and(|n| recovered.len() >= n),
                    mismatch: false,
                    fingerprint,
                });
            }
            None => match options.policy {
                MismatchPolicy::Strict => {
                    warn!(step, token, recovered = recovered.len(), fingerprint, "decode mismatch");
                    return Err(StegoError::DecodeMismatch {
                        step,
                        token,
                        recovered: recovered.into_bits(),
                    });
                }
                MismatchPolicy::Degraded => {
                    warn!(step, token, fingerprint, "decode mismatch, step skipped");
                    skipped.push(step);
                    steps.push(StepResult {
                        step,
                        token,
                        bits: 0,
                        codeword_len: 0,
                        exhausted: options.expected_bits.is_some_and(|n| recovered.len() >= n),
                        mismatch: true,
                        fingerprint,
                    });
                }
            },
        }
        state.commit(token);
    }

    let recovered_bits = unpack(recovered.into_bits(), options.expected_bits);
    info!(
        bits_recovered = recovered_bits.len(),
        skipped = skipped.len(),
        "decode finished"
    );

    Ok(DecodeOutput {
        bits_recovered: recovered_bits.len(),
        recovered_bits,
        mismatch_step: skipped.first().copied(),
        skipped_steps: skipped,
        steps,
    })
}

/// Encode, and on [`StegoError::Fit`] retry with a longer length budget.
///
/// Each attempt starts from a fresh operation state. The budget grows to
/// `max(max_length + 16, payload_bits / 2)`. The seed is fixed before the
/// first attempt so every attempt is reproducible from `settings_used`.
///
/// # Errors
/// The last attempt's error, or any non-fit error immediately.
pub fn encode_with_retry<P: DistributionProvider>(
    provider: &P,
    payload: &PayloadMessage,
    context: &[TokenId],
    settings: &Settings,
    max_attempts: usize,
) -> Result<EncodeOutput, StegoError> {
    let mut settings = concrete_settings(settings);
    let attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match encode(provider, payload, context, &settings) {
            Err(StegoError::Fit { .. }) if attempt < attempts => {
                let grown = (settings.max_length + 16).max(payload.bit_len() / 2);
                warn!(
                    attempt,
                    from = settings.max_length,
                    to = grown,
                    "retrying with a longer budget"
                );
                settings.max_length = grown;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// One independent encode request.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub payload: PayloadMessage,
    pub context: Vec<TokenId>,
    pub settings: Settings,
}

/// Run independent encodes against one shared provider.
///
/// Results come back in job order. With the `parallel` feature the jobs run
/// on the rayon pool.
pub fn encode_batch<P>(provider: &P, jobs: &[EncodeJob]) -> Vec<Result<EncodeOutput, StegoError>>
where
    P: DistributionProvider + Sync,
{
    let run = |job: &EncodeJob| encode(provider, &job.payload, &job.context, &job.settings);

    #[cfg(feature = "parallel")]
    let results: Vec<_> = jobs.par_iter().map(run).collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = jobs.iter().map(run).collect();

    results
}

/// Copy of `settings` with a seed drawn from the thread RNG if none is set.
fn concrete_settings(settings: &Settings) -> Settings {
    let mut used = settings.clone();
    if used.random_seed.is_none() {
        used.random_seed = Some(rand::thread_rng().gen());
    }
    used
}
