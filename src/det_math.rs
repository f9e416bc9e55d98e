// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Deterministic math functions for reproducible distribution reconstruction.
//!
//! Provides `det_exp`, `det_ln` and `det_log2` using only IEEE 754 operations
//! (add, sub, mul, div, floor, bit manipulation). The platform libm is never
//! consulted, so the encoder and the decoder see the same bits for the same
//! inputs even when they run on different machines or toolchains.
//!
//! Algorithms and coefficients from FDLIBM (Freely Distributable LIBM),
//! which guarantees < 1 ULP error for both functions.

// ──────────────────────────────────────────────────────────────────────────
// Shared constants: ln(2) split for Cody-Waite style reduction.
// LN2_HI + LN2_LO = ln 2 to ~70 bits; LN2_HI has its low 32 bits clear so
// k·LN2_HI is exact for |k| < 2^20.
// ──────────────────────────────────────────────────────────────────────────

const LN2_HI: f64 = f64::from_bits(0x3FE62E42FEE00000); // 6.93147180369123816490e-01
const LN2_LO: f64 = f64::from_bits(0x3DEA39EF35793C76); // 1.90821492927058770002e-10
const INV_LN2: f64 = f64::from_bits(0x3FF71547652B82FE); // 1.44269504088896338700e+00

// ──────────────────────────────────────────────────────────────────────────
// Exp kernel coefficients (FDLIBM e_exp.c).
// R(r²) ≈ r·(exp(r)+1)/(exp(r)-1) on [-0.5·ln2, 0.5·ln2].
// ──────────────────────────────────────────────────────────────────────────

const P1: f64 = f64::from_bits(0x3FC555555555553E); //  1.66666666666666019037e-01
const P2: f64 = f64::from_bits(0xBF66C16C16BEBD93); // -2.77777777770155933842e-03
const P3: f64 = f64::from_bits(0x3F11566AAF25DE2C); //  6.61375632143793436117e-05
const P4: f64 = f64::from_bits(0xBEBBBD41C5D26BF1); // -1.65339022054652515390e-06
const P5: f64 = f64::from_bits(0x3E66376972BEA4D0); //  4.13813679705723846039e-08

/// Above this, exp overflows to +∞.
const EXP_OVERFLOW: f64 = 7.09782712893383973096e+02;
/// Below this, exp underflows to 0.
const EXP_UNDERFLOW: f64 = -7.45133219101941108420e+02;

// ──────────────────────────────────────────────────────────────────────────
// Log kernel coefficients (FDLIBM e_log.c).
// log(1+f) = f - hfsq + s·(hfsq + R(z)), s = f/(2+f), z = s².
// ──────────────────────────────────────────────────────────────────────────

const LG1: f64 = f64::from_bits(0x3FE5555555555593); // 6.666666666666735130e-01
const LG2: f64 = f64::from_bits(0x3FD999999997FA04); // 3.999999999940941908e-01
const LG3: f64 = f64::from_bits(0x3FD2492494229359); // 2.857142874366239149e-01
const LG4: f64 = f64::from_bits(0x3FCC71C51D8E78AF); // 2.222219843214978396e-01
const LG5: f64 = f64::from_bits(0x3FC7466496CB03DE); // 1.818357216161805012e-01
const LG6: f64 = f64::from_bits(0x3FC39A09D078C69F); // 1.531383769920937332e-01
const LG7: f64 = f64::from_bits(0x3FC2F112DF3E5244); // 1.479819860511658591e-01

/// 2^54, used to normalise subnormal inputs to `det_ln`.
const TWO54: f64 = f64::from_bits(0x4350000000000000);

/// Multiply `y` by 2^k without calling `powi` (which may lower to libm).
#[inline]
fn scale_by_pow2(y: f64, k: i32) -> f64 {
    if (-1022..=1023).contains(&k) {
        y * f64::from_bits(((0x3FF + k) as u64) << 52)
    } else if k > 1023 {
        // Only k == 1024 is reachable below the overflow threshold.
        y * 2.0 * f64::from_bits(((0x3FF + k - 1) as u64) << 52)
    } else {
        // Two-step scaling keeps the intermediate normal.
        let y = y * f64::from_bits(((0x3FF + k + 1000) as u64) << 52);
        y * f64::from_bits(((0x3FF - 1000) as u64) << 52)
    }
}

/// Deterministic e^x using only basic IEEE 754 operations.
pub fn det_exp(x: f64) -> f64 {
    if x.is_nan() {
        return x;
    }
    if x > EXP_OVERFLOW {
        return f64::INFINITY;
    }
    if x < EXP_UNDERFLOW {
        return 0.0;
    }
    if x.abs() < f64::from_bits(0x3E30000000000000) {
        // |x| < 2^-28: exp(x) rounds to 1 + x.
        return 1.0 + x;
    }

    // Argument reduction: x = k·ln2 + r, |r| <= 0.5·ln2.
    let k = (x * INV_LN2 + 0.5).floor();
    let hi = x - k * LN2_HI;
    let lo = k * LN2_LO;
    let r = hi - lo;

    let t = r * r;
    let c = r - t * (P1 + t * (P2 + t * (P3 + t * (P4 + t * P5))));
    let y = 1.0 - ((lo - (r * c) / (2.0 - c)) - hi);

    scale_by_pow2(y, k as i32)
}

/// Deterministic natural logarithm using only basic IEEE 754 operations.
pub fn det_ln(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }
    if x.is_infinite() {
        return x;
    }

    let mut x = x;
    let mut k: i32 = 0;
    if x < f64::MIN_POSITIVE {
        x *= TWO54;
        k -= 54;
    }

    // Reduce x into [sqrt(2)/2, sqrt(2)) and pull the exponent into k.
    let bits = x.to_bits();
    let mut hx = (bits >> 32) as u32;
    hx = hx.wrapping_add(0x3FF0_0000 - 0x3FE6_A09E);
    k += (hx >> 20) as i32 - 0x3FF;
    hx = (hx & 0x000F_FFFF) + 0x3FE6_A09E;
    let x = f64::from_bits(((hx as u64) << 32) | (bits & 0xFFFF_FFFF));

    let f = x - 1.0;
    let hfsq = 0.5 * f * f;
    let s = f / (2.0 + f);
    let z = s * s;
    let w = z * z;
    let t1 = w * (LG2 + w * (LG4 + w * LG6));
    let t2 = z * (LG1 + w * (LG3 + w * (LG5 + w * LG7)));
    let r = t2 + t1;
    let dk = k as f64;
    s * (hfsq + r) + dk * LN2_LO - hfsq + f + dk * LN2_HI
}

/// Deterministic base-2 logarithm.
pub fn det_log2(x: f64) -> f64 {
    det_ln(x) * INV_LN2
}

/// Left-to-right sum in slice order.
///
/// Summation order is part of the reproducibility contract: callers sort
/// their input canonically first and always accumulate through here, never
/// through iterator adaptors that may be reassociated or parallelised.
pub fn ordered_sum(values: &[f64]) -> f64 {
    let mut acc = 0.0f64;
    for &v in values {
        acc += v;
    }
    acc
}

// ──────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────
