// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Example: compare estimated capacity across variants and top-p values.
//!
//! Usage: capacity_probe [length]

use lmstego_core::{estimate_capacity, AlgorithmVariant, Settings, ToyModel};

fn main() {
    tracing_subscriber::fmt::init();

    let length: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(64);

    let model = ToyModel::new(2024);
    let context = model.vocabulary().tokenize("Once upon a time");

    println!(
        "{:<18} {:>6} {:>10} {:>10} {:>10}",
        "variant", "top_p", "path max", "expected", "entropy"
    );
    for variant in [
        AlgorithmVariant::FullCodec,
        AlgorithmVariant::SimplifiedCodec,
        AlgorithmVariant::PlainSample,
    ] {
        for top_p in [0.5, 0.8, 0.9, 1.0] {
            let settings = Settings::default()
                .with_algorithm(variant)
                .with_top_p(top_p)
                .with_max_length(length)
                .with_seed(1);
            match estimate_capacity(&model, &context, &settings) {
                Ok(c) => println!(
                    "{:<18} {:>6.2} {:>10} {:>10.1} {:>10.1}",
                    variant.name(),
                    top_p,
                    c.path_max_bits,
                    c.expected_bits,
                    c.entropy_bits
                ),
                Err(e) => eprintln!("{variant} top_p={top_p}: {e}"),
            }
        }
    }
}
