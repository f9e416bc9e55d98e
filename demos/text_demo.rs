// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Example: hide a short message in toy-model text and read it back.
//!
//! Usage: text_demo [message] [context]
//! Set RUST_LOG=lmstego_core=debug to see per-step traces.

use lmstego_core::{
    decode, encode_with_retry, suggest_length, DecodeOptions, PayloadMessage, Settings, ToyModel,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let message = args.get(1).map(String::as_str).unwrap_or("Hi");
    let context_text = args.get(2).map(String::as_str).unwrap_or("Once upon a time");

    let model = ToyModel::new(2024);
    let context = model.vocabulary().tokenize(context_text);
    let payload = PayloadMessage::from_text(message);
    let settings = Settings::default().with_max_length(suggest_length(payload.bit_len()));

    let out = match encode_with_retry(&model, &payload, &context, &settings, 3) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("Encode failed: {e}");
            std::process::exit(1);
        }
    };

    println!("Context:   {context_text}");
    println!("Stego:     {}", model.vocabulary().detokenize(&out.tokens));
    println!(
        "Embedded:  {} bits in {} tokens ({:.2} bits/token, perplexity {:.2})",
        out.bits_embedded, out.stats.tokens, out.stats.embedding_rate, out.stats.perplexity
    );
    match out.record().to_json() {
        Ok(json) => println!("Record:    {json}"),
        Err(e) => eprintln!("Could not serialize record: {e}"),
    }

    let options = DecodeOptions::expecting(out.payload_bits);
    match decode(&model, &out.tokens, &context, &out.settings_used, &options) {
        Ok(back) => println!("Recovered: {}", back.text()),
        Err(e) => {
            eprintln!("Decode failed: {e}");
            std::process::exit(1);
        }
    }
}
