//! Example walking through configuration, chain derivation and a render run
//!
//! Run with: cargo run --package quietwave-core --example denoise_demo

use quietwave_core::domain::config::{DenoiseConfig, QuietwaveConfig};
use quietwave_core::domain::{DecodedAudio, DenoiseChain, DenoiseError, WavHeader};
use quietwave_core::{process_audio, WAV_MIME_TYPE};

const SAMPLE_RATE: u32 = 44100;

/// Treats the input bytes as a seed for a noisy 440 Hz tone
fn synthetic_decoder(bytes: &[u8]) -> Result<DecodedAudio, DenoiseError> {
    let seed = bytes.iter().map(|&b| b as u32).sum::<u32>().max(1);
    let mut state = seed;
    let samples = (0..SAMPLE_RATE as usize)
        .map(|i| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = (state >> 8) as f64 / (1u32 << 24) as f64 - 0.5;
            let t = i as f64 / SAMPLE_RATE as f64;
            0.4 * (2.0 * std::f64::consts::PI * 440.0 * t).sin() + 0.05 * noise
        })
        .collect();

    Ok(DecodedAudio::new(vec![samples], SAMPLE_RATE))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("quietwave_core=debug,info")
        .init();

    println!("=== Quietwave Denoise Demo ===\n");

    // 1. Save and reload a configuration
    println!("1. Saving configuration...");
    let config = QuietwaveConfig {
        denoise: DenoiseConfig::new(70)?,
        ..Default::default()
    };
    let config_path = "demo_config.toml";
    config.save_to_file(config_path).await?;
    let loaded = QuietwaveConfig::load_from_file(config_path).await?;
    println!("   ✓ Loaded level {}", loaded.denoise.level);

    // 2. Show the derived chain
    println!("\n2. Derived chain at {} Hz:", SAMPLE_RATE);
    let chain = DenoiseChain::build(loaded.denoise.level, SAMPLE_RATE)?;
    let summary = chain.summary();
    println!("   highpass  {:>8.1} Hz", summary.highpass_hz);
    println!("   lowpass   {:>8.1} Hz", summary.lowpass_hz);
    println!(
        "   peaking   {:>8.1} dB @ {} Hz (Q {})",
        summary.peaking_gain_db, summary.peaking_center_hz, summary.peaking_q
    );
    println!("   gain      {:>8.2}x", summary.output_gain);

    // 3. Render and encode
    println!("\n3. Processing one second of noisy tone...");
    let bytes = process_audio(b"demo", loaded.denoise.level, &synthetic_decoder)?;
    if let Some(header) = WavHeader::parse(&bytes) {
        println!(
            "   ✓ {} bytes of {} ({} ch, {} Hz, {} data bytes)",
            bytes.len(),
            WAV_MIME_TYPE,
            header.channel_count,
            header.sample_rate_hz,
            header.data_size
        );
    }

    // 4. Out-of-range levels are rejected before any processing
    println!("\n4. Rejecting level 101...");
    match process_audio(b"demo", 101, &synthetic_decoder) {
        Err(e) => println!("   ✓ {} ({})", e.user_message(), e.kind()),
        Ok(_) => println!("   ✗ unexpectedly accepted"),
    }

    println!("\n=== Demo Complete ===");

    std::fs::remove_file(config_path)?;
    Ok(())
}
