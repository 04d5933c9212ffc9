//! Integration tests for the full denoise pipeline
//!
//! These tests push real WAV containers through the symphonia decoder, the
//! denoise chain and the PCM16 encoder, then read the result back with hound.

use proptest::prelude::*;
use quietwave_core::domain::config::RenderSettings;
use quietwave_core::domain::{DenoiseError, OfflineRenderer, WavHeader};
use quietwave_core::{process_audio, WAV_MIME_TYPE};
use quietwave_infra::SymphoniaDecoder;
use std::io::Cursor;

fn encode_input(channels: &[Vec<f64>], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = channels.first().map_or(0, Vec::len);
        for frame in 0..frames {
            for channel in channels {
                writer
                    .write_sample((channel[frame] * 32767.0).round() as i16)
                    .unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn read_output(bytes: &[u8]) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

fn generate_sine_wave(frequency: f64, amplitude: f64, sample_rate: u32, frames: usize) -> Vec<f64> {
    (0..frames)
        .map(|i| {
            amplitude * (2.0 * std::f64::consts::PI * frequency * i as f64 / sample_rate as f64).sin()
        })
        .collect()
}

fn tail_peak(samples: &[f64]) -> f64 {
    samples[samples.len() / 2..]
        .iter()
        .fold(0.0_f64, |peak, &s| peak.max(s.abs()))
}

// ============================================================================
// END-TO-END SCENARIOS
// ============================================================================

#[test]
fn test_silent_second_produces_silent_wav() {
    let input = encode_input(&[vec![0.0; 44100]], 44100);
    let output = process_audio(&input, 50, &SymphoniaDecoder::with_extension("wav")).unwrap();

    assert_eq!(output.len(), 88244);
    assert!(output[44..].iter().all(|&b| b == 0));

    let (spec, samples) = read_output(&output);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(samples.len(), 44100);
}

#[test]
fn test_stereo_shape_preserved() {
    let left = generate_sine_wave(440.0, 0.3, 48000, 4800);
    let right = generate_sine_wave(880.0, 0.3, 48000, 4800);
    let input = encode_input(&[left, right], 48000);

    let output = process_audio(&input, 20, &SymphoniaDecoder::new()).unwrap();
    let header = WavHeader::parse(&output).unwrap();

    assert_eq!(header.channel_count, 2);
    assert_eq!(header.sample_rate_hz, 48000);
    assert_eq!(header.data_size, 4800 * 2 * 2);
    assert_eq!(header.chunk_size(), 36 + header.data_size);
    assert_eq!(output.len(), 44 + header.data_size as usize);
}

#[test]
fn test_high_frequency_noise_attenuated() {
    let input = encode_input(&[generate_sine_wave(15000.0, 0.5, 44100, 8820)], 44100);

    let buffer = OfflineRenderer::default()
        .render(&input, &SymphoniaDecoder::new(), 0)
        .unwrap();

    // Lowpass at 2 kHz leaves well under a tenth of a 15 kHz tone
    assert!(tail_peak(buffer.channel(0).unwrap()) < 0.05);
}

#[test]
fn test_midrange_boosted_at_max_level() {
    let input = encode_input(&[generate_sine_wave(1000.0, 0.01, 44100, 44100)], 44100);

    let buffer = OfflineRenderer::default()
        .render(&input, &SymphoniaDecoder::new(), 100)
        .unwrap();

    // +10 dB peaking at 1 kHz times a 2x output gain
    let peak = tail_peak(buffer.channel(0).unwrap());
    assert!(peak > 0.055 && peak < 0.075, "peak was {}", peak);
}

#[test]
fn test_loud_input_clamps_instead_of_wrapping() {
    let input = encode_input(&[generate_sine_wave(1000.0, 0.9, 44100, 8820)], 44100);
    let output = process_audio(&input, 100, &SymphoniaDecoder::new()).unwrap();

    let (_, samples) = read_output(&output);
    assert_eq!(samples.iter().copied().max(), Some(i16::MAX));
    assert_eq!(samples.iter().copied().min(), Some(i16::MIN));
}

#[test]
fn test_processing_is_deterministic() {
    let noisy: Vec<f64> = generate_sine_wave(300.0, 0.4, 22050, 22050)
        .into_iter()
        .zip(generate_sine_wave(9000.0, 0.1, 22050, 22050))
        .map(|(a, b)| a + b)
        .collect();
    let input = encode_input(&[noisy.clone(), noisy], 22050);

    let first = process_audio(&input, 65, &SymphoniaDecoder::new()).unwrap();
    let second = process_audio(&input, 65, &SymphoniaDecoder::new()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_sequential_render_matches_default() {
    let input = encode_input(
        &[
            generate_sine_wave(200.0, 0.2, 32000, 3200),
            generate_sine_wave(5000.0, 0.2, 32000, 3200),
        ],
        32000,
    );
    let decoder = SymphoniaDecoder::new();

    let parallel = OfflineRenderer::default().render(&input, &decoder, 40).unwrap();
    let sequential = OfflineRenderer::new(RenderSettings {
        parallel_channels: false,
    })
    .render(&input, &decoder, 40)
    .unwrap();

    assert_eq!(parallel, sequential);
}

#[test]
fn test_mime_type() {
    assert_eq!(WAV_MIME_TYPE, "audio/wav");
}

#[tokio::test]
async fn test_file_round_trip() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let input_path = temp_dir.path().join("take1.wav");
    let output_path = temp_dir.path().join("processed_take1.wav");

    let input = encode_input(&[generate_sine_wave(440.0, 0.3, 22050, 2205)], 22050);
    tokio::fs::write(&input_path, &input).await.unwrap();

    let bytes = tokio::fs::read(&input_path).await.unwrap();
    let output = process_audio(&bytes, 30, &SymphoniaDecoder::with_extension("wav")).unwrap();
    tokio::fs::write(&output_path, &output).await.unwrap();

    let reader = hound::WavReader::open(&output_path).unwrap();
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().sample_rate, 22050);
    assert_eq!(reader.len(), 2205);
}

// ============================================================================
// FAILURE PATHS
// ============================================================================

#[test]
fn test_out_of_range_level_produces_no_output() {
    let input = encode_input(&[vec![0.1; 100]], 44100);

    for level in [-1, 101] {
        let err = process_audio(&input, level, &SymphoniaDecoder::new()).unwrap_err();
        assert!(matches!(err, DenoiseError::InvalidConfig(_)));
        assert_eq!(err.kind(), "invalid_config");
    }
}

#[test]
fn test_unsupported_bytes_fail_to_decode() {
    let err = process_audio(b"not an audio file at all", 50, &SymphoniaDecoder::new()).unwrap_err();
    assert!(matches!(err, DenoiseError::Decode(_)));
    assert_eq!(err.user_message(), "unsupported audio format");
}

#[test]
fn test_zero_frame_file_is_malformed() {
    let input = encode_input(&[Vec::new()], 44100);
    let err = process_audio(&input, 50, &SymphoniaDecoder::new()).unwrap_err();
    assert!(matches!(err, DenoiseError::MalformedAudio(_)));
}

#[test]
fn test_low_sample_rate_rejected() {
    // Lowpass cutoff of 2 kHz reaches Nyquist at 4 kHz
    let input = encode_input(&[vec![0.1; 400]], 4000);
    let err = process_audio(&input, 0, &SymphoniaDecoder::new()).unwrap_err();
    assert!(matches!(err, DenoiseError::InvalidFilterParameter { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_output_length_matches_input_shape(
        level in 0i32..=100,
        channel_count in 1usize..3,
        samples in prop::collection::vec(-1.0f64..1.0, 1..200),
    ) {
        let channels = vec![samples.clone(); channel_count];
        let input = encode_input(&channels, 16000);

        let output = process_audio(&input, level, &SymphoniaDecoder::new()).unwrap();
        let header = WavHeader::parse(&output).unwrap();

        let data_size = samples.len() * channel_count * 2;
        prop_assert_eq!(header.data_size as usize, data_size);
        prop_assert_eq!(output.len(), 44 + data_size);
    }
}
