//! Helper utilities for benchmarks

use rand::Rng;

/// Generate sine wave test signal
pub fn generate_sine_wave(freq: f64, amplitude: f64, sample_rate: u32, frames: usize) -> Vec<f64> {
    (0..frames)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            amplitude * (2.0 * std::f64::consts::PI * freq * t).sin()
        })
        .collect()
}

/// Generate white noise in [-amplitude, amplitude)
pub fn generate_white_noise(amplitude: f64, frames: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..frames)
        .map(|_| (rng.gen::<f64>() * 2.0 - 1.0) * amplitude)
        .collect()
}

/// Speech-band tone buried in hiss and mains hum
pub fn generate_noisy_voice(sample_rate: u32, frames: usize) -> Vec<f64> {
    let tone = generate_sine_wave(440.0, 0.4, sample_rate, frames);
    let hum = generate_sine_wave(50.0, 0.1, sample_rate, frames);
    let hiss = generate_white_noise(0.05, frames);

    tone.iter()
        .zip(&hum)
        .zip(&hiss)
        .map(|((t, h), n)| t + h + n)
        .collect()
}

/// Generate silence
pub fn generate_silence(frames: usize) -> Vec<f64> {
    vec![0.0; frames]
}

/// Calculate RMS level
pub fn calc_rms(buffer: &[f64]) -> f64 {
    if buffer.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = buffer.iter().map(|&s| s * s).sum();
    (sum_sq / buffer.len() as f64).sqrt()
}

/// Calculate peak level
pub fn calc_peak(buffer: &[f64]) -> f64 {
    buffer.iter().map(|&s| s.abs()).fold(0.0f64, f64::max)
}

/// Convert linear amplitude to decibels
pub fn amplitude_to_db(amp: f64) -> f64 {
    if amp <= 0.0 {
        -100.0
    } else {
        20.0 * amp.log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sine_wave() {
        let wave = generate_sine_wave(440.0, 1.0, 48000, 512);
        assert_eq!(wave.len(), 512);
        assert!(wave.iter().all(|&s| (-1.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_generate_white_noise() {
        let noise = generate_white_noise(0.5, 512);
        assert_eq!(noise.len(), 512);
        assert!(noise.iter().all(|&s| (-0.5..=0.5).contains(&s)));
    }

    #[test]
    fn test_generate_noisy_voice_bounded() {
        let voice = generate_noisy_voice(44100, 4410);
        assert_eq!(voice.len(), 4410);
        assert!(calc_peak(&voice) <= 0.55 + 1e-9);
    }

    #[test]
    fn test_calc_rms() {
        let signal = vec![1.0, -1.0, 1.0, -1.0];
        assert!((calc_rms(&signal) - 1.0).abs() < 1e-9);
        assert_eq!(calc_rms(&generate_silence(0)), 0.0);
    }

    #[test]
    fn test_calc_peak() {
        let signal = vec![0.5, -0.8, 0.3, -0.2];
        assert!((calc_peak(&signal) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_amplitude_to_db() {
        assert!((amplitude_to_db(1.0) - 0.0).abs() < 0.1);
        assert!((amplitude_to_db(0.5) - (-6.02)).abs() < 0.1);
        assert!((amplitude_to_db(0.0) - (-100.0)).abs() < 0.1);
    }
}
