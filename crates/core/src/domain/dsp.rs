//! Digital Signal Processing for the offline denoiser
//!
//! This module provides:
//! - Biquad coefficient design (lowpass, highpass, peaking)
//! - A Direct Form I delay line applied over a whole channel
//! - The fixed denoise chain: highpass → lowpass → peaking → linear gain
//!
//! All arithmetic is 64-bit. Filters never clamp; clamping only happens when
//! samples are quantized for WAV output.

use crate::domain::audio::{DenoiseError, Result, SampleBuffer};
use crate::domain::config::DenoiseConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// Fixed parameters of the denoise chain
pub mod params {
    /// Noise reduction level range (inclusive)
    pub const LEVEL_MIN: i32 = 0;
    pub const LEVEL_MAX: i32 = 100;

    /// Lowest highpass cutoff the chain will use
    pub const HIGHPASS_FLOOR_HZ: f64 = 20.0;

    /// Resonance of the lowpass/highpass stages: 1 dB, i.e. Q = 10^(1/20)
    pub const PASS_Q: f64 = 1.122_018_454_301_963_3;

    /// Peaking stage center frequency and Q
    pub const PEAKING_CENTER_HZ: f64 = 1000.0;
    pub const PEAKING_Q: f64 = 1.0;
}

/// Transfer-function family of a biquad stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Peaking,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterKind::Lowpass => "lowpass",
            FilterKind::Highpass => "highpass",
            FilterKind::Peaking => "peaking",
        };
        f.write_str(name)
    }
}

// ============================================================================
// BIQUAD FILTER
// ============================================================================

/// Biquad filter coefficients
///
/// Stored un-normalized as designed; [`BiquadCoeffs::normalized`] divides
/// everything by `a0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    /// Denominator coefficients
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        // Unity gain (no filtering)
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    /// Design coefficients for one stage (Audio EQ Cookbook)
    ///
    /// `gain_db` is only used by [`FilterKind::Peaking`].
    ///
    /// # Errors
    /// `InvalidFilterParameter` when `frequency_hz` is not inside
    /// `(0, sample_rate_hz / 2)` or `q` is not positive.
    pub fn design(
        kind: FilterKind,
        frequency_hz: f64,
        q: f64,
        gain_db: f64,
        sample_rate_hz: u32,
    ) -> Result<Self> {
        let invalid = |reason: &str| DenoiseError::InvalidFilterParameter {
            kind,
            frequency_hz,
            q,
            sample_rate_hz,
            reason: reason.to_string(),
        };

        let nyquist = sample_rate_hz as f64 / 2.0;
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(invalid("frequency must be positive"));
        }
        if frequency_hz >= nyquist {
            return Err(invalid("frequency must be below the Nyquist frequency"));
        }
        if !q.is_finite() || q <= 0.0 {
            return Err(invalid("Q must be positive"));
        }
        if !gain_db.is_finite() {
            return Err(invalid("gain must be finite"));
        }

        let w0 = 2.0 * std::f64::consts::PI * frequency_hz / sample_rate_hz as f64;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let coeffs = match kind {
            FilterKind::Lowpass => Self {
                b0: (1.0 - cos_w0) / 2.0,
                b1: 1.0 - cos_w0,
                b2: (1.0 - cos_w0) / 2.0,
                a0: 1.0 + alpha,
                a1: -2.0 * cos_w0,
                a2: 1.0 - alpha,
            },
            FilterKind::Highpass => Self {
                b0: (1.0 + cos_w0) / 2.0,
                b1: -(1.0 + cos_w0),
                b2: (1.0 + cos_w0) / 2.0,
                a0: 1.0 + alpha,
                a1: -2.0 * cos_w0,
                a2: 1.0 - alpha,
            },
            FilterKind::Peaking => {
                let a = 10.0_f64.powf(gain_db / 40.0);
                Self {
                    b0: 1.0 + alpha * a,
                    b1: -2.0 * cos_w0,
                    b2: 1.0 - alpha * a,
                    a0: 1.0 + alpha / a,
                    a1: -2.0 * cos_w0,
                    a2: 1.0 - alpha / a,
                }
            }
        };

        trace!(%kind, frequency_hz, q, gain_db, sample_rate_hz, ?coeffs, "Designed biquad");
        Ok(coeffs)
    }

    /// Coefficients scaled so that `a0 == 1`
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            b0: self.b0 / self.a0,
            b1: self.b1 / self.a0,
            b2: self.b2 / self.a0,
            a0: 1.0,
            a1: self.a1 / self.a0,
            a2: self.a2 / self.a0,
        }
    }
}

/// Direct Form I delay line for one channel pass
///
/// Lives on the stack of the call that filters a channel and is dropped
/// when that call returns.
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    // Previous input samples (x[n-1], x[n-2])
    x1: f64,
    x2: f64,
    // Previous output samples (y[n-1], y[n-2])
    y1: f64,
    y2: f64,
}

impl BiquadFilter {
    /// Create a filter with a cleared delay line
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs: coeffs.normalized(),
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Process a single sample
    #[inline]
    fn process_sample(&mut self, x: f64) -> f64 {
        // y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
        let y = self.coeffs.b0 * x + self.coeffs.b1 * self.x1 + self.coeffs.b2 * self.x2
            - self.coeffs.a1 * self.y1
            - self.coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    /// Filter a run of samples, carrying state over from previous calls
    pub fn process(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

/// Filter a whole channel in place with a fresh delay line
pub fn apply_in_place(coeffs: &BiquadCoeffs, samples: &mut [f64]) {
    BiquadFilter::new(*coeffs).process(samples);
}

/// Filter a whole channel into a new array with a fresh delay line
pub fn apply(coeffs: &BiquadCoeffs, samples: &[f64]) -> Vec<f64> {
    let mut output = samples.to_vec();
    apply_in_place(coeffs, &mut output);
    output
}

// ============================================================================
// FILTER STAGE
// ============================================================================

/// One biquad stage of the chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterStage {
    pub kind: FilterKind,
    pub frequency_hz: f64,
    pub q: f64,
    /// Only meaningful for peaking stages
    pub gain_db: f64,
}

impl FilterStage {
    pub fn lowpass(frequency_hz: f64, q: f64) -> Self {
        Self {
            kind: FilterKind::Lowpass,
            frequency_hz,
            q,
            gain_db: 0.0,
        }
    }

    pub fn highpass(frequency_hz: f64, q: f64) -> Self {
        Self {
            kind: FilterKind::Highpass,
            frequency_hz,
            q,
            gain_db: 0.0,
        }
    }

    pub fn peaking(frequency_hz: f64, q: f64, gain_db: f64) -> Self {
        Self {
            kind: FilterKind::Peaking,
            frequency_hz,
            q,
            gain_db,
        }
    }

    /// Design this stage's coefficients for a sample rate
    pub fn coefficients(&self, sample_rate_hz: u32) -> Result<BiquadCoeffs> {
        BiquadCoeffs::design(
            self.kind,
            self.frequency_hz,
            self.q,
            self.gain_db,
            sample_rate_hz,
        )
    }
}

// ============================================================================
// DENOISE CHAIN
// ============================================================================

/// One transform in the ordered chain
#[derive(Debug, Clone, PartialEq)]
pub enum ChainStage {
    Biquad {
        stage: FilterStage,
        coeffs: BiquadCoeffs,
    },
    Gain(f64),
}

impl ChainStage {
    /// Apply this stage to one channel in place
    pub fn apply(&self, samples: &mut [f64]) {
        match self {
            ChainStage::Biquad { coeffs, .. } => apply_in_place(coeffs, samples),
            ChainStage::Gain(gain) => {
                for sample in samples.iter_mut() {
                    *sample *= gain;
                }
            }
        }
    }

    pub fn name(&self) -> String {
        match self {
            ChainStage::Biquad { stage, .. } => stage.kind.to_string(),
            ChainStage::Gain(_) => "gain".to_string(),
        }
    }
}

/// Derived parameters of a built chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub level: i32,
    pub sample_rate_hz: u32,
    pub highpass_hz: f64,
    pub lowpass_hz: f64,
    pub peaking_center_hz: f64,
    pub peaking_q: f64,
    pub peaking_gain_db: f64,
    pub output_gain: f64,
}

/// The denoise cascade for one level and sample rate
///
/// Stages run highpass → lowpass → peaking → gain on every channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DenoiseChain {
    config: DenoiseConfig,
    sample_rate_hz: u32,
    stages: Vec<ChainStage>,
}

impl DenoiseChain {
    /// Derive all stages from a noise reduction level
    ///
    /// # Errors
    /// - `InvalidConfig` when `level` is outside [0, 100]
    /// - `InvalidFilterParameter` when a cutoff does not fit the sample rate
    pub fn build(level: i32, sample_rate_hz: u32) -> Result<Self> {
        let config = DenoiseConfig::new(level)?;

        let filters = [
            FilterStage::highpass(config.highpass_cutoff_hz(), params::PASS_Q),
            FilterStage::lowpass(config.lowpass_cutoff_hz(), params::PASS_Q),
            FilterStage::peaking(
                params::PEAKING_CENTER_HZ,
                params::PEAKING_Q,
                config.peaking_gain_db(),
            ),
        ];

        let mut stages = Vec::with_capacity(filters.len() + 1);
        for stage in filters {
            let coeffs = stage.coefficients(sample_rate_hz)?;
            stages.push(ChainStage::Biquad { stage, coeffs });
        }
        stages.push(ChainStage::Gain(config.output_gain()));

        debug!(
            "Chain built: level={}, HP={:.1}Hz, LP={:.0}Hz, peak={:.1}dB@{:.0}Hz, gain={:.2}",
            level,
            config.highpass_cutoff_hz(),
            config.lowpass_cutoff_hz(),
            config.peaking_gain_db(),
            params::PEAKING_CENTER_HZ,
            config.output_gain()
        );

        Ok(Self {
            config,
            sample_rate_hz,
            stages,
        })
    }

    pub fn level(&self) -> i32 {
        self.config.level
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// The ordered stage list
    pub fn stages(&self) -> &[ChainStage] {
        &self.stages
    }

    pub fn output_gain(&self) -> f64 {
        self.config.output_gain()
    }

    pub fn summary(&self) -> ChainSummary {
        ChainSummary {
            level: self.config.level,
            sample_rate_hz: self.sample_rate_hz,
            highpass_hz: self.config.highpass_cutoff_hz(),
            lowpass_hz: self.config.lowpass_cutoff_hz(),
            peaking_center_hz: params::PEAKING_CENTER_HZ,
            peaking_q: params::PEAKING_Q,
            peaking_gain_db: self.config.peaking_gain_db(),
            output_gain: self.config.output_gain(),
        }
    }

    /// Run every stage over one channel
    pub fn process_channel(&self, samples: &mut [f64]) {
        for stage in &self.stages {
            stage.apply(samples);
        }
    }

    /// Process all channels one after another
    pub fn process(&self, buffer: SampleBuffer) -> Result<SampleBuffer> {
        let sample_rate_hz = self.check_rate(&buffer)?;
        let mut channels = buffer.into_channels();

        for (index, channel) in channels.iter_mut().enumerate() {
            trace!(channel = index, frames = channel.len(), "Filtering channel");
            self.process_channel(channel);
        }

        SampleBuffer::new(channels, sample_rate_hz)
    }

    /// Process channels on scoped worker threads
    ///
    /// Channels are split into contiguous chunks, at most one chunk per
    /// available core. Output is bit-identical to [`DenoiseChain::process`].
    pub fn process_parallel(&self, buffer: SampleBuffer) -> Result<SampleBuffer> {
        let workers = worker_count(buffer.channel_count());
        self.process_chunked(buffer, workers)
    }

    fn process_chunked(&self, buffer: SampleBuffer, workers: usize) -> Result<SampleBuffer> {
        if workers < 2 || buffer.channel_count() < 2 {
            return self.process(buffer);
        }

        let sample_rate_hz = self.check_rate(&buffer)?;
        let mut channels = buffer.into_channels();
        let per_worker = channels.len().div_ceil(workers);
        debug!(
            channels = channels.len(),
            workers, per_worker, "Filtering channels in parallel"
        );

        crossbeam::thread::scope(|scope| {
            for (chunk_index, chunk) in channels.chunks_mut(per_worker).enumerate() {
                scope.spawn(move |_| {
                    for (offset, channel) in chunk.iter_mut().enumerate() {
                        trace!(
                            channel = chunk_index * per_worker + offset,
                            frames = channel.len(),
                            "Filtering channel"
                        );
                        self.process_channel(channel);
                    }
                });
            }
        })
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload));

        SampleBuffer::new(channels, sample_rate_hz)
    }

    fn check_rate(&self, buffer: &SampleBuffer) -> Result<u32> {
        if buffer.sample_rate_hz() != self.sample_rate_hz {
            return Err(DenoiseError::InvalidConfig(format!(
                "chain designed for {} Hz cannot process {} Hz audio",
                self.sample_rate_hz,
                buffer.sample_rate_hz()
            )));
        }
        Ok(self.sample_rate_hz)
    }
}

/// Worker threads for `channel_count` channels, capped at the available cores
fn worker_count(channel_count: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    cores.min(channel_count).max(1)
}

// ============================================================================
// TESTS
// ============================================================================
