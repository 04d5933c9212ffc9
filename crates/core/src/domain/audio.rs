//! Audio buffer abstractions and the pipeline error taxonomy
//!
//! This module defines the sample container every stage operates on and the
//! seam to the decoding collaborator. Concrete decoders (symphonia-backed)
//! live in the `infra` crate.

use crate::domain::dsp::FilterKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur anywhere in a denoise run
///
/// Every variant aborts the whole run; nothing is retried.
#[derive(Debug, Error)]
pub enum DenoiseError {
    /// Input bytes could not be parsed into samples
    #[error("Decode error: {0}")]
    Decode(String),

    /// Decoded buffer violates shape invariants
    #[error("Malformed audio: {0}")]
    MalformedAudio(String),

    /// Noise reduction level (or another caller input) is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A derived filter parameter is invalid for the sample rate
    #[error(
        "Invalid {kind} filter parameter: {reason} (frequency={frequency_hz} Hz, q={q}, sample rate={sample_rate_hz} Hz)"
    )]
    InvalidFilterParameter {
        kind: FilterKind,
        frequency_hz: f64,
        q: f64,
        sample_rate_hz: u32,
        reason: String,
    },

    /// Zero-length audio reached the encoder
    #[error("Empty buffer: no frames to encode")]
    EmptyBuffer,
}

impl DenoiseError {
    /// Stable machine-readable tag for the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            DenoiseError::Decode(_) => "decode",
            DenoiseError::MalformedAudio(_) => "malformed_audio",
            DenoiseError::InvalidConfig(_) => "invalid_config",
            DenoiseError::InvalidFilterParameter { .. } => "invalid_filter_parameter",
            DenoiseError::EmptyBuffer => "empty_buffer",
        }
    }

    /// Short message suitable for showing to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            DenoiseError::Decode(_) => "unsupported audio format",
            DenoiseError::MalformedAudio(_) => "audio file is damaged or inconsistent",
            DenoiseError::InvalidConfig(_) => "invalid level",
            DenoiseError::InvalidFilterParameter { .. } => {
                "sample rate too low for the selected noise reduction level"
            }
            DenoiseError::EmptyBuffer => "audio contains no samples",
        }
    }
}

pub type Result<T> = std::result::Result<T, DenoiseError>;

/// Per-channel floating point audio with a shared sample rate
///
/// Invariants: at least one channel, every channel has the same length,
/// sample rate is positive. A zero frame count is representable; the
/// renderer and encoder reject it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBuffer {
    channels: Vec<Vec<f64>>,
    sample_rate_hz: u32,
}

impl SampleBuffer {
    /// Create a buffer, validating its shape
    pub fn new(channels: Vec<Vec<f64>>, sample_rate_hz: u32) -> Result<Self> {
        if sample_rate_hz == 0 {
            return Err(DenoiseError::MalformedAudio(
                "sample rate must be positive".to_string(),
            ));
        }

        let Some(first) = channels.first() else {
            return Err(DenoiseError::MalformedAudio(
                "buffer has no channels".to_string(),
            ));
        };

        let frame_count = first.len();
        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != frame_count)
        {
            return Err(DenoiseError::MalformedAudio(format!(
                "channel {} has {} frames, expected {}",
                index,
                channel.len(),
                frame_count
            )));
        }

        Ok(Self {
            channels,
            sample_rate_hz,
        })
    }

    /// Create an all-zero buffer
    pub fn silent(channel_count: usize, frame_count: usize, sample_rate_hz: u32) -> Result<Self> {
        Self::new(vec![vec![0.0; frame_count]; channel_count], sample_rate_hz)
    }

    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate_hz as f64
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f64 {
        self.channels
            .iter()
            .flatten()
            .fold(0.0_f64, |peak, &s| peak.max(s.abs()))
    }

    /// Give up ownership of the channel arrays
    pub fn into_channels(self) -> Vec<Vec<f64>> {
        self.channels
    }
}

/// Raw output of a [`Decoder`], before shape validation
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub channels: Vec<Vec<f64>>,
    pub sample_rate_hz: u32,
    /// Channel count reported by the container
    pub channel_count: usize,
}

impl DecodedAudio {
    pub fn new(channels: Vec<Vec<f64>>, sample_rate_hz: u32) -> Self {
        let channel_count = channels.len();
        Self {
            channels,
            sample_rate_hz,
            channel_count,
        }
    }

    /// Validate and convert into a non-empty [`SampleBuffer`]
    pub fn into_buffer(self) -> Result<SampleBuffer> {
        if self.channel_count != self.channels.len() {
            return Err(DenoiseError::MalformedAudio(format!(
                "container reports {} channels but {} were decoded",
                self.channel_count,
                self.channels.len()
            )));
        }

        let buffer = SampleBuffer::new(self.channels, self.sample_rate_hz)?;
        if buffer.is_empty() {
            return Err(DenoiseError::MalformedAudio(
                "decoded audio has zero frames".to_string(),
            ));
        }

        Ok(buffer)
    }
}

/// Decoding collaborator: turns container bytes into per-channel samples
pub trait Decoder: Send + Sync {
    /// Decode a complete input file held in memory
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio>;
}

impl<F> Decoder for F
where
    F: Fn(&[u8]) -> Result<DecodedAudio> + Send + Sync,
{
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio> {
        self(bytes)
    }
}
