//! Offline render runs
//!
//! A render run is one synchronous unit of work: decode, validate, filter.
//! Any failure aborts the run and no partial buffer is returned.

use crate::domain::audio::{Decoder, DenoiseError, Result, SampleBuffer};
use crate::domain::config::{DenoiseConfig, RenderSettings};
use crate::domain::dsp::DenoiseChain;
use crate::domain::wav;
use tracing::{debug, info, instrument};

/// MIME type of the bytes produced by [`process_audio`]
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Orchestrates Decoder → DenoiseChain → filtered buffer
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRenderer {
    settings: RenderSettings,
}

impl OfflineRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Decode `input` and run the denoise chain over it
    ///
    /// # Errors
    /// - `InvalidConfig` for a level outside [0, 100], before decoding
    /// - `Decode` from the decoder
    /// - `MalformedAudio` for inconsistent or zero-length decoded audio
    /// - `InvalidFilterParameter` when the level does not fit the sample rate
    #[instrument(skip(self, input, decoder), fields(input_len = input.len()))]
    pub fn render(&self, input: &[u8], decoder: &dyn Decoder, level: i32) -> Result<SampleBuffer> {
        DenoiseConfig::new(level)?;

        let decoded = decoder.decode(input)?;
        debug!(
            channels = decoded.channels.len(),
            sample_rate = decoded.sample_rate_hz,
            "Decoded input"
        );

        let buffer = decoded.into_buffer()?;
        self.render_buffer(buffer, level)
    }

    /// [`OfflineRenderer::render`] followed by WAV encoding
    pub fn process(&self, input: &[u8], decoder: &dyn Decoder, level: i32) -> Result<Vec<u8>> {
        let buffer = self.render(input, decoder, level)?;
        wav::encode(&buffer)
    }

    /// Run the denoise chain over an already decoded buffer
    pub fn render_buffer(&self, buffer: SampleBuffer, level: i32) -> Result<SampleBuffer> {
        if buffer.is_empty() {
            return Err(DenoiseError::MalformedAudio(
                "buffer has zero frames".to_string(),
            ));
        }

        let chain = DenoiseChain::build(level, buffer.sample_rate_hz())?;

        info!(
            "Render started: {} ch, {} frames @ {} Hz, level={}",
            buffer.channel_count(),
            buffer.frame_count(),
            buffer.sample_rate_hz(),
            level
        );

        let output = if self.settings.parallel_channels {
            chain.process_parallel(buffer)?
        } else {
            chain.process(buffer)?
        };

        info!(
            peak = output.peak(),
            duration_secs = output.duration_secs(),
            "Render finished"
        );
        Ok(output)
    }
}

/// Decode, denoise and encode in one call with default [`RenderSettings`]
///
/// Returns the complete PCM16 WAV file (MIME type [`WAV_MIME_TYPE`]).
/// Use [`OfflineRenderer::process`] to run with loaded settings.
pub fn process_audio(input: &[u8], level: i32, decoder: &dyn Decoder) -> Result<Vec<u8>> {
    OfflineRenderer::default().process(input, decoder, level)
}
