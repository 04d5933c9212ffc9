//! Symphonia-backed decoder
//!
//! Probes the container from in-memory bytes, decodes the first audio track
//! to the end, and returns one `f64` array per channel. Supported formats
//! follow the enabled symphonia features: MP3, AAC/MP4, FLAC, OGG/Vorbis
//! and WAV.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer as InterleavedBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument, warn};

use quietwave_core::domain::audio::{DecodedAudio, Decoder, DenoiseError, Result};

fn decode_error(context: &str, err: SymphoniaError) -> DenoiseError {
    DenoiseError::Decode(format!("{}: {}", context, err))
}

/// Decoder for any container/codec symphonia can probe
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    extension: Option<String>,
}

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hint the container format with a file extension (e.g. `"mp3"`)
    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: Some(extension.into()),
        }
    }

    fn hint(&self) -> Hint {
        let mut hint = Hint::new();
        if let Some(ext) = &self.extension {
            hint.with_extension(ext);
        }
        hint
    }
}

impl Decoder for SymphoniaDecoder {
    #[instrument(skip(self, bytes), fields(len = bytes.len(), ext = ?self.extension))]
    fn decode(&self, bytes: &[u8]) -> Result<DecodedAudio> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &self.hint(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| decode_error("Failed to probe format", e))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DenoiseError::Decode("No audio tracks found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let reported_channels = track.codec_params.channels.map(|c| c.count());

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| decode_error("Failed to create decoder", e))?;

        let mut channels: Vec<Vec<f64>> = Vec::new();
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(decode_error("Error reading packet", e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    skipped_packets += 1;
                    warn!(error = e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(decode_error("Decode error", e)),
            };

            let spec = *decoded.spec();
            let count = spec.channels.count();
            if sample_rate.is_none() {
                sample_rate = Some(spec.rate);
            }

            if channels.is_empty() {
                channels = vec![Vec::new(); count];
            } else if channels.len() != count {
                return Err(DenoiseError::MalformedAudio(format!(
                    "channel count changed mid-stream from {} to {}",
                    channels.len(),
                    count
                )));
            }

            let mut interleaved = InterleavedBuffer::<f64>::new(decoded.capacity() as u64, spec);
            interleaved.copy_interleaved_ref(decoded);

            for frame in interleaved.samples().chunks_exact(count) {
                for (channel, &sample) in channels.iter_mut().zip(frame) {
                    channel.push(sample);
                }
            }
        }

        let sample_rate_hz = sample_rate
            .ok_or_else(|| DenoiseError::Decode("Unknown sample rate".to_string()))?;

        if channels.is_empty() {
            // Nothing decoded: keep the container's channel layout with zero frames
            channels = vec![Vec::new(); reported_channels.unwrap_or(1)];
        }

        let channel_count = reported_channels.unwrap_or(channels.len());
        debug!(
            channels = channel_count,
            frames = channels.first().map_or(0, Vec::len),
            sample_rate = sample_rate_hz,
            skipped_packets,
            "Decoded audio track"
        );

        Ok(DecodedAudio {
            channels,
            sample_rate_hz,
            channel_count,
        })
    }
}
