//! Canonical PCM16 WAV encoding
//!
//! Output is always a 44-byte RIFF/WAVE header (`fmt ` chunk of size 16,
//! audio format 1) followed by interleaved little-endian `i16` samples.

use crate::domain::audio::{DenoiseError, Result, SampleBuffer};
use tracing::debug;

/// Size of the canonical header in bytes
pub const HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u16 = BITS_PER_SAMPLE / 8;
const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;
const MAX_CHANNELS: u16 = u16::MAX / BYTES_PER_SAMPLE;

/// Field values of the 44-byte header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub channel_count: u16,
    pub sample_rate_hz: u32,
    /// Size of the `data` chunk payload in bytes
    pub data_size: u32,
}

impl WavHeader {
    /// Header describing the PCM16 encoding of `buffer`
    ///
    /// # Errors
    /// `EmptyBuffer` for zero frames, `MalformedAudio` when the channel count
    /// or data size does not fit the header fields.
    pub fn for_buffer(buffer: &SampleBuffer) -> Result<Self> {
        if buffer.channel_count() == 0 || buffer.frame_count() == 0 {
            return Err(DenoiseError::EmptyBuffer);
        }

        let channel_count = u16::try_from(buffer.channel_count())
            .ok()
            .filter(|&count| count <= MAX_CHANNELS)
            .ok_or_else(|| {
                DenoiseError::MalformedAudio(format!(
                    "{} channels do not fit a WAV header",
                    buffer.channel_count()
                ))
            })?;

        let byte_rate = buffer.sample_rate_hz() as u64 * channel_count as u64 * BYTES_PER_SAMPLE as u64;
        if byte_rate > u32::MAX as u64 {
            return Err(DenoiseError::MalformedAudio(format!(
                "byte rate {} does not fit a WAV header",
                byte_rate
            )));
        }

        // RIFF sizes are u32 and the chunk size adds 36 on top of the data
        let data_size = (buffer.frame_count() as u64)
            .checked_mul(channel_count as u64 * BYTES_PER_SAMPLE as u64)
            .and_then(|size| u32::try_from(size).ok())
            .filter(|size| size.checked_add(36).is_some())
            .ok_or_else(|| {
                DenoiseError::MalformedAudio(format!(
                    "{} frames exceed the 4 GiB WAV limit",
                    buffer.frame_count()
                ))
            })?;

        Ok(Self {
            channel_count,
            sample_rate_hz: buffer.sample_rate_hz(),
            data_size,
        })
    }

    /// `36 + data_size`
    pub fn chunk_size(&self) -> u32 {
        36 + self.data_size
    }

    pub fn block_align(&self) -> u16 {
        self.channel_count * BYTES_PER_SAMPLE
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate_hz * self.block_align() as u32
    }

    /// Total file length: header plus data
    pub fn file_len(&self) -> usize {
        HEADER_LEN + self.data_size as usize
    }

    /// Serialize the header, little-endian throughout
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&self.chunk_size().to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
        header[20..22].copy_from_slice(&PCM_FORMAT.to_le_bytes());
        header[22..24].copy_from_slice(&self.channel_count.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate_hz.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_size.to_le_bytes());
        header
    }

    /// Read back a canonical header
    ///
    /// Returns `None` unless every fixed field matches the layout this
    /// module writes and the derived fields are consistent.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..HEADER_LEN)?;
        let u16_at = |at: usize| u16::from_le_bytes([header[at], header[at + 1]]);
        let u32_at = |at: usize| {
            u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
        };

        if &header[0..4] != b"RIFF"
            || &header[8..12] != b"WAVE"
            || &header[12..16] != b"fmt "
            || &header[36..40] != b"data"
            || u32_at(16) != FMT_CHUNK_SIZE
            || u16_at(20) != PCM_FORMAT
            || u16_at(34) != BITS_PER_SAMPLE
        {
            return None;
        }

        if u16_at(22) > MAX_CHANNELS {
            return None;
        }

        let parsed = Self {
            channel_count: u16_at(22),
            sample_rate_hz: u32_at(24),
            data_size: u32_at(40),
        };

        let consistent = parsed.data_size.checked_add(36) == Some(u32_at(4))
            && (parsed.sample_rate_hz as u64 * parsed.block_align() as u64) == u32_at(28) as u64
            && parsed.block_align() == u16_at(32);
        consistent.then_some(parsed)
    }
}

/// Quantize one sample to PCM16
///
/// Clamps to [-1, 1], scales negatives by 32768 and non-negatives by 32767,
/// then truncates toward zero.
#[inline]
pub fn quantize(sample: f64) -> i16 {
    // NaN has no meaningful level; encode it as silence
    if sample.is_nan() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode a buffer as a canonical PCM16 WAV file
///
/// Output length is exactly `44 + frames × channels × 2`.
pub fn encode(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    let header = WavHeader::for_buffer(buffer)?;

    let mut bytes = Vec::with_capacity(header.file_len());
    bytes.extend_from_slice(&header.to_bytes());

    let channels = buffer.channels();
    for frame in 0..buffer.frame_count() {
        for channel in channels {
            bytes.extend_from_slice(&quantize(channel[frame]).to_le_bytes());
        }
    }

    debug!(
        channels = header.channel_count,
        sample_rate = header.sample_rate_hz,
        bytes = bytes.len(),
        "Encoded WAV"
    );
    Ok(bytes)
}
