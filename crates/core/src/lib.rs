//! Quietwave core: offline denoising pipeline
//!
//! Decoded PCM goes through a fixed highpass → lowpass → peaking biquad
//! cascade plus a linear gain, all derived from a single noise reduction
//! level, and is serialized as a canonical 44-byte-header PCM16 WAV file.

pub mod domain;

pub use domain::render::{process_audio, OfflineRenderer, WAV_MIME_TYPE};
