//! Domain entities and business rules

pub mod audio;
pub mod config;
pub mod dsp;
pub mod render;
pub mod wav;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{DecodedAudio, Decoder, DenoiseError, SampleBuffer};
pub use config::{ConfigError, ConfigManager, DenoiseConfig, QuietwaveConfig, RenderSettings};
pub use dsp::{
    BiquadCoeffs, BiquadFilter, ChainStage, ChainSummary, DenoiseChain, FilterKind, FilterStage,
};
pub use render::{process_audio, OfflineRenderer, WAV_MIME_TYPE};
pub use wav::{encode, quantize, WavHeader};
