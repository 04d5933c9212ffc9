//! Configuration management for Quietwave
//!
//! This module provides:
//! - The noise reduction level and every parameter derived from it
//! - Render settings (channel fan-out)
//! - TOML persistence and a config manager rooted in the user config dir

use crate::domain::audio::DenoiseError;
use crate::domain::dsp::params;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration file operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<DenoiseError> for ConfigError {
    fn from(err: DenoiseError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// The single user-facing control
///
/// Every filter and gain parameter is a pure function of `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenoiseConfig {
    /// Noise reduction level in [0, 100]
    pub level: i32,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self { level: 50 }
    }
}

impl DenoiseConfig {
    /// Create a validated config
    pub fn new(level: i32) -> std::result::Result<Self, DenoiseError> {
        let config = Self { level };
        config.validate()?;
        Ok(config)
    }

    /// Reject levels outside [0, 100]
    pub fn validate(&self) -> std::result::Result<(), DenoiseError> {
        if !(params::LEVEL_MIN..=params::LEVEL_MAX).contains(&self.level) {
            return Err(DenoiseError::InvalidConfig(format!(
                "level {} is outside [{}, {}]",
                self.level,
                params::LEVEL_MIN,
                params::LEVEL_MAX
            )));
        }
        Ok(())
    }

    /// 2000 + level × 40 Hz
    pub fn lowpass_cutoff_hz(&self) -> f64 {
        2000.0 + self.level as f64 * 40.0
    }

    /// 80 − level × 0.5 Hz, never below [`params::HIGHPASS_FLOOR_HZ`]
    pub fn highpass_cutoff_hz(&self) -> f64 {
        (80.0 - self.level as f64 * 0.5).max(params::HIGHPASS_FLOOR_HZ)
    }

    /// level × 0.1 dB at the fixed peaking center
    pub fn peaking_gain_db(&self) -> f64 {
        self.level as f64 * 0.1
    }

    /// 1 + level / 100
    pub fn output_gain(&self) -> f64 {
        1.0 + self.level as f64 / 100.0
    }
}

/// How a render run is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Filter channels on separate worker threads
    #[serde(default = "default_parallel_channels")]
    pub parallel_channels: bool,
}

fn default_parallel_channels() -> bool {
    true
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            parallel_channels: default_parallel_channels(),
        }
    }
}

/// Complete Quietwave configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuietwaveConfig {
    #[serde(default)]
    pub denoise: DenoiseConfig,
    #[serde(default)]
    pub render: RenderSettings,
}

impl QuietwaveConfig {
    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config = Self::from_toml(&contents)?;

        debug!(level = config.denoise.level, "Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(path, self.to_toml()?).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.denoise.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Configuration manager for the main Quietwave config
///
/// Manages the configuration file at `~/.config/quietwave/config.toml`.
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("config.toml");

        Self {
            config_dir,
            config_path,
        }
    }

    /// Manage an explicit config file instead of `<dir>/config.toml`
    pub fn with_file(config_path: PathBuf) -> Self {
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            config_dir,
            config_path,
        }
    }

    /// Get the default config directory path
    ///
    /// Returns `~/.config/quietwave` on Linux, the platform equivalent elsewhere
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("quietwave"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from file
    ///
    /// If the config file doesn't exist, writes and returns the default.
    /// If the config file is corrupt, backs it up and returns the default.
    #[instrument(skip(self))]
    pub async fn load(&self) -> QuietwaveConfig {
        if !self.config_path.exists() {
            info!(
                path = %self.config_path.display(),
                "Config file not found, creating default"
            );

            let config = QuietwaveConfig::default();

            if let Err(e) = config.save_to_file(&self.config_path).await {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to save default config"
                );
            }

            return config;
        }

        match QuietwaveConfig::load_from_file(&self.config_path).await {
            Ok(config) => config,
            Err(e) => {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load config, using default"
                );

                let backup_path = self.config_path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(&self.config_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                QuietwaveConfig::default()
            }
        }
    }

    #[instrument(skip(self, config))]
    pub async fn save(&self, config: &QuietwaveConfig) -> Result<()> {
        fs::create_dir_all(&self.config_dir).await?;
        config.save_to_file(&self.config_path).await
    }

    /// Delete the config file if present
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        if self.config_path.exists() {
            fs::remove_file(&self.config_path).await?;
            info!(
                path = %self.config_path.display(),
                "Configuration cleared"
            );
        }

        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}
