// ABOUTME: Configuration types and parsing for enginewire.yml.
// ABOUTME: Handles YAML parsing, file discovery and environment overrides.

use crate::error::{Error, Result};
use crate::stream::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_READ_SIZE, DecodeOptions, RAW_STREAM};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "enginewire.yml";
pub const CONFIG_FILENAME_ALT: &str = "enginewire.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".enginewire/config.yml";

pub const ENV_RAW_STREAM_TYPE: &str = "ENGINEWIRE_RAW_STREAM_TYPE";
pub const ENV_MAX_FRAME_SIZE: &str = "ENGINEWIRE_MAX_FRAME_SIZE";
pub const ENV_READ_SIZE: &str = "ENGINEWIRE_READ_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Content type marking a multiplexed stdout/stderr body.
    pub raw_stream_content_type: String,

    /// Largest frame payload accepted, in bytes.
    pub max_frame_size: u32,

    /// Bytes per read when decoding chunked JSON.
    pub read_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_stream_content_type: RAW_STREAM.to_string(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_size: DEFAULT_READ_SIZE,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the first config file found in `dir`, or the defaults when there
    /// is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load(path);
            }
        }

        tracing::debug!(dir = %dir.display(), "no config file, using defaults");
        Ok(Self::default())
    }

    /// Override fields from `ENGINEWIRE_*` environment variables.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Some(value) = env_var(ENV_RAW_STREAM_TYPE) {
            self.raw_stream_content_type = value;
        }
        if let Some(value) = env_var(ENV_MAX_FRAME_SIZE) {
            self.max_frame_size = parse_env(ENV_MAX_FRAME_SIZE, &value)?;
        }
        if let Some(value) = env_var(ENV_READ_SIZE) {
            self.read_size = parse_env(ENV_READ_SIZE, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            raw_stream_content_type: self.raw_stream_content_type.clone(),
            max_frame_size: self.max_frame_size,
            read_size: self.read_size,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.raw_stream_content_type.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "raw_stream_content_type cannot be empty".to_string(),
            ));
        }
        if self.max_frame_size == 0 {
            return Err(Error::InvalidConfig(
                "max_frame_size must be greater than zero".to_string(),
            ));
        }
        if self.read_size == 0 {
            return Err(Error::InvalidConfig(
                "read_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{name}: not a valid size: {value}")))
}
