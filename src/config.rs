//! Session configuration.
//!
//! Loaded from a TOML file; every section and field is optional and
//! falls back to the defaults below.
//!
//! ```toml
//! [session]
//! initial_facing = "back"
//! preview_surface = "preview"
//! mirror_mode = "on_front_only"
//! record_audio = false
//!
//! [output]
//! directory = "/data/files"
//! file_name = "video.mp4"
//! timestamped = false
//!
//! [logging]
//! filter = "info"
//! ```

use crate::camera::{LensFacing, MirrorMode, OutputTarget};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings applied when the controller is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lens the session starts on.
    pub initial_facing: LensFacing,
    /// Identifier of the surface the preview renders into.
    pub preview_surface: String,
    /// Mirroring of recorded video.
    pub mirror_mode: MirrorMode,
    /// Record audio alongside video (requires microphone permission).
    pub record_audio: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_facing: LensFacing::Back,
            preview_surface: "preview".to_string(),
            mirror_mode: MirrorMode::OnFrontOnly,
            record_audio: false,
        }
    }
}

impl SessionConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview_surface.trim().is_empty() {
            return Err(ConfigError::EmptyPreviewSurface);
        }
        Ok(())
    }
}

/// Where recordings are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory recordings are written to.
    pub directory: PathBuf,
    /// Output file name; must not contain a path separator.
    pub file_name: String,
    /// Append a UTC timestamp to the file stem so recordings don't
    /// overwrite each other.
    pub timestamped: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_name: "video.mp4".to_string(),
            timestamped: false,
        }
    }
}

impl OutputConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Must be a bare name: no separators, not "." or "..".
        let bare = Path::new(&self.file_name)
            .file_name()
            .is_some_and(|name| name.len() == self.file_name.len());
        if !bare {
            return Err(ConfigError::InvalidFileName(self.file_name.clone()));
        }
        Ok(())
    }

    /// Builds the output target for a recording started at `now`.
    pub fn target(&self, now: DateTime<Utc>) -> OutputTarget {
        if !self.timestamped {
            return OutputTarget::in_dir(&self.directory, &self.file_name);
        }

        let path = Path::new(&self.file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stamp = now.format("%Y%m%d-%H%M%S");
        let name = match path.extension() {
            Some(ext) => format!("{}-{}.{}", stem, stamp, ext.to_string_lossy()),
            None => format!("{}-{}", stem, stamp),
        };
        OutputTarget::in_dir(&self.directory, &name)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` overrides it.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `preview_surface` is blank.
    #[error("preview surface must not be empty")]
    EmptyPreviewSurface,
    /// `file_name` is not a bare file name.
    #[error("invalid output file name '{0}' (must be a bare file name)")]
    InvalidFileName(String),
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[session]` section.
    #[serde(default)]
    pub session: SessionConfig,
    /// `[output]` section.
    #[serde(default)]
    pub output: OutputConfig,
    /// `[logging]` section.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.session.validate()?;
        config.output.validate()?;
        Ok(config)
    }
}
