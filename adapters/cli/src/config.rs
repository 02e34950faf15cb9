//! Session configuration loaded from TOML.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use gridmerge_core::{LatLng, DEFAULT_START};
use gridmerge_system_viewport::{DEFAULT_HALF_EXTENT, DEFAULT_MARGIN, MAX_SPAN};
use serde::Deserialize;
use thiserror::Error;

/// Configuration file consulted when no explicit path is given.
pub const DEFAULT_CONFIG_PATH: &str = "gridmerge.toml";

/// Largest half-extent whose margined view still fits the scheduler span.
pub const MAX_VIEW_HALF_EXTENT: u32 = (MAX_SPAN - 1) / 2 - DEFAULT_MARGIN;

/// Snapshot file used when the configuration does not name one.
pub const DEFAULT_SAVE_PATH: &str = "gridmerge-save.json";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config at {path}: {source}")]
    Read {
        /// Location of the configuration file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid TOML for [`GameConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value parsed but is outside the accepted range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Tunable session settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// File holding the durable snapshot.
    pub save_path: PathBuf,
    /// Position a fresh game starts from.
    pub start: LatLng,
    /// Cells visible on each side of the player.
    pub view_half_extent: u32,
    /// Lifetime of advisory notices in milliseconds.
    pub notice_duration_ms: u64,
    /// Optional file of `lat,lng` fixes replayed as live positions.
    pub position_feed: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from(DEFAULT_SAVE_PATH),
            start: DEFAULT_START,
            view_half_extent: DEFAULT_HALF_EXTENT,
            notice_duration_ms: 3_000,
            position_feed: None,
        }
    }
}

impl GameConfig {
    /// Reads and validates the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reads the configuration at `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parses and validates configuration text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Lifetime of advisory notices.
    #[must_use]
    pub fn notice_lifetime(&self) -> Duration {
        Duration::from_millis(self.notice_duration_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.start.is_finite() {
            return Err(ConfigError::Invalid("start position must be finite".into()));
        }
        if self.view_half_extent == 0 || self.view_half_extent > MAX_VIEW_HALF_EXTENT {
            return Err(ConfigError::Invalid(format!(
                "view_half_extent must be between 1 and {MAX_VIEW_HALF_EXTENT}"
            )));
        }
        if self.notice_duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "notice_duration_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
