//! Application configuration.
//!
//! The configuration is loaded from a JSON file, by default
//! `$XDG_CONFIG_HOME/scrubline/config.json`.  Each concern lives under its
//! own top-level key so sections can be added later without breaking
//! existing files.
//!
//! # Example
//!
//! ```json
//! {
//!   "scroll": { "scrub_lag": 0.8, "snap_delay_ms": 150 },
//!   "frame": { "interval_ms": 16 },
//!   "shader": { "speed": 1.0, "color": "#555555", "noise_intensity": 3.5 },
//!   "letters": { "max_rotation_deg": 90.0, "range_end": 0.18 },
//!   "counter": { "duration_s": 2.0, "separator": "," }
//! }
//! ```

use crate::counter::CounterParams;
use crate::letters::LetterParams;
use crate::shader::SilkParams;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
///
/// Every field is optional: a minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Scroll smoothing and snapping.
    #[serde(default)]
    pub scroll: ScrollConfig,

    /// Frame clock of the hosts that drive their own loop.
    #[serde(default)]
    pub frame: FrameConfig,

    /// Look of the shader background.
    #[serde(default)]
    pub shader: SilkParams,

    /// Hero letter dispersion.
    #[serde(default)]
    pub letters: LetterParams,

    /// Count-up numbers.
    #[serde(default)]
    pub counter: CounterParams,
}

/// Scroll smoothing and snapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Overrides every section's scrub lag (seconds).  `None` keeps each
    /// section's own value; `0` follows the scroll position immediately.
    pub scrub_lag: Option<f64>,
    /// Quiet time after the last scroll event before snapping (ms).
    pub snap_delay_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            scrub_lag: None,
            snap_delay_ms: 100,
        }
    }
}

impl ScrollConfig {
    pub fn snap_delay(&self) -> f64 {
        self.snap_delay_ms as f64 / 1000.0
    }
}

/// Frame clock settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Interval between frames (ms).
    pub interval_ms: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self { interval_ms: 16 }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e.0)))
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError(e.to_string()))
    }

    /// `$XDG_CONFIG_HOME/scrubline`, or `~/.config/scrubline`.
    pub fn default_dir() -> PathBuf {
        let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
            format!("{}/.config", home)
        });
        PathBuf::from(base).join("scrubline")
    }

    /// Load `config.json` from [`default_dir`](Self::default_dir).
    pub fn load_default() -> Self {
        Self::load_or_default(&Self::default_dir().join("config.json"))
    }

    /// Load `path`, falling back to compiled-in defaults.  A missing file is
    /// normal; a file that fails to parse is logged as a warning.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => {
                info!("loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
