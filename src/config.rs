use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

// ---------------------------------------------------------------------------
// Config sections
// ---------------------------------------------------------------------------

/// Units and display scaling of the two curve axes.
///
/// `y_*` describes stress, `x_*` describes strain. Values are divided by the
/// scaling factor before being shown or reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    pub y_unit: String,
    pub y_scaling: f64,
    pub x_unit: String,
    pub x_scaling: f64,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            y_unit: "MPa".to_string(),
            y_scaling: 1.0,
            x_unit: String::new(),
            x_scaling: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub family: String,
    pub weight: String,
    pub size: f32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "Monospace".to_string(),
            weight: "bold".to_string(),
            size: 12.0,
        }
    }
}

/// Strain interval used to fit Young's modulus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionWindow {
    pub start: f64,
    pub end: f64,
}

impl Default for RegressionWindow {
    fn default() -> Self {
        Self {
            start: 0.001,
            end: 0.01,
        }
    }
}

impl RegressionWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntegrationMethod {
    #[default]
    #[serde(rename = "trapz")]
    Trapezoid,
    #[serde(rename = "simps")]
    Simpson,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub method: IntegrationMethod,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Process-wide settings, built once at start-up and handed to the cache.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub axis: AxisConfig,
    pub font: FontConfig,
    pub regression: RegressionWindow,
    pub integration: IntegrationConfig,
}

impl Config {
    /// Load a config file. Missing sections and keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Use the external config file when it exists, otherwise the embedded
    /// defaults. A broken file is reported and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.is_file() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using default config");
                Self::default()
            }
        }
    }

    /// Copy of this config with a different modulus window.
    pub fn with_regression(mut self, window: RegressionWindow) -> Self {
        self.regression = window;
        self
    }
}
