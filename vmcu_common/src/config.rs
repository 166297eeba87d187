//! Configuration loading traits and types.
//!
//! Provides a standardized way to load the TOML run description consumed
//! by the `vmcu` binary.
//!
//! # Usage
//!
//! ```rust,no_run
//! use vmcu_common::config::{ConfigLoader, RunConfig};
//! use std::path::Path;
//!
//! let config = RunConfig::load(Path::new("run.toml")).unwrap();
//! config.validate().unwrap();
//! ```

use crate::gpio::BoardConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Toolchain section of a run description.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolchainSection {
    /// Arduino-style core/library resource directory.
    pub resource_dir: PathBuf,
    /// Sketch source path.
    pub sketch: PathBuf,
    /// Fully-qualified board name used during compilation.
    pub fqbn: String,
}

fn default_ticks() -> u64 {
    100
}

fn default_tick_period_ms() -> u64 {
    10
}

/// Run-loop section of a run description.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    /// Number of `tick()` calls before the board is stopped.
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Host-side sleep between ticks, in milliseconds.
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            tick_period_ms: default_tick_period_ms(),
        }
    }
}

/// Top-level TOML run description for the `vmcu` binary.
///
/// # TOML Example
///
/// ```toml
/// [board]
/// pins = [13]
///
/// [board.gpio_drivers.13]
/// kind = "oscillator"
/// period_ticks = 10
///
/// [toolchain]
/// resource_dir = "/opt/vmcu/resources"
/// sketch = "sketches/blink"
/// fqbn = "arduino:avr:nano"
///
/// [run]
/// ticks = 500
/// tick_period_ms = 10
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Pins and driver wiring.
    #[serde(default)]
    pub board: BoardConfig,
    /// Compilation inputs.
    pub toolchain: ToolchainSection,
    /// Tick loop parameters.
    #[serde(default)]
    pub run: RunSection,
}

impl RunConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `toolchain.fqbn` is empty
    /// - `run.ticks` is zero
    /// - the board section is not well-formed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.toolchain.fqbn.is_empty() {
            return Err(ConfigError::ValidationError(
                "toolchain.fqbn cannot be empty".to_string(),
            ));
        }
        if self.run.ticks == 0 {
            return Err(ConfigError::ValidationError(
                "run.ticks must be at least 1".to_string(),
            ));
        }
        if !self.board.is_well_formed() {
            return Err(ConfigError::ValidationError(
                "board drivers must target configured pins with non-zero periods".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_loader_file_not_found() {
        let result = RunConfig::load(Path::new("/nonexistent/path/run.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = RunConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_run_config_load_success() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[board]
pins = [13]

[board.gpio_drivers.13]
kind = "oscillator"
period_ticks = 10

[toolchain]
resource_dir = "/opt/vmcu/resources"
sketch = "sketches/blink"
fqbn = "arduino:avr:nano"

[run]
ticks = 500
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = RunConfig::load(file.path()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.run.ticks, 500);
        assert_eq!(config.run.tick_period_ms, 10); // default
        assert!(config.board.pins.contains(&13));
        assert_eq!(config.toolchain.fqbn, "arduino:avr:nano");
    }

    #[test]
    fn test_run_config_validation_empty_fqbn() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[toolchain]
resource_dir = "/opt/vmcu/resources"
sketch = "sketches/blink"
fqbn = ""
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = RunConfig::load(file.path()).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
