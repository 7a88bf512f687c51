//! Configuration file loading
//!
//! Defaults for the command line come from an optional TOML file:
//!
//! ```toml
//! probe = "usb:serial=E6603"
//! device = "msp430"
//! verify = true
//! swd_clock_khz = 4000
//! ```
//!
//! Every key is optional, and command line flags take precedence.

use riotee_core::target::TargetKind;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "riotee-probe.toml";

/// Contents of a configuration file
#[derive(Debug, Default, Clone, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Probe selection string
    pub probe: Option<String>,
    /// Target device family
    #[serde(default, deserialize_with = "deserialize_device")]
    pub device: Option<TargetKind>,
    /// Verify after programming
    pub verify: Option<bool>,
    /// SWD clock for nRF52 targets
    pub swd_clock_khz: Option<u32>,
}

fn deserialize_device<'de, D>(deserializer: D) -> Result<Option<TargetKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let name = String::deserialize(deserializer)?;
    name.parse()
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("unknown device: {}", name)))
}

impl Config {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load `path`, or the default file if `path` is None
    ///
    /// A missing default file yields an empty configuration; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !explicit && !path.is_file() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let config = Self::from_toml_str(&text)
            .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            probe = "dummy:variant=board"
            device = "msp430"
            verify = false
            swd_clock_khz = 4000
            "#,
        )
        .unwrap();
        assert_eq!(config.probe.as_deref(), Some("dummy:variant=board"));
        assert_eq!(config.device, Some(TargetKind::Msp430));
        assert_eq!(config.verify, Some(false));
        assert_eq!(config.swd_clock_khz, Some(4000));
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_bad_config() {
        assert!(Config::from_toml_str("device = \"avr\"").is_err());
        assert!(Config::from_toml_str("speed = 3").is_err());
    }

    #[test]
    fn test_missing_explicit_file() {
        assert!(Config::load(Some(Path::new("/nonexistent/riotee-probe.toml"))).is_err());
    }
}
