//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use j1939_decoder::keys::normalize_selected_signals;
use j1939_decoder::protocols::get_can_protocol;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Directory scanned for profile JSON files
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: PathBuf,
    #[serde(default)]
    pub ports: Vec<PortConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// One CAN port and how to decode it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortConfig {
    /// Port name as it appears in telemetry (e.g. "can1")
    pub id: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Profile filenames applied to this port's decoder, in order
    #[serde(default)]
    pub profiles: Vec<String>,
    /// Signal keys to emit (legacy keys are accepted)
    #[serde(default)]
    pub selected_signals: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Include the per-port diagnostics summary
    #[serde(default)]
    pub include_diagnostics: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

fn default_profiles_dir() -> PathBuf {
    PathBuf::from("profiles")
}

fn default_protocol() -> String {
    "j1939".to_string()
}

impl AppConfig {
    /// Check protocol ids and port uniqueness, canonicalise signal keys
    pub fn validate(mut self) -> Result<Self> {
        let mut seen = HashSet::new();
        for port in &mut self.ports {
            if port.id.trim().is_empty() {
                bail!("Port id must not be empty");
            }
            if !seen.insert(port.id.clone()) {
                bail!("Port {} is configured more than once", port.id);
            }
            if get_can_protocol(&port.protocol).is_none() {
                bail!("Port {} uses unknown protocol '{}'", port.id, port.protocol);
            }
            port.selected_signals = normalize_selected_signals(&port.selected_signals);
        }
        Ok(self)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))
}
