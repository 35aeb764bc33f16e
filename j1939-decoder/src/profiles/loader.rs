//! Generic CAN profile loader
//!
//! Profiles are JSON files describing a display name, a base protocol, and
//! one opaque section per protocol id. Scanning a directory never fails: a
//! file that cannot be read or parsed is logged and skipped.

use crate::types::{DecoderError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// A loaded CAN profile
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// File name the profile was loaded from (unique key)
    pub filename: String,
    /// Display name
    pub name: String,
    /// Protocol this profile extends (e.g. "j1939")
    pub base_protocol: String,
    /// Free-form description
    pub description: String,
    /// Protocol-specific sections keyed by protocol id
    pub protocol_data: BTreeMap<String, Map<String, Value>>,
}

/// On-disk shape of a profile file
#[derive(Debug, Deserialize)]
struct ProfileFile {
    name: Option<String>,
    base_protocol: String,
    #[serde(default)]
    description: Option<String>,
    protocol_data: BTreeMap<String, Map<String, Value>>,
}

impl Profile {
    /// Parse a profile from JSON text
    ///
    /// `filename` becomes the profile key; its stem is the fallback display
    /// name when the file does not declare one.
    pub fn from_json_str(filename: &str, content: &str) -> Result<Self> {
        let file: ProfileFile =
            serde_json::from_str(content).map_err(|source| DecoderError::ProfileParse {
                path: filename.to_string(),
                source,
            })?;

        if file.base_protocol.is_empty() {
            return Err(DecoderError::InvalidProfile(format!(
                "Invalid profile {}: 'base_protocol' must be a non-empty string",
                filename
            )));
        }

        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename)
            .to_string();

        Ok(Profile {
            filename: filename.to_string(),
            name: file.name.unwrap_or(stem),
            base_protocol: file.base_protocol,
            description: file.description.unwrap_or_default(),
            protocol_data: file.protocol_data,
        })
    }

    /// Protocol section for a protocol id, if present
    pub fn section(&self, protocol_id: &str) -> Option<&Map<String, Value>> {
        self.protocol_data.get(protocol_id)
    }
}

/// Load a single profile file
pub fn load_profile(path: &Path) -> Result<Profile> {
    let content = std::fs::read_to_string(path).map_err(|source| DecoderError::ProfileIo {
        path: path.display().to_string(),
        source,
    })?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.json");

    Profile::from_json_str(filename, &content)
}

/// Discover CAN profile files (`*.json`) in a directory
///
/// A missing or unreadable directory yields no profiles.
pub fn discover_profiles(dir: &Path) -> BTreeMap<String, Profile> {
    let mut profiles = BTreeMap::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Profile directory {:?} not readable: {}", dir, e);
            return profiles;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "json");
        if !is_json || !path.is_file() {
            continue;
        }

        match load_profile(&path) {
            Ok(profile) => {
                log::debug!("Discovered profile {} ({})", profile.filename, profile.name);
                profiles.insert(profile.filename.clone(), profile);
            }
            Err(e) => log::warn!("Failed to read profile {:?}: {}", path.file_name(), e),
        }
    }

    log::info!("Discovered {} profile(s) in {:?}", profiles.len(), dir);
    profiles
}

/// Filename -> display name map, optionally filtered by base protocol
pub fn profile_display_map(
    profiles: &BTreeMap<String, Profile>,
    base_protocol: Option<&str>,
) -> BTreeMap<String, String> {
    profiles
        .iter()
        .filter(|(_, profile)| base_protocol.map_or(true, |proto| profile.base_protocol == proto))
        .map(|(filename, profile)| (filename.clone(), profile.name.clone()))
        .collect()
}
