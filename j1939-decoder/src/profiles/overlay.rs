//! J1939 profile overlay
//!
//! Validates the `j1939` section of a profile and merges it onto a copy of a
//! base dictionary. A profile is accepted or rejected as a whole: its groups
//! and parameters are only inserted once every definition and every
//! cross-reference inside it has been checked.
//!
//! Section layout:
//!
//! ```json
//! {
//!   "pgns": { "65271": { "name": "...", "acronym": "VEP1", "length": 8, "spns": [167, 168] } },
//!   "spns": { "167": { "name": "...", "pgn": 65271, "start_byte": 3, "start_bit": 1,
//!                      "bit_length": 16, "resolution": 0.05, "offset": 0, "unit": "V",
//!                      "min_value": 0, "max_value": 3212.75,
//!                      "states": { "0": "Off", "1": "On" } } },
//!   "dm1":  { "spn_encoding": "big_endian", "ports": ["can1"],
//!             "custom_fault_spns": { "520198": "Emergency Stop" } }
//! }
//! ```

use super::loader::Profile;
use crate::config::{Dm1Config, SpnEncoding};
use crate::signals::{PgnDefinition, SignalDatabase, SpnDefinition, MAX_PAYLOAD_LEN, MAX_PGN};
use crate::types::{DecoderError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Protocol id of the section this module reads
pub const J1939_PROTOCOL_ID: &str = "j1939";

/// Validated contents of one profile's J1939 section
#[derive(Debug, Clone, Default)]
pub struct J1939Overlay {
    /// Group definitions by PGN
    pub pgns: BTreeMap<u32, PgnDefinition>,
    /// Parameter definitions by SPN
    pub spns: BTreeMap<u32, SpnDefinition>,
    /// Optional DM1 override
    pub dm1: Option<Dm1Config>,
}

/// Result of merging profiles onto a base dictionary
#[derive(Debug, Clone)]
pub struct MergedDictionary {
    /// Base dictionary with every accepted profile applied
    pub database: SignalDatabase,
    /// DM1 override from the last profile that declared one
    pub dm1_config: Option<Dm1Config>,
    /// One message per rejected profile
    pub errors: Vec<String>,
}

/// Parse and validate the J1939 section of a profile
pub fn parse_j1939_profile(profile: &Profile) -> Result<J1939Overlay> {
    let empty = Map::new();
    let section = profile.section(J1939_PROTOCOL_ID).unwrap_or(&empty);
    let invalid = |reason: &str| {
        DecoderError::InvalidProfile(format!("Invalid profile {}: {}", profile.filename, reason))
    };

    let pgns_data = match section.get("pgns") {
        None => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => return Err(invalid("'pgns' must be a dictionary")),
    };
    let spns_data = match section.get("spns") {
        None => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => return Err(invalid("'spns' must be a dictionary")),
    };

    let mut pgns = BTreeMap::new();
    for (pgn_str, pgn_obj) in pgns_data {
        let pgn_def = parse_pgn(pgn_str, pgn_obj).map_err(|err| {
            DecoderError::InvalidProfile(format!(
                "Invalid PGN definition for {} in {}: {}",
                pgn_str, profile.filename, err
            ))
        })?;
        pgns.insert(pgn_def.pgn, pgn_def);
    }

    let mut spns = BTreeMap::new();
    for (spn_str, spn_obj) in spns_data {
        let spn_def = parse_spn(spn_str, spn_obj).map_err(|err| {
            DecoderError::InvalidProfile(format!(
                "Invalid SPN definition for {} in {}: {}",
                spn_str, profile.filename, err
            ))
        })?;
        spns.insert(spn_def.spn, spn_def);
    }

    for (pgn_num, pgn_def) in &pgns {
        for spn_num in &pgn_def.spns {
            if !spns.contains_key(spn_num) {
                return Err(invalid(&format!(
                    "PGN {} references SPN {} which is not defined",
                    pgn_num, spn_num
                )));
            }
        }
    }
    for (spn_num, spn_def) in &spns {
        let Some(pgn_def) = pgns.get(&spn_def.pgn) else {
            return Err(invalid(&format!(
                "SPN {} references PGN {} which is not defined",
                spn_num, spn_def.pgn
            )));
        };
        if spn_def.end_byte() > pgn_def.length {
            return Err(invalid(&format!(
                "SPN {} spans bytes {}-{} but PGN {} is only {} bytes long",
                spn_num,
                spn_def.start_byte,
                spn_def.end_byte(),
                spn_def.pgn,
                pgn_def.length
            )));
        }
    }

    let dm1 = parse_dm1_config(section.get("dm1"), &profile.filename);

    Ok(J1939Overlay { pgns, spns, dm1 })
}

/// Merge the J1939 sections of `profiles` onto a copy of `base`
///
/// Profiles are applied in order with insert-or-replace semantics, so later
/// profiles override earlier ones and the base. Rejected profiles are
/// reported in `errors` and leave no trace in the result.
pub fn merge_j1939_databases(base: &SignalDatabase, profiles: &[Profile]) -> MergedDictionary {
    let mut database = base.clone();
    let mut dm1_config = None;
    let mut errors = Vec::new();

    for profile in profiles {
        if profile.base_protocol != J1939_PROTOCOL_ID {
            log::debug!(
                "Skipping profile {}: base protocol is {}",
                profile.filename,
                profile.base_protocol
            );
            continue;
        }

        match parse_j1939_profile(profile) {
            Ok(overlay) => {
                for pgn_def in overlay.pgns.into_values() {
                    database.insert_pgn(pgn_def);
                }
                for spn_def in overlay.spns.into_values() {
                    database.insert_spn(spn_def);
                }
                if overlay.dm1.is_some() {
                    dm1_config = overlay.dm1;
                }
                log::debug!("Loaded J1939 profile: {}", profile.filename);
            }
            Err(e) => {
                log::error!("Failed to load profile {}: {}", profile.filename, e);
                errors.push(e.to_string());
            }
        }
    }

    let broken = database.broken_references();
    if !broken.is_empty() {
        log::error!("Merged dictionary has broken references: {:?}", broken);
    }
    debug_assert!(broken.is_empty(), "merged dictionary has broken references");

    MergedDictionary {
        database,
        dm1_config,
        errors,
    }
}

fn parse_pgn(pgn_str: &str, value: &Value) -> std::result::Result<PgnDefinition, String> {
    let pgn: u32 = pgn_str
        .trim()
        .parse()
        .map_err(|_| "PGN number must be an integer".to_string())?;
    if pgn > MAX_PGN {
        return Err(format!("PGN number must not exceed {}", MAX_PGN));
    }
    let obj = value
        .as_object()
        .ok_or_else(|| "PGN definition must be an object".to_string())?;

    for field in ["name", "acronym", "length", "spns"] {
        if !obj.contains_key(field) {
            return Err(format!("Missing required field '{}'", field));
        }
    }

    let name = require_str(obj, "PGN", "name")?;
    let acronym = require_str(obj, "PGN", "acronym")?;
    let length = require_uint(obj, "PGN", "length")?;
    if length > MAX_PAYLOAD_LEN as u64 {
        return Err(format!("PGN 'length' must not exceed {} bytes", MAX_PAYLOAD_LEN));
    }
    let spns = obj["spns"]
        .as_array()
        .ok_or_else(|| "PGN 'spns' must be a list".to_string())?
        .iter()
        .map(|item| item.as_u64().and_then(|n| u32::try_from(n).ok()))
        .collect::<Option<Vec<u32>>>()
        .ok_or_else(|| "PGN 'spns' entries must be integers".to_string())?;

    Ok(PgnDefinition {
        pgn,
        name,
        acronym,
        length: length as usize,
        spns,
    })
}

fn parse_spn(spn_str: &str, value: &Value) -> std::result::Result<SpnDefinition, String> {
    const REQUIRED: [&str; 8] = [
        "name",
        "pgn",
        "start_byte",
        "start_bit",
        "bit_length",
        "resolution",
        "offset",
        "unit",
    ];

    let spn: u32 = spn_str
        .trim()
        .parse()
        .map_err(|_| "SPN number must be an integer".to_string())?;
    let obj = value
        .as_object()
        .ok_or_else(|| "SPN definition must be an object".to_string())?;

    for field in REQUIRED {
        if !obj.contains_key(field) {
            return Err(format!("Missing required field '{}'", field));
        }
    }

    let name = require_str(obj, "SPN", "name")?;
    let pgn = u32::try_from(require_uint(obj, "SPN", "pgn")?)
        .ok()
        .filter(|pgn| *pgn <= MAX_PGN)
        .ok_or_else(|| "SPN 'pgn' is out of range".to_string())?;
    let start_byte = require_uint(obj, "SPN", "start_byte")?;
    let start_bit = require_uint(obj, "SPN", "start_bit")?;
    let bit_length = require_uint(obj, "SPN", "bit_length")?;
    let resolution = require_number(obj, "SPN", "resolution")?;
    let offset = require_number(obj, "SPN", "offset")?;
    let unit = require_str(obj, "SPN", "unit")?;
    let min_value = optional_number(obj, "min_value")?;
    let max_value = optional_number(obj, "max_value")?;

    if !(1..=MAX_PAYLOAD_LEN as u64).contains(&start_byte) {
        return Err(format!("SPN 'start_byte' must be between 1 and {}", MAX_PAYLOAD_LEN));
    }
    if !(1..=8).contains(&start_bit) {
        return Err("SPN 'start_bit' must be between 1 and 8".to_string());
    }
    if !(1..=32).contains(&bit_length) {
        return Err("SPN 'bit_length' must be between 1 and 32".to_string());
    }

    let states = match obj.get("states") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(parse_states(spn, map)),
        Some(_) => return Err("SPN 'states' must be an object".to_string()),
    };

    Ok(SpnDefinition {
        spn,
        name,
        pgn,
        start_byte: start_byte as usize,
        start_bit: start_bit as u8,
        bit_length: bit_length as u8,
        resolution,
        offset,
        unit,
        min_value,
        max_value,
        states,
    })
}

/// Keep state entries whose key is an integer and whose label is a string
fn parse_states(spn: u32, map: &Map<String, Value>) -> BTreeMap<u32, String> {
    let mut states = BTreeMap::new();
    for (raw_str, label) in map {
        match (raw_str.trim().parse::<u32>(), label.as_str()) {
            (Ok(raw), Some(label)) => {
                states.insert(raw, label.to_string());
            }
            _ => log::debug!("SPN {}: dropping state entry {:?}", spn, raw_str),
        }
    }
    states
}

fn parse_dm1_config(value: Option<&Value>, profile_name: &str) -> Option<Dm1Config> {
    let obj = match value? {
        Value::Null => return None,
        Value::Object(obj) => obj,
        _ => {
            log::warn!("Invalid dm1 section in {}: must be an object", profile_name);
            return None;
        }
    };

    let spn_encoding = match obj.get("spn_encoding") {
        None => SpnEncoding::LittleEndian,
        Some(tag) => match tag.as_str().and_then(SpnEncoding::from_tag) {
            Some(encoding) => encoding,
            None => {
                log::warn!("Invalid dm1.spn_encoding in {}: {}", profile_name, tag);
                SpnEncoding::LittleEndian
            }
        },
    };

    let ports = match obj.get("ports") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut custom_fault_spns = BTreeMap::new();
    if let Some(Value::Object(faults)) = obj.get("custom_fault_spns") {
        for (spn_str, name) in faults {
            let Ok(spn) = spn_str.trim().parse::<u32>() else {
                continue;
            };
            let name = match name {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            custom_fault_spns.insert(spn, name);
        }
    }

    Some(Dm1Config {
        spn_encoding,
        ports,
        custom_fault_spns,
    })
}

fn require_str(
    obj: &Map<String, Value>,
    kind: &str,
    field: &str,
) -> std::result::Result<String, String> {
    obj[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("{} '{}' must be a string", kind, field))
}

fn require_uint(
    obj: &Map<String, Value>,
    kind: &str,
    field: &str,
) -> std::result::Result<u64, String> {
    obj[field]
        .as_u64()
        .ok_or_else(|| format!("{} '{}' must be an integer", kind, field))
}

fn require_number(
    obj: &Map<String, Value>,
    kind: &str,
    field: &str,
) -> std::result::Result<f64, String> {
    obj[field]
        .as_f64()
        .ok_or_else(|| format!("{} '{}' must be a number", kind, field))
}

fn optional_number(
    obj: &Map<String, Value>,
    field: &str,
) -> std::result::Result<Option<f64>, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("SPN '{}' must be a number", field)),
    }
}
