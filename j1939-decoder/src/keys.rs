//! Signal keys
//!
//! Every value the adapters emit is addressed by a dotted key:
//!
//! - `can.<port>.<protocol>.spn<N>`: a decoded SPN
//! - `can.<port>.<protocol>.raw.<PGN>`: a raw hex payload
//! - `can.<port>.<protocol>.dm1.<field>`: a DM1 field
//!
//! Older selections used `<port>.spn<N>` style keys; those are converted to
//! the canonical form on load.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// CAN ports known to carry legacy keys
pub const CAN_PORTS: [&str; 2] = ["can1", "can2"];

/// DM1 fields exposed as signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dm1Field {
    ActiveFault,
    ProtectLamp,
    AmberWarning,
    RedStop,
    Mil,
    ActiveSpn,
    ActiveFmi,
    OccurrenceCount,
}

impl Dm1Field {
    /// All fields, in discovery order
    pub const ALL: [Dm1Field; 8] = [
        Dm1Field::ActiveFault,
        Dm1Field::ProtectLamp,
        Dm1Field::AmberWarning,
        Dm1Field::RedStop,
        Dm1Field::Mil,
        Dm1Field::ActiveSpn,
        Dm1Field::ActiveFmi,
        Dm1Field::OccurrenceCount,
    ];

    /// Key suffix for this field
    pub fn as_str(&self) -> &'static str {
        match self {
            Dm1Field::ActiveFault => "active_fault",
            Dm1Field::ProtectLamp => "protect_lamp",
            Dm1Field::AmberWarning => "amber_warning",
            Dm1Field::RedStop => "red_stop",
            Dm1Field::Mil => "mil",
            Dm1Field::ActiveSpn => "active_spn",
            Dm1Field::ActiveFmi => "active_fmi",
            Dm1Field::OccurrenceCount => "occurrence_count",
        }
    }

    /// Parse a key suffix
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

/// What a signal key addresses
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Decoded SPN
    Spn(u32),
    /// Raw payload of a PGN
    Raw(u32),
    /// Known DM1 field
    Dm1(Dm1Field),
    /// DM1 field this version does not know
    Dm1Other(String),
}

/// A parsed canonical signal key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalKey {
    /// Port the signal was seen on (e.g. "can1")
    pub port: String,
    /// Protocol id (e.g. "j1939")
    pub protocol: String,
    /// Addressed signal
    pub kind: SignalKind,
}

impl SignalKey {
    /// Key for a decoded SPN
    pub fn spn(port: &str, protocol: &str, spn: u32) -> Self {
        Self::new(port, protocol, SignalKind::Spn(spn))
    }

    /// Key for a raw PGN payload
    pub fn raw(port: &str, protocol: &str, pgn: u32) -> Self {
        Self::new(port, protocol, SignalKind::Raw(pgn))
    }

    /// Key for a DM1 field
    pub fn dm1(port: &str, protocol: &str, field: Dm1Field) -> Self {
        Self::new(port, protocol, SignalKind::Dm1(field))
    }

    fn new(port: &str, protocol: &str, kind: SignalKind) -> Self {
        Self {
            port: port.to_string(),
            protocol: protocol.to_string(),
            kind,
        }
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "can.{}.{}.", self.port, self.protocol)?;
        match &self.kind {
            SignalKind::Spn(spn) => write!(f, "spn{}", spn),
            SignalKind::Raw(pgn) => write!(f, "raw.{}", pgn),
            SignalKind::Dm1(field) => write!(f, "dm1.{}", field.as_str()),
            SignalKind::Dm1Other(field) => write!(f, "dm1.{}", field),
        }
    }
}

/// Error returned when a string is not a canonical CAN signal key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a CAN signal key: {0}")]
pub struct ParseSignalKeyError(pub String);

impl FromStr for SignalKey {
    type Err = ParseSignalKeyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let err = || ParseSignalKeyError(key.to_string());

        let rest = key.strip_prefix("can.").ok_or_else(err)?;
        let mut parts = rest.splitn(3, '.');
        let port = parts.next().filter(|p| !p.is_empty()).ok_or_else(err)?;
        let protocol = parts.next().filter(|p| !p.is_empty()).ok_or_else(err)?;
        let tail = parts.next().ok_or_else(err)?;

        let kind = if let Some(pgn) = tail.strip_prefix("raw.") {
            SignalKind::Raw(pgn.parse().map_err(|_| err())?)
        } else if let Some(field) = tail.strip_prefix("dm1.") {
            if field.is_empty() {
                return Err(err());
            }
            match Dm1Field::from_name(field) {
                Some(field) => SignalKind::Dm1(field),
                None => SignalKind::Dm1Other(field.to_string()),
            }
        } else if let Some(spn) = tail.strip_prefix("spn") {
            SignalKind::Spn(spn.parse().map_err(|_| err())?)
        } else {
            return Err(err());
        };

        Ok(SignalKey::new(port, protocol, kind))
    }
}

/// Convert a legacy signal key to canonical form
///
/// Canonical and unrecognised keys are returned trimmed but otherwise
/// unchanged.
pub fn to_canonical_signal_key(signal_key: &str) -> String {
    let key = signal_key.trim();
    if key.is_empty() || key.starts_with("can.") {
        return key.to_string();
    }

    for port in CAN_PORTS {
        let Some(suffix) = key.strip_prefix(port).and_then(|s| s.strip_prefix('.')) else {
            continue;
        };
        if suffix.starts_with("spn") || suffix.starts_with("raw.") || suffix.starts_with("dm1.") {
            return format!("can.{}.j1939.{}", port, suffix);
        }
    }

    key.to_string()
}

/// Canonicalise and de-duplicate a selection, keeping first-seen order
pub fn normalize_selected_signals<I, S>(selected: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for item in selected {
        let canonical = to_canonical_signal_key(item.as_ref());
        if canonical.is_empty() || !seen.insert(canonical.clone()) {
            continue;
        }
        normalized.push(canonical);
    }
    normalized
}
