//! Core types for the J1939 decoder library
//!
//! This module defines the frame envelope the decoder consumes, the values it
//! emits, and the error type used on the load-time paths. Decode-time problems
//! never surface as errors across the adapter boundary; they become absent
//! readings instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// One CAN frame as delivered by the transport
///
/// The payload is kept in its wire form (a hex string) because diagnostics
/// echo it back verbatim and raw-only protocols emit it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFrame {
    /// 29-bit extended CAN identifier
    pub id: u32,
    /// Payload as a hex string (e.g. "3FFFCD883927F4FF")
    pub data: String,
}

impl CanFrame {
    /// Create a frame from an identifier and a hex payload
    pub fn new(id: u32, data: impl Into<String>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Decode the hex payload into bytes
    pub fn payload(&self) -> Result<Vec<u8>> {
        hex::decode(self.data.trim()).map_err(|e| {
            DecoderError::InvalidData(format!(
                "CAN ID {} carries malformed hex payload {:?}: {}",
                self.id, self.data, e
            ))
        })
    }

    /// Identifier rendered the way diagnostics show it (`0x0CF00400`)
    pub fn id_hex(&self) -> String {
        format!("0x{:08X}", self.id)
    }

    /// Payload truncated to 16 hex characters for sample displays
    pub fn sample_data(&self) -> String {
        match self.data.get(..16) {
            Some(head) if self.data.len() > 16 => format!("{}...", head),
            _ => self.data.clone(),
        }
    }
}

/// Errors that can occur while loading profiles or handling payloads
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Failed to read profile {path}: {source}")]
    ProfileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse profile {path}: {source}")]
    ProfileParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    InvalidProfile(String),

    #[error("Unknown CAN protocol: {0}")]
    UnknownProtocol(String),
}

/// A decoded value as exposed to callers
///
/// Numbers are physical values already scaled and rounded to 4 decimal
/// places; text is an enumeration label, a DM1 description, or a raw hex
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Integer value (DM1 identifiers and counters)
    Integer(i64),
    /// Physical value after resolution/offset
    Float(f64),
    /// Enumeration label, description, or raw payload
    Text(String),
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Integer(v) => write!(f, "{}", v),
            SignalValue::Float(v) => write!(f, "{}", v),
            SignalValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl SignalValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Integer(v) => Some(*v as f64),
            SignalValue::Float(v) => Some(*v),
            SignalValue::Text(_) => None,
        }
    }

    /// Text view of the value, if it is a label
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SignalValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// True if this is a numeric value
    pub fn is_numeric(&self) -> bool {
        !matches!(self, SignalValue::Text(_))
    }
}

impl From<f64> for SignalValue {
    fn from(v: f64) -> Self {
        SignalValue::Float(v)
    }
}

impl From<i64> for SignalValue {
    fn from(v: i64) -> Self {
        SignalValue::Integer(v)
    }
}

impl From<&str> for SignalValue {
    fn from(v: &str) -> Self {
        SignalValue::Text(v.to_string())
    }
}

/// Outcome of decoding one signal
///
/// Every variant except `Value` is reported as "absent" to callers; the
/// distinction is kept for logging and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalReading {
    /// A physical value or enumeration label
    Value(SignalValue),
    /// All bits set: the sender does not provide this parameter
    NotAvailable,
    /// All bits set except the LSB: the sender flags an error
    ErrorIndicator,
    /// Enumerated signal whose raw value has no label
    Unmapped(u64),
    /// The payload is too short for the signal's byte window
    ShortFrame,
    /// The definition's bit layout cannot be read from any payload
    InvalidLayout,
}

impl SignalReading {
    /// The decoded value, or `None` for every absent variant
    pub fn value(&self) -> Option<&SignalValue> {
        match self {
            SignalReading::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Consume the reading, keeping only a present value
    pub fn into_value(self) -> Option<SignalValue> {
        match self {
            SignalReading::Value(v) => Some(v),
            _ => None,
        }
    }

    /// True for every variant that callers see as absent
    pub fn is_absent(&self) -> bool {
        !matches!(self, SignalReading::Value(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_payload_decoding() {
        let frame = CanFrame::new(217056256, "3FFFCD883927F4FF");
        assert_eq!(
            frame.payload().unwrap(),
            vec![0x3F, 0xFF, 0xCD, 0x88, 0x39, 0x27, 0xF4, 0xFF]
        );
        assert_eq!(frame.id_hex(), "0x0CF00400");
    }

    #[test]
    fn test_frame_payload_rejects_bad_hex() {
        let frame = CanFrame::new(217056256, "ZZZZ");
        assert!(matches!(frame.payload(), Err(DecoderError::InvalidData(_))));

        let odd = CanFrame::new(217056256, "ABC");
        assert!(odd.payload().is_err());
    }

    #[test]
    fn test_sample_data_truncation() {
        let frame = CanFrame::new(1, "00112233445566778899");
        assert_eq!(frame.sample_data(), "0011223344556677...");
        let short = CanFrame::new(1, "0011");
        assert_eq!(short.sample_data(), "0011");
    }

    #[test]
    fn test_signal_value_views() {
        assert_eq!(SignalValue::Float(1841.0).as_f64(), Some(1841.0));
        assert_eq!(SignalValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(SignalValue::from("On").as_str(), Some("On"));
        assert!(!SignalValue::from("On").is_numeric());
    }

    #[test]
    fn test_signal_value_serializes_untagged() {
        let json = serde_json::to_string(&SignalValue::Float(503.95)).unwrap();
        assert_eq!(json, "503.95");
        let json = serde_json::to_string(&SignalValue::from("Active")).unwrap();
        assert_eq!(json, "\"Active\"");
    }

    #[test]
    fn test_reading_absent_variants() {
        assert!(SignalReading::NotAvailable.is_absent());
        assert!(SignalReading::ShortFrame.value().is_none());
        assert!(SignalReading::InvalidLayout.is_absent());
        let reading = SignalReading::Value(SignalValue::Float(80.0));
        assert_eq!(reading.into_value(), Some(SignalValue::Float(80.0)));
    }
}
