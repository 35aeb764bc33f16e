//! DM1 decoding configuration
//!
//! A profile may override how the DM1 (active diagnostic trouble codes)
//! record is decoded. The override is replaced wholesale by any later profile
//! that also declares one.

use std::collections::BTreeMap;
use std::fmt;

/// Placement of the SPN field inside the DM1 trouble-code record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpnEncoding {
    /// J1939-73 little-endian placement
    #[default]
    LittleEndian,
    /// Manufacturer big-endian placement (e.g. MAN engines)
    BigEndian,
}

impl SpnEncoding {
    /// Parse the tag used in profile files
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "little_endian" | "standard" => Some(SpnEncoding::LittleEndian),
            "big_endian" | "alternate" => Some(SpnEncoding::BigEndian),
            _ => None,
        }
    }

    /// Tag used in diagnostics output
    pub fn as_str(&self) -> &'static str {
        match self {
            SpnEncoding::LittleEndian => "little_endian",
            SpnEncoding::BigEndian => "big_endian",
        }
    }
}

impl fmt::Display for SpnEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DM1 decoding override declared by a profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dm1Config {
    /// SPN placement for the ports listed below
    pub spn_encoding: SpnEncoding,

    /// Ports the encoding applies to (empty = every port)
    pub ports: Vec<String>,

    /// Display names for manufacturer-proprietary SPNs
    pub custom_fault_spns: BTreeMap<u32, String>,
}

impl Dm1Config {
    /// Create a configuration with standard encoding and no custom names
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the SPN encoding
    pub fn with_spn_encoding(mut self, encoding: SpnEncoding) -> Self {
        self.spn_encoding = encoding;
        self
    }

    /// Builder method: restrict the encoding to a port
    pub fn add_port(mut self, port: impl Into<String>) -> Self {
        self.ports.push(port.into());
        self
    }

    /// Builder method: name a proprietary fault SPN
    pub fn add_custom_fault(mut self, spn: u32, name: impl Into<String>) -> Self {
        self.custom_fault_spns.insert(spn, name.into());
        self
    }

    /// Check whether this configuration covers a port
    pub fn applies_to_port(&self, port: &str) -> bool {
        self.ports.is_empty() || self.ports.iter().any(|p| p == port)
    }

    /// Encoding to use for DM1 frames arriving on a port
    pub fn encoding_for_port(&self, port: &str) -> SpnEncoding {
        if self.applies_to_port(port) {
            self.spn_encoding
        } else {
            SpnEncoding::LittleEndian
        }
    }
}
