//! Unified signal database
//!
//! Holds the PGN and SPN tables a decoder works from: the built-in J1939
//! dictionary, optionally overlaid with profile definitions.

use std::collections::{BTreeMap, HashMap};

/// Largest PGN a 29-bit identifier can carry (data page + PF + PS)
pub const MAX_PGN: u32 = 0x1FFFF;

/// Largest J1939 payload in bytes (multi-packet transport limit)
pub const MAX_PAYLOAD_LEN: usize = 1785;

/// A J1939 parameter group (PGN) definition
#[derive(Debug, Clone, PartialEq)]
pub struct PgnDefinition {
    /// Parameter group number
    pub pgn: u32,
    /// Group name
    pub name: String,
    /// Short acronym (e.g. "EEC1")
    pub acronym: String,
    /// Declared payload length in bytes
    pub length: usize,
    /// SPNs carried by this group, in payload order
    pub spns: Vec<u32>,
}

/// A J1939 suspect parameter (SPN) definition
#[derive(Debug, Clone, PartialEq)]
pub struct SpnDefinition {
    /// Suspect parameter number
    pub spn: u32,
    /// Parameter name
    pub name: String,
    /// Owning parameter group
    pub pgn: u32,
    /// 1-indexed start byte
    pub start_byte: usize,
    /// 1-indexed start bit within the start byte (1 = LSB)
    pub start_bit: u8,
    /// Length in bits (1-32)
    pub bit_length: u8,
    /// Scale factor applied to the raw value
    pub resolution: f64,
    /// Offset added after scaling
    pub offset: f64,
    /// Engineering unit (empty for dimensionless or enumerated values)
    pub unit: String,
    /// Informational minimum physical value
    pub min_value: Option<f64>,
    /// Informational maximum physical value
    pub max_value: Option<f64>,
    /// Raw value -> label table for state-coded parameters
    pub states: Option<BTreeMap<u32, String>>,
}

impl SpnDefinition {
    /// Number of payload bytes the signal window spans
    pub fn byte_count(&self) -> usize {
        (self.bit_length as usize).div_ceil(8)
    }

    /// Last payload byte (exclusive, 0-indexed) the window touches
    pub fn end_byte(&self) -> usize {
        self.start_byte.saturating_sub(1).saturating_add(self.byte_count())
    }

    /// True if this parameter decodes to a label rather than a number
    pub fn is_enumerated(&self) -> bool {
        self.states.is_some()
    }
}

/// The PGN/SPN dictionary a decoder instance works from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalDatabase {
    /// Group definitions by PGN
    pgns: HashMap<u32, PgnDefinition>,
    /// Parameter definitions by SPN
    spns: HashMap<u32, SpnDefinition>,
}

impl SignalDatabase {
    /// Create a new empty signal database
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a group definition
    pub fn insert_pgn(&mut self, pgn: PgnDefinition) {
        self.pgns.insert(pgn.pgn, pgn);
    }

    /// Insert or replace a parameter definition
    pub fn insert_spn(&mut self, spn: SpnDefinition) {
        self.spns.insert(spn.spn, spn);
    }

    /// Get a group definition by PGN
    pub fn pgn(&self, pgn: u32) -> Option<&PgnDefinition> {
        self.pgns.get(&pgn)
    }

    /// Get a parameter definition by SPN
    pub fn spn(&self, spn: u32) -> Option<&SpnDefinition> {
        self.spns.get(&spn)
    }

    /// Check whether a PGN is known
    pub fn contains_pgn(&self, pgn: u32) -> bool {
        self.pgns.contains_key(&pgn)
    }

    /// Check whether an SPN is known
    pub fn contains_spn(&self, spn: u32) -> bool {
        self.spns.contains_key(&spn)
    }

    /// All known PGNs, sorted
    pub fn pgn_numbers(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.pgns.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            num_pgns: self.pgns.len(),
            num_spns: self.spns.len(),
        }
    }

    /// Cross-reference problems in this dictionary
    ///
    /// Every SPN referenced by a group must exist, and every SPN's owning
    /// group must exist. Returns one message per broken reference.
    pub fn broken_references(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for pgn_num in self.pgn_numbers() {
            let pgn_def = &self.pgns[&pgn_num];
            for spn_num in &pgn_def.spns {
                if !self.spns.contains_key(spn_num) {
                    problems.push(format!(
                        "PGN {} references SPN {} which is not defined",
                        pgn_num, spn_num
                    ));
                }
            }
        }
        let mut spn_numbers: Vec<u32> = self.spns.keys().copied().collect();
        spn_numbers.sort_unstable();
        for spn_num in spn_numbers {
            let spn_def = &self.spns[&spn_num];
            if !self.pgns.contains_key(&spn_def.pgn) {
                problems.push(format!(
                    "SPN {} references PGN {} which is not defined",
                    spn_num, spn_def.pgn
                ));
            }
        }
        problems
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Number of group definitions
    pub num_pgns: usize,
    /// Number of parameter definitions
    pub num_spns: usize,
}
