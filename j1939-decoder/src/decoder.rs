//! Main decoder API
//!
//! A [`J1939Decoder`] is the merged dictionary plus the resolved DM1
//! configuration. It is built once per profile selection and never mutated
//! afterwards, so one instance can be shared by concurrent readers.

use crate::config::{Dm1Config, SpnEncoding};
use crate::dm1::{self, Dm1Result, DM1_PGN};
use crate::frame_decoder::{self, J1939Header};
use crate::profiles::{merge_j1939_databases, Profile};
use crate::signals::{DatabaseStats, PgnDefinition, SignalDatabase, SpnDefinition};
use crate::types::{CanFrame, SignalReading, SignalValue};
use std::collections::BTreeMap;

/// Decoder instance over a merged J1939 dictionary
#[derive(Debug, Clone)]
pub struct J1939Decoder {
    /// Built-in dictionary with profiles applied
    signal_db: SignalDatabase,
    /// DM1 override from the profiles, if any
    dm1_config: Option<Dm1Config>,
}

/// Everything decoded from one port's frame batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortDecode {
    /// SPN readings across all non-DM1 frames (later frames win)
    pub spns: BTreeMap<u32, SignalReading>,
    /// Last DM1 frame decoded in the batch
    pub dm1: Option<Dm1Result>,
}

impl J1939Decoder {
    /// Create a decoder over the built-in dictionary alone
    pub fn new() -> Self {
        Self::with_database(SignalDatabase::builtin(), None)
    }

    /// Create a decoder over an explicit dictionary
    pub fn with_database(signal_db: SignalDatabase, dm1_config: Option<Dm1Config>) -> Self {
        Self {
            signal_db,
            dm1_config,
        }
    }

    /// Build a decoder from the built-in dictionary and a profile selection
    ///
    /// Always returns a usable decoder. Rejected profiles are reported as
    /// human-readable messages and otherwise ignored.
    pub fn from_profiles(profiles: &[Profile]) -> (Self, Vec<String>) {
        log::info!("Building J1939 decoder from {} profile(s)", profiles.len());
        let merged = merge_j1939_databases(&SignalDatabase::builtin(), profiles);
        let stats = merged.database.stats();
        log::info!(
            "J1939 dictionary ready: {} PGNs, {} SPNs, {} rejected profile(s)",
            stats.num_pgns,
            stats.num_spns,
            merged.errors.len()
        );
        (
            Self::with_database(merged.database, merged.dm1_config),
            merged.errors,
        )
    }

    /// Split a CAN identifier into its J1939 header fields
    pub fn extract_header(can_id: u32) -> J1939Header {
        frame_decoder::extract_header(can_id)
    }

    /// The merged dictionary
    pub fn database(&self) -> &SignalDatabase {
        &self.signal_db
    }

    /// The DM1 override in effect, if any
    pub fn dm1_config(&self) -> Option<&Dm1Config> {
        self.dm1_config.as_ref()
    }

    /// Look up the PGN definition for a CAN identifier
    pub fn pgn_info(&self, can_id: u32) -> Option<&PgnDefinition> {
        self.signal_db.pgn(Self::extract_header(can_id).pgn)
    }

    /// Look up a PGN definition by number
    pub fn pgn_def(&self, pgn: u32) -> Option<&PgnDefinition> {
        self.signal_db.pgn(pgn)
    }

    /// Look up an SPN definition by number
    pub fn spn_def(&self, spn: u32) -> Option<&SpnDefinition> {
        self.signal_db.spn(spn)
    }

    /// True if frames with this PGN are understood (dictionary or DM1)
    pub fn is_known_pgn(&self, pgn: u32) -> bool {
        pgn == DM1_PGN || self.signal_db.contains_pgn(pgn)
    }

    /// Decode all known SPNs from a single frame
    ///
    /// Returns an empty map for unknown PGNs, DM1 frames (see
    /// [`decode_dm1`](Self::decode_dm1)) and malformed hex payloads.
    pub fn decode_frame(&self, frame: &CanFrame) -> BTreeMap<u32, SignalReading> {
        let pgn = Self::extract_header(frame.id).pgn;

        if pgn == DM1_PGN {
            return BTreeMap::new();
        }

        if !self.signal_db.contains_pgn(pgn) {
            log::debug!("Unknown PGN {} (0x{:04X}) from CAN ID {}", pgn, pgn, frame.id);
            return BTreeMap::new();
        }

        match frame.payload() {
            Ok(data) => frame_decoder::decode_group(pgn, &self.signal_db, &data),
            Err(e) => {
                log::warn!("{}", e);
                BTreeMap::new()
            }
        }
    }

    /// DM1 SPN encoding for frames arriving on a port
    pub fn dm1_encoding(&self, port: &str) -> SpnEncoding {
        self.dm1_config
            .as_ref()
            .map_or(SpnEncoding::LittleEndian, |config| config.encoding_for_port(port))
    }

    /// True if DM1 frames on this port use the big-endian SPN placement
    pub fn uses_alternate_dm1_encoding(&self, port: &str) -> bool {
        self.dm1_encoding(port) == SpnEncoding::BigEndian
    }

    /// Custom names for manufacturer-proprietary fault SPNs
    pub fn custom_fault_names(&self) -> Option<&BTreeMap<u32, String>> {
        self.dm1_config.as_ref().map(|config| &config.custom_fault_spns)
    }

    /// Decode a DM1 payload using the encoding configured for `port`
    pub fn decode_dm1(&self, data: &[u8], port: &str) -> Option<Dm1Result> {
        dm1::decode_dm1(data, self.dm1_encoding(port))
    }

    /// Human-readable fault description
    ///
    /// The SPN name comes from the merged dictionary first, then from the
    /// profile's custom fault names, else `Unknown SPN <n>`.
    pub fn fault_description(&self, spn: u32, fmi: u8) -> String {
        let name = self
            .signal_db
            .spn(spn)
            .map(|spn_def| spn_def.name.as_str())
            .or_else(|| {
                self.custom_fault_names()
                    .and_then(|names| names.get(&spn))
                    .map(String::as_str)
            });
        dm1::compose_fault_description(spn, fmi, name)
    }

    /// Decode every frame from one port
    ///
    /// Non-DM1 readings are merged across frames; the last decodable DM1
    /// frame wins.
    pub fn decode_port(&self, frames: &[CanFrame], port: &str) -> PortDecode {
        let mut result = PortDecode::default();

        for frame in frames {
            if Self::extract_header(frame.id).pgn == DM1_PGN {
                match frame.payload() {
                    Ok(data) => {
                        if let Some(dm1) = self.decode_dm1(&data, port) {
                            result.dm1 = Some(dm1);
                        }
                    }
                    Err(e) => log::warn!("{}", e),
                }
                continue;
            }
            result.spns.extend(self.decode_frame(frame));
        }

        result
    }

    /// Convenience: decoded values only, absent readings dropped
    pub fn decode_values(&self, frame: &CanFrame) -> BTreeMap<u32, SignalValue> {
        self.decode_frame(frame)
            .into_iter()
            .filter_map(|(spn, reading)| reading.into_value().map(|value| (spn, value)))
            .collect()
    }

    /// Get statistics about the merged dictionary
    pub fn stats(&self) -> DatabaseStats {
        self.signal_db.stats()
    }
}

impl Default for J1939Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_creation() {
        let decoder = J1939Decoder::new();
        assert!(decoder.stats().num_pgns > 0);
        assert!(decoder.dm1_config().is_none());
    }

    #[test]
    fn test_decode_eec1_frame() {
        let decoder = J1939Decoder::new();
        let values = decoder.decode_values(&CanFrame::new(217056256, "3FFFCD883927F4FF"));
        assert_eq!(values[&190], SignalValue::Float(1841.0));
        assert_eq!(values[&513], SignalValue::Float(80.0));
    }

    #[test]
    fn test_decode_lfc_frame() {
        let decoder = J1939Decoder::new();
        let values = decoder.decode_values(&CanFrame::new(419358976, "E2020000BC1E0200"));
        assert_eq!(values[&250], SignalValue::Float(369.0));
        assert_eq!(values[&182], SignalValue::Float(69470.0));
    }

    #[test]
    fn test_unknown_and_malformed_frames_are_empty() {
        let decoder = J1939Decoder::new();
        assert!(decoder.decode_frame(&CanFrame::new(419372032, "C4F0FFFF00FF00FF")).is_empty());
        assert!(decoder.decode_frame(&CanFrame::new(217056256, "ZZZZ")).is_empty());
    }

    #[test]
    fn test_dm1_frames_skip_signal_decoding() {
        let decoder = J1939Decoder::new();
        assert!(decoder.decode_frame(&CanFrame::new(0x18FECA00, "0000000000000000")).is_empty());
        assert!(decoder.is_known_pgn(DM1_PGN));
    }

    #[test]
    fn test_pgn_and_spn_lookups() {
        let decoder = J1939Decoder::new();
        assert_eq!(decoder.pgn_info(217056256).unwrap().acronym, "EEC1");
        assert!(decoder.pgn_info(419372032).is_none());
        assert_eq!(decoder.spn_def(190).unwrap().name, "Engine Speed");
        assert!(decoder.spn_def(99999).is_none());
    }

    #[test]
    fn test_decode_port_collects_dm1() {
        let decoder = J1939Decoder::new();
        let frames = [
            CanFrame::new(217056256, "3FFFCD883927F4FF"),
            CanFrame::new(419357952, "5F27000000000000"),
            CanFrame::new(419372032, "C4F0FFFF00FF00FF"),
            CanFrame::new(0x18FECA00, "04FF6E000001FFFF"),
        ];
        let result = decoder.decode_port(&frames, "can1");
        assert_eq!(result.spns[&190].value(), Some(&SignalValue::Float(1841.0)));
        assert_eq!(result.spns[&247].value(), Some(&SignalValue::Float(503.95)));
        let dm1 = result.dm1.unwrap();
        assert_eq!(dm1.active_spn, 110);
        assert!(dm1.lamp_protect);
    }

    #[test]
    fn test_fault_description_lookup_order() {
        let config = Dm1Config::new()
            .add_custom_fault(520198, "Emergency Stop")
            .add_custom_fault(110, "Shadowed");
        let decoder = J1939Decoder::with_database(SignalDatabase::builtin(), Some(config));

        assert_eq!(
            decoder.fault_description(110, 0),
            "SPN 110: Engine Coolant Temperature (FMI 0: Data Valid - Above Normal Range)"
        );
        assert_eq!(
            decoder.fault_description(520198, 2),
            "SPN 520198: Emergency Stop (FMI 2: Data Erratic/Incorrect)"
        );
        assert_eq!(
            decoder.fault_description(99999, 31),
            "SPN 99999: Unknown SPN 99999 (FMI 31: Condition Exists)"
        );
        assert_eq!(decoder.fault_description(0, 0), "No Active Fault");
    }

    #[test]
    fn test_dm1_encoding_per_port() {
        let config = Dm1Config::new()
            .with_spn_encoding(SpnEncoding::BigEndian)
            .add_port("can2");
        let decoder = J1939Decoder::with_database(SignalDatabase::builtin(), Some(config));
        assert!(decoder.uses_alternate_dm1_encoding("can2"));
        assert!(!decoder.uses_alternate_dm1_encoding("can1"));
        assert!(!J1939Decoder::new().uses_alternate_dm1_encoding("can2"));
    }
}
