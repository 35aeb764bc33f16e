//! Frame decoding engine
//!
//! Pure functions that split a 29-bit J1939 identifier into its header fields
//! and extract physical values from a payload using SPN definitions.

use crate::signals::{SignalDatabase, SpnDefinition};
use crate::types::{SignalReading, SignalValue};
use byteorder::{ByteOrder, LittleEndian};
use std::collections::BTreeMap;

/// First PDU format value of the broadcast (PDU2) range
pub const PDU2_THRESHOLD: u32 = 240;

/// Header fields carried by a 29-bit J1939 identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct J1939Header {
    /// Message priority (0 = highest)
    pub priority: u8,
    /// Parameter group number
    pub pgn: u32,
    /// Source address of the sending node
    pub source_address: u8,
}

impl J1939Header {
    /// True when the identifier uses PDU1 (peer-to-peer) addressing
    pub fn is_pdu1(&self) -> bool {
        ((self.pgn >> 8) & 0xFF) < PDU2_THRESHOLD
    }
}

/// Extract priority, PGN and source address from a 29-bit CAN identifier
///
/// For PDU2 (PF >= 240) the PS byte is a group extension and belongs to the
/// PGN. For PDU1 it is a destination address and is dropped.
pub fn extract_header(can_id: u32) -> J1939Header {
    let source_address = (can_id & 0xFF) as u8;
    let pf = (can_id >> 16) & 0xFF;
    let ps = (can_id >> 8) & 0xFF;
    let dp = (can_id >> 24) & 0x01;
    let priority = ((can_id >> 26) & 0x7) as u8;

    let pgn = if pf >= PDU2_THRESHOLD {
        (dp << 16) | (pf << 8) | ps
    } else {
        (dp << 16) | (pf << 8)
    };

    J1939Header {
        priority,
        pgn,
        source_address,
    }
}

/// Decode a single SPN from payload bytes
///
/// The byte window is read little-endian, then narrowed to the bit field when
/// the signal is sub-byte or not byte-aligned. All-ones ("not available") and
/// all-ones-but-LSB ("error indicator") are checked against the field width.
/// Numeric results are rounded to 4 decimal places.
pub fn decode_signal(spn_def: &SpnDefinition, data: &[u8]) -> SignalReading {
    let valid_layout = (1..=32).contains(&spn_def.bit_length)
        && (1..=8).contains(&spn_def.start_bit)
        && spn_def.start_byte >= 1;
    if !valid_layout {
        log::warn!(
            "SPN {} has an invalid layout (start byte {}, start bit {}, {} bits)",
            spn_def.spn,
            spn_def.start_byte,
            spn_def.start_bit,
            spn_def.bit_length
        );
        return SignalReading::InvalidLayout;
    }

    let start_idx = spn_def.start_byte - 1;
    let byte_count = spn_def.byte_count();

    let Some(end_idx) = start_idx
        .checked_add(byte_count)
        .filter(|end| *end <= data.len())
    else {
        log::trace!(
            "SPN {} needs {} byte(s) from byte {} but frame only has {} bytes",
            spn_def.spn,
            byte_count,
            spn_def.start_byte,
            data.len()
        );
        return SignalReading::ShortFrame;
    };

    let mut raw_value = LittleEndian::read_uint(&data[start_idx..end_idx], byte_count);

    let mask = field_mask(spn_def.bit_length);
    if spn_def.bit_length < 8 || spn_def.start_bit > 1 {
        let shift = u32::from(spn_def.start_bit.saturating_sub(1));
        raw_value = (raw_value >> shift) & mask;
    }

    if raw_value == mask {
        log::trace!("SPN {}: not available", spn_def.spn);
        return SignalReading::NotAvailable;
    }
    if raw_value == mask - 1 {
        log::trace!("SPN {}: error indicator", spn_def.spn);
        return SignalReading::ErrorIndicator;
    }

    if let Some(states) = &spn_def.states {
        return match u32::try_from(raw_value).ok().and_then(|raw| states.get(&raw)) {
            Some(label) => SignalReading::Value(SignalValue::Text(label.clone())),
            None => SignalReading::Unmapped(raw_value),
        };
    }

    let physical = raw_value as f64 * spn_def.resolution + spn_def.offset;
    SignalReading::Value(SignalValue::Float(round4(physical)))
}

/// Decode every SPN of a PGN from payload bytes
///
/// Unknown PGNs yield an empty map. SPNs the group references but the
/// dictionary lacks are skipped.
pub fn decode_group(pgn: u32, db: &SignalDatabase, data: &[u8]) -> BTreeMap<u32, SignalReading> {
    let mut results = BTreeMap::new();

    let Some(pgn_def) = db.pgn(pgn) else {
        log::debug!("Unknown PGN {} (0x{:04X})", pgn, pgn);
        return results;
    };

    for spn_num in &pgn_def.spns {
        if let Some(spn_def) = db.spn(*spn_num) {
            results.insert(*spn_num, decode_signal(spn_def, data));
        }
    }

    results
}

/// All-ones value of an N-bit field
fn field_mask(bit_length: u8) -> u64 {
    (1u64 << bit_length) - 1
}

/// Round to 4 decimal places
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(hex_str: &str) -> Vec<u8> {
        hex::decode(hex_str).unwrap()
    }

    fn layout(start_byte: usize, start_bit: u8, bit_length: u8) -> SpnDefinition {
        SpnDefinition {
            spn: 9000,
            name: "Test".to_string(),
            pgn: 65000,
            start_byte,
            start_bit,
            bit_length,
            resolution: 1.0,
            offset: 0.0,
            unit: String::new(),
            min_value: None,
            max_value: None,
            states: None,
        }
    }

    #[test]
    fn test_extract_header_eec1() {
        let header = extract_header(217056256);
        assert_eq!(header.pgn, 61444);
        assert_eq!(header.priority, 3);
        assert_eq!(header.source_address, 0x00);
        assert!(!header.is_pdu1());
    }

    #[test]
    fn test_extract_header_known_pgns() {
        let cases = [
            (217056000u32, 61443u32),
            (0x18FEEE00, 65262),
            (419360512, 65263),
            (0x18FEF100, 65265),
            (419357952, 65253),
            (419358976, 65257),
            (419362304, 65270),
            (419358208, 65254),
            (419362560, 65271),
            (419372032, 65308),
            (419361280, 65266),
        ];
        for (can_id, pgn) in cases {
            assert_eq!(extract_header(can_id).pgn, pgn, "CAN ID 0x{:08X}", can_id);
        }
    }

    #[test]
    fn test_pdu1_excludes_destination() {
        let header = extract_header(0x18ECFF00);
        assert_eq!(header.pgn, 60416);
        assert_eq!(header.pgn & 0xFF, 0);
        assert!(header.is_pdu1());
    }

    #[test]
    fn test_group_extension_low_byte() {
        for pf in [0u32, 100, 239, 240, 254, 255] {
            for ps in [0u32, 0x12, 0xFF] {
                let can_id = (6 << 26) | (1 << 24) | (pf << 16) | (ps << 8) | 0x21;
                let header = extract_header(can_id);
                if pf >= 240 {
                    assert_eq!(header.pgn & 0xFF, ps);
                } else {
                    assert_eq!(header.pgn & 0xFF, 0);
                }
                assert_eq!(header.pgn >> 16, 1);
                assert_eq!(header.source_address, 0x21);
                assert_eq!(header.priority, 6);
            }
        }
    }

    #[test]
    fn test_decode_engine_speed() {
        let db = SignalDatabase::builtin();
        let reading = decode_signal(db.spn(190).unwrap(), &payload("3FFFCD883927F4FF"));
        assert_eq!(reading, SignalReading::Value(SignalValue::Float(1841.0)));
    }

    #[test]
    fn test_decode_actual_torque_offset() {
        let db = SignalDatabase::builtin();
        let reading = decode_signal(db.spn(513).unwrap(), &payload("3FFFCD883927F4FF"));
        assert_eq!(reading.value().and_then(SignalValue::as_f64), Some(80.0));
    }

    #[test]
    fn test_decode_total_hours_rounding() {
        let db = SignalDatabase::builtin();
        let reading = decode_signal(db.spn(247).unwrap(), &payload("5F27000000000000"));
        assert_eq!(reading.value().and_then(SignalValue::as_f64), Some(503.95));
    }

    #[test]
    fn test_decode_vehicle_speed() {
        let db = SignalDatabase::builtin();
        let reading = decode_signal(db.spn(84).unwrap(), &payload("FF0F32000000FFFF"));
        let value = reading.value().and_then(SignalValue::as_f64).unwrap();
        assert!((value - 50.0586).abs() < 0.01);
    }

    #[test]
    fn test_decode_is_idempotent() {
        let db = SignalDatabase::builtin();
        let data = payload("A0FFFFB3FFFF9CFA");
        let spn_def = db.spn(175).unwrap();
        assert_eq!(decode_signal(spn_def, &data), decode_signal(spn_def, &data));
    }

    #[test]
    fn test_not_available_sentinel() {
        let db = SignalDatabase::builtin();
        let reading = decode_signal(db.spn(110).unwrap(), &payload("FFFFFFFFFFFFFFFF"));
        assert_eq!(reading, SignalReading::NotAvailable);
    }

    #[test]
    fn test_error_indicator_sentinel() {
        let db = SignalDatabase::builtin();
        let reading = decode_signal(db.spn(110).unwrap(), &payload("FE00000000000000"));
        assert_eq!(reading, SignalReading::ErrorIndicator);
    }

    #[test]
    fn test_all_ones_is_absent_for_every_width() {
        for bits in 1u8..=32 {
            let spn_def = layout(1, 1, bits);
            let mask = field_mask(bits);
            let mut data = mask.to_le_bytes().to_vec();
            data.truncate(8);
            assert_eq!(
                decode_signal(&spn_def, &data),
                SignalReading::NotAvailable,
                "{} bits",
                bits
            );
        }
    }

    #[test]
    fn test_short_frame_is_absent() {
        let db = SignalDatabase::builtin();
        let reading = decode_signal(db.spn(190).unwrap(), &payload("AABB"));
        assert_eq!(reading, SignalReading::ShortFrame);
    }

    #[test]
    fn test_window_past_end_of_address_space() {
        let data = payload("3FFFCD883927F4FF");
        let reading = decode_signal(&layout(usize::MAX, 1, 16), &data);
        assert_eq!(reading, SignalReading::ShortFrame);
        assert_eq!(layout(usize::MAX, 1, 16).end_byte(), usize::MAX);
    }

    #[test]
    fn test_invalid_layout_reported_separately() {
        let data = payload("3FFFCD883927F4FF");
        let layouts = [
            layout(0, 1, 8),
            layout(1, 0, 8),
            layout(1, 9, 8),
            layout(1, 1, 0),
            layout(1, 1, 40),
        ];
        for spn_def in layouts {
            assert_eq!(decode_signal(&spn_def, &data), SignalReading::InvalidLayout);
        }
    }

    #[test]
    fn test_sub_byte_extraction() {
        let db = SignalDatabase::builtin();
        // Byte 4 = 0x0C, bits 3-4 = 0b11 -> not available
        let reading = decode_signal(db.spn(596).unwrap(), &payload("FF0F320C0000FFFF"));
        assert_eq!(reading, SignalReading::NotAvailable);

        // Byte 4 = 0x04, bits 3-4 = 0b01 -> "Enabled"
        let reading = decode_signal(db.spn(596).unwrap(), &payload("FF0F32040000FFFF"));
        assert_eq!(reading.value().and_then(SignalValue::as_str), Some("Enabled"));
    }

    #[test]
    fn test_enumerated_never_numeric() {
        let db = SignalDatabase::builtin();
        let spn_def = db.spn(899).unwrap();
        for raw in 0u8..16 {
            let reading = decode_signal(spn_def, &[raw, 0, 0, 0, 0, 0, 0, 0]);
            if let Some(value) = reading.value() {
                assert!(!value.is_numeric());
            }
        }
        // 12 has no label
        assert_eq!(decode_signal(spn_def, &[12, 0, 0, 0, 0, 0, 0, 0]), SignalReading::Unmapped(12));
    }

    #[test]
    fn test_numeric_never_label() {
        let db = SignalDatabase::builtin();
        let spn_def = db.spn(110).unwrap();
        for raw in 0u8..=255 {
            if let Some(value) = decode_signal(spn_def, &[raw]).value() {
                assert!(value.is_numeric());
            }
        }
    }

    #[test]
    fn test_decode_group_eec1() {
        let db = SignalDatabase::builtin();
        let results = decode_group(61444, &db, &payload("3FFFCD883927F4FF"));
        assert_eq!(results[&190].value().and_then(SignalValue::as_f64), Some(1841.0));
        assert_eq!(results[&513].value().and_then(SignalValue::as_f64), Some(80.0));
        assert!(results[&899].is_absent());
    }

    #[test]
    fn test_decode_group_unknown_is_empty() {
        let db = SignalDatabase::builtin();
        assert!(decode_group(65308, &db, &payload("C4F0FFFF00FF00FF")).is_empty());
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(10079.0 * 0.05), 503.95);
        assert_eq!(round4(1.23456789), 1.2346);
    }
}
