// End-to-end decoding against the built-in dictionary

use j1939_decoder::dm1::{compose_fault_description, decode_dm1};
use j1939_decoder::signals::SpnDefinition;
use j1939_decoder::{
    decode_signal, extract_header, CanFrame, J1939Decoder, SignalReading, SignalValue, SpnEncoding,
};

fn spn_at(start_byte: usize, start_bit: u8, bit_length: u8) -> SpnDefinition {
    SpnDefinition {
        spn: 1,
        name: "Test".to_string(),
        pgn: 65280,
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
fn engine_speed_from_eec1() {
    let header = extract_header(217056256);
    assert_eq!(header.pgn, 61444);

    let decoder = J1939Decoder::new();
    let values = decoder.decode_values(&CanFrame::new(217056256, "3FFFCD883927F4FF"));
    assert_eq!(values[&190], SignalValue::Float(1841.0));
}

#[test]
fn engine_hours_four_byte_field() {
    let decoder = J1939Decoder::new();
    let values = decoder.decode_values(&CanFrame::new(419357952, "5F27000000000000"));
    assert_eq!(values[&247], SignalValue::Float(503.95));
}

#[test]
fn all_ones_byte_is_not_available() {
    let data = [0xFF; 8];
    for start_byte in 1..=8 {
        assert_eq!(decode_signal(&spn_at(start_byte, 1, 8), &data), SignalReading::NotAvailable);
    }
}

#[test]
fn dm1_no_fault_sentinel() {
    let dm1 = decode_dm1(
        &[0x00, 0xFF, 0x00, 0x00, 0x00, 0x05, 0xFF, 0xFF],
        SpnEncoding::LittleEndian,
    )
    .unwrap();
    assert_eq!((dm1.active_spn, dm1.active_fmi), (0, 0));
    assert_eq!(compose_fault_description(dm1.active_spn, dm1.active_fmi, None), "No Active Fault");

    let decoder = J1939Decoder::new();
    assert_eq!(decoder.fault_description(dm1.active_spn, dm1.active_fmi), "No Active Fault");
}

#[test]
fn pdu1_header_drops_destination() {
    // PF = 236 (0xEC), PS = 0xFF
    let header = extract_header(0x18ECFF00);
    assert_eq!(header.pgn, 0xEC00);
    assert_eq!(header.pgn & 0xFF, 0);
    assert!(header.is_pdu1());
}

#[test]
fn header_low_byte_property() {
    for pf in [0u32, 100, 239, 240, 254, 255] {
        for ps in [0u32, 0x01, 0x7F, 0xFF] {
            let can_id = (6 << 26) | (pf << 16) | (ps << 8) | 0x21;
            let header = extract_header(can_id);
            if pf >= 240 {
                assert_eq!(header.pgn & 0xFF, ps);
            } else {
                assert_eq!(header.pgn & 0xFF, 0);
            }
            assert_eq!(header.source_address, 0x21);
            assert_eq!(header.priority, 6);
        }
    }
}

#[test]
fn decode_is_deterministic() {
    let decoder = J1939Decoder::new();
    let frame = CanFrame::new(419360256, "2A2B2C2D2E2F3031");
    assert_eq!(decoder.decode_frame(&frame), decoder.decode_frame(&frame));
}

#[test]
fn enumerated_and_numeric_never_mix() {
    let decoder = J1939Decoder::new();
    let payloads = ["0000000000000000", "0102030405060708", "F1F2F3F4F5F6F7F8", "3FFFCD883927F4FF"];

    for pgn in decoder.database().pgn_numbers() {
        let can_id = (6 << 26) | (pgn << 8);
        for payload in payloads {
            for (spn, reading) in decoder.decode_frame(&CanFrame::new(can_id, payload)) {
                let Some(value) = reading.value() else {
                    continue;
                };
                let enumerated = decoder.spn_def(spn).unwrap().is_enumerated();
                assert_eq!(enumerated, !value.is_numeric(), "SPN {} decoded to {:?}", spn, value);
            }
        }
    }
}

#[test]
fn short_and_malformed_frames_decode_to_absent() {
    let decoder = J1939Decoder::new();

    let short = decoder.decode_frame(&CanFrame::new(217056256, "3FFF"));
    assert!(!short.is_empty());
    assert_eq!(short[&190], SignalReading::ShortFrame);

    assert!(decoder.decode_frame(&CanFrame::new(217056256, "not hex")).is_empty());
}
