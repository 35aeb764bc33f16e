//! J1939 protocol adapter

use super::{CanProtocolAdapter, DiscoveredSignal, RuntimeDecode};
use crate::decoder::J1939Decoder;
use crate::diagnostics::{DecodeMode, Dm1Diagnostic, FrameDiagnostics, SpnDiagnostic};
use crate::dm1::{Dm1Result, DM1_PGN, NO_ACTIVE_FAULT};
use crate::keys::{Dm1Field, SignalKey, SignalKind};
use crate::meta::{unit_mapping, DeviceClass, SignalMeta, StateClass};
use crate::profiles::Profile;
use crate::signals::SpnDefinition;
use crate::types::{CanFrame, SignalValue};
use std::collections::{BTreeMap, HashSet};

const PROTOCOL_ID: &str = "j1939";
const DM1_GROUP_NAME: &str = "DM1 - Active DTCs";
const DM1_GROUP_ACRONYM: &str = "DM1";

/// Full J1939 decoding over the merged dictionary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct J1939Protocol;

impl CanProtocolAdapter for J1939Protocol {
    type Decoder = J1939Decoder;

    fn protocol_id(&self) -> &'static str {
        PROTOCOL_ID
    }

    fn display_name(&self) -> &'static str {
        "J1939"
    }

    fn build_decoder(&self, profiles: &[Profile]) -> (J1939Decoder, Vec<String>) {
        J1939Decoder::from_profiles(profiles)
    }

    fn discover_signals(
        &self,
        frames: &[CanFrame],
        port: &str,
        decoder: &J1939Decoder,
    ) -> Vec<DiscoveredSignal> {
        let mut discovered = Vec::new();
        let mut seen_spns = HashSet::new();
        let mut seen_raw = HashSet::new();

        for frame in frames {
            let pgn = J1939Decoder::extract_header(frame.id).pgn;
            if pgn == DM1_PGN {
                continue;
            }

            let readings = decoder.decode_frame(frame);
            if readings.is_empty() {
                // Known group with a malformed payload: its SPNs show up on a good frame
                if decoder.pgn_def(pgn).is_none() && seen_raw.insert(pgn) {
                    discovered.push(DiscoveredSignal {
                        key: SignalKey::raw(port, PROTOCOL_ID, pgn).to_string(),
                        name: format!("Unknown PGN {} (0x{:04X})", pgn, pgn),
                        sample_value: Some(SignalValue::Text(frame.sample_data())),
                        unit: None,
                        default_selected: false,
                    });
                }
                continue;
            }

            let acronym = decoder.pgn_def(pgn).map(|pgn_def| pgn_def.acronym.as_str());
            for (spn, reading) in readings {
                if !seen_spns.insert(spn) {
                    continue;
                }
                let (name, unit) = match decoder.spn_def(spn) {
                    Some(spn_def) => (
                        signal_name(spn_def, acronym),
                        Some(spn_def.unit.clone()).filter(|unit| !unit.is_empty()),
                    ),
                    None => (format!("SPN {}", spn), None),
                };
                let sample_value = reading.into_value();
                discovered.push(DiscoveredSignal {
                    key: SignalKey::spn(port, PROTOCOL_ID, spn).to_string(),
                    name,
                    default_selected: sample_value.is_some(),
                    sample_value,
                    unit,
                });
            }
        }

        // Faults are intermittent, so DM1 stays selectable without a sample
        discovered.extend(Dm1Field::ALL.into_iter().map(|field| {
            let (sample_value, default_selected) = dm1_discovery_default(field);
            DiscoveredSignal {
                key: SignalKey::dm1(port, PROTOCOL_ID, field).to_string(),
                name: dm1_field_meta(field).name,
                sample_value: Some(sample_value),
                unit: None,
                default_selected,
            }
        }));

        log::debug!("Discovered {} J1939 signal(s) on {}", discovered.len(), port);
        discovered
    }

    fn decode_runtime(
        &self,
        frames: &[CanFrame],
        port: &str,
        selected: &HashSet<String>,
        decoder: &J1939Decoder,
    ) -> RuntimeDecode {
        let mut result = RuntimeDecode::default();

        for frame in frames {
            let header = J1939Decoder::extract_header(frame.id);
            let pgn = header.pgn;
            let mut diag = FrameDiagnostics::new(
                PROTOCOL_ID,
                frame,
                &header,
                decoder.is_known_pgn(pgn),
                DecodeMode::Decoded,
            );

            if pgn == DM1_PGN {
                decode_dm1_frame(frame, port, selected, decoder, &mut diag, &mut result);
                result.diagnostics.push(diag);
                continue;
            }

            let readings = decoder.decode_frame(frame);

            if let Some(pgn_def) = decoder.pgn_def(pgn) {
                diag.pgn_name = Some(pgn_def.name.clone());
                diag.pgn_acronym = Some(pgn_def.acronym.clone());
                let spns: BTreeMap<u32, SpnDiagnostic> = readings
                    .iter()
                    .map(|(spn, reading)| {
                        let spn_def = decoder.spn_def(*spn);
                        let entry = SpnDiagnostic {
                            value: reading.value().cloned(),
                            name: spn_def.map(|d| d.name.clone()),
                            unit: spn_def.map(|d| d.unit.clone()),
                        };
                        (*spn, entry)
                    })
                    .collect();
                if spns.values().any(|entry| entry.value.is_some()) {
                    result.has_valid_data = true;
                }
                diag.spns = Some(spns);
            }

            if readings.is_empty() {
                let raw_key = SignalKey::raw(port, PROTOCOL_ID, pgn).to_string();
                if selected.contains(&raw_key) {
                    result.values.insert(raw_key, SignalValue::Text(frame.data.clone()));
                }
            }

            for (spn, reading) in readings {
                let key = SignalKey::spn(port, PROTOCOL_ID, spn).to_string();
                if !selected.contains(&key) {
                    continue;
                }
                if let Some(value) = reading.into_value() {
                    result.values.insert(key, value);
                }
            }

            result.diagnostics.push(diag);
        }

        result
    }

    fn resolve_signal_meta(&self, signal_key: &str, decoder: &J1939Decoder) -> SignalMeta {
        let Ok(key) = signal_key.parse::<SignalKey>() else {
            return SignalMeta::named(signal_key).with_state_class(None);
        };

        match key.kind {
            SignalKind::Spn(spn) => spn_meta(spn, decoder),
            SignalKind::Raw(pgn) => SignalMeta::named(format!("PGN {} (Raw)", pgn))
                .with_state_class(None)
                .with_icon("mdi:numeric"),
            SignalKind::Dm1(field) => dm1_field_meta(field),
            SignalKind::Dm1Other(field) => SignalMeta::named(format!("DM1 {}", field))
                .with_state_class(None)
                .diagnostic(),
        }
    }
}

/// Decode one DM1 frame into the batch result
fn decode_dm1_frame(
    frame: &CanFrame,
    port: &str,
    selected: &HashSet<String>,
    decoder: &J1939Decoder,
    diag: &mut FrameDiagnostics,
    result: &mut RuntimeDecode,
) {
    let data = match frame.payload() {
        Ok(data) => data,
        Err(e) => {
            log::warn!("{}", e);
            return;
        }
    };

    let encoding = decoder.dm1_encoding(port);
    let Some(dm1) = decoder.decode_dm1(&data, port) else {
        log::debug!("DM1 frame on {} too short: {} byte(s)", port, data.len());
        return;
    };

    result.has_valid_data = true;
    let fault = decoder.fault_description(dm1.active_spn, dm1.active_fmi);

    for field in Dm1Field::ALL {
        let key = SignalKey::dm1(port, PROTOCOL_ID, field).to_string();
        if selected.contains(&key) {
            result.values.insert(key, dm1_field_value(field, &dm1, &fault));
        }
    }

    diag.pgn_name = Some(DM1_GROUP_NAME.to_string());
    diag.pgn_acronym = Some(DM1_GROUP_ACRONYM.to_string());
    diag.dm1 = Some(Dm1Diagnostic::new(&dm1, fault, encoding.as_str()));
}

fn lamp_state(active: bool) -> SignalValue {
    SignalValue::from(if active { "Active" } else { "Off" })
}

/// Runtime value of one DM1 field
fn dm1_field_value(field: Dm1Field, dm1: &Dm1Result, fault: &str) -> SignalValue {
    match field {
        Dm1Field::ActiveFault => SignalValue::from(fault),
        Dm1Field::ProtectLamp => lamp_state(dm1.lamp_protect),
        Dm1Field::AmberWarning => lamp_state(dm1.lamp_amber),
        Dm1Field::RedStop => lamp_state(dm1.lamp_red),
        Dm1Field::Mil => lamp_state(dm1.lamp_mil),
        Dm1Field::ActiveSpn => SignalValue::Integer(i64::from(dm1.active_spn)),
        Dm1Field::ActiveFmi => SignalValue::Integer(i64::from(dm1.active_fmi)),
        Dm1Field::OccurrenceCount => SignalValue::Integer(i64::from(dm1.occurrence_count)),
    }
}

/// Sample value and pre-selection for a DM1 field in discovery
fn dm1_discovery_default(field: Dm1Field) -> (SignalValue, bool) {
    match field {
        Dm1Field::ActiveFault => (SignalValue::from(NO_ACTIVE_FAULT), true),
        Dm1Field::ProtectLamp | Dm1Field::AmberWarning | Dm1Field::RedStop => {
            (lamp_state(false), true)
        }
        Dm1Field::Mil => (lamp_state(false), false),
        Dm1Field::ActiveSpn | Dm1Field::ActiveFmi | Dm1Field::OccurrenceCount => {
            (SignalValue::Integer(0), false)
        }
    }
}

fn dm1_field_meta(field: Dm1Field) -> SignalMeta {
    let (name, icon) = match field {
        Dm1Field::ActiveFault => ("DM1 Active Fault", "mdi:engine"),
        Dm1Field::ProtectLamp => ("DM1 Protect Lamp", "mdi:alert-circle"),
        Dm1Field::AmberWarning => ("DM1 Amber Warning", "mdi:alert"),
        Dm1Field::RedStop => ("DM1 Red Stop", "mdi:alert-octagon"),
        Dm1Field::Mil => ("DM1 MIL Lamp", "mdi:engine-outline"),
        Dm1Field::ActiveSpn => ("DM1 Active SPN", "mdi:identifier"),
        Dm1Field::ActiveFmi => ("DM1 Active FMI", "mdi:identifier"),
        Dm1Field::OccurrenceCount => ("DM1 Occurrence Count", "mdi:counter"),
    };

    let state_class = match field {
        Dm1Field::OccurrenceCount => Some(StateClass::Measurement),
        _ => None,
    };

    let meta = SignalMeta::named(name).with_state_class(state_class).with_icon(icon);
    match field {
        Dm1Field::ActiveFault => meta,
        _ => meta.diagnostic(),
    }
}

/// SPN name suffixed with its group's acronym, e.g. "Engine Speed (EEC1)"
fn signal_name(spn_def: &SpnDefinition, acronym: Option<&str>) -> String {
    match acronym {
        Some(acronym) if !acronym.is_empty() => format!("{} ({})", spn_def.name, acronym),
        _ => spn_def.name.clone(),
    }
}

fn spn_meta(spn: u32, decoder: &J1939Decoder) -> SignalMeta {
    let Some(spn_def) = decoder.spn_def(spn) else {
        return SignalMeta::named(format!("SPN {}", spn));
    };

    let acronym = decoder.pgn_def(spn_def.pgn).map(|pgn_def| pgn_def.acronym.as_str());
    let mut meta = SignalMeta::named(signal_name(spn_def, acronym));

    if let Some(states) = &spn_def.states {
        meta.device_class = Some(DeviceClass::Enum);
        meta.state_class = None;
        meta.options = Some(states.values().cloned().collect());
        return meta;
    }

    match unit_mapping(&spn_def.unit) {
        Some((device_class, unit, state_class)) => {
            meta.device_class = device_class;
            meta.unit = unit.map(str::to_string);
            meta.state_class = Some(state_class);
        }
        None => {
            meta.unit = Some(spn_def.unit.clone()).filter(|unit| !unit.is_empty());
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dm1Config, SpnEncoding};
    use crate::signals::SignalDatabase;

    fn selection(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_discover_known_unknown_and_dm1() {
        let decoder = J1939Decoder::new();
        let frames = [
            CanFrame::new(217056256, "3FFFCD883927F4FF"),
            CanFrame::new(419372032, "C4F0FFFF00FF00FF"),
            CanFrame::new(419372032, "C4F0FFFF00FF00FF"),
        ];
        let found = J1939Protocol.discover_signals(&frames, "can1", &decoder);

        let speed = found.iter().find(|s| s.key == "can.can1.j1939.spn190").unwrap();
        assert_eq!(speed.name, "Engine Speed (EEC1)");
        assert_eq!(speed.sample_value, Some(SignalValue::Float(1841.0)));
        assert_eq!(speed.unit.as_deref(), Some("rpm"));
        assert!(speed.default_selected);

        let raw: Vec<_> = found.iter().filter(|s| s.key.contains(".raw.")).collect();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].name, "Unknown PGN 65308 (0xFF1C)");
        assert!(!raw[0].default_selected);

        let dm1: Vec<_> = found.iter().filter(|s| s.key.contains(".dm1.")).collect();
        assert_eq!(dm1.len(), 8);
        assert_eq!(dm1[0].key, "can.can1.j1939.dm1.active_fault");
        assert_eq!(dm1[0].sample_value, Some(SignalValue::from("No Active Fault")));
        assert!(dm1[0].default_selected);
        let mil = dm1.iter().find(|s| s.key.ends_with("dm1.mil")).unwrap();
        assert!(!mil.default_selected);
    }

    #[test]
    fn test_discover_absent_values_not_preselected() {
        let decoder = J1939Decoder::new();
        let frames = [CanFrame::new(217056256, "FFFFFFFFFFFFFFFF")];
        let found = J1939Protocol.discover_signals(&frames, "can1", &decoder);
        let speed = found.iter().find(|s| s.key == "can.can1.j1939.spn190").unwrap();
        assert_eq!(speed.sample_value, None);
        assert!(!speed.default_selected);
    }

    #[test]
    fn test_decode_runtime_respects_selection() {
        let decoder = J1939Decoder::new();
        let frames = [
            CanFrame::new(217056256, "3FFFCD883927F4FF"),
            CanFrame::new(419372032, "C4F0FFFF00FF00FF"),
        ];
        let selected = selection(&["can.can1.j1939.spn190", "can.can1.j1939.raw.65308"]);
        let result = J1939Protocol.decode_runtime(&frames, "can1", &selected, &decoder);

        assert!(result.has_valid_data);
        assert_eq!(result.values.len(), 2);
        assert_eq!(result.values["can.can1.j1939.spn190"], SignalValue::Float(1841.0));
        assert_eq!(
            result.values["can.can1.j1939.raw.65308"],
            SignalValue::from("C4F0FFFF00FF00FF")
        );

        assert_eq!(result.diagnostics.len(), 2);
        let eec1 = &result.diagnostics[0];
        assert!(eec1.known);
        assert_eq!(eec1.pgn_acronym.as_deref(), Some("EEC1"));
        assert!(eec1.spns.as_ref().unwrap().contains_key(&513));
        let unknown = &result.diagnostics[1];
        assert!(!unknown.known);
        assert!(unknown.spns.is_none());
    }

    #[test]
    fn test_decode_runtime_all_absent_is_not_valid() {
        let decoder = J1939Decoder::new();
        let frames = [CanFrame::new(217056256, "FFFFFFFFFFFFFFFF")];
        let selected = selection(&["can.can1.j1939.spn190"]);
        let result = J1939Protocol.decode_runtime(&frames, "can1", &selected, &decoder);
        assert!(!result.has_valid_data);
        assert!(result.values.is_empty());
        assert_eq!(result.diagnostics.len(), 1);
    }

    #[test]
    fn test_decode_runtime_dm1() {
        let decoder = J1939Decoder::new();
        let frames = [CanFrame::new(0x18FECA00, "04FF6E000001FFFF")];
        let selected = selection(&[
            "can.can1.j1939.dm1.active_fault",
            "can.can1.j1939.dm1.protect_lamp",
            "can.can1.j1939.dm1.amber_warning",
            "can.can1.j1939.dm1.occurrence_count",
        ]);
        let result = J1939Protocol.decode_runtime(&frames, "can1", &selected, &decoder);

        assert!(result.has_valid_data);
        assert_eq!(
            result.values["can.can1.j1939.dm1.active_fault"],
            SignalValue::from(
                "SPN 110: Engine Coolant Temperature (FMI 0: Data Valid - Above Normal Range)"
            )
        );
        assert_eq!(result.values["can.can1.j1939.dm1.protect_lamp"], SignalValue::from("Active"));
        assert_eq!(result.values["can.can1.j1939.dm1.amber_warning"], SignalValue::from("Off"));
        assert_eq!(result.values["can.can1.j1939.dm1.occurrence_count"], SignalValue::Integer(1));
        assert!(!result.values.contains_key("can.can1.j1939.dm1.mil"));

        let diag = &result.diagnostics[0];
        assert!(diag.known);
        assert_eq!(diag.pgn_acronym.as_deref(), Some("DM1"));
        assert_eq!(diag.dm1.as_ref().unwrap().encoding, "little_endian");
    }

    #[test]
    fn test_decode_runtime_dm1_big_endian_port() {
        let config = Dm1Config::new()
            .with_spn_encoding(SpnEncoding::BigEndian)
            .add_port("can2")
            .add_custom_fault(880, "Proprietary Fault");
        let decoder = J1939Decoder::with_database(SignalDatabase::builtin(), Some(config));
        // (0x00 << 11) | (0x6E << 3) | (0x01 >> 5) = 880, FMI = 0x01 & 0x1F
        let frames = [CanFrame::new(0x18FECA00, "0000006E0101FFFF")];
        let selected = selection(&[
            "can.can2.j1939.dm1.active_spn",
            "can.can2.j1939.dm1.active_fault",
        ]);
        let result = J1939Protocol.decode_runtime(&frames, "can2", &selected, &decoder);

        assert_eq!(result.values["can.can2.j1939.dm1.active_spn"], SignalValue::Integer(880));
        assert_eq!(
            result.values["can.can2.j1939.dm1.active_fault"],
            SignalValue::from("SPN 880: Proprietary Fault (FMI 1: Data Valid - Below Normal Range)")
        );
        assert_eq!(result.diagnostics[0].dm1.as_ref().unwrap().encoding, "big_endian");
    }

    #[test]
    fn test_short_dm1_still_reported() {
        let decoder = J1939Decoder::new();
        let frames = [CanFrame::new(0x18FECA00, "0000")];
        let result = J1939Protocol.decode_runtime(&frames, "can1", &HashSet::new(), &decoder);
        assert!(!result.has_valid_data);
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].dm1.is_none());
    }

    #[test]
    fn test_malformed_dm1_payload_skipped() {
        let decoder = J1939Decoder::new();
        let frames = [CanFrame::new(0x18FECA00, "ZZFFFE00C301FFFF")];
        let selected = selection(&["can.can1.j1939.dm1.active_fault"]);
        let result = J1939Protocol.decode_runtime(&frames, "can1", &selected, &decoder);
        assert!(!result.has_valid_data);
        assert!(result.values.is_empty());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].dm1.is_none());
    }

    #[test]
    fn test_resolve_signal_meta() {
        let decoder = J1939Decoder::new();
        let proto = J1939Protocol;

        let meta = proto.resolve_signal_meta("can.can1.j1939.spn110", &decoder);
        assert_eq!(meta.name, "Engine Coolant Temperature (ET1)");
        assert_eq!(meta.device_class, Some(DeviceClass::Temperature));
        assert_eq!(meta.unit.as_deref(), Some("°C"));

        let meta = proto.resolve_signal_meta("can.can1.j1939.spn247", &decoder);
        assert!(meta.is_cumulative());

        assert_eq!(
            proto.resolve_signal_meta("can.can1.j1939.spn99999", &decoder).name,
            "SPN 99999"
        );

        let raw = proto.resolve_signal_meta("can.can1.j1939.raw.65308", &decoder);
        assert_eq!(raw.name, "PGN 65308 (Raw)");
        assert_eq!(raw.state_class, None);

        let dm1 = proto.resolve_signal_meta("can.can1.j1939.dm1.occurrence_count", &decoder);
        assert_eq!(dm1.name, "DM1 Occurrence Count");
        assert_eq!(dm1.state_class, Some(StateClass::Measurement));
        assert!(dm1.diagnostic);
        assert!(!proto.resolve_signal_meta("can.can1.j1939.dm1.active_fault", &decoder).diagnostic);
        assert_eq!(
            proto.resolve_signal_meta("can.can1.j1939.dm1.extra", &decoder).name,
            "DM1 extra"
        );

        assert_eq!(
            proto.resolve_signal_meta("internal.main.vsys", &decoder).name,
            "internal.main.vsys"
        );
    }

    #[test]
    fn test_enumerated_meta_has_options() {
        let decoder = J1939Decoder::new();
        let meta = J1939Protocol.resolve_signal_meta("can.can1.j1939.spn899", &decoder);
        assert_eq!(meta.device_class, Some(DeviceClass::Enum));
        assert_eq!(meta.state_class, None);
        assert_eq!(meta.unit, None);
        assert!(!meta.options.unwrap().is_empty());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let decoder = J1939Decoder::new();
        let first = J1939Protocol.resolve_signal_meta("can.can1.j1939.spn190", &decoder);
        let second = J1939Protocol.resolve_signal_meta("can.can1.j1939.spn190", &decoder);
        assert_eq!(first, second);
    }
}
