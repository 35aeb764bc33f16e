//! Per-frame decode diagnostics
//!
//! Every runtime decode emits one [`FrameDiagnostics`] per input frame,
//! whether or not any of its signals were selected.

use crate::dm1::Dm1Result;
use crate::frame_decoder::J1939Header;
use crate::types::{CanFrame, SignalValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// How a frame was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Decoded against a signal dictionary
    Decoded,
    /// Passed through as a raw payload
    Raw,
}

/// One SPN's outcome within a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpnDiagnostic {
    /// Decoded value, `None` when absent
    pub value: Option<SignalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// DM1 details attached to a diagnostic frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dm1Diagnostic {
    pub active_spn: u32,
    pub active_fmi: u8,
    pub active_fault: String,
    pub occurrence_count: u8,
    /// SPN placement used for this frame
    pub encoding: &'static str,
}

impl Dm1Diagnostic {
    pub fn new(dm1: &Dm1Result, active_fault: String, encoding: &'static str) -> Self {
        Self {
            active_spn: dm1.active_spn,
            active_fmi: dm1.active_fmi,
            active_fault,
            occurrence_count: dm1.occurrence_count,
            encoding,
        }
    }
}

/// Diagnostics record for one input frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameDiagnostics {
    pub protocol: String,
    pub can_id: u32,
    pub can_id_hex: String,
    pub priority: u8,
    pub pgn: u32,
    pub pgn_hex: String,
    pub source_address: u8,
    /// Payload exactly as received
    pub data: String,
    /// True if the PGN is in the dictionary (or is DM1)
    pub known: bool,
    pub mode: DecodeMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pgn_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pgn_acronym: Option<String>,
    /// Per-SPN breakdown for known non-DM1 groups, keyed by SPN number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spns: Option<BTreeMap<u32, SpnDiagnostic>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dm1: Option<Dm1Diagnostic>,
}

impl FrameDiagnostics {
    /// Envelope-only record for a frame
    pub fn new(
        protocol: &str,
        frame: &CanFrame,
        header: &J1939Header,
        known: bool,
        mode: DecodeMode,
    ) -> Self {
        Self {
            protocol: protocol.to_string(),
            can_id: frame.id,
            can_id_hex: frame.id_hex(),
            priority: header.priority,
            pgn: header.pgn,
            pgn_hex: format!("0x{:04X}", header.pgn),
            source_address: header.source_address,
            data: frame.data.clone(),
            known,
            mode,
            pgn_name: None,
            pgn_acronym: None,
            spns: None,
            dm1: None,
        }
    }
}

/// A known-group SPN that decoded to nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableSpn {
    pub spn: u32,
    pub name: String,
    pub pgn: u32,
    pub pgn_acronym: String,
}

/// Per-port roll-up of a batch's diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortDiagnosticsSummary {
    pub protocol: String,
    pub total_frames: usize,
    pub known_frames: usize,
    pub unknown_frames: usize,
    pub unavailable_spns: Vec<UnavailableSpn>,
}

/// Summarise the diagnostics produced for one port
pub fn summarize_port_diagnostics(
    protocol: &str,
    frames: &[FrameDiagnostics],
) -> PortDiagnosticsSummary {
    let known_frames = frames.iter().filter(|frame| frame.known).count();

    let unavailable_spns = frames
        .iter()
        .filter(|frame| frame.known)
        .filter_map(|frame| frame.spns.as_ref().map(|spns| (frame, spns)))
        .flat_map(|(frame, spns)| {
            spns.iter()
                .filter(|(_, info)| info.value.is_none())
                .map(move |(spn, info)| UnavailableSpn {
                    spn: *spn,
                    name: info.name.clone().unwrap_or_else(|| "Unknown".to_string()),
                    pgn: frame.pgn,
                    pgn_acronym: frame.pgn_acronym.clone().unwrap_or_default(),
                })
        })
        .collect();

    PortDiagnosticsSummary {
        protocol: protocol.to_string(),
        total_frames: frames.len(),
        known_frames,
        unknown_frames: frames.len() - known_frames,
        unavailable_spns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_decoder::extract_header;

    fn frame_diag(
        can_id: u32,
        known: bool,
        spns: Option<BTreeMap<u32, SpnDiagnostic>>,
    ) -> FrameDiagnostics {
        let frame = CanFrame::new(can_id, "FFFFFFFFFFFFFFFF");
        let header = extract_header(can_id);
        let mut diag = FrameDiagnostics::new("j1939", &frame, &header, known, DecodeMode::Decoded);
        diag.pgn_acronym = Some("EEC1".to_string());
        diag.spns = spns;
        diag
    }

    #[test]
    fn test_envelope_fields() {
        let frame = CanFrame::new(217056256, "3FFFCD883927F4FF");
        let header = extract_header(frame.id);
        let diag = FrameDiagnostics::new("j1939", &frame, &header, true, DecodeMode::Decoded);
        assert_eq!(diag.can_id_hex, "0x0CF00400");
        assert_eq!(diag.pgn_hex, "0xF004");
        assert_eq!(diag.priority, 3);

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["mode"], "decoded");
        assert!(json.get("spns").is_none());
    }

    #[test]
    fn test_summary_counts_and_unavailable() {
        let mut spns = BTreeMap::new();
        spns.insert(
            190,
            SpnDiagnostic {
                value: Some(SignalValue::Float(1841.0)),
                name: Some("Engine Speed".to_string()),
                unit: Some("rpm".to_string()),
            },
        );
        spns.insert(
            899,
            SpnDiagnostic {
                value: None,
                name: Some("Engine Torque Mode".to_string()),
                unit: Some(String::new()),
            },
        );

        let frames = vec![
            frame_diag(217056256, true, Some(spns)),
            frame_diag(419372032, false, None),
        ];
        let summary = summarize_port_diagnostics("j1939", &frames);

        assert_eq!(summary.total_frames, 2);
        assert_eq!(summary.known_frames, 1);
        assert_eq!(summary.unknown_frames, 1);
        assert_eq!(summary.unavailable_spns.len(), 1);
        assert_eq!(summary.unavailable_spns[0].spn, 899);
        assert_eq!(summary.unavailable_spns[0].pgn, 61444);
        assert_eq!(summary.unavailable_spns[0].pgn_acronym, "EEC1");
    }
}
