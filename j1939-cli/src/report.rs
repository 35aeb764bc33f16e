//! Decode reports (TXT/JSON)

use j1939_decoder::{PortDiagnosticsSummary, SignalValue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

/// Decode result for one telemetry file
#[derive(Debug, Clone, Serialize)]
pub struct MessageReport {
    pub file: String,
    pub timestamp: String,
    pub ports: BTreeMap<String, PortReport>,
}

/// Decode result for one port of one message
#[derive(Debug, Clone, Serialize)]
pub struct PortReport {
    pub protocol: String,
    pub has_valid_data: bool,
    pub values: BTreeMap<String, SignalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<PortDiagnosticsSummary>,
}

impl MessageReport {
    pub fn new(file: &Path, timestamp: String) -> Self {
        Self {
            file: file.display().to_string(),
            timestamp,
            ports: BTreeMap::new(),
        }
    }
}

/// Render reports as plain text
pub fn render_text(reports: &[MessageReport]) -> String {
    let mut out = String::new();

    for report in reports {
        let _ = writeln!(out, "═══ {} @ {}", report.file, report.timestamp);
        for (port, port_report) in &report.ports {
            let status = if port_report.has_valid_data { "live" } else { "no data" };
            let _ = writeln!(out, "  {} [{}] {}", port, port_report.protocol, status);
            for (key, value) in &port_report.values {
                let _ = writeln!(out, "    {:<45} {}", key, value);
            }
            if let Some(summary) = &port_report.diagnostics {
                let _ = writeln!(
                    out,
                    "    frames: {} total, {} known, {} unknown",
                    summary.total_frames, summary.known_frames, summary.unknown_frames
                );
                for spn in &summary.unavailable_spns {
                    let _ = writeln!(
                        out,
                        "    unavailable: SPN {} {} ({} / PGN {})",
                        spn.spn, spn.name, spn.pgn_acronym, spn.pgn
                    );
                }
            }
        }
    }

    out
}
