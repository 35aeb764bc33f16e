//! Raw passthrough for protocols without a signal decoder
//!
//! Frames are addressed by the PGN their identifier would carry under J1939
//! and emitted unchanged as hex strings.

use super::{CanProtocolAdapter, DiscoveredSignal, RuntimeDecode};
use crate::diagnostics::{DecodeMode, FrameDiagnostics};
use crate::frame_decoder::extract_header;
use crate::keys::{SignalKey, SignalKind};
use crate::meta::SignalMeta;
use crate::profiles::Profile;
use crate::types::{CanFrame, SignalValue};
use std::collections::HashSet;

/// A protocol exposed as raw frames only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawProtocol {
    protocol_id: &'static str,
    display_name: &'static str,
}

impl RawProtocol {
    pub const fn new(protocol_id: &'static str, display_name: &'static str) -> Self {
        Self {
            protocol_id,
            display_name,
        }
    }
}

impl CanProtocolAdapter for RawProtocol {
    type Decoder = ();

    fn protocol_id(&self) -> &'static str {
        self.protocol_id
    }

    fn display_name(&self) -> &'static str {
        self.display_name
    }

    fn build_decoder(&self, profiles: &[Profile]) -> ((), Vec<String>) {
        if !profiles.is_empty() {
            log::debug!(
                "{} has no decoder; ignoring {} profile(s)",
                self.protocol_id,
                profiles.len()
            );
        }
        ((), Vec::new())
    }

    fn discover_signals(
        &self,
        frames: &[CanFrame],
        port: &str,
        _decoder: &(),
    ) -> Vec<DiscoveredSignal> {
        let mut seen = HashSet::new();

        frames
            .iter()
            .filter_map(|frame| {
                let pgn = extract_header(frame.id).pgn;
                if !seen.insert(pgn) {
                    return None;
                }
                Some(DiscoveredSignal {
                    key: SignalKey::raw(port, self.protocol_id, pgn).to_string(),
                    name: format!("Raw PGN {} (0x{:04X})", pgn, pgn),
                    sample_value: Some(SignalValue::Text(frame.sample_data())),
                    unit: None,
                    default_selected: true,
                })
            })
            .collect()
    }

    fn decode_runtime(
        &self,
        frames: &[CanFrame],
        port: &str,
        selected: &HashSet<String>,
        _decoder: &(),
    ) -> RuntimeDecode {
        let mut result = RuntimeDecode::default();

        for frame in frames {
            let header = extract_header(frame.id);
            if frame.payload().is_ok() {
                result.has_valid_data = true;
            }

            let key = SignalKey::raw(port, self.protocol_id, header.pgn).to_string();
            if selected.contains(&key) {
                result.values.insert(key, SignalValue::Text(frame.data.clone()));
            }

            result.diagnostics.push(FrameDiagnostics::new(
                self.protocol_id,
                frame,
                &header,
                false,
                DecodeMode::Raw,
            ));
        }

        result
    }

    fn resolve_signal_meta(&self, signal_key: &str, _decoder: &()) -> SignalMeta {
        match signal_key.parse::<SignalKey>().map(|key| key.kind) {
            Ok(SignalKind::Raw(pgn)) => SignalMeta::named(format!("Raw PGN {}", pgn))
                .with_state_class(None)
                .with_icon("mdi:numeric"),
            _ => SignalMeta::named(signal_key).with_state_class(None),
        }
    }
}
