//! CAN protocol adapters
//!
//! Each protocol that can ride on a CAN port implements
//! [`CanProtocolAdapter`]. The set of protocols is closed: [`CanProtocol`]
//! names every variant and [`registry`] maps protocol ids onto them.
//!
//! Building a decoder produces a [`ProtocolRuntime`], an immutable value that
//! bundles the adapter with its decoder state so callers can share it across
//! threads and swap it out wholesale on reconfiguration.

pub mod j1939;
pub mod raw;
pub mod registry;

pub use j1939::J1939Protocol;
pub use raw::RawProtocol;
pub use registry::{get_can_protocol, list_can_protocol_options, CAN_PROTOCOLS};

use crate::decoder::J1939Decoder;
use crate::diagnostics::FrameDiagnostics;
use crate::meta::SignalMeta;
use crate::profiles::Profile;
use crate::types::{CanFrame, SignalValue};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// A signal offered for selection during discovery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredSignal {
    /// Canonical signal key
    pub key: String,
    /// Display name
    pub name: String,
    /// Value seen in the sample (`None` when absent)
    pub sample_value: Option<SignalValue>,
    pub unit: Option<String>,
    /// Whether the signal should be pre-selected
    pub default_selected: bool,
}

/// Output of one runtime decode call for one port
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuntimeDecode {
    /// Selected signal values that decoded to something
    pub values: BTreeMap<String, SignalValue>,
    /// One record per input frame
    pub diagnostics: Vec<FrameDiagnostics>,
    /// True if anything in the batch decoded to a present value
    pub has_valid_data: bool,
}

/// Capabilities every CAN protocol provides
pub trait CanProtocolAdapter {
    /// Decoder state produced by [`build_decoder`](Self::build_decoder)
    type Decoder;

    /// Identifier used in signal keys and configuration
    fn protocol_id(&self) -> &'static str;

    /// Label shown to users
    fn display_name(&self) -> &'static str;

    /// Build decoder state from a profile selection
    ///
    /// Never fails: profiles that cannot be applied are reported in the
    /// returned message list and the decoder falls back to what remains.
    fn build_decoder(&self, profiles: &[Profile]) -> (Self::Decoder, Vec<String>);

    /// Enumerate selectable signals from sample frames
    fn discover_signals(
        &self,
        frames: &[CanFrame],
        port: &str,
        decoder: &Self::Decoder,
    ) -> Vec<DiscoveredSignal>;

    /// Decode a batch of frames into selected values plus diagnostics
    fn decode_runtime(
        &self,
        frames: &[CanFrame],
        port: &str,
        selected: &HashSet<String>,
        decoder: &Self::Decoder,
    ) -> RuntimeDecode;

    /// Display metadata for a key this protocol produced
    fn resolve_signal_meta(&self, signal_key: &str, decoder: &Self::Decoder) -> SignalMeta;
}

/// Every registered protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanProtocol {
    /// Full J1939 decoding
    J1939(J1939Protocol),
    /// Envelope-only passthrough
    Raw(RawProtocol),
}

impl CanProtocol {
    pub fn protocol_id(&self) -> &'static str {
        match self {
            CanProtocol::J1939(p) => p.protocol_id(),
            CanProtocol::Raw(p) => p.protocol_id(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CanProtocol::J1939(p) => p.display_name(),
            CanProtocol::Raw(p) => p.display_name(),
        }
    }

    /// Build the runtime for this protocol from a profile selection
    pub fn build_decoder(&self, profiles: &[Profile]) -> (ProtocolRuntime, Vec<String>) {
        match self {
            CanProtocol::J1939(p) => {
                let (decoder, errors) = p.build_decoder(profiles);
                (ProtocolRuntime::J1939(Arc::new(decoder)), errors)
            }
            CanProtocol::Raw(p) => {
                let ((), errors) = p.build_decoder(profiles);
                (ProtocolRuntime::Raw(*p), errors)
            }
        }
    }
}

/// A protocol bound to its immutable decoder state
#[derive(Debug, Clone)]
pub enum ProtocolRuntime {
    J1939(Arc<J1939Decoder>),
    Raw(RawProtocol),
}

impl ProtocolRuntime {
    pub fn protocol_id(&self) -> &'static str {
        match self {
            ProtocolRuntime::J1939(_) => J1939Protocol.protocol_id(),
            ProtocolRuntime::Raw(p) => p.protocol_id(),
        }
    }

    pub fn discover_signals(&self, frames: &[CanFrame], port: &str) -> Vec<DiscoveredSignal> {
        match self {
            ProtocolRuntime::J1939(decoder) => {
                J1939Protocol.discover_signals(frames, port, decoder)
            }
            ProtocolRuntime::Raw(p) => p.discover_signals(frames, port, &()),
        }
    }

    pub fn decode_runtime(
        &self,
        frames: &[CanFrame],
        port: &str,
        selected: &HashSet<String>,
    ) -> RuntimeDecode {
        match self {
            ProtocolRuntime::J1939(decoder) => {
                J1939Protocol.decode_runtime(frames, port, selected, decoder)
            }
            ProtocolRuntime::Raw(p) => p.decode_runtime(frames, port, selected, &()),
        }
    }

    pub fn resolve_signal_meta(&self, signal_key: &str) -> SignalMeta {
        match self {
            ProtocolRuntime::J1939(decoder) => {
                J1939Protocol.resolve_signal_meta(signal_key, decoder)
            }
            ProtocolRuntime::Raw(p) => p.resolve_signal_meta(signal_key, &()),
        }
    }

    /// The J1939 decoder, if this runtime has one
    pub fn j1939_decoder(&self) -> Option<&J1939Decoder> {
        match self {
            ProtocolRuntime::J1939(decoder) => Some(&**decoder),
            ProtocolRuntime::Raw(_) => None,
        }
    }
}
