//! J1939 Decoder Library
//!
//! A stateless, reusable library for decoding SAE J1939 CAN frames into
//! engineering values, with a built-in signal dictionary that manufacturer
//! profiles can extend or override.
//!
//! # Architecture
//!
//! - A built-in PGN/SPN dictionary, copied into every decoder that is built
//! - Pure frame decoding: header extraction, bit-exact signal extraction,
//!   DM1 active-fault decoding in both SPN placements
//! - Profile overlay: validated JSON fragments merged onto the dictionary
//! - Protocol adapters: J1939 plus raw passthrough variants behind one
//!   contract (build, discover, decode, resolve metadata)
//!
//! The library does NOT:
//! - Receive frames from a bus or message broker
//! - Track values across batches or apply staleness rules
//! - Reassemble multi-packet transport protocol messages
//!
//! Decoders are immutable once built. Reconfiguring means building a new one.
//!
//! # Example Usage
//!
//! ```
//! use j1939_decoder::{get_can_protocol, CanFrame, SignalValue};
//! use std::collections::HashSet;
//!
//! let protocol = get_can_protocol("j1939").unwrap();
//! let (runtime, errors) = protocol.build_decoder(&[]);
//! assert!(errors.is_empty());
//!
//! let frames = vec![CanFrame::new(0x0CF00400, "3FFFCD883927F4FF")];
//! let selected: HashSet<String> = ["can.can1.j1939.spn190".to_string()].into();
//!
//! let result = runtime.decode_runtime(&frames, "can1", &selected);
//! assert!(result.has_valid_data);
//! assert_eq!(result.values["can.can1.j1939.spn190"], SignalValue::Float(1841.0));
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod diagnostics;
pub mod dm1;
pub mod frame_decoder;
pub mod keys;
pub mod meta;
pub mod profiles;
pub mod protocols;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use config::{Dm1Config, SpnEncoding};
pub use decoder::{J1939Decoder, PortDecode};
pub use diagnostics::{summarize_port_diagnostics, FrameDiagnostics, PortDiagnosticsSummary};
pub use dm1::{Dm1Result, DM1_PGN};
pub use frame_decoder::{decode_group, decode_signal, extract_header, J1939Header};
pub use keys::{normalize_selected_signals, to_canonical_signal_key, SignalKey};
pub use meta::{SignalMeta, SignalMetaCache};
pub use profiles::{discover_profiles, Profile};
pub use protocols::{
    get_can_protocol, list_can_protocol_options, CanProtocol, CanProtocolAdapter, DiscoveredSignal,
    ProtocolRuntime, RuntimeDecode,
};
pub use signals::{DatabaseStats, SignalDatabase};
pub use types::{CanFrame, DecoderError, Result, SignalReading, SignalValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: the built-in dictionary is populated
        let decoder = J1939Decoder::new();
        let stats = decoder.stats();
        assert!(stats.num_pgns > 0);
        assert!(stats.num_spns > stats.num_pgns);
    }
}
