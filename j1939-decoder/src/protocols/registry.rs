//! Registered CAN protocols

use super::{CanProtocol, J1939Protocol, RawProtocol};
use crate::types::{DecoderError, Result};

/// Every protocol a port can be configured with, in display order
pub static CAN_PROTOCOLS: [CanProtocol; 4] = [
    CanProtocol::J1939(J1939Protocol),
    CanProtocol::Raw(RawProtocol::new("nmea2000", "NMEA 2000 (Raw)")),
    CanProtocol::Raw(RawProtocol::new("iso11783", "ISO 11783 (Raw)")),
    CanProtocol::Raw(RawProtocol::new("canopen", "CANopen (Raw)")),
];

/// Look up a protocol by id
pub fn get_can_protocol(protocol_id: &str) -> Option<&'static CanProtocol> {
    CAN_PROTOCOLS.iter().find(|p| p.protocol_id() == protocol_id)
}

/// Look up a protocol by id, failing on unknown ids
pub fn require_can_protocol(protocol_id: &str) -> Result<&'static CanProtocol> {
    get_can_protocol(protocol_id)
        .ok_or_else(|| DecoderError::UnknownProtocol(protocol_id.to_string()))
}

/// (id, label) pairs for configuration selectors
pub fn list_can_protocol_options() -> Vec<(&'static str, &'static str)> {
    CAN_PROTOCOLS
        .iter()
        .map(|p| (p.protocol_id(), p.display_name()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(matches!(get_can_protocol("j1939"), Some(CanProtocol::J1939(_))));
        assert!(matches!(get_can_protocol("iso11783"), Some(CanProtocol::Raw(_))));
        assert!(get_can_protocol("j1587").is_none());
        assert!(matches!(
            require_can_protocol("j1587"),
            Err(DecoderError::UnknownProtocol(id)) if id == "j1587"
        ));
    }

    #[test]
    fn test_options_in_order() {
        assert_eq!(
            list_can_protocol_options(),
            vec![
                ("j1939", "J1939"),
                ("nmea2000", "NMEA 2000 (Raw)"),
                ("iso11783", "ISO 11783 (Raw)"),
                ("canopen", "CANopen (Raw)"),
            ]
        );
    }
}
