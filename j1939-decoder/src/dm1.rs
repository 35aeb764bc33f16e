//! DM1 (active diagnostic trouble codes) decoding
//!
//! DM1 single-frame layout (J1939-73):
//! - Byte 1: lamp status, four 2-bit fields
//! - Byte 2: reserved
//! - Bytes 3-6: one DTC (SPN, FMI, occurrence count)
//! - Bytes 7-8: padding
//!
//! Some manufacturers place the SPN big-endian across bytes 3-5. The
//! encoding is chosen per port from the profile's [`Dm1Config`].
//!
//! [`Dm1Config`]: crate::config::Dm1Config

use crate::config::SpnEncoding;
use serde::Serialize;

/// PGN of the DM1 broadcast
pub const DM1_PGN: u32 = 65226;

/// Minimum payload length for a DM1 decode
pub const DM1_MIN_LENGTH: usize = 6;

/// Description used when no fault is active
pub const NO_ACTIVE_FAULT: &str = "No Active Fault";

/// Decoded DM1 frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dm1Result {
    /// Malfunction indicator lamp
    pub lamp_mil: bool,
    /// Engine protect lamp
    pub lamp_protect: bool,
    /// Amber warning lamp
    pub lamp_amber: bool,
    /// Red stop lamp
    pub lamp_red: bool,
    /// SPN of the active fault (0 when none)
    pub active_spn: u32,
    /// Failure mode identifier of the active fault (0 when none)
    pub active_fmi: u8,
    /// Occurrence count (7 bits)
    pub occurrence_count: u8,
}

impl Dm1Result {
    /// True when the record carries the "no active fault" sentinel
    pub fn is_no_fault(&self) -> bool {
        self.active_spn == 0 && self.active_fmi == 0
    }
}

/// Decode a DM1 single frame
///
/// Returns `None` when the payload is shorter than 6 bytes. The "no fault"
/// check ignores the occurrence count in byte 6.
pub fn decode_dm1(data: &[u8], encoding: SpnEncoding) -> Option<Dm1Result> {
    if data.len() < DM1_MIN_LENGTH {
        return None;
    }

    let lamp_byte = data[0];
    let byte3 = u32::from(data[2]);
    let byte4 = u32::from(data[3]);
    let byte5 = data[4];
    let byte6 = data[5];

    let spn_high = u32::from(byte5 >> 5);
    let mut active_spn = match encoding {
        SpnEncoding::LittleEndian => byte3 | (byte4 << 8) | (spn_high << 16),
        SpnEncoding::BigEndian => (byte3 << 11) | (byte4 << 3) | spn_high,
    };
    let mut active_fmi = byte5 & 0x1F;

    if byte3 == 0 && byte4 == 0 && spn_high == 0 && active_fmi == 0 {
        active_spn = 0;
        active_fmi = 0;
    }

    Some(Dm1Result {
        lamp_mil: lamp_byte & 0x03 != 0,
        lamp_protect: lamp_byte & 0x0C != 0,
        lamp_amber: lamp_byte & 0x30 != 0,
        lamp_red: lamp_byte & 0xC0 != 0,
        active_spn,
        active_fmi,
        occurrence_count: byte6 & 0x7F,
    })
}

/// J1939-73 failure mode identifier meaning, if standardised
pub fn fmi_description(fmi: u8) -> Option<&'static str> {
    let text = match fmi {
        0 => "Data Valid - Above Normal Range",
        1 => "Data Valid - Below Normal Range",
        2 => "Data Erratic/Incorrect",
        3 => "Voltage Above Normal",
        4 => "Voltage Below Normal",
        5 => "Current Below Normal",
        6 => "Current Above Normal",
        7 => "Mechanical System Not Responding",
        8 => "Abnormal Frequency/Period/Width",
        9 => "Abnormal Update Rate",
        10 => "Abnormal Rate of Change",
        11 => "Root Cause Not Known",
        12 => "Bad Intelligent Device or Component",
        13 => "Out of Calibration",
        14 => "Special Instructions",
        15 => "Data Valid - Above Normal Range (Least Severe)",
        16 => "Data Valid - Above Normal Range (Moderately Severe)",
        17 => "Data Valid - Below Normal Range (Least Severe)",
        18 => "Data Valid - Below Normal Range (Moderately Severe)",
        19 => "Received Network Data in Error",
        20 => "Data Drifted High",
        21 => "Data Drifted Low",
        31 => "Condition Exists",
        _ => return None,
    };
    Some(text)
}

/// Compose the fault description from an already-resolved SPN name
///
/// e.g. `SPN 520198: Emergency Stop (FMI 2: Data Erratic/Incorrect)`
pub fn compose_fault_description(spn: u32, fmi: u8, spn_name: Option<&str>) -> String {
    if spn == 0 && fmi == 0 {
        return NO_ACTIVE_FAULT.to_string();
    }

    let spn_name = match spn_name {
        Some(name) => name.to_string(),
        None => format!("Unknown SPN {}", spn),
    };
    let fmi_desc = match fmi_description(fmi) {
        Some(desc) => desc.to_string(),
        None => format!("FMI {}", fmi),
    };

    format!("SPN {}: {} (FMI {}: {})", spn, spn_name, fmi, fmi_desc)
}
