//! Built-in J1939 dictionary
//!
//! Compile-time tables for the common SAE J1939-71 parameter groups. A fresh
//! owned copy is produced for every decoder build so that no profile merge
//! can touch the baseline.

use super::database::{PgnDefinition, SignalDatabase, SpnDefinition};

struct BuiltinPgn {
    pgn: u32,
    name: &'static str,
    acronym: &'static str,
    length: usize,
    spns: &'static [u32],
}

struct BuiltinSpn {
    spn: u32,
    name: &'static str,
    pgn: u32,
    start_byte: usize,
    start_bit: u8,
    bit_length: u8,
    resolution: f64,
    offset: f64,
    unit: &'static str,
    min_value: Option<f64>,
    max_value: Option<f64>,
    states: &'static [(u32, &'static str)],
}

#[allow(clippy::too_many_arguments)]
const fn spn(
    spn: u32,
    name: &'static str,
    pgn: u32,
    start_byte: usize,
    start_bit: u8,
    bit_length: u8,
    resolution: f64,
    offset: f64,
    unit: &'static str,
) -> BuiltinSpn {
    BuiltinSpn {
        spn,
        name,
        pgn,
        start_byte,
        start_bit,
        bit_length,
        resolution,
        offset,
        unit,
        min_value: None,
        max_value: None,
        states: &[],
    }
}

impl BuiltinSpn {
    const fn range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    const fn states(mut self, states: &'static [(u32, &'static str)]) -> Self {
        self.states = states;
        self
    }
}

const SWITCH_STATES: &[(u32, &str)] = &[(0, "Off"), (1, "On")];
const PEDAL_SWITCH_STATES: &[(u32, &str)] = &[(0, "Released"), (1, "Depressed")];

const PGNS: &[BuiltinPgn] = &[
    BuiltinPgn {
        pgn: 61443,
        name: "Electronic Engine Controller 2",
        acronym: "EEC2",
        length: 8,
        spns: &[558, 559, 91, 92, 974],
    },
    BuiltinPgn {
        pgn: 61444,
        name: "Electronic Engine Controller 1",
        acronym: "EEC1",
        length: 8,
        spns: &[899, 512, 513, 190, 1483, 2432],
    },
    BuiltinPgn {
        pgn: 65248,
        name: "Vehicle Distance",
        acronym: "VD",
        length: 8,
        spns: &[244, 245],
    },
    BuiltinPgn {
        pgn: 65253,
        name: "Engine Hours, Revolutions",
        acronym: "HOURS",
        length: 8,
        spns: &[247, 249],
    },
    BuiltinPgn {
        pgn: 65254,
        name: "Time/Date",
        acronym: "TD",
        length: 8,
        spns: &[959, 960, 961, 963, 962, 964, 1601, 1602],
    },
    BuiltinPgn {
        pgn: 65257,
        name: "Fuel Consumption (Liquid)",
        acronym: "LFC",
        length: 8,
        spns: &[250, 182],
    },
    BuiltinPgn {
        pgn: 65262,
        name: "Engine Temperature 1",
        acronym: "ET1",
        length: 8,
        spns: &[110, 174, 175, 176, 52, 1134],
    },
    BuiltinPgn {
        pgn: 65263,
        name: "Engine Fluid Level/Pressure 1",
        acronym: "EFL/P1",
        length: 8,
        spns: &[94, 22, 98, 100, 101, 109, 111],
    },
    BuiltinPgn {
        pgn: 65265,
        name: "Cruise Control/Vehicle Speed",
        acronym: "CCVS1",
        length: 8,
        spns: &[69, 70, 84, 595, 596, 597, 598, 86, 527],
    },
    BuiltinPgn {
        pgn: 65266,
        name: "Fuel Economy (Liquid)",
        acronym: "LFE1",
        length: 8,
        spns: &[183, 184, 185, 51],
    },
    BuiltinPgn {
        pgn: 65269,
        name: "Ambient Conditions",
        acronym: "AMB",
        length: 8,
        spns: &[108, 170, 171, 172, 79],
    },
    BuiltinPgn {
        pgn: 65270,
        name: "Inlet/Exhaust Conditions 1",
        acronym: "IC1",
        length: 8,
        spns: &[81, 102, 105, 106, 107, 173, 112],
    },
    BuiltinPgn {
        pgn: 65271,
        name: "Vehicle Electrical Power 1",
        acronym: "VEP1",
        length: 8,
        spns: &[114, 115, 167, 168, 158],
    },
    BuiltinPgn {
        pgn: 65276,
        name: "Dash Display",
        acronym: "DD",
        length: 8,
        spns: &[80, 96, 95, 99, 169, 38],
    },
];

const SPNS: &[BuiltinSpn] = &[
    // EEC2
    spn(558, "Accelerator Pedal Low Idle Switch", 61443, 1, 1, 2, 1.0, 0.0, "")
        .states(&[(0, "Not in low idle"), (1, "In low idle")]),
    spn(559, "Accelerator Pedal Kickdown Switch", 61443, 1, 3, 2, 1.0, 0.0, "")
        .states(&[(0, "Passive"), (1, "Active")]),
    spn(91, "Accelerator Pedal Position 1", 61443, 2, 1, 8, 0.4, 0.0, "%").range(0.0, 100.0),
    spn(92, "Engine Percent Load At Current Speed", 61443, 3, 1, 8, 1.0, 0.0, "%")
        .range(0.0, 250.0),
    spn(974, "Remote Accelerator Pedal Position", 61443, 4, 1, 8, 0.4, 0.0, "%")
        .range(0.0, 100.0),
    // EEC1
    spn(899, "Engine Torque Mode", 61444, 1, 1, 4, 1.0, 0.0, "").states(&[
        (0, "Low idle governor/no request"),
        (1, "Accelerator pedal/operator selection"),
        (2, "Cruise control"),
        (3, "PTO governor"),
        (4, "Road speed governor"),
        (5, "ASR control"),
        (6, "Transmission control"),
        (7, "ABS control"),
        (8, "Torque limiting"),
        (9, "High speed governor"),
        (10, "Braking system"),
        (11, "Remote accelerator"),
    ]),
    spn(512, "Driver's Demand Engine - Percent Torque", 61444, 2, 1, 8, 1.0, -125.0, "%")
        .range(-125.0, 125.0),
    spn(513, "Actual Engine - Percent Torque", 61444, 3, 1, 8, 1.0, -125.0, "%")
        .range(-125.0, 125.0),
    spn(190, "Engine Speed", 61444, 4, 1, 16, 0.125, 0.0, "rpm").range(0.0, 8031.875),
    spn(1483, "Source Address of Controlling Device", 61444, 6, 1, 8, 1.0, 0.0, ""),
    spn(2432, "Engine Demand - Percent Torque", 61444, 8, 1, 8, 1.0, -125.0, "%")
        .range(-125.0, 125.0),
    // VD
    spn(244, "Trip Distance", 65248, 1, 1, 32, 0.125, 0.0, "km"),
    spn(245, "Total Vehicle Distance", 65248, 5, 1, 32, 0.125, 0.0, "km"),
    // HOURS
    spn(247, "Engine Total Hours of Operation", 65253, 1, 1, 32, 0.05, 0.0, "h"),
    spn(249, "Engine Total Revolutions", 65253, 5, 1, 32, 1000.0, 0.0, "rev"),
    // TD
    spn(959, "Seconds", 65254, 1, 1, 8, 0.25, 0.0, "s").range(0.0, 59.75),
    spn(960, "Minutes", 65254, 2, 1, 8, 1.0, 0.0, "min").range(0.0, 59.0),
    spn(961, "Hours", 65254, 3, 1, 8, 1.0, 0.0, "h").range(0.0, 23.0),
    spn(963, "Month", 65254, 4, 1, 8, 1.0, 0.0, "month").range(1.0, 12.0),
    spn(962, "Day", 65254, 5, 1, 8, 0.25, 0.0, "day").range(0.25, 31.75),
    spn(964, "Year", 65254, 6, 1, 8, 1.0, 1985.0, "year").range(1985.0, 2235.0),
    spn(1601, "Local Minute Offset", 65254, 7, 1, 8, 1.0, -125.0, "min").range(-59.0, 59.0),
    spn(1602, "Local Hour Offset", 65254, 8, 1, 8, 1.0, -125.0, "h").range(-23.0, 23.0),
    // LFC
    spn(250, "Engine Total Fuel Used", 65257, 1, 1, 32, 0.5, 0.0, "L"),
    spn(182, "Engine Trip Fuel", 65257, 5, 1, 32, 0.5, 0.0, "L"),
    // ET1
    spn(110, "Engine Coolant Temperature", 65262, 1, 1, 8, 1.0, -40.0, "deg C")
        .range(-40.0, 210.0),
    spn(174, "Engine Fuel Temperature 1", 65262, 2, 1, 8, 1.0, -40.0, "deg C")
        .range(-40.0, 210.0),
    spn(175, "Engine Oil Temperature 1", 65262, 3, 1, 16, 0.03125, -273.0, "deg C")
        .range(-273.0, 1734.96875),
    spn(176, "Engine Turbocharger Oil Temperature", 65262, 5, 1, 16, 0.03125, -273.0, "deg C")
        .range(-273.0, 1734.96875),
    spn(52, "Engine Intercooler Temperature", 65262, 7, 1, 8, 1.0, -40.0, "deg C")
        .range(-40.0, 210.0),
    spn(1134, "Engine Intercooler Thermostat Opening", 65262, 8, 1, 8, 0.4, 0.0, "%")
        .range(0.0, 100.0),
    // EFL/P1
    spn(94, "Engine Fuel Delivery Pressure", 65263, 1, 1, 8, 4.0, 0.0, "kPa").range(0.0, 1000.0),
    spn(22, "Engine Extended Crankcase Blow-by Pressure", 65263, 2, 1, 8, 0.05, 0.0, "kPa")
        .range(0.0, 12.5),
    spn(98, "Engine Oil Level", 65263, 3, 1, 8, 0.4, 0.0, "%").range(0.0, 100.0),
    spn(100, "Engine Oil Pressure", 65263, 4, 1, 8, 4.0, 0.0, "kPa").range(0.0, 1000.0),
    spn(101, "Engine Crankcase Pressure", 65263, 5, 1, 16, 0.0078125, -250.0, "kPa")
        .range(-250.0, 251.99),
    spn(109, "Engine Coolant Pressure", 65263, 7, 1, 8, 2.0, 0.0, "kPa").range(0.0, 500.0),
    spn(111, "Engine Coolant Level", 65263, 8, 1, 8, 0.4, 0.0, "%").range(0.0, 100.0),
    // CCVS1
    spn(69, "Two Speed Axle Switch", 65265, 1, 1, 2, 1.0, 0.0, "")
        .states(&[(0, "Low speed range"), (1, "High speed range")]),
    spn(70, "Parking Brake Switch", 65265, 1, 3, 2, 1.0, 0.0, "")
        .states(&[(0, "Not set"), (1, "Set")]),
    spn(84, "Wheel-Based Vehicle Speed", 65265, 2, 1, 16, 0.00390625, 0.0, "km/h")
        .range(0.0, 250.996),
    spn(595, "Cruise Control Active", 65265, 4, 1, 2, 1.0, 0.0, "").states(SWITCH_STATES),
    spn(596, "Cruise Control Enable Switch", 65265, 4, 3, 2, 1.0, 0.0, "")
        .states(&[(0, "Disabled"), (1, "Enabled")]),
    spn(597, "Brake Switch", 65265, 4, 5, 2, 1.0, 0.0, "").states(PEDAL_SWITCH_STATES),
    spn(598, "Clutch Switch", 65265, 4, 7, 2, 1.0, 0.0, "").states(PEDAL_SWITCH_STATES),
    spn(86, "Cruise Control Set Speed", 65265, 6, 1, 8, 1.0, 0.0, "km/h").range(0.0, 250.0),
    spn(527, "Cruise Control States", 65265, 7, 6, 3, 1.0, 0.0, "").states(&[
        (0, "Off/Disabled"),
        (1, "Hold"),
        (2, "Accelerate"),
        (3, "Decelerate"),
        (4, "Resume"),
        (5, "Set"),
    ]),
    // LFE1
    spn(183, "Engine Fuel Rate", 65266, 1, 1, 16, 0.05, 0.0, "L/h").range(0.0, 3212.75),
    spn(184, "Engine Instantaneous Fuel Economy", 65266, 3, 1, 16, 0.001953125, 0.0, "km/L")
        .range(0.0, 125.5),
    spn(185, "Engine Average Fuel Economy", 65266, 5, 1, 16, 0.001953125, 0.0, "km/L")
        .range(0.0, 125.5),
    spn(51, "Engine Throttle Valve 1 Position", 65266, 7, 1, 8, 0.4, 0.0, "%").range(0.0, 100.0),
    // AMB
    spn(108, "Barometric Pressure", 65269, 1, 1, 8, 0.5, 0.0, "kPa").range(0.0, 125.0),
    spn(170, "Cab Interior Temperature", 65269, 2, 1, 16, 0.03125, -273.0, "deg C")
        .range(-273.0, 1734.96875),
    spn(171, "Ambient Air Temperature", 65269, 4, 1, 16, 0.03125, -273.0, "deg C")
        .range(-273.0, 1734.96875),
    spn(172, "Engine Air Inlet Temperature", 65269, 6, 1, 8, 1.0, -40.0, "deg C")
        .range(-40.0, 210.0),
    spn(79, "Road Surface Temperature", 65269, 7, 1, 16, 0.03125, -273.0, "deg C")
        .range(-273.0, 1734.96875),
    // IC1
    spn(81, "Aftertreatment 1 DPF Inlet Pressure", 65270, 1, 1, 8, 0.5, 0.0, "kPa")
        .range(0.0, 125.0),
    spn(102, "Engine Intake Manifold #1 Pressure", 65270, 2, 1, 8, 2.0, 0.0, "kPa")
        .range(0.0, 500.0),
    spn(105, "Engine Intake Manifold 1 Temperature", 65270, 3, 1, 8, 1.0, -40.0, "deg C")
        .range(-40.0, 210.0),
    spn(106, "Engine Air Inlet Pressure", 65270, 4, 1, 8, 2.0, 0.0, "kPa").range(0.0, 500.0),
    spn(107, "Engine Air Filter 1 Differential Pressure", 65270, 5, 1, 8, 0.05, 0.0, "kPa")
        .range(0.0, 12.5),
    spn(173, "Engine Exhaust Gas Temperature", 65270, 6, 1, 16, 0.03125, -273.0, "deg C")
        .range(-273.0, 1734.96875),
    spn(112, "Engine Coolant Filter Differential Pressure", 65270, 8, 1, 8, 0.5, 0.0, "kPa")
        .range(0.0, 125.0),
    // VEP1
    spn(114, "Net Battery Current", 65271, 1, 1, 8, 1.0, -125.0, "A").range(-125.0, 125.0),
    spn(115, "Alternator Current", 65271, 2, 1, 8, 1.0, 0.0, "A").range(0.0, 250.0),
    spn(167, "Charging System Potential (Voltage)", 65271, 3, 1, 16, 0.05, 0.0, "V")
        .range(0.0, 3212.75),
    spn(168, "Battery Potential / Power Input 1", 65271, 5, 1, 16, 0.05, 0.0, "V")
        .range(0.0, 3212.75),
    spn(158, "Keyswitch Battery Potential", 65271, 7, 1, 16, 0.05, 0.0, "V").range(0.0, 3212.75),
    // DD
    spn(80, "Washer Fluid Level", 65276, 1, 1, 8, 0.4, 0.0, "%").range(0.0, 100.0),
    spn(96, "Fuel Level 1", 65276, 2, 1, 8, 0.4, 0.0, "%").range(0.0, 100.0),
    spn(95, "Engine Fuel Filter Differential Pressure", 65276, 3, 1, 8, 2.0, 0.0, "kPa")
        .range(0.0, 500.0),
    spn(99, "Engine Oil Filter Differential Pressure", 65276, 4, 1, 8, 0.5, 0.0, "kPa")
        .range(0.0, 125.0),
    spn(169, "Cargo Ambient Temperature", 65276, 5, 1, 16, 0.03125, -273.0, "deg C")
        .range(-273.0, 1734.96875),
    spn(38, "Fuel Level 2", 65276, 7, 1, 8, 0.4, 0.0, "%").range(0.0, 100.0),
];

impl From<&BuiltinPgn> for PgnDefinition {
    fn from(entry: &BuiltinPgn) -> Self {
        PgnDefinition {
            pgn: entry.pgn,
            name: entry.name.to_string(),
            acronym: entry.acronym.to_string(),
            length: entry.length,
            spns: entry.spns.to_vec(),
        }
    }
}

impl From<&BuiltinSpn> for SpnDefinition {
    fn from(entry: &BuiltinSpn) -> Self {
        let states = if entry.states.is_empty() {
            None
        } else {
            Some(
                entry
                    .states
                    .iter()
                    .map(|(raw, label)| (*raw, label.to_string()))
                    .collect(),
            )
        };
        SpnDefinition {
            spn: entry.spn,
            name: entry.name.to_string(),
            pgn: entry.pgn,
            start_byte: entry.start_byte,
            start_bit: entry.start_bit,
            bit_length: entry.bit_length,
            resolution: entry.resolution,
            offset: entry.offset,
            unit: entry.unit.to_string(),
            min_value: entry.min_value,
            max_value: entry.max_value,
            states,
        }
    }
}

impl SignalDatabase {
    /// Build an owned copy of the built-in J1939 dictionary
    pub fn builtin() -> Self {
        let mut db = SignalDatabase::new();
        for entry in PGNS {
            db.insert_pgn(entry.into());
        }
        for entry in SPNS {
            db.insert_spn(entry.into());
        }
        db
    }
}
