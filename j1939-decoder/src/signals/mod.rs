//! Signal dictionary
//!
//! This module contains the PGN/SPN definition types, the merged signal
//! database, and the built-in J1939 tables.

pub mod builtin;
pub mod database;

// Re-export key types for convenience
pub use database::{
    DatabaseStats, PgnDefinition, SignalDatabase, SpnDefinition, MAX_PAYLOAD_LEN, MAX_PGN,
};
