//! Manufacturer profiles
//!
//! Discovery and loading of profile files, and the J1939 overlay that merges
//! validated profile definitions onto the built-in dictionary.

pub mod loader;
pub mod overlay;

pub use loader::{discover_profiles, load_profile, profile_display_map, Profile};
pub use overlay::{merge_j1939_databases, parse_j1939_profile, J1939Overlay, MergedDictionary};
