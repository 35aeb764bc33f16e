//! Display metadata for signal keys

use serde::Serialize;
use std::collections::HashMap;

/// Physical quantity a signal measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Temperature,
    Speed,
    Duration,
    Volume,
    Voltage,
    Pressure,
    Current,
    Enum,
}

/// How successive values relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    /// Instantaneous reading
    Measurement,
    /// Cumulative counter that only grows (hours, fuel used, revolutions)
    TotalIncreasing,
}

/// Display metadata for one signal key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<DeviceClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<StateClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Choice list for enumerated signals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    /// Belongs to the diagnostic category rather than primary readings
    pub diagnostic: bool,
}

impl SignalMeta {
    /// Plain measurement metadata with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device_class: None,
            state_class: Some(StateClass::Measurement),
            unit: None,
            options: None,
            icon: None,
            diagnostic: false,
        }
    }

    /// Builder method: set the state class
    pub fn with_state_class(mut self, state_class: Option<StateClass>) -> Self {
        self.state_class = state_class;
        self
    }

    /// Builder method: set the icon hint
    pub fn with_icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Builder method: mark as diagnostic
    pub fn diagnostic(mut self) -> Self {
        self.diagnostic = true;
        self
    }

    /// True if the value is a monotonic running total
    pub fn is_cumulative(&self) -> bool {
        self.state_class == Some(StateClass::TotalIncreasing)
    }
}

/// Map a J1939 unit string to (device class, display unit, state class)
pub fn unit_mapping(unit: &str) -> Option<(Option<DeviceClass>, Option<&'static str>, StateClass)> {
    use DeviceClass::*;
    use StateClass::*;

    let mapping = match unit {
        "rpm" => (None, Some("rpm"), Measurement),
        "deg C" => (Some(Temperature), Some("°C"), Measurement),
        "km/h" => (Some(Speed), Some("km/h"), Measurement),
        "h" => (Some(Duration), Some("h"), TotalIncreasing),
        "L" => (Some(Volume), Some("L"), TotalIncreasing),
        "V" => (Some(Voltage), Some("V"), Measurement),
        "kPa" => (Some(Pressure), Some("kPa"), Measurement),
        "%" => (None, Some("%"), Measurement),
        "s" => (None, Some("s"), Measurement),
        "min" => (None, Some("min"), Measurement),
        "rev" => (None, Some("rev"), TotalIncreasing),
        "day" => (None, Some("day"), Measurement),
        "month" => (None, None, Measurement),
        "year" => (None, None, Measurement),
        "L/h" => (None, Some("L/h"), Measurement),
        "km/L" => (None, Some("km/L"), Measurement),
        "A" => (Some(Current), Some("A"), Measurement),
        _ => return None,
    };
    Some(mapping)
}

/// Caller-owned memoisation of metadata lookups
///
/// Resolution is pure, so entries never go stale for the decoder they were
/// resolved against. Drop the cache when the decoder is replaced.
#[derive(Debug, Default)]
pub struct SignalMetaCache {
    entries: HashMap<String, SignalMeta>,
}

impl SignalMetaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached metadata for `key`, resolving it on first use
    pub fn get_or_resolve<F>(&mut self, key: &str, resolve: F) -> &SignalMeta
    where
        F: FnOnce(&str) -> SignalMeta,
    {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| resolve(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
