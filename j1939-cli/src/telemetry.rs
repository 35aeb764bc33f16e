//! Telemetry message parsing
//!
//! A message is one JSON object per tick: each CAN port maps to a list of
//! `{ "id": <u32>, "data": "<hex>" }` frames, and `ts` carries the device
//! timestamp in epoch seconds.
//!
//! ```json
//! { "ts": 1718000000.25, "can1": [ { "id": 217056256, "data": "3FFFCD883927F4FF" } ] }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use j1939_decoder::CanFrame;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One parsed telemetry message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryMessage {
    /// Device timestamp
    pub timestamp: Option<DateTime<Utc>>,
    /// Frames by port id
    pub ports: BTreeMap<String, Vec<CanFrame>>,
}

impl TelemetryMessage {
    /// Parse a message, keeping only the listed ports
    ///
    /// Frames without a numeric `id` or a string `data` are skipped.
    pub fn from_json_str(content: &str, ports: &[&str]) -> Result<Self> {
        let value: Value =
            serde_json::from_str(content).context("Telemetry message is not valid JSON")?;
        let obj = value
            .as_object()
            .context("Telemetry message must be a JSON object")?;

        let timestamp = obj.get("ts").and_then(Value::as_f64).and_then(epoch_to_datetime);

        let mut parsed = BTreeMap::new();
        for port in ports {
            let Some(Value::Array(items)) = obj.get(*port) else {
                continue;
            };
            let frames: Vec<CanFrame> = items.iter().filter_map(parse_frame).collect();
            if frames.len() < items.len() {
                log::debug!("{}: skipped {} incomplete frame(s)", port, items.len() - frames.len());
            }
            parsed.insert(port.to_string(), frames);
        }

        Ok(Self {
            timestamp,
            ports: parsed,
        })
    }

    /// Timestamp for display, or "-" when the message has none
    pub fn timestamp_display(&self) -> String {
        self.timestamp
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Load and parse a telemetry message file
pub fn load_message(path: &Path, ports: &[&str]) -> Result<TelemetryMessage> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read telemetry file: {:?}", path))?;
    TelemetryMessage::from_json_str(&content, ports)
        .with_context(|| format!("Failed to parse telemetry file: {:?}", path))
}

fn parse_frame(item: &Value) -> Option<CanFrame> {
    let id = item.get("id")?.as_u64().and_then(|id| u32::try_from(id).ok())?;
    let data = item.get("data")?.as_str()?;
    Some(CanFrame::new(id, data))
}

fn epoch_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}
