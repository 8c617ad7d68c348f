//! Decoding of Brewfather custom-stream readings.
//!
//! The relay this server stands in for posts a flat JSON object per reading.
//! Decoding is best effort: anything that doesn't look like a reading is
//! simply not reported.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One sensor reading as posted to `/stream?id=...`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamReading {
    pub name: String,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub temp_unit: Option<String>,
    #[serde(default)]
    pub gravity: Option<f64>,
    #[serde(default)]
    pub gravity_unit: Option<String>,
    /// Weeks since the sensor battery was replaced.
    #[serde(default)]
    pub battery: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StreamReading {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

/// Extracts the stream id from a `/stream?id=...` query string.
pub fn stream_id(query: Option<&str>) -> Option<&str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "id")
        .map(|(_, value)| value)
}
