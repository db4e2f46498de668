//! Status payload decoding
//!
//! Switches report telemetry as integer-keyed "data points" under a `dps`
//! object:
//!
//! ```text
//! {"dps": {"1": true, "18": 150, "19": 2300, "20": 2400}}
//! ```
//!
//! | index | meaning | raw unit     | canonical unit |
//! |-------|---------|--------------|----------------|
//! | 1     | switch  | bool         | bool           |
//! | 18    | current | mA           | mA             |
//! | 19    | power   | 0.1 W        | W              |
//! | 20    | voltage | 0.1 V        | V              |
//!
//! Missing indices decode to zero values. Other indices are ignored.

use serde::Deserialize;

use crate::SensorReading;
use crate::error::ParseError;

/// Power and voltage are reported in tenths of their unit
const TENTHS: f64 = 10.0;

#[derive(Debug, Default, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    dps: Option<DataPoints>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPoints {
    #[serde(rename = "1", default)]
    switch: Option<bool>,
    #[serde(rename = "18", default)]
    current: Option<f64>,
    #[serde(rename = "19", default)]
    power: Option<f64>,
    #[serde(rename = "20", default)]
    voltage: Option<f64>,
}

/// Decode a raw status payload into a [`SensorReading`] for `name`
pub fn parse_status(name: &str, raw: &[u8]) -> Result<SensorReading, ParseError> {
    let payload: StatusPayload = serde_json::from_slice(raw).map_err(ParseError::new)?;
    let dps = payload.dps.unwrap_or_default();

    Ok(SensorReading {
        name: name.to_string(),
        switch: dps.switch.unwrap_or_default(),
        current_ma: dps.current.unwrap_or_default(),
        power_w: dps.power.unwrap_or_default() / TENTHS,
        voltage_v: dps.voltage.unwrap_or_default() / TENTHS,
        state: String::from_utf8_lossy(raw).into_owned(),
    })
}
