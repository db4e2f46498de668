pub mod config;
pub mod devices;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod sinks;
pub mod util;

#[cfg(feature = "api")]
pub mod api;

use serde::{Deserialize, Serialize};

/// Normalized telemetry for a single switch.
///
/// Power and voltage are already scaled to W and V; current stays in mA as
/// reported by the device. `state` keeps the raw status payload verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub name: String,
    pub switch: bool,
    pub current_ma: f64,
    pub power_w: f64,
    pub voltage_v: f64,
    pub state: String,
}
