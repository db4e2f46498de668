//! Gauge exporter
//!
//! Keeps the latest value of every gauge per device and renders them in the
//! Prometheus text exposition format. Values are overwritten on every record,
//! nothing is aggregated.

use std::collections::BTreeMap;
use std::fmt::Write;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use super::MetricsRecorder;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Gauges {
    switch_state: bool,
    current: f64,
    power: f64,
    voltage: f64,
}

const GAUGES: [(&str, &str); 4] = [
    ("switch_state", "Relay state of the switch (1 = on)"),
    ("switch_current_milliamps", "Current drawn through the switch in mA"),
    ("switch_power_watts", "Power drawn through the switch in W"),
    ("switch_voltage_volts", "Supply voltage measured by the switch in V"),
];

#[derive(Debug, Default)]
pub struct GaugeExporter {
    gauges: RwLock<BTreeMap<String, Gauges>>,
}

impl GaugeExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of devices that have reported at least once
    pub async fn device_count(&self) -> usize {
        self.gauges.read().await.len()
    }

    /// Render all gauges, devices sorted by name
    pub async fn render(&self) -> String {
        let gauges = self.gauges.read().await;
        let mut out = String::new();

        for (index, (metric, help)) in GAUGES.iter().enumerate() {
            let _ = writeln!(out, "# HELP {metric} {help}");
            let _ = writeln!(out, "# TYPE {metric} gauge");

            for (device, values) in gauges.iter() {
                let value = match index {
                    0 => f64::from(u8::from(values.switch_state)),
                    1 => values.current,
                    2 => values.power,
                    _ => values.voltage,
                };
                let _ = writeln!(
                    out,
                    "{metric}{{device=\"{}\"}} {value}",
                    escape_label(device)
                );
            }
        }

        out
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[async_trait]
impl MetricsRecorder for GaugeExporter {
    async fn record(&self, name: &str, switch_state: bool, current: f64, power: f64, voltage: f64) {
        let mut gauges = self.gauges.write().await;
        gauges.insert(
            name.to_string(),
            Gauges {
                switch_state,
                current,
                power,
                voltage,
            },
        );
        trace!("recorded gauges for {name}");
    }
}
