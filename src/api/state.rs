use std::sync::Arc;

use crate::sinks::GaugeExporter;

/// Shared state passed to exporter handlers
#[derive(Clone)]
pub struct ExporterState {
    pub exporter: Arc<GaugeExporter>,

    /// Devices in the registry, fixed at startup
    pub devices: usize,
}

impl ExporterState {
    pub fn new(exporter: Arc<GaugeExporter>, devices: usize) -> Self {
        Self { exporter, devices }
    }
}
