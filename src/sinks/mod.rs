//! Downstream sinks for readings
//!
//! Every successful reading is handed to [`SinkFanout::dispatch`], which
//! forwards it to the broker publisher first and the metrics recorder second.
//!
//! ```text
//! SensorReading → ReadingPublisher (mqtt | broadcast | webhook)
//!               → MetricsRecorder  (gauge exporter)
//! ```
//!
//! Sinks never report errors back to the caller: a failing publisher logs and
//! moves on. Network publishers are bounded by the poll timeout, so a slow
//! broker holds a device task for at most that long.

pub mod broadcast;
pub mod exporter;
pub mod mqtt;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::SensorReading;
use crate::config::PublisherConfig;

pub use broadcast::{BroadcastPublisher, ReadingEvent, log_readings};
pub use exporter::GaugeExporter;
pub use mqtt::MqttPublisher;
pub use webhook::WebhookPublisher;

/// Broker side of the fan-out
///
/// Must be safe to call from many device tasks at once.
#[async_trait]
pub trait ReadingPublisher: Send + Sync {
    async fn publish(&self, reading: &SensorReading);
}

/// Metrics side of the fan-out
#[async_trait]
pub trait MetricsRecorder: Send + Sync {
    async fn record(&self, name: &str, switch_state: bool, current: f64, power: f64, voltage: f64);
}

/// Forwards each reading to both sinks
#[derive(Clone)]
pub struct SinkFanout {
    publisher: Arc<dyn ReadingPublisher>,
    recorder: Arc<dyn MetricsRecorder>,
}

impl SinkFanout {
    pub fn new(publisher: Arc<dyn ReadingPublisher>, recorder: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            publisher,
            recorder,
        }
    }

    /// Publish, then record. The reading is consumed here.
    pub async fn dispatch(&self, reading: SensorReading) {
        self.publisher.publish(&reading).await;
        self.recorder
            .record(
                &reading.name,
                reading.switch,
                reading.current_ma,
                reading.power_w,
                reading.voltage_v,
            )
            .await;
        trace!("fanned out reading for {}", reading.name);
    }
}

/// Build the configured publisher
///
/// Returns the broadcast publisher alongside when that backend is selected so
/// callers can subscribe to it. `timeout` bounds each network publish.
pub fn build_publisher(
    config: &PublisherConfig,
    timeout: Duration,
) -> anyhow::Result<(Arc<dyn ReadingPublisher>, Option<BroadcastPublisher>)> {
    match config {
        PublisherConfig::Broadcast { capacity } => {
            let publisher = BroadcastPublisher::new(*capacity);
            Ok((Arc::new(publisher.clone()), Some(publisher)))
        }
        PublisherConfig::Webhook {
            url,
            topic,
            client_id,
            token,
        } => {
            let publisher = WebhookPublisher::new(
                url.clone(),
                topic.clone(),
                client_id.clone(),
                token.clone(),
                timeout,
            )?;
            Ok((Arc::new(publisher), None))
        }
        PublisherConfig::Mqtt(mqtt) => {
            let publisher = MqttPublisher::connect(mqtt, timeout)?;
            Ok((Arc::new(publisher), None))
        }
    }
}
