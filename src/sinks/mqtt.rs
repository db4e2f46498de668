//! MQTT broker publisher
//!
//! ```text
//! publish() --(bounded request queue)--> connection task --TCP--> broker
//! ```
//!
//! The connection task owns the `rumqttc` event loop and reconnects on its
//! own; device tasks only ever enqueue, bounded by the publish timeout.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, trace, warn};

use crate::SensorReading;
use crate::config::MqttConfig;

use super::ReadingPublisher;

/// Publishes waiting for the connection task before callers start blocking
const REQUEST_CAPACITY: usize = 64;

const KEEP_ALIVE: Duration = Duration::from_secs(30);

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct MqttPublisher {
    client: AsyncClient,
    topic: String,
    timeout: Duration,
    connection: JoinHandle<()>,
}

impl MqttPublisher {
    /// Create the client and start driving its connection in the background
    ///
    /// The broker is contacted lazily, so an unreachable broker does not stop
    /// startup; it shows up as logged connection errors instead.
    pub fn connect(config: &MqttConfig, timeout: Duration) -> anyhow::Result<Self> {
        if config.client_id.is_empty() || config.client_id.starts_with(' ') {
            anyhow::bail!("invalid MQTT client id '{}'", config.client_id);
        }

        let mut options =
            MqttOptions::new(config.client_id.clone(), config.address.clone(), config.port);
        options.set_keep_alive(KEEP_ALIVE);
        if let Some(user) = &config.user {
            options.set_credentials(user.clone(), config.password.clone().unwrap_or_default());
        }

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let broker = format!("{}:{}", config.address, config.port);
        let connection = tokio::spawn(drive_connection(event_loop, broker));

        Ok(Self {
            client,
            topic: config.topic.clone(),
            timeout,
            connection,
        })
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

async fn drive_connection(mut event_loop: EventLoop, broker: String) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("connected to MQTT broker at {broker}");
            }
            Ok(event) => trace!("mqtt event: {event:?}"),
            Err(e) => {
                warn!("MQTT connection to {broker} failed: {e}");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[async_trait]
impl ReadingPublisher for MqttPublisher {
    #[instrument(skip_all, fields(device = %reading.name))]
    async fn publish(&self, reading: &SensorReading) {
        let payload = match serde_json::to_vec(reading) {
            Ok(payload) => payload,
            Err(e) => {
                error!("failed to encode reading: {e}");
                return;
            }
        };

        let publish = self
            .client
            .publish(self.topic.clone(), QoS::AtLeastOnce, false, payload);

        match tokio::time::timeout(self.timeout, publish).await {
            Ok(Ok(())) => trace!("queued reading for {}", self.topic),
            Ok(Err(e)) => error!("failed to publish reading: {e}"),
            Err(_) => error!("publishing reading timed out after {:?}", self.timeout),
        }
    }
}
