//! In-process publisher backed by a tokio broadcast channel

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{info, trace, warn};

use crate::SensorReading;

use super::ReadingPublisher;

/// Event broadcast for every published reading
#[derive(Debug, Clone)]
pub struct ReadingEvent {
    pub reading: SensorReading,

    /// When the reading was published
    pub timestamp: DateTime<Utc>,
}

/// Publisher that fans readings out to in-process subscribers
///
/// The channel lags or drops events for slow subscribers; readings are
/// produced every round, so gaps are acceptable.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<ReadingEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReadingEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl ReadingPublisher for BroadcastPublisher {
    async fn publish(&self, reading: &SensorReading) {
        let event = ReadingEvent {
            reading: reading.clone(),
            timestamp: Utc::now(),
        };

        // Not having subscribers is fine
        match self.sender.send(event) {
            Ok(num_receivers) => {
                trace!("published reading to {num_receivers} receivers");
            }
            Err(_) => {
                trace!("no receivers for reading (this is OK)");
            }
        }
    }
}

/// Log every reading received on `receiver` until the channel closes
///
/// Used when no broker is configured, so readings are still visible. Returns
/// the number of readings logged.
pub async fn log_readings(mut receiver: broadcast::Receiver<ReadingEvent>) -> usize {
    let mut logged = 0;
    loop {
        match receiver.recv().await {
            Ok(event) => {
                let reading = &event.reading;
                info!(
                    "{} - switch: {}, current: {}mA, power: {}W, voltage: {}V",
                    reading.name, reading.switch, reading.current_ma, reading.power_w, reading.voltage_v
                );
                logged += 1;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("reading log fell behind, skipped {skipped} readings");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    logged
}
