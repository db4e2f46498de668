use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{error, instrument, trace};

use crate::SensorReading;

use super::ReadingPublisher;

/// Publisher posting each reading as JSON to a broker's HTTP ingest endpoint
#[derive(Debug, Clone)]
pub struct WebhookPublisher {
    client: Client,
    url: String,
    topic: String,
    client_id: Option<String>,
    token: Option<String>,
}

impl WebhookPublisher {
    pub fn new(
        url: String,
        topic: String,
        client_id: Option<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            url,
            topic,
            client_id,
            token,
        })
    }
}

#[async_trait]
impl ReadingPublisher for WebhookPublisher {
    #[instrument(skip_all, fields(device = %reading.name))]
    async fn publish(&self, reading: &SensorReading) {
        let payload = json!({
            "topic": self.topic,
            "client_id": self.client_id,
            "timestamp": Utc::now().to_rfc3339(),
            "reading": reading,
        });

        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                if response.status().is_success() {
                    trace!("published reading to {}", self.url);
                } else {
                    error!("publishing reading failed with status: {}", response.status());
                }
            }
            Err(e) => {
                error!("failed to publish reading: {}", e);
            }
        }
    }
}
