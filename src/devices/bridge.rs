//! HTTP bridge client for switches
//!
//! The bridge exposes each paired device under its gateway id:
//!
//! - `POST {base}/devices/{gwId}/refresh` - trigger a data point refresh
//! - `GET  {base}/devices/{gwId}/status`  - current status payload
//!
//! Both requests carry the device's shared secret in `X-DEVICE-KEY`.
//!
//! A refresh with a zero timeout is a trigger: it is still sent from the
//! caller's task, but only waits [`TRIGGER_TIMEOUT`] for the bridge to answer.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, trace};

use crate::config::DeviceConfig;
use crate::error::{DeviceError, DeviceResult};

use super::SwitchDevice;

const KEY_HEADER: &str = "X-DEVICE-KEY";

/// How long a zero-timeout refresh waits for the bridge before giving up
pub const TRIGGER_TIMEOUT: Duration = Duration::from_millis(500);

pub struct BridgeSwitch {
    client: reqwest::Client,
    base_url: String,
    gw_id: String,
    key: String,
    name: String,
}

impl BridgeSwitch {
    pub fn new(client: reqwest::Client, base_url: &str, config: &DeviceConfig) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            gw_id: config.gw_id.clone(),
            key: config.key.clone(),
            name: config.name.clone(),
        }
    }

    fn url(&self, action: &str) -> String {
        format!("{}/devices/{}/{action}", self.base_url, self.gw_id)
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> DeviceError {
    if err.is_timeout() {
        DeviceError::Timeout(timeout)
    } else {
        DeviceError::from(err)
    }
}

#[async_trait]
impl SwitchDevice for BridgeSwitch {
    fn key(&self) -> &str {
        &self.gw_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(device = %self.name))]
    async fn refresh(&self, timeout: Duration) -> DeviceResult<()> {
        let timeout = if timeout.is_zero() {
            TRIGGER_TIMEOUT
        } else {
            timeout
        };

        let response = self
            .client
            .post(self.url("refresh"))
            .header(KEY_HEADER, &self.key)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        if !response.status().is_success() {
            return Err(DeviceError::Rejected(response.status().as_u16()));
        }

        trace!("refresh acknowledged");
        Ok(())
    }

    #[instrument(skip(self), fields(device = %self.name))]
    async fn get_status(&self, timeout: Duration) -> DeviceResult<Vec<u8>> {
        let response = self
            .client
            .get(self.url("status"))
            .header(KEY_HEADER, &self.key)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        if !response.status().is_success() {
            return Err(DeviceError::Rejected(response.status().as_u16()));
        }

        let body = response.bytes().await.map_err(|e| classify(e, timeout))?;

        trace!("received {} status bytes", body.len());
        Ok(body.to_vec())
    }
}
