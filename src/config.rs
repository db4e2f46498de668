use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, trace};

/// Downstream publisher configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum PublisherConfig {
    /// In-process broadcast channel (default)
    Broadcast {
        #[serde(default = "default_channel_capacity")]
        capacity: usize,
    },

    /// MQTT broker; each reading is published as JSON to the topic
    Mqtt(MqttConfig),

    /// HTTP webhook receiving one JSON document per reading
    Webhook {
        url: String,
        #[serde(default = "default_topic")]
        topic: String,
        client_id: Option<String>,
        token: Option<String>,
    },
}

impl Default for PublisherConfig {
    fn default() -> Self {
        PublisherConfig::Broadcast {
            capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

fn default_topic() -> String {
    String::from("switch-scanner/readings")
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct MqttConfig {
    /// Broker host name or IP
    pub address: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    pub user: Option<String>,
    pub password: Option<String>,

    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,
}

impl MqttConfig {
    fn new(address: String) -> Self {
        Self {
            address,
            port: default_mqtt_port(),
            user: None,
            password: None,
            topic: default_topic(),
            client_id: default_client_id(),
        }
    }

    fn apply(&mut self, overrides: BrokerOverrides) {
        if let Some(address) = overrides.address {
            self.address = address;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if overrides.user.is_some() {
            self.user = overrides.user;
        }
        if overrides.password.is_some() {
            self.password = overrides.password;
        }
        if let Some(topic) = overrides.topic {
            self.topic = topic;
        }
        if let Some(client_id) = overrides.client_id {
            self.client_id = client_id;
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.address.trim().is_empty() {
            anyhow::bail!("MQTT broker address must not be empty");
        }
        if self.client_id.is_empty() || self.client_id.starts_with(' ') {
            anyhow::bail!("invalid MQTT client id '{}'", self.client_id);
        }
        if self.topic.is_empty() || self.topic.contains(['+', '#']) {
            anyhow::bail!("invalid MQTT topic '{}'", self.topic);
        }
        Ok(())
    }
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    String::from("switch-scanner")
}

/// Broker settings taken from the environment (`BROKER_*`, `CLIENT_ID`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrokerOverrides {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub topic: Option<String>,
    pub client_id: Option<String>,
}

impl BrokerOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ExporterConfig {
    /// Listen address for the exporter endpoint; falls back to the environment
    pub listen: Option<SocketAddr>,
}

impl ExporterConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        self.listen.unwrap_or_else(|| {
            SocketAddr::new(
                crate::util::get_exporter_addr().into(),
                crate::util::get_exporter_port(),
            )
        })
    }
}

/// A single device descriptor as found in the devices list
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct DeviceConfig {
    #[serde(rename = "gwId")]
    pub gw_id: String,
    pub key: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    /// Bridge base URL, overriding the global `bridge`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Seconds to sleep between rounds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Seconds each status request may take; defaults to `interval`
    pub timeout: Option<u64>,

    /// Default bridge base URL for devices without their own `address`
    pub bridge: Option<String>,

    #[serde(default)]
    pub devices: Vec<DeviceConfig>,

    /// Separate JSON array of device descriptors, merged after `devices`
    pub devices_file: Option<PathBuf>,

    pub publisher: Option<PublisherConfig>,

    /// Exporter endpoint settings (only used with the `api` feature)
    pub exporter: Option<ExporterConfig>,
}

fn default_interval() -> u64 {
    15
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(self.interval))
    }

    /// Replace interval and timeout with values taken from the environment
    pub fn apply_overrides(&mut self, interval: Option<u64>, timeout: Option<u64>) {
        if let Some(interval) = interval {
            debug!("interval overridden to {interval}s");
            self.interval = interval;
        }
        if let Some(timeout) = timeout {
            debug!("timeout overridden to {timeout}s");
            self.timeout = Some(timeout);
        }
    }

    /// Apply broker settings from the environment
    ///
    /// An MQTT publisher is created when none is configured and the
    /// environment names a broker address.
    pub fn apply_broker_overrides(&mut self, overrides: BrokerOverrides) {
        if overrides.is_empty() {
            return;
        }

        match self.publisher.take() {
            Some(PublisherConfig::Mqtt(mut mqtt)) => {
                debug!("broker settings overridden from environment");
                mqtt.apply(overrides);
                self.publisher = Some(PublisherConfig::Mqtt(mqtt));
            }
            None => match overrides.address.clone() {
                Some(address) => {
                    debug!("using MQTT broker {address} from environment");
                    let mut mqtt = MqttConfig::new(address);
                    mqtt.apply(overrides);
                    self.publisher = Some(PublisherConfig::Mqtt(mqtt));
                }
                None => debug!("broker settings without BROKER_ADDRESS are ignored"),
            },
            other => {
                debug!("broker settings ignored, publisher is not MQTT");
                self.publisher = other;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(PublisherConfig::Mqtt(mqtt)) = &self.publisher {
            mqtt.validate()?;
        }
        if self.interval == 0 {
            anyhow::bail!("polling interval must be at least one second");
        }
        if self.timeout == Some(0) {
            anyhow::bail!("timeout must be at least one second");
        }
        Ok(())
    }
}

pub fn read_devices_file(path: &Path) -> anyhow::Result<Vec<DeviceConfig>> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read devices file {}", path.display()))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid devices file {}", path.display()))
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file {path}"))?;
    let mut config: Config = serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided! ({e})"))?;

    if let Some(devices_file) = &config.devices_file {
        // relative paths are taken from the config file's directory
        let devices_path = match Path::new(path).parent() {
            Some(dir) if devices_file.is_relative() => dir.join(devices_file),
            _ => devices_file.clone(),
        };
        let extra = read_devices_file(&devices_path)?;
        config.devices.extend(extra);
    }

    config.apply_overrides(crate::util::get_interval(), crate::util::get_timeout());
    config.apply_broker_overrides(crate::util::get_broker_overrides());
    config.validate()?;

    trace!("loaded config: {config:?}");
    Ok(config)
}
