//! Device registry and protocol client seam
//!
//! Every polled device is a [`SwitchDevice`] trait object. The concrete client
//! for each configured device is chosen once, when the [`DeviceRegistry`] is
//! built, so the polling loop never inspects device types.
//!
//! ```text
//! [DeviceConfig] --from_configs--> DeviceRegistry { Arc<dyn SwitchDevice>, ... }
//!                                        |
//!                                        v
//!                               RoundScheduler (read-only)
//! ```

pub mod bridge;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::DeviceConfig;
use crate::error::{DeviceResult, RegistryError};

pub use bridge::BridgeSwitch;

/// Protocol client for a single switch
///
/// Implementations must be `Send + Sync`; each call is made from the device's
/// own poll task.
#[async_trait]
pub trait SwitchDevice: Send + Sync {
    /// Opaque identity (gateway id)
    fn key(&self) -> &str;

    /// Display name used for logging and readings
    fn name(&self) -> &str;

    /// Ask the device to recompute its status
    ///
    /// A zero `timeout` means "trigger only": the request must still be sent
    /// before returning, but the client should not wait long for an answer.
    /// Nothing may keep running after the call returns.
    async fn refresh(&self, timeout: Duration) -> DeviceResult<()>;

    /// Fetch the current raw status payload, which may be empty
    async fn get_status(&self, timeout: Duration) -> DeviceResult<Vec<u8>>;
}

/// Device variants known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Switch,
}

impl DeviceKind {
    pub fn parse(device_type: &str) -> Option<Self> {
        match device_type.to_ascii_lowercase().as_str() {
            "switch" | "plug" | "outlet" => Some(DeviceKind::Switch),
            _ => None,
        }
    }
}

/// Immutable set of devices enumerated at startup
#[derive(Clone)]
pub struct DeviceRegistry {
    devices: Arc<[Arc<dyn SwitchDevice>]>,
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices.iter().map(|d| d.key()).collect::<Vec<_>>())
            .finish()
    }
}

impl DeviceRegistry {
    /// Build a registry from ready-made clients, rejecting duplicate keys
    pub fn new(devices: Vec<Arc<dyn SwitchDevice>>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for device in &devices {
            if !seen.insert(device.key().to_string()) {
                return Err(RegistryError::DuplicateKey(device.key().to_string()));
            }
        }

        Ok(Self {
            devices: devices.into(),
        })
    }

    /// Resolve every descriptor to a concrete client
    ///
    /// `bridge` is the fallback base URL for descriptors without an `address`.
    pub fn from_configs(
        configs: &[DeviceConfig],
        bridge: Option<&str>,
    ) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RegistryError::Client(e.to_string()))?;

        let mut devices: Vec<Arc<dyn SwitchDevice>> = Vec::with_capacity(configs.len());

        for config in configs {
            let Some(kind) = DeviceKind::parse(&config.device_type) else {
                return Err(RegistryError::UnsupportedType {
                    name: config.name.clone(),
                    device_type: config.device_type.clone(),
                });
            };

            let Some(address) = config.address.as_deref().or(bridge) else {
                return Err(RegistryError::MissingAddress(config.name.clone()));
            };

            match kind {
                DeviceKind::Switch => {
                    debug!("registering switch {} ({})", config.name, config.gw_id);
                    devices.push(Arc::new(BridgeSwitch::new(
                        client.clone(),
                        address,
                        config,
                    )));
                }
            }
        }

        Self::new(devices)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SwitchDevice>> {
        self.devices.iter()
    }
}
