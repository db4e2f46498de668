use std::time::Duration;

use tracing::{error, instrument, trace, warn};

use crate::devices::SwitchDevice;
use crate::error::DeviceError;
use crate::parser::parse_status;
use crate::sinks::SinkFanout;

/// What happened to a device during one round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A reading was parsed and handed to the sinks
    Published,

    /// The device had nothing to report
    Empty,

    /// The status request failed or timed out
    StatusFailed,

    /// The status payload could not be decoded
    ParseFailed,
}

/// Runs the refresh / get-status exchange for one device
pub struct DevicePoller {
    timeout: Duration,
    fanout: SinkFanout,
}

impl DevicePoller {
    pub fn new(timeout: Duration, fanout: SinkFanout) -> Self {
        Self { timeout, fanout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll a single device
    ///
    /// Every failure is logged here and reflected in the outcome; nothing is
    /// propagated to the caller.
    #[instrument(skip_all, fields(device = %device.name()))]
    pub async fn poll(&self, device: &dyn SwitchDevice) -> PollOutcome {
        // Refresh is only a trigger; its failure does not stop the status request.
        // The outer bound keeps a client that ignores the zero timeout in check.
        match tokio::time::timeout(self.timeout, device.refresh(Duration::ZERO)).await {
            Ok(Ok(())) => trace!("refresh sent"),
            Ok(Err(e)) => warn!("{} - refresh failed: {e}", device.name()),
            Err(_) => warn!(
                "{} - refresh failed: {}",
                device.name(),
                DeviceError::Timeout(self.timeout)
            ),
        }

        let status = match tokio::time::timeout(self.timeout, device.get_status(self.timeout)).await
        {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                error!("{} - status request failed: {e}", device.name());
                return PollOutcome::StatusFailed;
            }
            Err(_) => {
                error!(
                    "{} - status request failed: {}",
                    device.name(),
                    DeviceError::Timeout(self.timeout)
                );
                return PollOutcome::StatusFailed;
            }
        };

        if status.is_empty() {
            trace!("empty status, nothing to report");
            return PollOutcome::Empty;
        }

        let reading = match parse_status(device.name(), &status) {
            Ok(reading) => reading,
            Err(e) => {
                error!("{} - error parsing sensor data: {e}", device.name());
                return PollOutcome::ParseFailed;
            }
        };

        trace!("parsed reading: {reading:?}");
        self.fanout.dispatch(reading).await;

        PollOutcome::Published
    }
}
