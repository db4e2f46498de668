use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use crate::devices::DeviceRegistry;
use crate::sinks::SinkFanout;

use super::poller::{DevicePoller, PollOutcome};

/// Outcome counts for one round, used for logging only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Poll tasks launched (always the registry size)
    pub launched: usize,
    pub published: usize,
    pub empty: usize,
    /// Status or parse failures, including tasks that panicked
    pub failed: usize,
}

impl RoundReport {
    fn tally(&mut self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Published => self.published += 1,
            PollOutcome::Empty => self.empty += 1,
            PollOutcome::StatusFailed | PollOutcome::ParseFailed => self.failed += 1,
        }
    }

    /// Number of tasks that finished, whatever their outcome
    pub fn completed(&self) -> usize {
        self.published + self.empty + self.failed
    }
}

/// Polls every registered device once per round, forever
///
/// The registry is enumerated once; all rounds poll exactly that set.
pub struct RoundScheduler {
    registry: DeviceRegistry,
    poller: Arc<DevicePoller>,
    interval: Duration,
}

impl RoundScheduler {
    pub fn new(
        registry: DeviceRegistry,
        fanout: SinkFanout,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            poller: Arc::new(DevicePoller::new(timeout, fanout)),
            interval,
        }
    }

    pub fn device_count(&self) -> usize {
        self.registry.len()
    }

    /// Run rounds until the process exits
    #[instrument(skip_all)]
    pub async fn run(self) {
        info!("number of devices found - {}", self.registry.len());
        debug!(
            "polling every {:?} with a {:?} timeout",
            self.interval,
            self.poller.timeout()
        );

        let mut round: u64 = 0;
        loop {
            round += 1;
            let report = self.run_round(round).await;

            info!(
                "round {round}: {} published, {} empty, {} failed",
                report.published, report.empty, report.failed
            );

            debug!("sleeping for {:?} ...", self.interval);
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Launch one poll task per device and wait for all of them
    ///
    /// A fresh `JoinSet` is used for every round, so no task of this round can
    /// outlive the call.
    #[instrument(skip(self))]
    pub async fn run_round(&self, round: u64) -> RoundReport {
        let mut tasks = JoinSet::new();

        for device in self.registry.iter() {
            let device = Arc::clone(device);
            let poller = Arc::clone(&self.poller);
            tasks.spawn(async move { poller.poll(device.as_ref()).await });
        }

        let mut report = RoundReport {
            launched: tasks.len(),
            ..Default::default()
        };

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(outcome) => report.tally(outcome),
                Err(e) => {
                    error!("poll task did not complete: {e}");
                    report.failed += 1;
                }
            }
        }

        report
    }
}
