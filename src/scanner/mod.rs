//! Round-based polling of every registered device
//!
//! ## Round lifecycle
//!
//! ```text
//!          ┌──────────────────────────────────────────────┐
//!          │ RoundScheduler                               │
//!          │                                              │
//!          │  JoinSet (fresh per round)                   │
//!          │   ├─ poll(device 1) ─┐                       │
//!          │   ├─ poll(device 2) ─┼─▶ join_next() barrier │
//!          │   └─ poll(device N) ─┘                       │
//!          │                 │                            │
//!          │                 ▼                            │
//!          │        sleep(interval) ─── next round        │
//!          └──────────────────────────────────────────────┘
//!
//! poll(device): refresh → get_status → parse → SinkFanout::dispatch
//! ```
//!
//! Failures never leave a device's task: the barrier only observes that the
//! task finished. A device failing in one round is polled again in the next.

pub mod poller;
pub mod scheduler;

pub use poller::{DevicePoller, PollOutcome};
pub use scheduler::{RoundReport, RoundScheduler};
