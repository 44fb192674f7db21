use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use common::{Error, ScanSummary};

use crate::Scanner;

/// Fires a scanner once at start and then every `interval`.
///
/// Ticks missed while a pass overruns are skipped, never replayed, so
/// passes neither overlap nor burst to catch up.
pub struct ScanScheduler {
    scanner: Arc<Scanner>,
    interval: Duration,
}

impl ScanScheduler {
    pub fn new(scanner: Arc<Scanner>) -> Self {
        let interval = scanner.settings().interval;
        Self { scanner, interval }
    }

    /// Run forever. Call from `tokio::spawn`.
    pub async fn run(self) {
        let name = self.scanner.settings().name.clone();
        info!(name = %name, interval_secs = self.interval.as_secs(), "Scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // first tick completes immediately
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// One scheduled pass. Failures are logged; the schedule carries on.
    pub async fn run_once(&self) -> Option<ScanSummary> {
        match self.scanner.run_scan().await {
            Ok(summary) => Some(summary),
            Err(Error::ScanInProgress(name)) => {
                warn!(name = %name, "Previous pass still running, tick skipped");
                None
            }
            Err(e) => {
                error!(
                    name = %self.scanner.settings().name,
                    class = e.class(),
                    error = %e,
                    "Scan pass failed"
                );
                None
            }
        }
    }
}
