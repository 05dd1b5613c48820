use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::scrape::{scrape_next_feed, AggregateError};
use crate::storage::Database;

/// Consecutive failed ticks that stop the scheduler
pub const FAILURE_THRESHOLD: u32 = 3;

/// Interval used by `agg` when none is given
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// `tokio::time::interval` rejects a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Too many consecutive errors ({failures}), stopping aggregation: {last}")]
    TooManyFailures {
        failures: u32,
        #[source]
        last: AggregateError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

/// Counts consecutive failures; any success resets it.
#[derive(Debug, Clone)]
pub struct FailureCounter {
    consecutive: u32,
    threshold: u32,
}

impl FailureCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Returns `true` once the threshold has been reached.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive >= self.threshold
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

impl Default for FailureCounter {
    fn default() -> Self {
        Self::new(FAILURE_THRESHOLD)
    }
}

/// Fixed-interval aggregation loop.
///
/// Each tick processes exactly one feed via [`scrape_next_feed`]. The first
/// tick fires immediately. Cancellation is observed only between ticks: a
/// fetch already in flight always runs to completion.
pub struct Scheduler {
    db: Database,
    client: reqwest::Client,
    interval: Duration,
    state: SchedulerState,
    failures: FailureCounter,
}

impl Scheduler {
    pub fn new(db: Database, client: reqwest::Client, interval: Duration) -> Self {
        Self {
            db,
            client,
            interval: interval.max(MIN_INTERVAL),
            state: SchedulerState::Stopped,
            failures: FailureCounter::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.consecutive()
    }

    /// Run until `shutdown` turns `true` or the failure threshold is hit.
    ///
    /// Returns `Ok(())` on cancellation and
    /// [`SchedulerError::TooManyFailures`] after [`FAILURE_THRESHOLD`]
    /// consecutive failed ticks. Dropping the sender without signalling
    /// never cancels.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), SchedulerError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.state = SchedulerState::Running;
        tracing::info!(interval = ?self.interval, "Aggregation started");

        while self.state == SchedulerState::Running {
            tokio::select! {
                biased;

                _ = cancelled(&mut shutdown) => {
                    tracing::info!("Aggregation finished");
                    self.state = SchedulerState::Stopped;
                }

                _ = ticker.tick() => {
                    self.tick().await?;
                }
            }
        }

        Ok(())
    }

    /// One unit of work plus the failure-counter transition.
    async fn tick(&mut self) -> Result<(), SchedulerError> {
        match scrape_next_feed(&self.db, &self.client).await {
            Ok(_) => {
                self.failures.record_success();
                Ok(())
            }
            Err(e) => {
                if self.failures.record_failure() {
                    self.state = SchedulerState::Stopped;
                    tracing::error!(
                        failures = self.failures.consecutive(),
                        error = %e,
                        "Too many consecutive errors, stopping aggregation"
                    );
                    return Err(SchedulerError::TooManyFailures {
                        failures: self.failures.consecutive(),
                        last: e,
                    });
                }
                tracing::warn!(
                    failures = self.failures.consecutive(),
                    threshold = FAILURE_THRESHOLD,
                    error = %e,
                    "Aggregation failed, trying again on next tick"
                );
                Ok(())
            }
        }
    }
}

/// Resolves once the flag is `true`; pends forever if the sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
