//! Connectivity monitor
//!
//! Turns the layered connectivity check into a bounded wait: one check per
//! attempt, a fixed sleep in between, and exactly one terminal outcome once
//! connectivity is back or the attempt budget is used up.

use crate::{
    config::PollPolicy,
    services::{
        connectivity::ConnectivityCheck,
        notification::{Notification, Notifier},
    },
};
use log::{error, info, warn};
use std::{future::Future, pin::pin, time::Duration};
use tokio::time::{Instant, sleep};

const BANNER: &str = "===============================================";

/// Terminal result of a monitor run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonitorOutcome {
    restored: bool,
    elapsed: Duration,
    attempts_used: u32,
    cancelled: bool,
}

impl MonitorOutcome {
    fn restored_after(elapsed: Duration, attempts_used: u32) -> Self {
        Self {
            restored: true,
            elapsed,
            attempts_used,
            cancelled: false,
        }
    }

    fn exhausted_after(elapsed: Duration, attempts_used: u32) -> Self {
        Self {
            restored: false,
            elapsed,
            attempts_used,
            cancelled: false,
        }
    }

    fn cancelled_after(elapsed: Duration, attempts_used: u32) -> Self {
        Self {
            restored: false,
            elapsed,
            attempts_used,
            cancelled: true,
        }
    }

    pub fn restored(&self) -> bool {
        self.restored
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Elapsed time in whole seconds, rounded down
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.as_secs()
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }
}

pub struct ConnectivityMonitor<C, N> {
    check: C,
    notifier: N,
    policy: PollPolicy,
}

impl<C, N> ConnectivityMonitor<C, N>
where
    C: ConnectivityCheck,
    N: Notifier,
{
    pub fn new(check: C, notifier: N, policy: PollPolicy) -> Self {
        Self {
            check,
            notifier,
            policy,
        }
    }

    /// Poll until connectivity is restored or the attempt budget is exhausted
    pub async fn wait_for_internet(&self) -> MonitorOutcome {
        self.wait_for_internet_until(std::future::pending()).await
    }

    /// Poll like [`Self::wait_for_internet`] but stop early once `cancel` completes
    ///
    /// Cancellation is observed while sleeping between attempts; a running check
    /// always finishes first. A cancelled run sends no notification.
    pub async fn wait_for_internet_until<F>(&self, cancel: F) -> MonitorOutcome
    where
        F: Future<Output = ()>,
    {
        let mut cancel = pin!(cancel);
        let max_attempts = self.policy.max_attempts();
        let start = Instant::now();
        let mut attempt = 0;

        info!("{BANNER}");
        info!("checking internet connection...");
        info!("{BANNER}");

        loop {
            attempt += 1;
            info!(
                "attempt {attempt}/{max_attempts} ({} seconds elapsed)...",
                start.elapsed().as_secs()
            );

            let result = self.check.check().await;
            let elapsed = start.elapsed();

            if result.reachable {
                let outcome = MonitorOutcome::restored_after(elapsed, attempt);
                if let Some(strategy) = result.strategy {
                    info!(
                        "connectivity confirmed by {strategy} probe in {} ms",
                        result.latency.as_millis()
                    );
                }
                info!("{BANNER}");
                info!("internet connection restored!");
                info!("total wait time: {} seconds", outcome.elapsed_seconds());
                info!("{BANNER}");

                self.dispatch(Notification::restored(outcome.elapsed_seconds()))
                    .await;
                return outcome;
            }

            if attempt >= max_attempts {
                let outcome = MonitorOutcome::exhausted_after(elapsed, attempt);
                error!("{BANNER}");
                error!(
                    "internet connection not restored after {} seconds!",
                    outcome.elapsed_seconds()
                );
                warn!("please check the modem manually.");
                error!("{BANNER}");

                self.dispatch(Notification::exhausted(outcome.elapsed_seconds()))
                    .await;
                return outcome;
            }

            tokio::select! {
                _ = sleep(self.policy.check_interval()) => {}
                _ = &mut cancel => {
                    warn!("connectivity monitor cancelled after {attempt} attempts");
                    return MonitorOutcome::cancelled_after(start.elapsed(), attempt);
                }
            }
        }
    }

    async fn dispatch(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!("failed to send notification: {e:#}");
        }
    }
}
