//! Ladder Driver
//!
//! Timer loop that runs one reconciliation tick per interval until the
//! shutdown token is cancelled. A tick in progress always completes; the
//! token is only observed between ticks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{BrokerGateway, InstrumentStore};
use crate::application::use_cases::LadderEngine;

/// Configuration for the ladder driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderDriverConfig {
    /// Time between tick starts.
    pub interval: Duration,
}

impl Default for LadderDriverConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// Drives [`LadderEngine::reconcile`] on a fixed interval.
pub struct LadderDriver<B, S>
where
    B: BrokerGateway + 'static,
    S: InstrumentStore + 'static,
{
    engine: Arc<LadderEngine<B, S>>,
    config: LadderDriverConfig,
    shutdown: CancellationToken,
}

impl<B, S> LadderDriver<B, S>
where
    B: BrokerGateway + 'static,
    S: InstrumentStore + 'static,
{
    /// Create a new driver.
    pub const fn new(
        engine: Arc<LadderEngine<B, S>>,
        config: LadderDriverConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            config,
            shutdown,
        }
    }

    /// Run the loop on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the loop until cancelled, then save the book one last time.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "Ladder driver started"
        );

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    tracing::info!("Ladder driver shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.engine.reconcile(Utc::now()).await;
                    if report.submitted_count() > 0 || report.failed_count() > 0 {
                        tracing::info!(
                            tick = report.tick,
                            submitted = report.submitted_count(),
                            failed = report.failed_count(),
                            skipped = report.skipped_count(),
                            "Reconciliation tick completed"
                        );
                    }
                }
            }
        }

        if !self.engine.persist_and_publish(Utc::now()).await {
            tracing::error!("Final save before shutdown failed");
        }
        tracing::info!("Ladder driver stopped");
    }
}
