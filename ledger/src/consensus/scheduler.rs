//! Periodic block assembly.

use std::sync::Arc;
use std::time::Duration;

use slog::Logger;
use tokio::sync::mpsc;
use tokio::sync::{Notify, Semaphore};
use tokio::time::MissedTickBehavior;

use crate::chain::BlockProposer;
use crate::error::Error;

/// Default tick between block assemblies.
pub const DEFAULT_BLOCK_INTERVAL: Duration = Duration::from_secs(10);

/// Assembly failures tolerated before the scheduler gives up.
pub const DEFAULT_ERROR_THRESHOLD: u32 = 3;

/// Ticks a [`BlockProposer`] on a fixed interval.
///
/// Runs on every node; the proposer itself no-ops off-leader. A one-slot
/// semaphore keeps at most one assembly in flight, so a slow consensus
/// submission never races the next tick. Assembly runs on the blocking pool
/// and panics are caught there — they are logged and counted as failures,
/// never allowed to take the process down. Once the failure count reaches
/// the threshold the scheduler stops with an error; liveness of block
/// production is gone at that point and restarting is an operator decision.
pub struct BlockScheduler<P: BlockProposer + 'static> {
    proposer: Arc<P>,
    interval: Duration,
    error_threshold: u32,
    logger: Logger,
}

impl<P: BlockProposer + 'static> BlockScheduler<P> {
    pub fn new(proposer: Arc<P>, logger: Logger) -> Self {
        Self {
            proposer,
            interval: DEFAULT_BLOCK_INTERVAL,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            logger,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_error_threshold(mut self, threshold: u32) -> Self {
        self.error_threshold = threshold;
        self
    }

    /// Runs until `shutdown` fires or the error threshold is reached.
    pub async fn run(self, shutdown: Arc<Notify>) -> Result<(), Error> {
        let slot = Arc::new(Semaphore::new(1));
        let (err_tx, mut err_rx) = mpsc::channel::<Error>(8);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut failures = 0u32;

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    slog::info!(self.logger, "block scheduler shutting down");
                    return Ok(());
                }
                Some(err) = err_rx.recv() => {
                    failures += 1;
                    slog::error!(self.logger, "block assembly failed";
                        "error" => %err,
                        "failures" => failures,
                    );
                    if failures >= self.error_threshold {
                        return Err(Error::Consensus(
                            "block scheduler reached the error threshold".into(),
                        ));
                    }
                }
                _ = ticker.tick() => {
                    // Previous assembly still running: skip this tick.
                    let Ok(permit) = Arc::clone(&slot).try_acquire_owned() else {
                        continue;
                    };
                    let proposer = Arc::clone(&self.proposer);
                    let err_tx = err_tx.clone();
                    let logger = self.logger.clone();
                    tokio::spawn(async move {
                        let outcome =
                            tokio::task::spawn_blocking(move || proposer.propose_block()).await;
                        drop(permit);
                        match outcome {
                            Ok(Ok(())) => {}
                            Ok(Err(err)) => {
                                let _ = err_tx.send(err).await;
                            }
                            // spawn_blocking catches the panic for us.
                            Err(join_err) => {
                                slog::error!(logger, "block assembly panicked";
                                    "error" => %join_err,
                                );
                                let _ = err_tx
                                    .send(Error::Consensus(format!(
                                        "block assembly panicked: {join_err}"
                                    )))
                                    .await;
                            }
                        }
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    struct CountingProposer {
        calls: AtomicU32,
        fail: bool,
    }

    impl BlockProposer for CountingProposer {
        fn propose_block(&self) -> Result<(), Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::Consensus("submission timed out".into()))
            } else {
                Ok(())
            }
        }
    }

    struct PanickingProposer;

    impl BlockProposer for PanickingProposer {
        fn propose_block(&self) -> Result<(), Error> {
            panic!("assembly blew up");
        }
    }

    #[tokio::test]
    async fn stops_after_error_threshold() {
        let proposer = Arc::new(CountingProposer {
            calls: AtomicU32::new(0),
            fail: true,
        });
        let scheduler = BlockScheduler::new(Arc::clone(&proposer), test_logger())
            .with_interval(Duration::from_millis(10))
            .with_error_threshold(3);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            scheduler.run(Arc::new(Notify::new())),
        )
        .await
        .expect("scheduler should stop on its own");

        assert!(matches!(result, Err(Error::Consensus(_))));
        assert!(proposer.calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn shutdown_stops_a_healthy_scheduler() {
        let proposer = Arc::new(CountingProposer {
            calls: AtomicU32::new(0),
            fail: false,
        });
        let shutdown = Arc::new(Notify::new());
        let scheduler = BlockScheduler::new(Arc::clone(&proposer), test_logger())
            .with_interval(Duration::from_millis(10));

        let handle = tokio::spawn(scheduler.run(Arc::clone(&shutdown)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.notify_one();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler should honor shutdown")
            .unwrap();
        assert!(result.is_ok());
        assert!(proposer.calls.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn panics_are_recovered_and_counted() {
        let scheduler = BlockScheduler::new(Arc::new(PanickingProposer), test_logger())
            .with_interval(Duration::from_millis(10))
            .with_error_threshold(2);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            scheduler.run(Arc::new(Notify::new())),
        )
        .await
        .expect("panicking proposer must not hang the scheduler");
        assert!(matches!(result, Err(Error::Consensus(_))));
    }
}
