//! Recurring background work.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// A task that runs a closure on a fixed period until shut down.
///
/// Missed ticks are skipped rather than bursted, so a slow run never causes a
/// pile-up of back-to-back runs.
pub struct PeriodicTask {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawns the task. With `run_immediately` the first run happens right
    /// away, otherwise after one `period`.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, run_immediately: bool, mut run: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let start = if run_immediately {
                Instant::now()
            } else {
                Instant::now() + period
            };
            let mut interval_timer = tokio::time::interval_at(start, period);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        debug!("Running periodic task {}", name);
                        run().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            debug!("Periodic task {} handle dropped, stopping", name);
                            break;
                        }
                        if *shutdown_rx.borrow() {
                            info!("Periodic task {} shutting down", name);
                            break;
                        }
                    }
                }
            }
        });

        Self {
            name,
            shutdown_tx,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals shutdown and waits for the current run, if any, to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}
