//! Cancellable periodic task runner.
//!
//! Background jobs (cache sweep, alert evaluation) implement [`PeriodicTask`]
//! and are started with [`spawn_periodic`]. The returned [`TaskHandle`] stops
//! the loop cleanly; a run that is already in progress is allowed to finish.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::utils::error::{Error, Result};

/// A unit of work executed on a fixed period
#[async_trait]
pub trait PeriodicTask: Send + Sync + 'static {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Execute one pass. Errors are logged by the scheduler and never stop the loop.
    async fn run_once(&self) -> Result<()>;
}

/// Handle to a running periodic task
pub struct TaskHandle {
    name: String,
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the background loop has exited
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal the loop to stop and wait for it to exit
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.join.await {
            if e.is_panic() {
                log::error!("periodic task '{}' panicked: {}", self.name, e);
            }
        }
    }
}

/// Spawn `task` on the tokio runtime, running it once every `period`.
///
/// The first run happens one full period after spawning. Ticks missed while a
/// long pass is still running are delayed rather than replayed in a burst.
pub fn spawn_periodic(task: Arc<dyn PeriodicTask>, period: Duration) -> Result<TaskHandle> {
    if period.is_zero() {
        return Err(Error::InvalidArgument(format!(
            "period for task '{}' must be greater than zero",
            task.name()
        )));
    }

    let name = task.name().to_string();
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let loop_name = name.clone();

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() completes its first tick immediately
        ticker.tick().await;

        log::info!("periodic task '{}' started (every {:?})", loop_name, period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = task.run_once().await {
                        log::warn!("periodic task '{}' failed: {}", loop_name, e);
                    }
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
        log::info!("periodic task '{}' stopped", loop_name);
    });

    Ok(TaskHandle { name, stop_tx, join })
}
