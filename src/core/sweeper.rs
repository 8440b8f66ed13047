//! Background reservation expiry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument};

use crate::core::mapper::MapperShared;
use crate::core::MapperError;
use crate::util::clock::now_ms;

/// Handle to the running sweep loop.
pub(crate) struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn the loop on the current tokio runtime.
    pub(crate) fn spawn(shared: Arc<MapperShared>, interval: Duration) -> Result<Self, MapperError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MapperError::Runtime(format!("expiry sweeper needs a tokio runtime: {e}")))?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run(shared, interval, shutdown_rx));
        Ok(Self { shutdown, handle })
    }

    /// Signal the loop and wait until it has exited.
    pub(crate) async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "expiry sweeper terminated abnormally");
        }
    }
}

#[instrument(skip(shared, shutdown))]
async fn run(shared: Arc<MapperShared>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    info!(interval_ms = interval.as_millis(), "starting reservation expiry sweeper");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; sweep one interval after start.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let freed = shared.cleanup_expired_at(now_ms());
                debug!(freed, "expiry sweep complete");
            }
            changed = shutdown.changed() => {
                // A dropped sender means the mapper is gone.
                if changed.is_err() || *shutdown.borrow() {
                    info!("reservation expiry sweeper shutting down");
                    break;
                }
            }
        }
    }
}
