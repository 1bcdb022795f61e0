//! Idle reaper - periodically evicts silent clients.
//!
//! The reaper holds no state of its own. Each tick it asks the coordinator
//! to scan the registry, so eviction is serialized with every other mutation.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::handle::CoordinatorHandle;

/// Spawns the reaper task.
///
/// Exits when the coordinator's shutdown token is cancelled or its command
/// channel closes.
pub fn spawn_reaper(
    coordinator: CoordinatorHandle,
    tick: Duration,
    idle_threshold: Duration,
) -> JoinHandle<()> {
    let shutdown = coordinator.shutdown_token();

    tokio::spawn(async move {
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Reaper stopping: coordinator shut down");
                    break;
                }

                _ = ticker.tick() => {
                    match coordinator.reap_idle(idle_threshold).await {
                        Ok(0) => {}
                        Ok(evicted) => debug!(evicted, "Reaper closed idle clients"),
                        Err(_) => {
                            debug!("Reaper stopping: coordinator channel closed");
                            break;
                        }
                    }
                }
            }
        }
    })
}
