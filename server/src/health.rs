//! Periodic eviction of dead connections
//!
//! The monitor only inspects the liveness flag each agent's own I/O clears on
//! failure; it never pings peers. It catches connections whose writer failed
//! while their reader is still blocked waiting for input.

use crate::network::ServerState;
use log::warn;
use shared::PlayerId;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Backstop that evicts connections whose own loop has already failed
pub struct HealthMonitor {
    state: Arc<ServerState>,
    period: Duration,
}

impl HealthMonitor {
    /// Creates a monitor that sweeps every `period`
    pub fn new(state: Arc<ServerState>, period: Duration) -> Self {
        Self { state, period }
    }

    /// Evicts every agent currently marked dead; returns their identifiers
    pub async fn sweep(&self) -> Vec<PlayerId> {
        let dead = self.state.broadcaster.dead_agents().await;
        for id in &dead {
            warn!("Evicting unresponsive player {}", id);
            if let Some(departure) = self.state.evict(*id).await {
                if departure.released > 0 {
                    warn!(
                        "Released {} tiles held by player {}",
                        departure.released, id
                    );
                }
            }
        }
        dead
    }

    /// Runs `sweep` on a fixed period until the task is aborted
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // Skip the first tick since it fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }
}
