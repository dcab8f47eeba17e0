//! Background eviction of expired sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::store::SessionStore;

/// Periodically sweeps the session store until told to stop.
pub struct SessionSweeper {
    store: Arc<dyn SessionStore>,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl SessionSweeper {
    pub fn new(store: Arc<dyn SessionStore>, interval: Duration) -> Self {
        Self {
            store,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Sweep on every tick, starting immediately. Returns on shutdown.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.store.sweep_expired(Utc::now()).await;
                    if evicted > 0 {
                        info!(evicted, remaining = self.store.len(), "Expired sessions evicted");
                    } else {
                        debug!(remaining = self.store.len(), "Expiry sweep found nothing");
                    }
                }
                _ = self.shutdown.notified() => {
                    debug!("Session sweeper stopped");
                    return;
                }
            }
        }
    }

    /// Signal the sweeper to stop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
