//! Periodic refresh of every target.
//!
//! Each tick spawns one task per target and moves on without waiting for
//! them. A task asks for a fresh scan; if the observatory rate limits that
//! request it falls back once to the observatory's most recent result. Any
//! remaining failure is logged and the target keeps its previous cache entry.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::cache::Cache;
use crate::collector::ObservatoryClient;
use crate::error::ObservatoryError;
use crate::Target;

/// Which request produced a cached result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// The forced rescan succeeded.
    Rescanned,
    /// The rescan was rate limited and the observatory's latest result was used.
    Cached,
}

pub struct Scheduler {
    client: Arc<ObservatoryClient>,
    cache: Arc<Cache>,
    targets: Vec<Target>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        client: Arc<ObservatoryClient>,
        cache: Arc<Cache>,
        targets: Vec<Target>,
        interval: Duration,
    ) -> Self {
        Scheduler {
            client,
            cache,
            targets,
            interval,
        }
    }

    /// Runs the refresh loop on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Ticks forever. The first tick fires immediately.
    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            info!(targets = self.targets.len(), "Refreshing observatory results");
            self.dispatch();
        }
    }

    /// Starts one refresh task per target and returns without awaiting them.
    pub fn dispatch(&self) -> Vec<JoinHandle<()>> {
        self.targets
            .iter()
            .cloned()
            .map(|target| {
                let client = Arc::clone(&self.client);
                let cache = Arc::clone(&self.cache);
                tokio::spawn(async move {
                    match refresh_target(&client, &cache, &target).await {
                        Ok(Refresh::Rescanned) => info!(host = %target, "Updated result"),
                        Ok(Refresh::Cached) => {
                            info!(host = %target, "Updated result from observatory cache")
                        }
                        Err(e) => warn!(host = %target, error = %e, "Failed to get result"),
                    }
                })
            })
            .collect()
    }
}

/// Scrapes `target` once and stores the result.
///
/// A rate-limited rescan is retried a single time without forcing a rescan.
/// On error the cache is left untouched.
pub async fn refresh_target(
    client: &ObservatoryClient,
    cache: &Cache,
    target: &Target,
) -> Result<Refresh, ObservatoryError> {
    let (metrics, refresh) = match client.scrape(target, true).await {
        Ok(metrics) => (metrics, Refresh::Rescanned),
        Err(e) if e.is_rate_limited() => {
            info!(host = %target, "Rescan rate limited, falling back to latest result");
            (client.scrape(target, false).await?, Refresh::Cached)
        }
        Err(e) => return Err(e),
    };

    cache.write(target.clone(), metrics);
    Ok(refresh)
}
