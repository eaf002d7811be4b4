//! Cancellable periodic tasks
//!
//! Runs a closure on a fixed interval until cancelled. The binaries use it for
//! the client's polling loop and the agent's stats heartbeat.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct PeriodicTask {
    name: String,
    token: CancellationToken,
    handle: JoinHandle<u64>,
}

impl PeriodicTask {
    /// Spawns `tick`, called with the 1-based tick number. The first tick fires
    /// one `period` after spawning. Ticks never overlap; a slow tick delays the
    /// next one instead of bunching them up.
    pub fn spawn<F, Fut>(name: impl Into<String>, period: Duration, tick: F) -> Self
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_with_token(name, period, CancellationToken::new(), tick)
    }

    /// Like `spawn`, stopping when `token` (or a parent of it) is cancelled.
    pub fn spawn_with_token<F, Fut>(
        name: impl Into<String>,
        period: Duration,
        token: CancellationToken,
        mut tick: F,
    ) -> Self
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let task_token = token.clone();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut count = 0u64;

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = interval.tick() => {
                        count += 1;
                        tick(count).await;
                    }
                }
            }

            debug!("Periodic task '{}' stopped after {} ticks", task_name, count);
            count
        });

        Self {
            name,
            token,
            handle,
        }
    }

    /// Cancels the task and waits for it, returning how many ticks ran.
    pub async fn stop(self) -> u64 {
        self.token.cancel();
        match self.handle.await {
            Ok(count) => count,
            Err(e) => {
                warn!("Periodic task '{}' ended abnormally: {}", self.name, e);
                0
            }
        }
    }
}
