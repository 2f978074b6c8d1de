use std::sync::Arc;
use std::time::Duration;

use loginguard_core::{Clock, LoginThrottle};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Runs [`LoginThrottle::sweep`] every `period` for the lifetime of the process.
pub fn spawn_sweeper<C>(throttle: Arc<LoginThrottle<C>>, period: Duration) -> JoinHandle<()>
where
    C: Clock + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let evicted = throttle.sweep();
            if evicted > 0 {
                tracing::info!(
                    "Swept {evicted} idle login records ({} still tracked)",
                    throttle.len()
                );
            }
        }
    })
}
