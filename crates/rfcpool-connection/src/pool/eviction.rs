//! Background eviction of idle connections

use std::sync::Weak;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::pool::PoolInner;

/// Spawn the periodic eviction task for a pool.
///
/// The task holds only a weak reference, so it ends on its own once every
/// pool handle is gone, or as soon as `shutdown` is cancelled. Ticks run
/// one after another, never overlapping.
pub(super) fn spawn_evictor(
    pool: Weak<PoolInner>,
    period: Duration,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(inner) = pool.upgrade() else {
                break;
            };
            let evicted = inner.evict_expired();
            if evicted > 0 {
                tracing::debug!(evicted, "evicted idle connections");
            }
        }

        tracing::trace!("eviction task stopped");
    });
}
