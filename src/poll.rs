use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::store::{OrderStore, SessionStore};

/// Refreshes the order lists and stats forever. The first tick fires
/// immediately; per-tick failures live in the store's error slots.
pub async fn run_order_refresh(store: Arc<OrderStore>, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "order refresh loop started");

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        store.refresh_all().await;
        debug!(
            pending = store.pending().len(),
            assigned = store.assigned().len(),
            "order lists refreshed"
        );
    }
}

/// Reports the courier's position forever. The source is pluggable because
/// device GPS acquisition lives outside this crate; a tick without a fix is
/// skipped.
pub async fn run_location_tracking<F>(session: Arc<SessionStore>, source: F, interval: Duration)
where
    F: Fn() -> Option<(f64, f64)> + Send,
{
    info!(
        interval_secs = interval.as_secs(),
        "location tracking loop started"
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        let Some((latitude, longitude)) = source() else {
            debug!("no location fix; skipping report");
            continue;
        };

        if !session.update_location(latitude, longitude).await {
            warn!(latitude, longitude, "location report failed");
        }
    }
}
