//! Periodic replay of the search outbox.
//!
//! Index writes that failed after their row commit are parked in
//! `search_outbox`; this loop replays them until the provider accepts them.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::services::SearchSync;

/// Entries replayed per tick.
const BATCH_SIZE: i64 = 100;

/// Run the reconcile loop every `interval` until `cancel` is triggered.
pub async fn run(sync: Arc<SearchSync>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        batch_size = BATCH_SIZE,
        "Search reconciler started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Search reconciler stopping");
                break;
            }
            _ = ticker.tick() => {
                match sync.reconcile_pending(BATCH_SIZE).await {
                    Ok(report) if report.failed > 0 => {
                        tracing::warn!(
                            replayed = report.replayed,
                            failed = report.failed,
                            "Search reconciler: some entries still pending"
                        );
                    }
                    Ok(_) => {
                        tracing::debug!("Search reconciler: tick complete");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Search reconciler: replay failed");
                    }
                }
            }
        }
    }
}
