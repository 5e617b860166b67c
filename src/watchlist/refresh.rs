// =============================================================================
// Watchlist refresh orchestration — the C7 entry point
// =============================================================================
//
// Grounded on monitor-service/watchlist_refresh.py::refresh_watchlist. Loads
// every active item, runs the funnel concurrently, derives the UI status,
// partitions FAIL+non-favourite items to the archive, and persists both
// sets in bulk. This is what `POST /monitor/internal/watchlist/refresh-status`
// and the daily beat schedule (§6, `WATCHLIST_REFRESH_CRON_HOUR_UTC`) call.
// =============================================================================

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use crate::data_access::DataAccess;
use crate::models::{LastRefreshStatus, WatchlistItem};

use super::funnel::WatchlistFunnel;
use super::status::derive_status;
use super::store::WatchlistStore;

const REFRESH_CONCURRENCY: usize = 16;

#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub message: String,
    pub updated_items: usize,
    pub archived_items: usize,
    pub failed_items: usize,
}

pub struct WatchlistRefreshEngine {
    store: WatchlistStore,
    funnel: WatchlistFunnel,
}

impl WatchlistRefreshEngine {
    pub fn new(store: WatchlistStore, data_access: Arc<DataAccess>) -> Self {
        WatchlistRefreshEngine { store, funnel: WatchlistFunnel::new(data_access) }
    }

    /// Thin pass-throughs so the monitor routes (§6) don't need direct
    /// access to the store — `AppState` only holds this engine.
    pub async fn store_snapshot(&self) -> anyhow::Result<Vec<WatchlistItem>> {
        self.store.all_active().await
    }

    pub async fn item_exists(&self, user_id: &str, ticker: &str) -> anyhow::Result<bool> {
        Ok(self.store.find_active(user_id, ticker).await?.is_some())
    }

    pub async fn upsert_item(&self, item: &WatchlistItem) -> anyhow::Result<()> {
        self.store.upsert_active(item).await
    }

    pub async fn delete_archived(&self, user_id: &str, ticker: &str) -> anyhow::Result<bool> {
        self.store.delete_archived(user_id, ticker).await
    }

    pub async fn refresh_all(&self) -> anyhow::Result<RefreshSummary> {
        let items = self.store.all_active().await?;
        if items.is_empty() {
            return Ok(RefreshSummary {
                message: "no active watchlist items to refresh".to_string(),
                updated_items: 0,
                archived_items: 0,
                failed_items: 0,
            });
        }

        let sample: Vec<&str> = items.iter().take(5).map(|i| i.ticker.as_str()).collect();
        info!(count = items.len(), sample = ?sample, "starting watchlist refresh");

        let funnel = &self.funnel;
        let refreshed: Vec<(WatchlistItem, bool)> = stream::iter(items.into_iter().map(|item| async move { funnel.refresh_one(item).await }))
            .buffer_unordered(REFRESH_CONCURRENCY)
            .collect()
            .await;

        let mut failed_downstream_tickers = HashSet::new();
        let mut to_update = Vec::new();
        let mut to_archive = Vec::new();

        for (mut item, downstream_failed) in refreshed {
            if downstream_failed {
                failed_downstream_tickers.insert(item.ticker.clone());
                item.last_refresh_status = LastRefreshStatus::Unknown;
            }
            item.status = derive_status(&item);

            let should_archive = item.last_refresh_status == LastRefreshStatus::Fail && !item.is_favourite;
            if should_archive {
                to_archive.push(item);
            } else {
                to_update.push(item);
            }
        }

        for item in &to_update {
            if let Err(e) = self.store.upsert_active(item).await {
                warn!(ticker = %item.ticker, error = %e, "failed to persist watchlist item update");
            }
        }

        let mut archived_count = 0usize;
        for item in to_archive {
            let ticker = item.ticker.clone();
            match self.store.archive(item).await {
                Ok(()) => archived_count += 1,
                Err(e) => warn!(ticker = %ticker, error = %e, "failed to archive watchlist item"),
            }
        }

        let summary = RefreshSummary {
            message: format!(
                "refreshed {} watchlist item(s): {} updated, {} archived, {} downstream failure(s) (sample: {})",
                to_update.len() + archived_count,
                to_update.len(),
                archived_count,
                failed_downstream_tickers.len(),
                sample.join(", "),
            ),
            updated_items: to_update.len(),
            archived_items: archived_count,
            failed_items: failed_downstream_tickers.len(),
        };
        info!(updated = summary.updated_items, archived = summary.archived_items, failed = summary.failed_items, "watchlist refresh complete");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WatchlistStatus;

    #[test]
    fn partition_rule_sends_non_favourite_failures_to_archive() {
        let mut fail_non_fav = WatchlistItem::new("u1", "ZZZZ");
        fail_non_fav.last_refresh_status = LastRefreshStatus::Fail;
        fail_non_fav.is_favourite = false;
        assert!(fail_non_fav.last_refresh_status == LastRefreshStatus::Fail && !fail_non_fav.is_favourite);

        let mut fail_fav = WatchlistItem::new("u1", "AAPL");
        fail_fav.last_refresh_status = LastRefreshStatus::Fail;
        fail_fav.is_favourite = true;
        assert!(!(fail_fav.last_refresh_status == LastRefreshStatus::Fail && !fail_fav.is_favourite));
    }

    #[test]
    fn every_item_derives_a_concrete_status_before_partitioning() {
        let mut item = WatchlistItem::new("u1", "MSFT");
        item.last_refresh_status = LastRefreshStatus::Pending;
        let status = derive_status(&item);
        assert_eq!(status, WatchlistStatus::Pending);
    }
}
