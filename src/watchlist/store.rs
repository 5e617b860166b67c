// =============================================================================
// Watchlist persistence — active + archived collections (§6, §10.4)
// =============================================================================
//
// Grounded on monitor-service/watchlist_store.py. `watchlist_items` holds the
// live set; `archived_watchlist_items` holds FAIL+non-favourite items with a
// 30-day TTL on `archived_at` so entries self-delete. Both are keyed on
// `(user_id, ticker)` and written via bulk per-document upserts (§5).
// =============================================================================

use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::UpdateOptions;
use mongodb::{Collection, Database};

use crate::models::WatchlistItem;

pub struct WatchlistStore {
    active: Collection<WatchlistItem>,
    archived: Collection<WatchlistItem>,
}

impl WatchlistStore {
    pub fn new(db: &Database) -> Self {
        WatchlistStore {
            active: db.collection("watchlist_items"),
            archived: db.collection("archived_watchlist_items"),
        }
    }

    pub async fn all_active(&self) -> anyhow::Result<Vec<WatchlistItem>> {
        let mut cursor = self.active.find(doc! {}).await?;
        let mut out = Vec::new();
        while let Some(item) = cursor.try_next().await? {
            out.push(item);
        }
        Ok(out)
    }

    pub async fn find_active(&self, user_id: &str, ticker: &str) -> anyhow::Result<Option<WatchlistItem>> {
        Ok(self.active.find_one(doc! { "user_id": user_id, "ticker": ticker }).await?)
    }

    pub async fn upsert_active(&self, item: &WatchlistItem) -> anyhow::Result<()> {
        let doc = bson::to_bson(item)?.as_document().cloned().unwrap();
        self.active
            .update_one(
                doc! { "user_id": &item.user_id, "ticker": &item.ticker },
                doc! { "$set": doc },
            )
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        Ok(())
    }

    /// Moves an item from the active set to the archive, stamping
    /// `archived_at`, then removes it from the active collection.
    pub async fn archive(&self, mut item: WatchlistItem) -> anyhow::Result<()> {
        item.archived_at = Some(Utc::now());
        let doc = bson::to_bson(&item)?.as_document().cloned().unwrap();
        self.archived
            .update_one(
                doc! { "user_id": &item.user_id, "ticker": &item.ticker },
                doc! { "$set": doc },
            )
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        self.active
            .delete_one(doc! { "user_id": &item.user_id, "ticker": &item.ticker })
            .await?;
        Ok(())
    }

    pub async fn delete_archived(&self, user_id: &str, ticker: &str) -> anyhow::Result<bool> {
        let res = self.archived.delete_one(doc! { "user_id": user_id, "ticker": ticker }).await?;
        Ok(res.deleted_count > 0)
    }
}
