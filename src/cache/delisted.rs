// =============================================================================
// Delisted-ticker deny-list
// =============================================================================
//
// Grounded on data-service/helper_functions.py::is_ticker_delisted /
// mark_ticker_as_delisted: a Mongo-backed registry that short-circuits the
// data-access layer for known-delisted tickers, soft-failing to "not
// delisted" on a transient store error rather than blocking the request.
// =============================================================================

use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use mongodb::options::UpdateOptions;
use mongodb::Collection;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelistedRecord {
    pub ticker: String,
    pub status: String,
    pub reason: String,
    pub last_updated: DateTime<Utc>,
}

pub struct DelistedRegistry {
    collection: Collection<DelistedRecord>,
}

impl DelistedRegistry {
    pub fn new(collection: Collection<DelistedRecord>) -> Self {
        DelistedRegistry { collection }
    }

    /// Soft-fails to `false` on any transient store error — it's better to
    /// attempt the downstream call than to block the request on a DB hiccup.
    pub async fn is_delisted(&self, ticker: &str) -> bool {
        match self.collection.count_documents(doc! { "ticker": ticker }).await {
            Ok(count) => count > 0,
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "delisted-status check failed, assuming not delisted");
                false
            }
        }
    }

    pub async fn mark_delisted(&self, ticker: &str, reason: &str) -> anyhow::Result<()> {
        let filter = doc! { "ticker": ticker };
        let update = doc! {
            "$set": {
                "ticker": ticker,
                "status": "delisted",
                "reason": reason,
                "last_updated": bson::DateTime::from_chrono(Utc::now()),
            }
        };
        self.collection
            .update_one(filter, update)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        Ok(())
    }
}
