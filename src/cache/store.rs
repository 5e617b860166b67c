// =============================================================================
// TTL cache store — C1
// =============================================================================
//
// Four typed caches (price, news, financials, industry) backed by a Mongo
// collection per kind (the durable TTL-indexed store, §6/§10.4) fronted by an
// in-process moka TTL cache for the hot path. `get` only returns a hit when
// the entry both exists/is unexpired AND `cache_covers_request` accepts the
// request shape (§4.1); `put` always refreshes `createdAt`.
// =============================================================================

use std::time::Duration;

use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use mongodb::options::UpdateOptions;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cache_covers::{cache_covers_request, CacheCoversRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Price,
    News,
    Financials,
    Industry,
}

impl CacheKind {
    fn collection_name(self) -> &'static str {
        match self {
            CacheKind::Price => "price_cache",
            CacheKind::News => "news_cache",
            CacheKind::Financials => "financials_cache",
            CacheKind::Industry => "industry_cache",
        }
    }

    /// TTL in seconds, per §3.
    pub fn ttl_secs(self) -> u64 {
        match self {
            CacheKind::Price => 342_800,
            CacheKind::News => 14_400,
            CacheKind::Financials => 342_800,
            CacheKind::Industry => 86_400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.created_at);
        age.num_seconds() as u64 > ttl.as_secs()
    }

    /// Best-effort extraction of the entry's bar dates, for cache_covers.
    /// Returns an empty vec (treated as "does not cover") if the payload is
    /// not a price-bar-shaped array.
    fn bar_dates(&self) -> Vec<String> {
        self.payload
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.get("date").and_then(|d| d.as_str()).map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub struct CacheStore {
    price: Collection<CacheEntry>,
    news: Collection<CacheEntry>,
    financials: Collection<CacheEntry>,
    industry: Collection<CacheEntry>,
    hot: moka::future::Cache<(CacheKind, String), CacheEntry>,
}

impl CacheStore {
    pub fn new(db: &Database) -> Self {
        CacheStore {
            price: db.collection(CacheKind::Price.collection_name()),
            news: db.collection(CacheKind::News.collection_name()),
            financials: db.collection(CacheKind::Financials.collection_name()),
            industry: db.collection(CacheKind::Industry.collection_name()),
            hot: moka::future::Cache::builder()
                .max_capacity(50_000)
                .time_to_live(Duration::from_secs(3600))
                .build(),
        }
    }

    fn collection(&self, kind: CacheKind) -> &Collection<CacheEntry> {
        match kind {
            CacheKind::Price => &self.price,
            CacheKind::News => &self.news,
            CacheKind::Financials => &self.financials,
            CacheKind::Industry => &self.industry,
        }
    }

    fn key(ticker: &str, extra: Option<&str>) -> String {
        match extra {
            Some(e) => format!("{ticker}:{e}"),
            None => ticker.to_string(),
        }
    }

    /// Returns `Some(payload)` only when an entry exists, is not expired, and
    /// `cacheCovers` accepts `req` — otherwise a miss (never partial data).
    pub async fn get(
        &self,
        kind: CacheKind,
        ticker: &str,
        req: &CacheCoversRequest,
    ) -> Option<serde_json::Value> {
        let key = Self::key(ticker, None);
        let entry = match self.hot.get(&(kind, key.clone())).await {
            Some(e) => Some(e),
            None => self.load_from_store(kind, &key).await,
        }?;

        if entry.is_expired(Duration::from_secs(kind.ttl_secs())) {
            return None;
        }
        if !cache_covers_request(&entry.bar_dates(), req) {
            return None;
        }
        Some(entry.payload.clone())
    }

    async fn load_from_store(&self, kind: CacheKind, key: &str) -> Option<CacheEntry> {
        match self.collection(kind).find_one(doc! { "key": key }).await {
            Ok(Some(entry)) => {
                self.hot.insert((kind, key.to_string()), entry.clone()).await;
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(kind = ?kind, key = %key, error = %e, "cache store read failed, treating as miss");
                None
            }
        }
    }

    /// Writes with `createdAt = now`; multi-writer, last-writer-wins on
    /// disjoint keys per §5.
    pub async fn put(&self, kind: CacheKind, ticker: &str, payload: serde_json::Value) -> anyhow::Result<()> {
        let key = Self::key(ticker, None);
        let entry = CacheEntry { key: key.clone(), payload, created_at: Utc::now() };

        self.collection(kind)
            .update_one(
                doc! { "key": &key },
                doc! { "$set": bson::to_bson(&entry)?.as_document().cloned().unwrap() },
            )
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;

        self.hot.insert((kind, key), entry).await;
        Ok(())
    }
}
