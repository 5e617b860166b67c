// =============================================================================
// Data-access facade — C1, extended to a full fetch-or-cache path
// =============================================================================
//
// Ties the TTL cache (`CacheStore`), the delisted deny-list, the sliding-
// window rate limiter, and the data-service HTTP client into the single
// entry point the orchestrator (C6/C7) actually calls: "give me a price
// series / financials payload for this ticker", with caching, delisting,
// and outbound-rate-limiting handled transparently.
// =============================================================================

use crate::cache::{CacheCoversRequest, CacheKind, CacheStore, DelistedRegistry, RateLimiter};
use crate::clients::DataServiceClient;
use crate::error::AppError;
use crate::models::{normalize_series, PriceBar};

pub struct DataAccess {
    cache: CacheStore,
    delisted: DelistedRegistry,
    rate_limiter: RateLimiter,
    data_service: DataServiceClient,
}

impl DataAccess {
    pub fn new(cache: CacheStore, delisted: DelistedRegistry, rate_limiter: RateLimiter, data_service: DataServiceClient) -> Self {
        DataAccess { cache, delisted, rate_limiter, data_service }
    }

    /// `None` means "no data" (delisted, or upstream had nothing) without
    /// being an error condition the caller needs to branch hard on.
    pub async fn get_price_series(&self, ticker: &str, period: &str) -> Result<Option<Vec<PriceBar>>, AppError> {
        if self.delisted.is_delisted(ticker).await {
            return Ok(None);
        }

        let req = CacheCoversRequest { period: Some(period.to_string()), start_date: None };
        if let Some(cached) = self.cache.get(CacheKind::Price, ticker, &req).await {
            let bars: Vec<PriceBar> = serde_json::from_value(cached)
                .map_err(|e| AppError::Internal(format!("corrupt price cache entry for {ticker}: {e}")))?;
            return Ok(Some(bars));
        }

        self.rate_limiter.acquire("data-service").await;
        let raw = self.data_service.fetch_price_series(ticker, period).await?;
        let Some(normalized) = normalize_series(raw) else {
            return Err(AppError::UpstreamContract(format!("{ticker}: price series failed normalization")));
        };

        let payload = serde_json::to_value(&normalized).map_err(|e| AppError::Internal(e.to_string()))?;
        if let Err(e) = self.cache.put(CacheKind::Price, ticker, payload).await {
            tracing::warn!(ticker = %ticker, error = %e, "price cache write failed, continuing uncached");
        }

        Ok(Some(normalized))
    }

    pub async fn get_financials(&self, ticker: &str) -> Result<Option<serde_json::Value>, AppError> {
        if self.delisted.is_delisted(ticker).await {
            return Ok(None);
        }

        let req = CacheCoversRequest { period: None, start_date: None };
        if let Some(cached) = self.cache.get(CacheKind::Financials, ticker, &req).await {
            return Ok(Some(cached));
        }

        self.rate_limiter.acquire("data-service").await;
        let payload = self.data_service.fetch_financials(ticker).await?;
        if let Err(e) = self.cache.put(CacheKind::Financials, ticker, payload.clone()).await {
            tracing::warn!(ticker = %ticker, error = %e, "financials cache write failed, continuing uncached");
        }
        Ok(Some(payload))
    }

    pub async fn mark_delisted(&self, ticker: &str, reason: &str) -> Result<(), AppError> {
        self.delisted.mark_delisted(ticker, reason).await.map_err(AppError::from)
    }

    pub async fn breadth(&self) -> (u64, u64) {
        match self.data_service.fetch_breadth().await {
            Ok(resp) => (resp.new_highs, resp.new_lows),
            Err(_) => (0, 0),
        }
    }
}
