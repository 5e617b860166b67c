// =============================================================================
// Shared application state
// =============================================================================
//
// The composition root's product: every collaborator a request handler or
// background task needs, wired once at startup and cloned cheaply (the
// Mongo driver's handles and every collaborator here are `Arc`-backed) into
// axum's router state and into the watchlist beat-schedule task.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use mongodb::Database;
use parking_lot::RwLock;

use crate::cache::{CacheStore, DelistedRegistry, RateLimiter};
use crate::clients::{DataServiceClient, TickerServiceClient};
use crate::config::Config;
use crate::data_access::DataAccess;
use crate::jobs::JobManager;
use crate::models::MarketTrendDay;
use crate::watchlist::{WatchlistRefreshEngine, WatchlistStore};

pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub data_access: Arc<DataAccess>,
    pub job_manager: Arc<JobManager>,
    pub ticker_client: Arc<TickerServiceClient>,
    pub watchlist_refresh: Arc<WatchlistRefreshEngine>,
    /// Trailing market-trend history fed to the leadership evaluator's
    /// market-relative check (§4.4); refreshed by the market-health read
    /// path as new trading days settle.
    pub trend_history: Arc<RwLock<Vec<MarketTrendDay>>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, db: Database) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        let cache = CacheStore::new(&db);
        let delisted = DelistedRegistry::new(db.collection("ticker_status"));
        let rate_limiter = RateLimiter::finnhub_default(config.finnhub_rate_limit_per_minute);
        let data_service = DataServiceClient::new(http_client.clone(), config.data_service_url.clone());

        let data_access = Arc::new(DataAccess::new(cache, delisted, rate_limiter, data_service));

        let job_manager = JobManager::new(&db);
        let ticker_client = Arc::new(TickerServiceClient::new(http_client, config.ticker_service_url.clone()));

        let watchlist_store = WatchlistStore::new(&db);
        let watchlist_refresh = Arc::new(WatchlistRefreshEngine::new(watchlist_store, data_access.clone()));

        AppState {
            config,
            db,
            data_access,
            job_manager,
            ticker_client,
            watchlist_refresh,
            trend_history: Arc::new(RwLock::new(Vec::new())),
        }
    }
}
