// =============================================================================
// Screening platform — main entry point
// =============================================================================
//
// Boots configuration, the Mongo-backed persistence layer (with TTL-index
// conflict resolution), shared application state, the daily watchlist
// refresh beat schedule, and the axum HTTP server.
// =============================================================================

mod api;
mod app_state;
mod cache;
mod clients;
mod config;
mod data_access;
mod db;
mod error;
mod indicators;
mod jobs;
mod leadership;
mod market_health;
mod models;
mod ticker;
mod trend;
mod vcp;
mod watchlist;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(Config::from_env()?);
    info!(
        mongo_db_name = %config.mongo_db_name,
        bind_addr = %config.bind_addr,
        watchlist_refresh_cron_hour_utc = config.watchlist_refresh_cron_hour_utc,
        finnhub_rate_limit_per_minute = config.finnhub_rate_limit_per_minute,
        "resolved configuration (MONGO_URI credentials redacted)"
    );

    let database = db::connect(&config).await?;
    db::ensure_indexes(&database).await?;
    info!("persistence layer ready, TTL indexes ensured");

    let state = Arc::new(AppState::new(config.clone(), database));

    spawn_watchlist_refresh_beat(state.clone(), config.watchlist_refresh_cron_hour_utc);

    let app = api::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "HTTP server listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server exited with an error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("shutdown signal received, stopping gracefully");
        }
    }

    info!("screening platform shut down complete");
    Ok(())
}

/// Runs the watchlist refresh once per day at `cron_hour_utc:00` (§6, §9).
/// Sleeps in short increments rather than computing a precise deadline so
/// the loop self-corrects after any overrun without drifting.
fn spawn_watchlist_refresh_beat(state: Arc<AppState>, cron_hour_utc: u32) {
    use chrono::Timelike;
    tokio::spawn(async move {
        let mut last_run_date: Option<chrono::NaiveDate> = None;
        loop {
            let now = chrono::Utc::now();
            let due = now.hour() == cron_hour_utc && last_run_date != Some(now.date_naive());
            if due {
                info!("watchlist refresh beat firing");
                match state.watchlist_refresh.refresh_all().await {
                    Ok(summary) => info!(
                        updated = summary.updated_items,
                        archived = summary.archived_items,
                        failed = summary.failed_items,
                        "watchlist refresh beat completed"
                    ),
                    Err(e) => error!(error = %e, "watchlist refresh beat failed"),
                }
                last_run_date = Some(now.date_naive());
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
    });
}
