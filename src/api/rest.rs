// =============================================================================
// REST API — HTTP surface (§6)
// =============================================================================
//
// No authentication layer: nothing in this deployment's interface list
// calls for one (unlike the teacher's Bearer-token-gated trading endpoints).
// CORS stays permissive, matching the teacher's development posture.
// =============================================================================

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::clients::TickerServiceClient;
use crate::error::AppError;
use crate::jobs::{JobManager, ScreeningPipeline};
use crate::market_health::{aggregate_market_health, IndexSeries};
use crate::models::{MarketHealthResponse, MarketTrendDay, WatchlistItem};
use crate::ticker::normalize_ticker;
use crate::trend::screen_trend;
use crate::vcp::{find_pattern, footprint, pivot_price, run_vcp_screening, stop_loss};

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/analyze/:ticker", get(analyze_one))
        .route("/screen/:ticker", get(screen_one))
        .route("/screen/batch", post(screen_batch))
        .route("/analyze/batch", post(analyze_batch))
        .route("/analyze/freshness/batch", post(freshness_batch))
        .route("/data/return/batch", post(return_batch))
        .route("/data/watchlist-metrics/batch", post(watchlist_metrics_batch))
        .route("/jobs/screening/start", post(start_screening_job))
        .route("/jobs/screening/stream/:job_id", get(crate::api::sse::stream_job_progress))
        .route("/jobs/screening/history", get(job_history))
        .route("/jobs/screening/history/:job_id", get(job_history_one))
        .route("/monitor/market-health", get(market_health))
        .route("/monitor/watchlist", get(list_watchlist))
        .route("/monitor/watchlist/:ticker", put(upsert_watchlist_item))
        .route("/monitor/archive/:ticker", delete(delete_archived_item))
        .route("/monitor/internal/watchlist/refresh-status", post(refresh_watchlist_status))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let _ = &state.db;
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

// =============================================================================
// Single-ticker endpoints
// =============================================================================

#[derive(Debug, Deserialize)]
struct AnalyzeQuery {
    #[serde(default)]
    mode: Option<String>,
}

async fn analyze_one(State(state): State<Arc<AppState>>, Path(raw_ticker): Path<String>, Query(q): Query<AnalyzeQuery>) -> Result<Json<serde_json::Value>, AppError> {
    let ticker = normalize_ticker(&raw_ticker).map_err(AppError::BadRequest)?;
    let fast = q.mode.as_deref() == Some("fast");

    let bars = state
        .data_access
        .get_price_series(&ticker, "1y")
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no price data for {ticker}")))?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let pattern = find_pattern(&closes);
    let (pass, footprint_str, details) = run_vcp_screening(&pattern, &closes, &volumes);

    let mut body = serde_json::json!({
        "ticker": ticker,
        "pass": pass,
        "footprint": footprint_str,
        "checks": details,
        "pivot_price": pivot_price(&pattern),
        "stop_loss": stop_loss(&pattern),
    });

    if !fast {
        let (parts, _) = footprint(&pattern);
        body["contractions"] = serde_json::json!(pattern);
        body["contraction_footprints"] = serde_json::json!(parts);
        body["chart"] = serde_json::json!({ "closes": closes, "volumes": volumes });
    }

    Ok(Json(body))
}

async fn screen_one(State(state): State<Arc<AppState>>, Path(raw_ticker): Path<String>) -> Result<Json<serde_json::Value>, AppError> {
    let ticker = normalize_ticker(&raw_ticker).map_err(AppError::BadRequest)?;
    let bars = state
        .data_access
        .get_price_series(&ticker, "1y")
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no price data for {ticker}")))?;
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let result = screen_trend(&closes);
    Ok(Json(serde_json::json!({ "ticker": ticker, "pass": result.pass, "rules": result.rules })))
}

// =============================================================================
// Batch endpoints
// =============================================================================

#[derive(Debug, Deserialize)]
struct BatchTickersRequest {
    tickers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BatchAnalyzeRequest {
    tickers: Vec<String>,
    #[serde(default)]
    mode: Option<String>,
}

#[derive(Debug, Serialize)]
struct BatchItemError {
    ticker: String,
    error: String,
}

async fn screen_batch(State(state): State<Arc<AppState>>, Json(req): Json<BatchTickersRequest>) -> Json<serde_json::Value> {
    let mut results = Vec::new();
    let mut errors = Vec::new();

    for raw in req.tickers {
        let ticker = match normalize_ticker(&raw) {
            Ok(t) => t,
            Err(e) => {
                errors.push(BatchItemError { ticker: raw, error: e });
                continue;
            }
        };
        match state.data_access.get_price_series(&ticker, "1y").await {
            Ok(Some(bars)) => {
                let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                let result = screen_trend(&closes);
                results.push(serde_json::json!({ "ticker": ticker, "pass": result.pass, "rules": result.rules }));
            }
            Ok(None) => {
                warn!(ticker = %ticker, "no price data, skipping in batch");
                errors.push(BatchItemError { ticker, error: "no price data".to_string() });
            }
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "trend-screen batch item failed, skipping");
                errors.push(BatchItemError { ticker, error: e.to_string() });
            }
        }
    }

    Json(serde_json::json!({ "results": results, "errors": errors }))
}

async fn analyze_batch(State(state): State<Arc<AppState>>, Json(req): Json<BatchAnalyzeRequest>) -> Json<serde_json::Value> {
    let fast = req.mode.as_deref() == Some("fast");
    let mut results = Vec::new();
    let mut errors = Vec::new();

    for raw in req.tickers {
        let ticker = match normalize_ticker(&raw) {
            Ok(t) => t,
            Err(e) => {
                errors.push(BatchItemError { ticker: raw, error: e });
                continue;
            }
        };
        match state.data_access.get_price_series(&ticker, "6mo").await {
            Ok(Some(bars)) if !bars.is_empty() => {
                let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
                let pattern = find_pattern(&closes);
                let (pass, footprint_str, details) = run_vcp_screening(&pattern, &closes, &volumes);
                let mut entry = serde_json::json!({
                    "ticker": ticker,
                    "pass": pass,
                    "footprint": footprint_str,
                    "checks": details,
                });
                if !fast {
                    entry["pivot_price"] = serde_json::json!(pivot_price(&pattern));
                    entry["stop_loss"] = serde_json::json!(stop_loss(&pattern));
                }
                results.push(entry);
            }
            Ok(_) => errors.push(BatchItemError { ticker, error: "no price data".to_string() }),
            Err(e) => {
                warn!(ticker = %ticker, error = %e, "vcp batch item failed, skipping");
                errors.push(BatchItemError { ticker, error: e.to_string() });
            }
        }
    }

    Json(serde_json::json!({ "results": results, "errors": errors }))
}

async fn freshness_batch(State(state): State<Arc<AppState>>, Json(req): Json<BatchTickersRequest>) -> Json<serde_json::Value> {
    let mut results = Vec::new();
    for raw in req.tickers {
        let Ok(ticker) = normalize_ticker(&raw) else { continue };
        let Ok(Some(bars)) = state.data_access.get_price_series(&ticker, "6mo").await else { continue };
        if bars.is_empty() {
            continue;
        }
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let pattern = find_pattern(&closes);
        let (_, footprint_str) = footprint(&pattern);
        let age_days = crate::vcp::pattern_age_days(&pattern, closes.len());
        results.push(serde_json::json!({
            "ticker": ticker,
            "vcpFootprint": footprint_str,
            "pattern_age_days": age_days,
            "days_since_pivot": age_days,
        }));
    }
    Json(serde_json::json!({ "results": results }))
}

async fn return_batch(State(state): State<Arc<AppState>>, Json(req): Json<BatchTickersRequest>) -> Json<serde_json::Value> {
    Json(compact_metrics(&state, req.tickers).await)
}

async fn watchlist_metrics_batch(State(state): State<Arc<AppState>>, Json(req): Json<BatchTickersRequest>) -> Json<serde_json::Value> {
    Json(compact_metrics(&state, req.tickers).await)
}

async fn compact_metrics(state: &Arc<AppState>, tickers: Vec<String>) -> serde_json::Value {
    let mut results = Vec::new();
    for raw in tickers {
        let Ok(ticker) = normalize_ticker(&raw) else { continue };
        let Ok(Some(bars)) = state.data_access.get_price_series(&ticker, "3mo").await else { continue };
        if bars.is_empty() {
            continue;
        }
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let current_price = *closes.last().unwrap();
        let vol_last = *volumes.last().unwrap_or(&0.0);
        let window = &volumes[volumes.len().saturating_sub(50)..];
        let vol_50d_avg = if window.is_empty() { None } else { Some(window.iter().sum::<f64>() / window.len() as f64) };
        let day_change_pct = if closes.len() >= 2 {
            let prev = closes[closes.len() - 2];
            if prev != 0.0 { Some((current_price - prev) / prev * 100.0) } else { None }
        } else {
            None
        };
        results.push(serde_json::json!({
            "ticker": ticker,
            "current_price": current_price,
            "vol_last": vol_last,
            "vol_50d_avg": vol_50d_avg,
            "day_change_pct": day_change_pct,
        }));
    }
    serde_json::json!({ "results": results })
}

// =============================================================================
// Job orchestration
// =============================================================================

async fn start_screening_job(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let job = state.job_manager.create("SCREENING", serde_json::Value::Null, Some("api".to_string())).await?;

    let job_manager = state.job_manager.clone();
    let data_access = state.data_access.clone();
    let ticker_client: Arc<TickerServiceClient> = state.ticker_client.clone();
    let trend_days: Vec<MarketTrendDay> = state.trend_history.read().clone();
    let job_id = job.job_id.clone();

    tokio::spawn(async move {
        let pipeline = ScreeningPipeline { job_manager, data_access, ticker_client, trend_days };
        pipeline.run(job_id).await;
    });

    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "job_id": job.job_id }))))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: i64,
    #[serde(default)]
    skip: u64,
}

fn default_history_limit() -> i64 {
    50
}

async fn job_history(State(state): State<Arc<AppState>>, Query(q): Query<HistoryQuery>) -> Result<Json<serde_json::Value>, AppError> {
    let jobs = state.job_manager.history(q.limit, q.skip).await?;
    Ok(Json(serde_json::json!({ "jobs": jobs })))
}

async fn job_history_one(State(state): State<Arc<AppState>>, Path(job_id): Path<String>) -> Result<Json<serde_json::Value>, AppError> {
    if !JobManager::is_recognized_job_id(&job_id) {
        return Err(AppError::BadRequest(format!("unrecognized job_id format: {job_id}")));
    }
    let job = state.job_manager.get(&job_id).await?.ok_or_else(|| AppError::NotFound(format!("unknown job_id: {job_id}")))?;
    Ok(Json(serde_json::json!(job)))
}

// =============================================================================
// Market health + watchlist monitor
// =============================================================================

async fn market_health(State(state): State<Arc<AppState>>) -> Result<Json<MarketHealthResponse>, AppError> {
    let (gspc, djia, ixic) = tokio::try_join!(
        state.data_access.get_price_series("^GSPC", "2y"),
        state.data_access.get_price_series("^DJI", "2y"),
        state.data_access.get_price_series("^IXIC", "2y"),
    )?;

    let gspc = IndexSeries { ticker: "^GSPC", closes: gspc.unwrap_or_default().iter().map(|b| b.close).collect() };
    let djia = IndexSeries { ticker: "^DJI", closes: djia.unwrap_or_default().iter().map(|b| b.close).collect() };
    let ixic = IndexSeries { ticker: "^IXIC", closes: ixic.unwrap_or_default().iter().map(|b| b.close).collect() };

    let health = aggregate_market_health(&gspc, &djia, &ixic)
        .ok_or_else(|| AppError::UpstreamUnavailable("one or more major indices could not be resolved".to_string()))?;

    let (new_highs, new_lows) = state.data_access.breadth().await;
    let high_low_ratio = if new_lows > 0 { new_highs as f64 / new_lows as f64 } else { new_highs as f64 };

    Ok(Json(MarketHealthResponse {
        market_stage: health.market_stage,
        correction_depth_percent: health.correction_depth_percent,
        high_low_ratio,
        new_highs,
        new_lows,
        fetched_at: Utc::now(),
    }))
}

#[derive(Debug, Deserialize)]
struct WatchlistQuery {
    #[serde(default)]
    exclude: Option<String>,
}

async fn list_watchlist(State(state): State<Arc<AppState>>, Query(q): Query<WatchlistQuery>) -> Result<Json<serde_json::Value>, AppError> {
    let excluded: std::collections::HashSet<String> = q
        .exclude
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(|t| normalize_ticker(t.trim()).ok())
        .collect();

    let items = state
        .watchlist_refresh
        .store_snapshot()
        .await?
        .into_iter()
        .filter(|i| !excluded.contains(&i.ticker))
        .collect::<Vec<_>>();

    Ok(Json(serde_json::json!({ "items": items })))
}

#[derive(Debug, Deserialize, Default)]
struct UpsertWatchlistRequest {
    #[serde(default)]
    is_favourite: bool,
}

async fn upsert_watchlist_item(
    State(state): State<Arc<AppState>>,
    Path(raw_ticker): Path<String>,
    body: Option<Json<UpsertWatchlistRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let ticker = normalize_ticker(&raw_ticker).map_err(AppError::BadRequest)?;
    let req = body.map(|Json(b)| b).unwrap_or_default();

    let existed = state.watchlist_refresh.item_exists("default", &ticker).await?;
    let mut item = WatchlistItem::new("default", &ticker);
    item.is_favourite = req.is_favourite;
    state.watchlist_refresh.upsert_item(&item).await?;

    info!(ticker = %ticker, existed, "watchlist item upserted");
    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(serde_json::json!({ "ticker": ticker, "is_favourite": item.is_favourite }))))
}

async fn delete_archived_item(State(state): State<Arc<AppState>>, Path(raw_ticker): Path<String>) -> Result<impl IntoResponse, AppError> {
    let ticker = normalize_ticker(&raw_ticker).map_err(AppError::BadRequest)?;
    state.watchlist_refresh.delete_archived("default", &ticker).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn refresh_watchlist_status(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, AppError> {
    let summary = state.watchlist_refresh.refresh_all().await?;
    Ok(Json(serde_json::json!(summary)))
}
