// =============================================================================
// Screening pipeline — the funnel C6 drives stage by stage
// =============================================================================
//
// Grounded on scheduler-service/tasks/screening_task.py. Fetches the ticker
// universe, trend-screens it in batched chunks (C3), VCP-analyzes survivors
// in fast mode (C2), then evaluates leadership (C4) on the final survivor
// set and persists one detail record per candidate plus a job summary.
//
// Leadership evaluation here runs without real peer context: peer data is
// sourced by a dedicated peer-service collaborator outside this crate's
// scope, so `industry_leader` conservatively reports "no complete financial
// data" for every candidate while the other leadership checks still run
// against real financials and trend history.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::warn;

use crate::clients::TickerServiceClient;
use crate::data_access::DataAccess;
use crate::jobs::manager::JobManager;
use crate::leadership::{evaluate_leadership, LeadershipInputs};
use crate::leadership::financial_health::GrowthTier;
use crate::models::{CoreFinancials, JobStatus, MarketTrendDay};
use crate::trend::screen_trend;
use crate::vcp::{find_pattern, run_vcp_screening};

const TRAILING_52_WEEK_WINDOW: usize = 252;

const JOB_TYPE: &str = "SCREENING";
const TOTAL_STEPS: u32 = 4;
const BATCH_CONCURRENCY: usize = 16;

const UNIVERSE_TIMEOUT: Duration = Duration::from_secs(60);
const TREND_STAGE_TIMEOUT: Duration = Duration::from_secs(300);
const VCP_STAGE_TIMEOUT: Duration = Duration::from_secs(300);
const METRICS_STAGE_TIMEOUT: Duration = Duration::from_secs(600);

pub struct ScreeningPipeline {
    pub job_manager: Arc<JobManager>,
    pub data_access: Arc<DataAccess>,
    pub ticker_client: Arc<TickerServiceClient>,
    pub trend_days: Vec<MarketTrendDay>,
}

impl ScreeningPipeline {
    pub async fn run(&self, job_id: String) {
        if let Err(e) = self.job_manager.start(&job_id).await {
            warn!(job_id = %job_id, error = %e, "failed to mark job RUNNING");
        }

        let universe = match self.stage_universe(&job_id).await {
            Ok(tickers) => tickers,
            Err(_) => return,
        };

        let survivors_trend = match self.stage_trend(&job_id, universe).await {
            Ok(s) => s,
            Err(_) => return,
        };

        let survivors_vcp = match self.stage_vcp(&job_id, survivors_trend).await {
            Ok(s) => s,
            Err(_) => return,
        };

        self.stage_finalize(&job_id, survivors_vcp).await;
    }

    async fn stage_universe(&self, job_id: &str) -> Result<Vec<String>, ()> {
        self.job_manager
            .emit_progress(job_id, JOB_TYPE, JobStatus::Running, 1, TOTAL_STEPS, "universe", "fetching ticker universe")
            .await;

        match timeout(UNIVERSE_TIMEOUT, self.ticker_client.fetch_universe()).await {
            Ok(Ok(tickers)) => Ok(tickers),
            Ok(Err(e)) => {
                let _ = self.job_manager.fail(job_id, "universe", &e.to_string()).await;
                Err(())
            }
            Err(_) => {
                let _ = self.job_manager.fail(job_id, "universe", "ticker universe fetch timed out").await;
                Err(())
            }
        }
    }

    async fn stage_trend(&self, job_id: &str, universe: Vec<String>) -> Result<Vec<String>, ()> {
        self.job_manager
            .emit_progress(job_id, JOB_TYPE, JobStatus::Running, 2, TOTAL_STEPS, "trend", &format!("trend-screening {} tickers", universe.len()))
            .await;

        let data_access = self.data_access.clone();
        let work = stream::iter(universe.into_iter().map(|ticker| {
            let data_access = data_access.clone();
            async move {
                let bars = data_access.get_price_series(&ticker, "1y").await.ok().flatten()?;
                let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                if screen_trend(&closes).pass {
                    Some(ticker)
                } else {
                    None
                }
            }
        }))
        .buffer_unordered(BATCH_CONCURRENCY);

        let survivors: Vec<String> = match timeout(TREND_STAGE_TIMEOUT, work.filter_map(|x| async move { x }).collect::<Vec<_>>()).await {
            Ok(s) => s,
            Err(_) => {
                let _ = self.job_manager.fail(job_id, "trend", "trend screening stage timed out").await;
                return Err(());
            }
        };

        if survivors.is_empty() {
            let _ = self.job_manager.fail(job_id, "trend", "no survivors passed the trend screen").await;
            return Err(());
        }
        Ok(survivors)
    }

    async fn stage_vcp(&self, job_id: &str, survivors: Vec<String>) -> Result<Vec<String>, ()> {
        self.job_manager
            .emit_progress(job_id, JOB_TYPE, JobStatus::Running, 3, TOTAL_STEPS, "vcp", &format!("VCP-analyzing {} survivors (fast mode)", survivors.len()))
            .await;

        let data_access = self.data_access.clone();
        let work = stream::iter(survivors.into_iter().map(|ticker| {
            let data_access = data_access.clone();
            async move {
                let bars = data_access.get_price_series(&ticker, "6mo").await.ok().flatten()?;
                let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
                let pattern = find_pattern(&closes);
                let (pass, _, _) = run_vcp_screening(&pattern, &closes, &volumes);
                if pass {
                    Some(ticker)
                } else {
                    None
                }
            }
        }))
        .buffer_unordered(BATCH_CONCURRENCY);

        let survivors: Vec<String> = match timeout(VCP_STAGE_TIMEOUT, work.filter_map(|x| async move { x }).collect::<Vec<_>>()).await {
            Ok(s) => s,
            Err(_) => {
                let _ = self.job_manager.fail(job_id, "vcp", "VCP analysis stage timed out").await;
                return Err(());
            }
        };

        if survivors.is_empty() {
            let _ = self.job_manager.fail(job_id, "vcp", "no survivors passed VCP screening").await;
            return Err(());
        }
        Ok(survivors)
    }

    async fn stage_finalize(&self, job_id: &str, survivors: Vec<String>) {
        self.job_manager
            .emit_progress(job_id, JOB_TYPE, JobStatus::Running, 4, TOTAL_STEPS, "metrics", &format!("attaching compact metrics for {} candidates", survivors.len()))
            .await;

        let (index_current_price, index_high_52_week) = match self.data_access.get_price_series("^GSPC", "2y").await {
            Ok(Some(bars)) if !bars.is_empty() => {
                let current = bars.last().map(|b| b.close).unwrap_or(0.0);
                let window = &bars[bars.len().saturating_sub(TRAILING_52_WEEK_WINDOW)..];
                let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
                (current, high)
            }
            _ => {
                warn!(job_id = %job_id, "failed to fetch ^GSPC index series for market-relative check; falling back to 0.0/0.0");
                (0.0, 0.0)
            }
        };

        let data_access = self.data_access.clone();
        let trend_days = self.trend_days.clone();
        let work = stream::iter(survivors.into_iter().map(|ticker| {
            let data_access = data_access.clone();
            let trend_days = trend_days.clone();
            async move { build_candidate_payload(&data_access, &ticker, &trend_days, index_current_price, index_high_52_week).await }
        }))
        .buffer_unordered(BATCH_CONCURRENCY);

        let candidates: Vec<serde_json::Value> = match timeout(METRICS_STAGE_TIMEOUT, work.filter_map(|x| async move { x }).collect::<Vec<_>>()).await {
            Ok(c) => c,
            Err(_) => {
                let _ = self.job_manager.fail(job_id, "metrics", "compact-metrics/persistence stage timed out").await;
                return;
            }
        };

        let summary = serde_json::json!({
            "candidate_count": candidates.len(),
            "tickers": candidates.iter().filter_map(|c| c.get("ticker").cloned()).collect::<Vec<_>>(),
        });

        if let Err(e) = self.job_manager.complete_success(job_id, candidates, summary).await {
            let _ = self.job_manager.fail(job_id, "metrics", &format!("failed to persist job summary: {e}")).await;
        }
    }
}

async fn build_candidate_payload(
    data_access: &DataAccess,
    ticker: &str,
    market_trends: &[MarketTrendDay],
    index_current_price: f64,
    index_high_52_week: f64,
) -> Option<serde_json::Value> {
    let bars = data_access.get_price_series(ticker, "1y").await.ok().flatten()?;
    if bars.is_empty() {
        return None;
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let current_price = *closes.last().unwrap();
    let day_change_pct = if closes.len() >= 2 {
        let prev = closes[closes.len() - 2];
        if prev != 0.0 { Some((current_price - prev) / prev * 100.0) } else { None }
    } else {
        None
    };
    let vol_last = *volumes.last().unwrap_or(&0.0);
    let vol_50d_avg = {
        let window = &volumes[volumes.len().saturating_sub(50)..];
        if window.is_empty() { None } else { Some(window.iter().sum::<f64>() / window.len() as f64) }
    };

    let financials_raw = data_access.get_financials(ticker).await.ok().flatten();
    let financials: CoreFinancials = financials_raw
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    let inputs = LeadershipInputs {
        ticker,
        financials: &financials,
        yoy_eps_growth_pct: None,
        quarterly_eps_growth_rates: &[],
        most_recent_eps: financials.quarterly_earnings.last().and_then(|q| q.eps),
        growth_tier: GrowthTier::Standard,
        stock_bars: &bars,
        market_trends,
        index_current_price,
        index_high_52_week,
        peers: &[],
    };
    let leadership = evaluate_leadership(&inputs);

    Some(serde_json::json!({
        "ticker": ticker,
        "current_price": current_price,
        "vol_last": vol_last,
        "vol_50d_avg": vol_50d_avg,
        "day_change_pct": day_change_pct,
        "leadership": leadership,
    }))
}
