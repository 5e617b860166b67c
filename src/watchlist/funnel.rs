// =============================================================================
// Watchlist refresh funnel — screen -> vcp -> freshness -> data-metrics (C7)
// =============================================================================
//
// Grounded on monitoring-service/services/update_orchestrator.py::refresh_watchlist_status.
// Re-uses the in-process trend screener (C3) and VCP engine (C2) exactly as
// the screening pipeline does. Freshness is a real fourth gate, not
// enrichment tacked onto the VCP stage (Open Question 10): a VCP-passing
// item whose pattern has gone stale fails here with `failed_stage =
// "freshness"`. data-metrics runs for every ticker, not just survivors
// (§4.7), and a hard per-stage failure forces `UNKNOWN` instead of `FAIL`.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;

use crate::data_access::DataAccess;
use crate::models::{LastRefreshStatus, PriceBar, WatchlistItem};
use crate::trend::screen_trend;
use crate::vcp::{find_pattern, footprint, is_pivot_good, pattern_age_days, pivot_price, run_vcp_screening};

/// A VCP-passing pattern is "fresh" when it is no older than this many days
/// (Open Question 10) — the same staleness bound `watchlist::status` uses to
/// demote an otherwise-PASS item to `Watch`.
const FRESHNESS_MAX_AGE_DAYS: i64 = 90;

/// Pure freshness-gate predicate (Open Question 10): fresh iff the pattern
/// exists and is no older than `FRESHNESS_MAX_AGE_DAYS`.
fn passes_freshness(has_pivot: Option<bool>, pattern_age_days: Option<i64>) -> bool {
    has_pivot == Some(true) && pattern_age_days.map(|age| age <= FRESHNESS_MAX_AGE_DAYS).unwrap_or(false)
}

pub struct WatchlistFunnel {
    data_access: Arc<DataAccess>,
}

impl WatchlistFunnel {
    pub fn new(data_access: Arc<DataAccess>) -> Self {
        WatchlistFunnel { data_access }
    }

    /// Runs the full funnel for one item. A hard per-stage error (a real
    /// upstream failure, not merely "no data") is terminal for that item
    /// and marks it as a downstream failure; the caller tracks these
    /// separately in `failed_downstream_tickers`.
    pub async fn refresh_one(&self, mut item: WatchlistItem) -> (WatchlistItem, bool) {
        let ticker = item.ticker.clone();
        let mut downstream_failed = false;

        match self.data_access.get_price_series(&ticker, "1y").await {
            Ok(Some(bars)) if bars.len() >= 50 => {
                let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                if screen_trend(&closes).pass {
                    self.run_vcp_stage(&ticker, &mut item).await;
                } else {
                    item.last_refresh_status = LastRefreshStatus::Fail;
                    item.failed_stage = Some("screen".to_string());
                }
            }
            Ok(_) => {
                item.last_refresh_status = LastRefreshStatus::Fail;
                item.failed_stage = Some("screen".to_string());
            }
            Err(e) => {
                tracing::warn!(ticker = %ticker, error = %e, "screen stage failed for watchlist ticker");
                item.last_refresh_status = LastRefreshStatus::Unknown;
                item.failed_stage = Some("screen".to_string());
                downstream_failed = true;
            }
        }

        downstream_failed |= self.attach_data_metrics(&ticker, &mut item).await;

        if downstream_failed {
            item.last_refresh_status = LastRefreshStatus::Unknown;
        }
        item.last_refresh_at = Some(Utc::now());

        (item, downstream_failed)
    }

    async fn run_vcp_stage(&self, ticker: &str, item: &mut WatchlistItem) {
        match self.data_access.get_price_series(ticker, "6mo").await {
            Ok(Some(bars)) if !bars.is_empty() => {
                Self::apply_vcp_and_freshness(bars, item);
            }
            Ok(_) => {
                item.last_refresh_status = LastRefreshStatus::Fail;
                item.failed_stage = Some("vcp".to_string());
            }
            Err(e) => {
                tracing::warn!(ticker = %ticker, error = %e, "vcp stage failed for watchlist ticker");
                item.last_refresh_status = LastRefreshStatus::Unknown;
                item.failed_stage = Some("vcp".to_string());
            }
        }
    }

    fn apply_vcp_and_freshness(bars: Vec<PriceBar>, item: &mut WatchlistItem) {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let pattern = find_pattern(&closes);
        let current_price = *closes.last().unwrap_or(&0.0);
        let (pass, _, _) = run_vcp_screening(&pattern, &closes, &volumes);

        item.vcp_pass = Some(pass);
        item.has_pivot = Some(!pattern.is_empty());
        item.is_pivot_good = Some(is_pivot_good(&pattern, current_price));
        item.pivot_price = pivot_price(&pattern);
        item.pattern_age_days = pattern_age_days(&pattern, closes.len());

        if !pass {
            item.last_refresh_status = LastRefreshStatus::Fail;
            item.failed_stage = Some("vcp".to_string());
            return;
        }

        let (_, footprint_str) = footprint(&pattern);
        item.vcp_footprint = if footprint_str.is_empty() { None } else { Some(footprint_str) };
        item.days_since_pivot = item.pattern_age_days;

        // freshness stage: a real gate, not enrichment-only (Open Question 10).
        // A VCP-passing item without a pattern, or whose pattern has aged past
        // FRESHNESS_MAX_AGE_DAYS, fails here instead of the funnel treating
        // every VCP pass as automatically fresh.
        if !passes_freshness(item.has_pivot, item.pattern_age_days) {
            item.last_refresh_status = LastRefreshStatus::Fail;
            item.failed_stage = Some("freshness".to_string());
            return;
        }

        item.last_refresh_status = LastRefreshStatus::Pass;
        item.failed_stage = None;
    }

    /// Runs for every item regardless of survivor status (§4.7). Returns
    /// `true` if this stage itself hit a hard downstream failure.
    async fn attach_data_metrics(&self, ticker: &str, item: &mut WatchlistItem) -> bool {
        let mut failed = false;
        match self.data_access.get_price_series(ticker, "3mo").await {
            Ok(Some(bars)) if !bars.is_empty() => {
                let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
                let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
                let current_price = *closes.last().unwrap();
                item.current_price = Some(current_price);
                item.vol_last = Some(*volumes.last().unwrap_or(&0.0));

                let window = &volumes[volumes.len().saturating_sub(50)..];
                item.vol_50d_avg = if window.is_empty() { None } else { Some(window.iter().sum::<f64>() / window.len() as f64) };

                item.day_change_pct = if closes.len() >= 2 {
                    let prev = closes[closes.len() - 2];
                    if prev != 0.0 { Some((current_price - prev) / prev * 100.0) } else { None }
                } else {
                    None
                };
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(ticker = %ticker, error = %e, "data-metrics stage failed for watchlist ticker");
                item.failed_stage = Some("data-metrics".to_string());
                failed = true;
            }
        }

        item.vol_vs_50d_ratio = match (item.vol_last, item.vol_50d_avg) {
            (Some(last), Some(avg)) if avg > 0.0 => Some(last / avg),
            _ => None,
        };
        item.pivot_proximity_percent = match (item.current_price, item.pivot_price) {
            (Some(price), Some(pivot)) if pivot != 0.0 => Some((price - pivot) / pivot * 100.0),
            _ => None,
        };
        item.is_at_pivot = item.pivot_proximity_percent.map(|p| p.abs() <= 1.0);
        item.has_pullback_setup = match (item.current_price, item.pivot_price) {
            (Some(price), Some(pivot)) if pivot != 0.0 => Some(price < pivot),
            _ => None,
        };

        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, DelistedRegistry, RateLimiter};
    use crate::clients::DataServiceClient;

    fn uptrend_item(ticker: &str) -> WatchlistItem {
        WatchlistItem::new("user-1", ticker)
    }

    #[test]
    fn freshness_gate_passes_recent_pattern() {
        assert!(passes_freshness(Some(true), Some(0)));
        assert!(passes_freshness(Some(true), Some(FRESHNESS_MAX_AGE_DAYS)));
    }

    #[test]
    fn freshness_gate_fails_stale_pattern() {
        assert!(!passes_freshness(Some(true), Some(FRESHNESS_MAX_AGE_DAYS + 1)));
    }

    #[test]
    fn freshness_gate_fails_without_a_pivot() {
        assert!(!passes_freshness(Some(false), Some(0)));
        assert!(!passes_freshness(None, None));
    }

    #[test]
    fn apply_vcp_and_freshness_fails_the_freshness_stage_on_a_stale_pattern() {
        // 36-bar canonical VCP series (src/vcp/contraction.rs), padded with a
        // long flat tail so the last contraction ages well past the 90-day
        // freshness bound while the pattern itself still passes VCP screening.
        let mut closes: Vec<f64> = vec![
            100.0, 102.0, 101.0, 103.0, 105.0, 104.0, 102.0, 100.0, 98.0, 96.0, 97.0, 99.0, 101.0,
            103.0, 104.0, 103.0, 101.0, 99.0, 97.0, 95.0, 96.0, 98.0, 100.0, 102.0, 103.0, 102.0,
            100.0, 98.0, 96.0, 94.0, 95.0, 97.0, 99.0, 101.0, 103.0, 105.0,
        ];
        closes.extend(std::iter::repeat(105.0).take(100));
        let bars: Vec<PriceBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: format!("2026-{:02}-{:02}", 1 + i / 28, 1 + i % 28),
                open: close,
                high: close,
                low: close,
                close,
                volume: 100.0,
                adjclose: None,
            })
            .collect();

        let mut item = uptrend_item("AAPL");
        WatchlistFunnel::apply_vcp_and_freshness(bars, &mut item);

        assert_eq!(item.vcp_pass, Some(true));
        assert_eq!(item.last_refresh_status, LastRefreshStatus::Fail);
        assert_eq!(item.failed_stage.as_deref(), Some("freshness"));
    }

    #[test]
    fn funnel_constructs_without_a_live_mongo_or_http_stack() {
        // Smoke test: the funnel can be wired up from pure in-memory fixtures;
        // actual stage behaviour is exercised via the pure functions it calls
        // (trend::screen_trend, vcp::run_vcp_screening) which carry their own
        // colocated test suites.
        let _ = uptrend_item("AAPL");
        let _: fn(CacheStore, DelistedRegistry, RateLimiter, DataServiceClient) -> DataAccess = DataAccess::new;
    }
}
