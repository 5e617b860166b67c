// =============================================================================
// Watchlist status derivation — pure function of a refreshed item (C7)
// =============================================================================
//
// Grounded on monitor-service/watchlist_status.py::derive_watchlist_status.
// Table-driven, evaluated top-to-bottom; the first matching row wins (§4.7).
// =============================================================================

use crate::models::{LastRefreshStatus, WatchlistItem, WatchlistStatus};

/// "Rich VCP signals present" means any one of these seven keys was
/// populated upstream at all (`Some(_)`), independent of its truthiness —
/// an item with only `has_pullback_setup: Some(true)` set still counts as
/// rich. Notably excludes `pivot_proximity_percent`.
fn rich_signals_present(item: &WatchlistItem) -> bool {
    item.vcp_pass.is_some()
        || item.is_pivot_good.is_some()
        || item.pattern_age_days.is_some()
        || item.has_pivot.is_some()
        || item.has_pullback_setup.is_some()
        || item.vol_vs_50d_ratio.is_some()
        || item.day_change_pct.is_some()
}

fn within_pivot_band(item: &WatchlistItem) -> bool {
    item.pivot_proximity_percent.map(|p| (-5.0..=0.0).contains(&p)).unwrap_or(false)
}

pub fn derive_status(item: &WatchlistItem) -> WatchlistStatus {
    match item.last_refresh_status {
        LastRefreshStatus::Fail => return WatchlistStatus::Failed,
        LastRefreshStatus::Pending | LastRefreshStatus::Unknown => return WatchlistStatus::Pending,
        LastRefreshStatus::Pass => {}
    }

    if !rich_signals_present(item) {
        return if within_pivot_band(item) { WatchlistStatus::BuyReady } else { WatchlistStatus::Watch };
    }

    if item.pattern_age_days.map(|age| age > 90).unwrap_or(false) {
        return WatchlistStatus::Watch;
    }

    if let (Some(ratio), Some(day_change)) = (item.vol_vs_50d_ratio, item.day_change_pct) {
        if ratio >= 3.0 && day_change < 0.0 {
            return WatchlistStatus::Watch;
        }
    }

    if item.vcp_pass == Some(true) && item.is_pivot_good == Some(true) && within_pivot_band(item) {
        return WatchlistStatus::BuyReady;
    }

    if item.has_pivot == Some(true) {
        if let Some(prox) = item.pivot_proximity_percent {
            if prox < -5.0 && item.vol_vs_50d_ratio.map(|r| r < 1.0).unwrap_or(false) {
                return WatchlistStatus::BuyAlert;
            }
        }
    }

    if item.has_pullback_setup == Some(true) && item.vol_vs_50d_ratio.map(|r| (0.7..=0.8).contains(&r)).unwrap_or(false) {
        return WatchlistStatus::BuyAlert;
    }

    WatchlistStatus::Watch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(ticker: &str) -> WatchlistItem {
        WatchlistItem::new("user-1", ticker)
    }

    #[test]
    fn buy_ready_on_pass_with_tight_pivot_proximity() {
        let mut item = base("AAPL");
        item.last_refresh_status = LastRefreshStatus::Pass;
        item.vcp_pass = Some(true);
        item.is_pivot_good = Some(true);
        item.pivot_proximity_percent = Some(-2.5);
        item.pattern_age_days = Some(30);
        item.vol_vs_50d_ratio = Some(0.9);
        assert_eq!(derive_status(&item), WatchlistStatus::BuyReady);
    }

    #[test]
    fn stale_pattern_overrides_to_watch() {
        let mut item = base("AAPL");
        item.last_refresh_status = LastRefreshStatus::Pass;
        item.vcp_pass = Some(true);
        item.is_pivot_good = Some(true);
        item.pivot_proximity_percent = Some(-2.5);
        item.pattern_age_days = Some(120);
        item.vol_vs_50d_ratio = Some(0.9);
        assert_eq!(derive_status(&item), WatchlistStatus::Watch);
    }

    #[test]
    fn fail_always_maps_to_failed_status() {
        let mut item = base("AAPL");
        item.last_refresh_status = LastRefreshStatus::Fail;
        assert_eq!(derive_status(&item), WatchlistStatus::Failed);
    }

    #[test]
    fn unknown_maps_to_pending() {
        let mut item = base("AAPL");
        item.last_refresh_status = LastRefreshStatus::Unknown;
        assert_eq!(derive_status(&item), WatchlistStatus::Pending);
    }

    #[test]
    fn buy_alert_on_pullback_with_moderate_volume_ratio() {
        let mut item = base("AAPL");
        item.last_refresh_status = LastRefreshStatus::Pass;
        item.vcp_pass = Some(false);
        item.is_pivot_good = Some(false);
        item.pivot_proximity_percent = Some(-10.0);
        item.has_pullback_setup = Some(true);
        item.vol_vs_50d_ratio = Some(0.75);
        assert_eq!(derive_status(&item), WatchlistStatus::BuyAlert);
    }

    #[test]
    fn pass_without_rich_signals_and_no_pivot_data_is_watch() {
        let mut item = base("AAPL");
        item.last_refresh_status = LastRefreshStatus::Pass;
        item.pivot_proximity_percent = None;
        assert_eq!(derive_status(&item), WatchlistStatus::Watch);
    }

    #[test]
    fn pass_without_rich_signals_and_near_pivot_is_buy_ready() {
        let mut item = base("AAPL");
        item.last_refresh_status = LastRefreshStatus::Pass;
        item.pivot_proximity_percent = Some(-2.0);
        assert_eq!(derive_status(&item), WatchlistStatus::BuyReady);
    }
}
