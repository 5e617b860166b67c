// =============================================================================
// Leadership Evaluator — market-relative check (market-trend impact)
// =============================================================================
//
// Grounded on leadership-service/checks/market_relative_checks.py::
// evaluate_market_trend_impact (reconstructed from
// tests/test_market_relative_checks.py; the check module itself was not in
// the filtered original-source pack — see DESIGN.md Open Question #8).
// Classifies the ticker's own price action against the broader market's
// trend-day history: a recovery out of a bearish stretch, a sustained bull
// run, or a bearish stretch the stock is weathering more shallowly than the
// index.
// =============================================================================

use crate::models::{MarketTrend, MarketTrendDay, PriceBar};

use super::CheckResult;

const MIN_HISTORY_DAYS: usize = 8;
const RECENT_WINDOW_DAYS: usize = 20;

/// Index of the day right after the most recent Bearish day, iff the trend
/// history currently reads Bullish (a Bearish->...->Bullish turn). `None`
/// when the series never went Bearish, or isn't currently Bullish.
fn recovery_turning_point(market_trends: &[MarketTrendDay]) -> Option<(usize, String)> {
    let last_idx = market_trends.len().checked_sub(1)?;
    if !matches!(market_trends[last_idx].trend, MarketTrend::Bullish) {
        return None;
    }
    let last_bearish_idx = (0..last_idx).rev().find(|&i| matches!(market_trends[i].trend, MarketTrend::Bearish))?;
    let turning_idx = last_bearish_idx + 1;
    Some((turning_idx, market_trends[turning_idx].date.clone()))
}

/// True iff some bar at or after `cutoff_idx` sets a new high over every
/// bar strictly before it in `stock_bars` (a genuine new 52-week high, not
/// just a local one).
fn running_new_high_from(stock_bars: &[PriceBar], cutoff_idx: usize) -> bool {
    let mut running_max = f64::NEG_INFINITY;
    let mut found = false;
    for (i, bar) in stock_bars.iter().enumerate() {
        if i >= cutoff_idx && bar.high > running_max {
            found = true;
        }
        running_max = running_max.max(bar.high);
    }
    found
}

fn stock_decline_from_52_week_high(stock_bars: &[PriceBar]) -> f64 {
    let high = stock_bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let current = stock_bars.last().map(|b| b.close).unwrap_or(0.0);
    if high <= 0.0 {
        return 0.0;
    }
    (high - current) / high
}

fn index_decline_from_52_week_high(index_current_price: f64, index_high_52_week: f64) -> f64 {
    if index_high_52_week <= 0.0 {
        return 0.0;
    }
    (index_high_52_week - index_current_price) / index_high_52_week
}

/// `market_trends` is chronological, oldest first. Needs >= 8 days; with
/// fewer, fails gracefully rather than guessing.
pub fn evaluate_market_trend_impact(
    stock_bars: &[PriceBar],
    index_current_price: f64,
    index_high_52_week: f64,
    market_trends: &[MarketTrendDay],
) -> CheckResult {
    if market_trends.len() < MIN_HISTORY_DAYS {
        return CheckResult::new(
            "market_trend_impact",
            false,
            format!("Market trends data is insufficient (requires >= {MIN_HISTORY_DAYS} days)."),
        );
    }

    if let Some((_, turning_date)) = recovery_turning_point(market_trends) {
        let cutoff_idx = stock_bars.iter().position(|b| b.date > turning_date).unwrap_or(stock_bars.len());
        let pass = running_new_high_from(stock_bars, cutoff_idx);
        return CheckResult::new(
            "market_trend_impact",
            pass,
            if pass {
                format!("recovery phase since {turning_date}, stock set a new 52-week high after the turn")
            } else {
                format!("recovery phase since {turning_date}, no new 52-week high yet")
            },
        );
    }

    match market_trends.last().map(|d| d.trend) {
        Some(MarketTrend::Bullish) => {
            let cutoff_idx = stock_bars.len().saturating_sub(RECENT_WINDOW_DAYS);
            let pass = running_new_high_from(stock_bars, cutoff_idx);
            CheckResult::new(
                "market_trend_impact",
                pass,
                if pass {
                    "sustained bull market, stock made a new 52-week high in the last 20 days".to_string()
                } else {
                    "sustained bull market but no recent 52-week high".to_string()
                },
            )
        }
        Some(MarketTrend::Bearish) => {
            let decline = stock_decline_from_52_week_high(stock_bars);
            let mkt_decline = index_decline_from_52_week_high(index_current_price, index_high_52_week);
            let pass = decline < mkt_decline;
            CheckResult::new(
                "market_trend_impact",
                pass,
                if pass {
                    format!("bearish market, stock decline ({:.1}%) shallower than the index's ({:.1}%)", decline * 100.0, mkt_decline * 100.0)
                } else {
                    format!("bearish market, stock decline ({:.1}%) at or beyond the index's ({:.1}%)", decline * 100.0, mkt_decline * 100.0)
                },
            )
        }
        _ => CheckResult::new("market_trend_impact", false, "no favourable market-trend shape detected".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(i: usize, trend: MarketTrend) -> MarketTrendDay {
        MarketTrendDay { date: format!("2024-{:02}-{:02}", 1 + i / 28, 1 + i % 28), trend }
    }

    fn trend_pattern(counts: &[(MarketTrend, usize)]) -> Vec<MarketTrendDay> {
        let mut out = Vec::new();
        let mut i = 0;
        for &(trend, n) in counts {
            for _ in 0..n {
                out.push(day(i, trend));
                i += 1;
            }
        }
        out
    }

    fn bar(i: usize, close: f64, high: f64) -> PriceBar {
        PriceBar { date: format!("2024-{:02}-{:02}", 1 + i / 28, 1 + i % 28), open: close, high, low: close, close, volume: 1_000.0, adjclose: None }
    }

    #[test]
    fn insufficient_history_fails_gracefully() {
        let trends = trend_pattern(&[(MarketTrend::Bullish, 1), (MarketTrend::Bearish, 1)]);
        let bars: Vec<PriceBar> = (0..2).map(|i| bar(i, 100.0, 101.0)).collect();
        let result = evaluate_market_trend_impact(&bars, 100.0, 100.0, &trends);
        assert!(!result.passed);
        assert!(result.message.contains("insufficient"));
    }

    #[test]
    fn recovery_phase_passes_on_post_turn_new_high() {
        let trends = trend_pattern(&[(MarketTrend::Bearish, 20), (MarketTrend::Neutral, 5), (MarketTrend::Bullish, 5)]);
        let mut bars: Vec<PriceBar> = (0..30).map(|i| bar(i, 100.0 + i as f64 * 0.1, 101.0 + i as f64 * 0.1)).collect();
        // Force a new high a few bars after the Bearish->Neutral turn (day 20).
        bars[22].high = 9_999.0;
        let result = evaluate_market_trend_impact(&bars, 100.0, 100.0, &trends);
        assert!(result.passed, "{}", result.message);
        assert!(result.message.contains("recovery phase"));
    }

    #[test]
    fn sustained_bull_is_not_flagged_as_recovery() {
        let trends = trend_pattern(&[(MarketTrend::Neutral, 20), (MarketTrend::Bullish, 10)]);
        let mut bars: Vec<PriceBar> = (0..30).map(|i| bar(i, 100.0 + i as f64, 100.0 + i as f64)).collect();
        let last = bars.len() - 1;
        bars[last].high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max) + 1.0;
        let result = evaluate_market_trend_impact(&bars, 100.0, 100.0, &trends);
        assert!(result.passed);
        assert!(!result.message.contains("recovery phase"));
        assert!(result.message.contains("sustained bull"));
    }

    #[test]
    fn bearish_market_with_shallow_stock_decline_passes() {
        let trends = trend_pattern(&[(MarketTrend::Bullish, 20), (MarketTrend::Neutral, 5), (MarketTrend::Bearish, 5)]);
        let mut bars: Vec<PriceBar> = (0..30).map(|i| bar(i, 100.0, 100.0)).collect();
        let last = bars.len() - 1;
        bars[last].close = 95.0; // stock down 5% from its 100 high
        let result = evaluate_market_trend_impact(&bars, 90.0, 100.0, &trends); // index down 10%
        assert!(result.passed, "{}", result.message);
        assert!(result.message.contains("shallower"));
    }

    #[test]
    fn bearish_market_with_deep_stock_decline_fails() {
        let trends = trend_pattern(&[(MarketTrend::Bullish, 20), (MarketTrend::Neutral, 5), (MarketTrend::Bearish, 5)]);
        let mut bars: Vec<PriceBar> = (0..30).map(|i| bar(i, 100.0, 100.0)).collect();
        let last = bars.len() - 1;
        bars[last].close = 80.0; // stock down 20%, worse than the index's 10%
        let result = evaluate_market_trend_impact(&bars, 90.0, 100.0, &trends);
        assert!(!result.passed);
    }
}
