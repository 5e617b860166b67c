// =============================================================================
// Market-Health Aggregator — C5
// =============================================================================
//
// Grounded on monitor-service/market_health.py. Computes posture from three
// major indices' SMA-50 crossovers evaluated on the *penultimate* bar (to
// avoid intraday partials), overall stage from the conjunction/disjunction
// of the three postures, and a `^GSPC`-only correction depth.
//
// DESIGN.md Open Question #1: the reference implementation reads the
// penultimate bar for posture but the *last* bar of `^GSPC` for correction
// depth. That asymmetry is reproduced here deliberately, not "fixed".
// =============================================================================

use crate::indicators::sma::{rolling_max, rolling_mean};
use crate::models::MarketTrend;

const SMA_SHORT: usize = 50;
const SMA_LONG: usize = 200;
const HIGH_LOW_WINDOW: usize = 252;
const HIGH_LOW_MIN_PERIODS: usize = 251;

#[derive(Debug, Clone)]
pub struct IndexSeries {
    pub ticker: &'static str,
    pub closes: Vec<f64>,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct IndexPosture {
    pub trend: MarketTrend,
    pub price: f64,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MarketHealth {
    pub market_stage: MarketTrend,
    pub correction_depth_percent: f64,
    pub postures: Vec<(String, IndexPosture)>,
}

fn posture_on_penultimate(closes: &[f64]) -> Option<IndexPosture> {
    if closes.len() < 2 {
        return None;
    }
    let idx = closes.len() - 2;
    let sma50 = rolling_mean(closes, SMA_SHORT, SMA_SHORT).get(idx).copied().flatten();
    let sma200 = rolling_mean(closes, SMA_LONG, SMA_LONG).get(idx).copied().flatten();
    let price = closes[idx];

    let trend = match sma50 {
        Some(s50) if price > s50 => MarketTrend::Bullish,
        Some(s50) if price < s50 => MarketTrend::Bearish,
        _ => MarketTrend::Neutral,
    };

    Some(IndexPosture { trend, price, sma_50: sma50, sma_200: sma200 })
}

/// Correction depth reads the index's *last* bar, deliberately inconsistent
/// with posture's penultimate-bar read (see module docs). Returns `0.0` if
/// the 52-week high is null, zero, or the close is unavailable.
fn correction_depth_percent(closes: &[f64]) -> f64 {
    if closes.is_empty() {
        return 0.0;
    }
    let last_idx = closes.len() - 1;
    let highs = rolling_max(closes, HIGH_LOW_WINDOW, HIGH_LOW_MIN_PERIODS);
    let high_52w = match highs.get(last_idx).copied().flatten() {
        Some(h) if h > 0.0 => h,
        _ => return 0.0,
    };
    let close = closes[last_idx];
    (((close - high_52w) / high_52w) * 100.0 * 100.0).round() / 100.0
}

/// Aggregates posture + correction depth across `^GSPC`, `^DJI`, `^IXIC`.
/// `gspc`, `djia`, `ixic` must each be a non-empty chronological close
/// series; if any is missing entirely, returns `None` rather than
/// inventing a value for the missing index.
pub fn aggregate_market_health(gspc: &IndexSeries, djia: &IndexSeries, ixic: &IndexSeries) -> Option<MarketHealth> {
    if gspc.closes.is_empty() || djia.closes.is_empty() || ixic.closes.is_empty() {
        return None;
    }

    let gspc_posture = posture_on_penultimate(&gspc.closes)?;
    let djia_posture = posture_on_penultimate(&djia.closes)?;
    let ixic_posture = posture_on_penultimate(&ixic.closes)?;

    let postures = vec![
        (gspc.ticker.to_string(), gspc_posture),
        (djia.ticker.to_string(), djia_posture),
        (ixic.ticker.to_string(), ixic_posture),
    ];

    let all_bullish = postures.iter().all(|(_, p)| matches!(p.trend, MarketTrend::Bullish));
    let all_bearish = postures.iter().all(|(_, p)| matches!(p.trend, MarketTrend::Bearish));
    let market_stage = if all_bullish {
        MarketTrend::Bullish
    } else if all_bearish {
        MarketTrend::Bearish
    } else {
        MarketTrend::Neutral
    };

    Some(MarketHealth {
        market_stage,
        correction_depth_percent: correction_depth_percent(&gspc.closes),
        postures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(ticker: &'static str, closes: Vec<f64>) -> IndexSeries {
        IndexSeries { ticker, closes }
    }

    #[test]
    fn missing_index_reports_failure_not_invented_values() {
        let empty = series("^IXIC", vec![]);
        let gspc = series("^GSPC", vec![100.0; 300]);
        let djia = series("^DJI", vec![100.0; 300]);
        assert!(aggregate_market_health(&gspc, &djia, &empty).is_none());
    }

    #[test]
    fn all_bullish_indices_yield_bullish_stage() {
        let rising: Vec<f64> = (0..300).map(|i| 100.0 + i as f64).collect();
        let gspc = series("^GSPC", rising.clone());
        let djia = series("^DJI", rising.clone());
        let ixic = series("^IXIC", rising);
        let health = aggregate_market_health(&gspc, &djia, &ixic).unwrap();
        assert_eq!(health.market_stage, MarketTrend::Bullish);
    }

    #[test]
    fn mixed_postures_yield_neutral_stage() {
        let rising: Vec<f64> = (0..300).map(|i| 100.0 + i as f64).collect();
        let falling: Vec<f64> = (0..300).map(|i| 400.0 - i as f64).collect();
        let gspc = series("^GSPC", rising.clone());
        let djia = series("^DJI", falling);
        let ixic = series("^IXIC", rising);
        let health = aggregate_market_health(&gspc, &djia, &ixic).unwrap();
        assert_eq!(health.market_stage, MarketTrend::Neutral);
    }

    #[test]
    fn correction_depth_is_zero_without_enough_history_for_52w_high() {
        let short: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        assert_eq!(correction_depth_percent(&short), 0.0);
    }

    #[test]
    fn correction_depth_reflects_drawdown_from_52w_high() {
        let mut closes: Vec<f64> = (0..300).map(|i| 100.0 + i as f64).collect();
        // Last bar drops sharply below the accumulated 52-week high.
        let high = *closes.iter().take(299).fold(&f64::MIN, |a, b| if b > a { b } else { a });
        closes.push(high * 0.8);
        let depth = correction_depth_percent(&closes);
        assert!(depth < -10.0);
    }
}
