// =============================================================================
// Trend Screener — C3
// =============================================================================
//
// Grounded on screening-service/trend_filter.py: the 7-rule moving-average
// trend filter (Mark Minervini's trend template). Every rule whose inputs
// are undefined for lack of series length evaluates to `false`, never
// panics or short-circuits the others — callers always get a full 7-bool
// breakdown alongside the aggregate pass/fail.
// =============================================================================

use serde::Serialize;

use crate::indicators::sma::sma_at;

const SMA_252_WINDOW: usize = 252;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TrendRules {
    pub r1_price_above_150_200: bool,
    pub r2_sma150_above_sma200: bool,
    pub r3_sma200_trending_up: bool,
    pub r4_sma50_above_150_200: bool,
    pub r5_price_above_sma50: bool,
    pub r6_price_above_130pct_low: bool,
    pub r7_price_within_75pct_high: bool,
}

impl TrendRules {
    pub fn all_pass(&self) -> bool {
        self.r1_price_above_150_200
            && self.r2_sma150_above_sma200
            && self.r3_sma200_trending_up
            && self.r4_sma50_above_150_200
            && self.r5_price_above_sma50
            && self.r6_price_above_130pct_low
            && self.r7_price_within_75pct_high
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrendScreenResult {
    pub pass: bool,
    pub rules: TrendRules,
}

/// Screen a chronological close series (oldest first) against the 7-rule
/// trend template. `closes` must be non-empty; an empty series screens as
/// an all-false fail rather than panicking.
pub fn screen_trend(closes: &[f64]) -> TrendScreenResult {
    let mut rules = TrendRules::default();
    let Some(&price) = closes.last() else {
        return TrendScreenResult { pass: false, rules };
    };
    let last_idx = closes.len() - 1;

    let sma50 = sma_at(closes, last_idx, 50);
    let sma150 = sma_at(closes, last_idx, 150);
    let sma200 = sma_at(closes, last_idx, 200);

    if let (Some(s150), Some(s200)) = (sma150, sma200) {
        rules.r1_price_above_150_200 = price > s150 && price > s200;
        rules.r2_sma150_above_sma200 = s150 > s200;
    }

    if closes.len() >= 220 {
        let sma200_20_ago = sma_at(closes, last_idx - 20, 200);
        if let (Some(today), Some(ago)) = (sma200, sma200_20_ago) {
            rules.r3_sma200_trending_up = today > ago;
        }
    }

    if let (Some(s50), Some(s150), Some(s200)) = (sma50, sma150, sma200) {
        rules.r4_sma50_above_150_200 = s50 > s150 && s50 > s200;
    }

    if let Some(s50) = sma50 {
        rules.r5_price_above_sma50 = price > s50;
    }

    // R6/R7 use the trailing 252 closes, or the whole series when shorter —
    // no minimum-length floor (see DESIGN.md Open Question 7).
    let window_len = closes.len().min(SMA_252_WINDOW);
    let window = &closes[closes.len() - window_len..];
    let min_close = window.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_close = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    rules.r6_price_above_130pct_low = price >= 1.30 * min_close;
    rules.r7_price_within_75pct_high = price >= 0.75 * max_close;

    TrendScreenResult { pass: rules.all_pass(), rules }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_uptrend_passes_all_seven_rules() {
        let closes: Vec<f64> = (0..300).map(|i| 100.0 + i as f64 * 0.5).collect();
        let result = screen_trend(&closes);
        assert!(result.pass, "{:?}", result.rules);
        assert!(result.rules.r1_price_above_150_200);
        assert!(result.rules.r3_sma200_trending_up);
    }

    #[test]
    fn death_cross_fails_r4_and_overall() {
        let mut closes: Vec<f64> = (0..250).map(|i| 100.0 + i as f64 * 0.8).collect();
        let last = *closes.last().unwrap();
        // Sharp 50-bar drop collapses SMA50 under SMA150/200.
        for i in 0..50 {
            closes.push(last - i as f64 * 3.0);
        }
        let result = screen_trend(&closes);
        assert!(!result.pass);
        assert!(!result.rules.r4_sma50_above_150_200);
    }

    #[test]
    fn short_series_fails_every_rule_without_panicking() {
        let closes = vec![10.0, 11.0, 9.0];
        let result = screen_trend(&closes);
        assert!(!result.pass);
        assert!(!result.rules.r6_price_above_130pct_low);
    }

    #[test]
    fn empty_series_is_a_clean_fail() {
        let result = screen_trend(&[]);
        assert!(!result.pass);
    }

    #[test]
    fn r6_r7_degrade_to_the_whole_series_below_252_bars() {
        // Only 251 bars on hand; R6/R7 must use the entire series rather
        // than fail outright for want of one more bar.
        let closes: Vec<f64> = (0..251).map(|i| 100.0 + i as f64).collect();
        let result = screen_trend(&closes);
        assert!(result.rules.r6_price_above_130pct_low);
        assert!(result.rules.r7_price_within_75pct_high);
    }

    #[test]
    fn r6_r7_use_trailing_252_window_once_series_exceeds_it() {
        // A deep, old low outside the trailing-252 window must not anchor
        // R6 once enough newer bars exist to cap the window at 252.
        let mut closes: Vec<f64> = vec![1.0];
        closes.extend((0..300).map(|i| 100.0 + i as f64 * 0.1));
        let result = screen_trend(&closes);
        let price = *closes.last().unwrap();

        // Had the stale low of 1.0 still counted, R6 would trivially pass.
        assert!(price >= 1.30 * 1.0);
        // With the window correctly capped at the trailing 252 bars the
        // stale low falls out of range and R6 fails on this series.
        assert!(!result.rules.r6_price_above_130pct_low);
    }
}
