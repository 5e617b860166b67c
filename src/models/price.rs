// =============================================================================
// Price bar model
// =============================================================================

use serde::{Deserialize, Serialize};

/// A single OHLCV bar. `date` is kept as a plain `YYYY-MM-DD` string rather
/// than a `NaiveDate` so malformed upstream payloads can be skipped at the
/// schema-validation boundary instead of panicking on parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjclose: Option<f64>,
}

impl PriceBar {
    /// A bar is well-formed iff every numeric field is finite. `date` is
    /// validated separately during normalization (strictly increasing).
    pub fn is_numerically_sane(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
            && self.adjclose.map(|v| v.is_finite()).unwrap_or(true)
    }
}

/// Validate and normalize a raw bar sequence: drop non-finite bars, then
/// require the remaining dates to be strictly increasing. Returns `None` if
/// the input is not chronologically salvageable (duplicate or
/// out-of-order dates after filtering).
pub fn normalize_series(raw: Vec<PriceBar>) -> Option<Vec<PriceBar>> {
    let mut bars: Vec<PriceBar> = raw.into_iter().filter(|b| b.is_numerically_sane()).collect();
    bars.sort_by(|a, b| a.date.cmp(&b.date));
    for pair in bars.windows(2) {
        if pair[0].date >= pair[1].date {
            return None;
        }
    }
    Some(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> PriceBar {
        PriceBar {
            date: date.to_string(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
            adjclose: None,
        }
    }

    #[test]
    fn drops_non_finite_bars() {
        let mut b = bar("2026-01-01", f64::NAN);
        b.close = f64::NAN;
        let series = normalize_series(vec![b, bar("2026-01-02", 10.0)]).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn rejects_duplicate_dates() {
        let series = normalize_series(vec![bar("2026-01-01", 1.0), bar("2026-01-01", 2.0)]);
        assert!(series.is_none());
    }
}
