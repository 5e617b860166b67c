// =============================================================================
// Core financials model
// =============================================================================
//
// Grounded on data-service/helper_functions.py::validate_and_prepare_financials:
// the three key numeric fields are substituted with 0 when the upstream
// payload carries a non-numeric value for them, everything else stays
// optional/null.
// =============================================================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EarningsQuarter {
    pub period: String,
    #[serde(default)]
    pub eps: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreFinancials {
    /// Substituted with 0 at ingestion if the upstream value was non-numeric.
    #[serde(default, rename = "totalRevenue")]
    pub total_revenue: f64,
    /// Substituted with 0 at ingestion if the upstream value was non-numeric.
    #[serde(default, rename = "Net Income")]
    pub net_income: f64,
    /// Substituted with 0 at ingestion if the upstream value was non-numeric.
    #[serde(default, rename = "marketCap")]
    pub market_cap: f64,

    #[serde(default, rename = "sharesOutstanding")]
    pub shares_outstanding: Option<f64>,
    #[serde(default, rename = "floatShares")]
    pub float_shares: Option<f64>,
    /// `None` means "unknown", never treated as a failure by downstream checks.
    #[serde(default, rename = "ipoDate")]
    pub ipo_date: Option<String>,

    #[serde(default)]
    pub annual_earnings: Vec<EarningsQuarter>,
    #[serde(default)]
    pub quarterly_earnings: Vec<EarningsQuarter>,
}

/// Index payload shape used by `^GSPC`/`^DJI`/`^IXIC`; bypasses strict
/// `CoreFinancials` validation entirely (the upstream source checks for the
/// `current_price` key to decide which shape it received).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPayload {
    pub current_price: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub high_52_week: Option<f64>,
    pub low_52_week: Option<f64>,
}

/// Ingestion-time substitution of the three key numeric fields: any
/// non-finite or absent value becomes 0.0 exactly as in the source helper.
pub fn substitute_key_fields(total_revenue: Option<f64>, net_income: Option<f64>, market_cap: Option<f64>) -> (f64, f64, f64) {
    let clean = |v: Option<f64>| v.filter(|x| x.is_finite()).unwrap_or(0.0);
    (clean(total_revenue), clean(net_income), clean(market_cap))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_missing_and_nonfinite_with_zero() {
        assert_eq!(
            substitute_key_fields(None, Some(f64::NAN), Some(5.0)),
            (0.0, 0.0, 5.0)
        );
    }
}
