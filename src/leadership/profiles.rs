// =============================================================================
// Leadership Evaluator — profile aggregation + two-tier pass logic
// =============================================================================
//
// Grounded on leadership-service/app.py::evaluate_leadership. Three fixed
// check-sets (Explosive Grower, High-Potential Setup, Market Favourite);
// overall pass requires one profile to be fully (100%) passed (the
// "primary") and every other profile to have at least one passing check
// (the "supporting" bar).
// =============================================================================

use super::financial_health::{
    accelerating_growth, consecutive_quarterly_growth, limited_float, positive_recent_earnings,
    recent_ipo, small_to_mid_cap, today, yoy_eps_growth, GrowthTier,
};
use super::industry_peer::{evaluate_industry_leader, PeerContract};
use super::market_relative::evaluate_market_trend_impact;
use super::CheckResult;
use crate::models::{CoreFinancials, MarketTrendDay, PriceBar};

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProfileResult {
    pub name: &'static str,
    pub checks: Vec<CheckResult>,
}

impl ProfileResult {
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn is_fully_passed(&self) -> bool {
        !self.checks.is_empty() && self.passed_count() == self.checks.len()
    }

    pub fn has_any_pass(&self) -> bool {
        self.passed_count() > 0
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LeadershipResult {
    pub ticker: String,
    pub profiles: Vec<ProfileResult>,
    pub primary_profile: Option<&'static str>,
    pub pass: bool,
    pub message: String,
}

/// Everything the three profiles need as input, gathered up front so the
/// evaluator itself stays a pure function of its inputs.
pub struct LeadershipInputs<'a> {
    pub ticker: &'a str,
    pub financials: &'a CoreFinancials,
    pub yoy_eps_growth_pct: Option<f64>,
    pub quarterly_eps_growth_rates: &'a [f64],
    pub most_recent_eps: Option<f64>,
    pub growth_tier: GrowthTier,
    /// The ticker's own OHLC history, chronological oldest first — feeds the
    /// market-relative check's 52-week-high / decline-depth comparisons.
    pub stock_bars: &'a [PriceBar],
    pub market_trends: &'a [MarketTrendDay],
    pub index_current_price: f64,
    pub index_high_52_week: f64,
    pub peers: &'a [PeerContract],
}

fn explosive_grower(inputs: &LeadershipInputs) -> ProfileResult {
    ProfileResult {
        name: "Explosive Grower",
        checks: vec![
            accelerating_growth(inputs.quarterly_eps_growth_rates),
            yoy_eps_growth(inputs.yoy_eps_growth_pct, inputs.growth_tier),
            consecutive_quarterly_growth(inputs.quarterly_eps_growth_rates),
            positive_recent_earnings(inputs.most_recent_eps),
        ],
    }
}

fn high_potential_setup(inputs: &LeadershipInputs) -> ProfileResult {
    ProfileResult {
        name: "High-Potential Setup",
        checks: vec![
            small_to_mid_cap(inputs.financials.market_cap),
            recent_ipo(inputs.financials.ipo_date.as_deref(), today()),
            limited_float(inputs.financials.float_shares),
        ],
    }
}

fn market_favourite(inputs: &LeadershipInputs) -> ProfileResult {
    ProfileResult {
        name: "Market Favourite",
        checks: vec![
            evaluate_industry_leader(
                inputs.ticker,
                inputs.financials.market_cap,
                inputs.financials.total_revenue,
                inputs.peers,
            ),
            evaluate_market_trend_impact(inputs.stock_bars, inputs.index_current_price, inputs.index_high_52_week, inputs.market_trends),
        ],
    }
}

pub fn evaluate_leadership(inputs: &LeadershipInputs) -> LeadershipResult {
    let profiles = vec![
        explosive_grower(inputs),
        high_potential_setup(inputs),
        market_favourite(inputs),
    ];

    let primary = profiles.iter().find(|p| p.is_fully_passed()).map(|p| p.name);

    let (pass, message) = match primary {
        None => (false, "no profile fully qualifies as primary".to_string()),
        Some(primary_name) => {
            let missing_support: Vec<&str> = profiles
                .iter()
                .filter(|p| p.name != primary_name && !p.has_any_pass())
                .map(|p| p.name)
                .collect();
            if missing_support.is_empty() {
                (true, format!("qualifies via {primary_name} with supporting signal from other profiles"))
            } else {
                (false, format!("{primary_name} qualifies as primary but supporting profiles lack any pass: {missing_support:?}"))
            }
        }
    };

    LeadershipResult {
        ticker: inputs.ticker.to_string(),
        profiles,
        primary_profile: primary,
        pass,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketTrend;

    fn base_financials() -> CoreFinancials {
        CoreFinancials {
            total_revenue: 50_000_000.0,
            net_income: 1_000_000.0,
            market_cap: 1_000_000_000.0,
            shares_outstanding: Some(10_000_000.0),
            float_shares: Some(5_000_000.0),
            ipo_date: Some((today() - chrono::Duration::days(100)).format("%Y-%m-%d").to_string()),
            annual_earnings: vec![],
            quarterly_earnings: vec![],
        }
    }

    fn bullish_days(n: usize) -> Vec<MarketTrendDay> {
        (0..n).map(|i| MarketTrendDay { date: format!("2024-01-{:02}", 1 + i), trend: MarketTrend::Bullish }).collect()
    }

    fn rising_bars_with_final_new_high(n: usize) -> Vec<PriceBar> {
        let mut bars: Vec<PriceBar> = (0..n)
            .map(|i| PriceBar {
                date: format!("2024-01-{:02}", 1 + i),
                open: 100.0,
                high: 100.0 + i as f64,
                low: 100.0,
                close: 100.0 + i as f64,
                volume: 1_000.0,
                adjclose: None,
            })
            .collect();
        if let Some(last) = bars.last_mut() {
            last.high += 1.0;
        }
        bars
    }

    #[test]
    fn fully_passing_high_potential_setup_becomes_primary_with_support() {
        let financials = base_financials();
        let trend_days = bullish_days(8);
        let stock_bars = rising_bars_with_final_new_high(8);
        let peers = vec![];
        let inputs = LeadershipInputs {
            ticker: "ABCD",
            financials: &financials,
            yoy_eps_growth_pct: None,
            quarterly_eps_growth_rates: &[],
            most_recent_eps: None,
            growth_tier: GrowthTier::Standard,
            stock_bars: &stock_bars,
            market_trends: &trend_days,
            index_current_price: 100.0,
            index_high_52_week: 100.0,
            peers: &peers,
        };
        let result = evaluate_leadership(&inputs);
        assert_eq!(result.primary_profile, Some("High-Potential Setup"));
        // Market Favourite: industry_leader fails (no peers), market_trend_impact passes -> has_any_pass.
        // Explosive Grower: all checks fail with no growth data -> no support -> overall fail.
        assert!(!result.pass);
    }

    #[test]
    fn no_primary_profile_fails_outright() {
        let mut financials = base_financials();
        financials.market_cap = 1.0; // breaks small_to_mid_cap
        financials.ipo_date = None; // breaks recent_ipo
        financials.float_shares = Some(1_000_000_000.0); // breaks limited_float
        let trend_days = vec![];
        let stock_bars = vec![];
        let peers = vec![];
        let inputs = LeadershipInputs {
            ticker: "ABCD",
            financials: &financials,
            yoy_eps_growth_pct: None,
            quarterly_eps_growth_rates: &[],
            most_recent_eps: None,
            growth_tier: GrowthTier::Standard,
            stock_bars: &stock_bars,
            market_trends: &trend_days,
            index_current_price: 0.0,
            index_high_52_week: 0.0,
            peers: &peers,
        };
        let result = evaluate_leadership(&inputs);
        assert!(result.primary_profile.is_none());
        assert!(!result.pass);
    }
}
