// =============================================================================
// Leadership Evaluator — financial-health checks
// =============================================================================
//
// Grounded on leadership-service/checks/financial_health_checks.py, with
// thresholds reconstructed from tests/test_financial_health_checks.py and
// tests/mock_data_helpers.py per DESIGN.md Open Question #2.
// =============================================================================

use chrono::{NaiveDate, Utc};

use super::CheckResult;

const SMALL_CAP_FLOOR: f64 = 300_000_000.0;
const MID_CAP_CEILING: f64 = 10_000_000_000.0;
const RECENT_IPO_DAYS: i64 = 730;
const LIMITED_FLOAT_CEILING: f64 = 75_000_000.0;
const YOY_GROWTH_STANDARD_PCT: f64 = 15.0;
const YOY_GROWTH_HIGH_PCT: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthTier {
    Standard,
    High,
}

impl GrowthTier {
    fn floor_pct(self) -> f64 {
        match self {
            GrowthTier::Standard => YOY_GROWTH_STANDARD_PCT,
            GrowthTier::High => YOY_GROWTH_HIGH_PCT,
        }
    }
}

/// Market cap already carries the ingestion-time zero-substitution (§3) — a
/// substituted zero is a real zero here, not "missing", so it simply fails
/// the band check like any other out-of-range value.
pub fn small_to_mid_cap(market_cap: f64) -> CheckResult {
    let passed = (SMALL_CAP_FLOOR..=MID_CAP_CEILING).contains(&market_cap);
    CheckResult::new(
        "small_to_mid_cap",
        passed,
        if passed {
            format!("market cap ${market_cap:.0} is within the small-to-mid band")
        } else {
            format!("market cap ${market_cap:.0} is outside [$300M, $10B]")
        },
    )
}

/// Missing `ipo_date` is "unknown", never a hard failure: the check fails
/// softly with a "not available" message rather than erroring.
pub fn recent_ipo(ipo_date: Option<&str>, as_of: NaiveDate) -> CheckResult {
    let Some(raw) = ipo_date else {
        return CheckResult::new("recent_ipo", false, "IPO date not available".to_string());
    };
    let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
        return CheckResult::new("recent_ipo", false, "IPO date not available".to_string());
    };
    let age_days = (as_of - parsed).num_days();
    let passed = (0..=RECENT_IPO_DAYS).contains(&age_days);
    CheckResult::new(
        "recent_ipo",
        passed,
        if passed {
            format!("IPO {age_days} days ago is within the recent-IPO window")
        } else {
            format!("IPO {age_days} days ago exceeds the {RECENT_IPO_DAYS}-day recent-IPO window")
        },
    )
}

pub fn limited_float(float_shares: Option<f64>) -> CheckResult {
    match float_shares {
        Some(shares) if shares <= LIMITED_FLOAT_CEILING => {
            CheckResult::new("limited_float", true, format!("float {shares:.0} shares is limited"))
        }
        Some(shares) => CheckResult::new(
            "limited_float",
            false,
            format!("float {shares:.0} shares exceeds the {LIMITED_FLOAT_CEILING:.0}-share ceiling"),
        ),
        None => CheckResult::new("limited_float", false, "float shares not available".to_string()),
    }
}

pub fn yoy_eps_growth(yoy_growth_pct: Option<f64>, tier: GrowthTier) -> CheckResult {
    match yoy_growth_pct {
        Some(pct) if pct >= tier.floor_pct() => {
            CheckResult::new("yoy_eps_growth", true, format!("YoY EPS growth {pct:.1}% clears the {:?} floor", tier))
        }
        Some(pct) => CheckResult::new(
            "yoy_eps_growth",
            false,
            format!("YoY EPS growth {pct:.1}% is below the {:?} floor of {:.0}%", tier, tier.floor_pct()),
        ),
        None => CheckResult::new("yoy_eps_growth", false, "YoY EPS growth not available".to_string()),
    }
}

/// `growth_rates` is the chronological sequence of quarter-over-quarter EPS
/// growth rates (percent); requires at least two consecutive positive
/// quarters anywhere in the tail.
pub fn consecutive_quarterly_growth(growth_rates: &[f64]) -> CheckResult {
    let passed = growth_rates.windows(2).any(|w| w[0] > 0.0 && w[1] > 0.0);
    CheckResult::new(
        "consecutive_quarterly_growth",
        passed,
        if passed {
            "at least two consecutive quarters of positive EPS growth".to_string()
        } else {
            "no two consecutive quarters of positive EPS growth".to_string()
        },
    )
}

/// Most recent quarter's growth rate must exceed the prior quarter's.
pub fn accelerating_growth(growth_rates: &[f64]) -> CheckResult {
    let passed = match growth_rates {
        [.., prior, recent] => recent > prior,
        _ => false,
    };
    CheckResult::new(
        "accelerating_growth",
        passed,
        if passed {
            "most recent quarter's growth rate exceeds the prior quarter's".to_string()
        } else {
            "growth is not accelerating quarter over quarter".to_string()
        },
    )
}

pub fn positive_recent_earnings(most_recent_eps: Option<f64>) -> CheckResult {
    match most_recent_eps {
        Some(eps) if eps > 0.0 => CheckResult::new("positive_recent_earnings", true, format!("most recent EPS {eps:.2} is positive")),
        Some(eps) => CheckResult::new("positive_recent_earnings", false, format!("most recent EPS {eps:.2} is not positive")),
        None => CheckResult::new("positive_recent_earnings", false, "most recent EPS not available".to_string()),
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_to_mid_cap_band() {
        assert!(small_to_mid_cap(1_000_000_000.0).passed);
        assert!(!small_to_mid_cap(100_000_000.0).passed);
        assert!(!small_to_mid_cap(50_000_000_000.0).passed);
    }

    #[test]
    fn recent_ipo_missing_date_fails_softly() {
        let result = recent_ipo(None, today());
        assert!(!result.passed);
        assert!(result.message.contains("not available"));
    }

    #[test]
    fn recent_ipo_within_window_passes() {
        let as_of = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let ipo = (as_of - chrono::Duration::days(400)).format("%Y-%m-%d").to_string();
        assert!(recent_ipo(Some(&ipo), as_of).passed);
    }

    #[test]
    fn yoy_growth_ladder_tiers() {
        assert!(yoy_eps_growth(Some(20.0), GrowthTier::Standard).passed);
        assert!(!yoy_eps_growth(Some(20.0), GrowthTier::High).passed);
        assert!(yoy_eps_growth(Some(30.0), GrowthTier::High).passed);
    }

    #[test]
    fn accelerating_growth_compares_last_two_quarters() {
        assert!(accelerating_growth(&[5.0, 10.0, 18.0]).passed);
        assert!(!accelerating_growth(&[18.0, 10.0]).passed);
        assert!(!accelerating_growth(&[]).passed);
    }

    #[test]
    fn consecutive_quarterly_growth_needs_a_run_of_two() {
        assert!(consecutive_quarterly_growth(&[-1.0, 2.0, 3.0]).passed);
        assert!(!consecutive_quarterly_growth(&[2.0, -1.0, 2.0]).passed);
    }
}
