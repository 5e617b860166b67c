// =============================================================================
// VCP derived checks — pivot goodness, correction depth, demand dry-up
// =============================================================================
//
// Grounded on analysis-service/vcp_logic.py: is_pivot_good, is_correction_deep,
// is_demand_dry, get_vcp_footprint, run_vcp_screening.
// =============================================================================

use super::contraction::Contraction;

const PIVOT_PRICE_PERC: f64 = 0.2;
const MAX_CORRECTION_PERC: f64 = 0.5;

/// Canonical buy-zone anchor: last contraction's high, +1%.
pub fn pivot_price(pattern: &[Contraction]) -> Option<f64> {
    pattern.last().map(|c| c.high_price * 1.01)
}

/// Canonical protective stop: last contraction's low, -1%.
pub fn stop_loss(pattern: &[Contraction]) -> Option<f64> {
    pattern.last().map(|c| c.low_price * 0.99)
}

/// Bar-count distance from the last contraction's low to the series end.
pub fn pattern_age_days(pattern: &[Contraction], series_len: usize) -> Option<i64> {
    pattern
        .last()
        .map(|c| series_len.saturating_sub(1).saturating_sub(c.low_idx) as i64)
}

pub fn is_pivot_good(pattern: &[Contraction], current_price: f64) -> bool {
    let Some(last) = pattern.last() else { return false };
    if last.high_price == 0.0 {
        return false;
    }
    let depth = (last.high_price - last.low_price) / last.high_price;
    depth <= PIVOT_PRICE_PERC && current_price > last.low_price
}

pub fn is_correction_deep(pattern: &[Contraction]) -> bool {
    let Some(first) = pattern.first() else { return false };
    if first.high_price == 0.0 {
        return true;
    }
    let deepest_low = pattern.iter().map(|c| c.low_price).fold(f64::INFINITY, f64::min);
    let max_correction = (first.high_price - deepest_low) / first.high_price;
    max_correction >= MAX_CORRECTION_PERC
}

fn linear_regression_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = values.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in xs.iter().zip(values.iter()) {
        num += (x - x_mean) * (y - y_mean);
        den += (x - x_mean) * (x - x_mean);
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

pub fn is_demand_dry(pattern: &[Contraction], prices: &[f64], volumes: &[f64]) -> bool {
    let Some(last) = pattern.last() else { return false };
    if volumes.len() < 2 {
        return false;
    }
    if last.high_idx >= volumes.len() || last.low_idx >= volumes.len() {
        return false;
    }

    let contraction_volumes = &volumes[last.high_idx..=last.low_idx];
    if contraction_volumes.len() < 2 {
        return false;
    }

    if linear_regression_slope(contraction_volumes) > 0.0 {
        return false;
    }

    if contraction_volumes.len() > 3 {
        if last.low_idx < 2 {
            return true;
        }
        let recent_prices = &prices[last.low_idx - 2..=last.low_idx];
        let recent_volumes = &contraction_volumes[contraction_volumes.len() - 3..];
        let price_is_falling = recent_prices[2] < recent_prices[0];
        let volume_is_rising = recent_volumes[2] > recent_volumes[0];
        if price_is_falling && volume_is_rising {
            return false;
        }
    }

    true
}

/// Per-contraction `"<days>D <depth%>"` strings joined with `" | "`.
pub fn footprint(pattern: &[Contraction]) -> (Vec<String>, String) {
    if pattern.is_empty() {
        return (Vec::new(), String::new());
    }
    let parts: Vec<String> = pattern
        .iter()
        .map(|c| {
            let depth = if c.high_price == 0.0 {
                0.0
            } else {
                (c.high_price - c.low_price) / c.high_price
            };
            let days = c.low_idx as i64 - c.high_idx as i64;
            format!("{days}D {:.1}%", depth * 100.0)
        })
        .collect();
    let joined = parts.join(" | ");
    (parts, joined)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct VcpCheckDetails {
    pub is_pivot_good: bool,
    pub is_correction_deep: bool,
    pub is_demand_dry: bool,
}

/// Non-empty pattern required; pass iff all three checks agree.
pub fn run_vcp_screening(
    pattern: &[Contraction],
    prices: &[f64],
    volumes: &[f64],
) -> (bool, String, VcpCheckDetails) {
    if pattern.is_empty() {
        return (
            false,
            String::new(),
            VcpCheckDetails { is_pivot_good: false, is_correction_deep: false, is_demand_dry: false },
        );
    }

    let current_price = *prices.last().unwrap_or(&0.0);
    let pivot_good = is_pivot_good(pattern, current_price);
    let correction_deep = is_correction_deep(pattern);
    let demand_dry = is_demand_dry(pattern, prices, volumes);

    let pass = pivot_good && !correction_deep && demand_dry;
    let (_, footprint_str) = footprint(pattern);

    (
        pass,
        footprint_str,
        VcpCheckDetails { is_pivot_good: pivot_good, is_correction_deep: correction_deep, is_demand_dry: demand_dry },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(high_idx: usize, high: f64, low_idx: usize, low: f64) -> Contraction {
        Contraction { high_idx, high_price: high, low_idx, low_price: low }
    }

    #[test]
    fn screening_pass_on_shallow_declining_volume_pattern() {
        let pattern = vec![c(0, 100.0, 10, 85.0), c(11, 95.0, 20, 90.0)];
        let volumes: Vec<f64> = (0..21).map(|i| 200.0 - (i as f64) * 6.0).collect();
        let prices: Vec<f64> = (0..21).map(|i| 100.0 - i as f64 * 0.1).chain(std::iter::once(92.0)).collect();
        let (pass, _, _) = run_vcp_screening(&pattern, &prices, &volumes);
        assert!(pass);
    }

    #[test]
    fn screening_fails_on_recent_selling_pressure() {
        let pattern = vec![c(0, 110.0, 10, 90.0)];
        let mut volumes: Vec<f64> = vec![200.0, 180.0, 160.0, 140.0, 120.0, 100.0, 80.0, 60.0, 50.0, 50.0, 55.0];
        assert_eq!(volumes.len(), 11);
        let mut prices: Vec<f64> = vec![110.0, 108.0, 106.0, 104.0, 102.0, 100.0, 98.0, 96.0, 95.0, 93.0, 92.0];
        assert_eq!(prices.len(), 11);
        volumes.truncate(11);
        prices.truncate(11);
        let (pass, _, details) = run_vcp_screening(&pattern, &prices, &volumes);
        assert!(!details.is_demand_dry);
        assert!(!pass);
    }

    #[test]
    fn footprint_formats_depth_and_duration() {
        let pattern = vec![c(0, 100.0, 10, 80.0)];
        let (_, s) = footprint(&pattern);
        assert_eq!(s, "10D 20.0%");
    }

    #[test]
    fn correction_deep_with_zero_high_is_treated_as_deep() {
        let pattern = vec![c(0, 0.0, 5, 0.0)];
        assert!(is_correction_deep(&pattern));
    }
}
