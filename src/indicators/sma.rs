// =============================================================================
// Simple Moving Average (SMA) + rolling extrema
// =============================================================================
//
// Unlike `ema::calculate_ema` (which returns a compacted series starting at
// the first valid index), these rolling helpers return a `Vec<Option<f64>>`
// aligned 1:1 with the input so callers can index by the same position as
// the source series — the shape the trend screener (C3) and market-health
// aggregator (C5) both need, where "SMA200 twenty bars ago" or "the
// penultimate bar's SMA50" are addressed positionally.
// =============================================================================

/// Rolling mean with an explicit `min_periods`: position `i` is `Some` only
/// once at least `min_periods` values have accumulated in `values[..=i]`
/// (pandas `rolling(window, min_periods=min_periods).mean()` semantics).
pub fn rolling_mean(values: &[f64], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling_reduce(values, window, min_periods, |slice| {
        slice.iter().sum::<f64>() / slice.len() as f64
    })
}

pub fn rolling_max(values: &[f64], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling_reduce(values, window, min_periods, |slice| {
        slice.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    })
}

pub fn rolling_min(values: &[f64], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    rolling_reduce(values, window, min_periods, |slice| {
        slice.iter().cloned().fold(f64::INFINITY, f64::min)
    })
}

fn rolling_reduce(
    values: &[f64],
    window: usize,
    min_periods: usize,
    reduce: impl Fn(&[f64]) -> f64,
) -> Vec<Option<f64>> {
    if window == 0 || min_periods == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        let slice = &values[start..=i];
        if slice.len() < min_periods {
            out.push(None);
        } else {
            out.push(Some(reduce(slice)));
        }
    }
    out
}

/// Plain SMA at a single position, requiring the full `period`-length
/// window ending at `idx` to be available (`min_periods == period`).
pub fn sma_at(values: &[f64], idx: usize, period: usize) -> Option<f64> {
    if period == 0 || idx + 1 < period {
        return None;
    }
    let slice = &values[idx + 1 - period..=idx];
    Some(slice.iter().sum::<f64>() / period as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_is_none_until_min_periods() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let out = rolling_mean(&values, 3, 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn sma_at_requires_full_window() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(sma_at(&values, 2, 3), Some(2.0));
        assert_eq!(sma_at(&values, 1, 3), None);
    }

    #[test]
    fn rolling_max_min_track_window_extrema() {
        let values = vec![5.0, 1.0, 9.0, 3.0, 7.0];
        let maxes = rolling_max(&values, 3, 3);
        assert_eq!(maxes, vec![None, None, Some(9.0), Some(9.0), Some(9.0)]);
        let mins = rolling_min(&values, 3, 3);
        assert_eq!(mins, vec![None, None, Some(1.0), Some(1.0), Some(3.0)]);
    }
}
