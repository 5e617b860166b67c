// =============================================================================
// VCP contraction detection — C2
// =============================================================================
//
// Grounded on analysis-service/app.py::find_one_contraction /
// find_volatility_contraction_pattern. Two sequential overlapping 5-day-
// window scans (peak, then trough), terminating on `COUNTER_THRESHOLD`
// consecutive misses.
// =============================================================================

const COUNTER_THRESHOLD: u32 = 5;
const WINDOW: usize = 5;

/// A single peak-to-trough contraction. `high_idx < low_idx` and
/// `high_price > low_price` always hold for a value returned here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contraction {
    pub high_idx: usize,
    pub high_price: f64,
    pub low_idx: usize,
    pub low_price: f64,
}

/// argmax over `prices[start..end]`, returning the smallest global index on
/// ties (first occurrence wins, matching Python `list.index`).
fn window_argmax(prices: &[f64], start: usize, end: usize) -> (usize, f64) {
    let mut best_idx = start;
    let mut best_val = prices[start];
    for i in start + 1..end {
        if prices[i] > best_val {
            best_val = prices[i];
            best_idx = i;
        }
    }
    (best_idx, best_val)
}

fn window_argmin(prices: &[f64], start: usize, end: usize) -> (usize, f64) {
    let mut best_idx = start;
    let mut best_val = prices[start];
    for i in start + 1..end {
        if prices[i] < best_val {
            best_val = prices[i];
            best_idx = i;
        }
    }
    (best_idx, best_val)
}

/// Find a single contraction starting the peak scan at `start_index`.
pub fn find_one_contraction(prices: &[f64], start_index: usize) -> Option<Contraction> {
    if start_index >= prices.len() {
        return None;
    }

    // --- Peak scan ---
    let mut local_high = f64::NEG_INFINITY;
    let mut local_high_idx: Option<usize> = None;
    let mut miss_streak: u32 = 0;

    for i in start_index..prices.len() {
        let window_end = (i + WINDOW).min(prices.len());
        if i >= window_end {
            break;
        }
        let (idx, val) = window_argmax(prices, i, window_end);
        if val > local_high {
            local_high = val;
            local_high_idx = Some(idx);
            miss_streak = 0;
        } else {
            miss_streak += 1;
        }
        if miss_streak >= COUNTER_THRESHOLD {
            break;
        }
    }

    let local_high_idx = match (miss_streak >= COUNTER_THRESHOLD, local_high_idx) {
        (true, Some(idx)) => idx,
        _ => return None,
    };

    // --- Trough scan ---
    let mut local_low = f64::INFINITY;
    let mut local_low_idx: Option<usize> = None;
    let mut miss_streak: u32 = 0;

    for j in local_high_idx..prices.len() {
        let window_end = (j + WINDOW).min(prices.len());
        if j >= window_end {
            break;
        }
        let (idx, val) = window_argmin(prices, j, window_end);
        if val < local_low {
            local_low = val;
            local_low_idx = Some(idx);
            miss_streak = 0;
        } else {
            miss_streak += 1;
        }
        if miss_streak >= COUNTER_THRESHOLD {
            break;
        }
    }

    let local_low_idx = match (miss_streak >= COUNTER_THRESHOLD, local_low_idx) {
        (true, Some(idx)) => idx,
        _ => return None,
    };

    if local_high_idx >= local_low_idx || local_high == local_low {
        return None;
    }

    Some(Contraction {
        high_idx: local_high_idx,
        high_price: local_high,
        low_idx: local_low_idx,
        low_price: local_low,
    })
}

/// Iteratively collect non-overlapping contractions with strictly
/// increasing low-indices; guaranteed to terminate since the cursor always
/// advances by at least 1 per iteration.
pub fn find_pattern(prices: &[f64]) -> Vec<Contraction> {
    let mut contractions = Vec::new();
    let mut cursor = 0usize;
    while cursor < prices.len() {
        match find_one_contraction(prices, cursor) {
            Some(c) => {
                cursor = c.low_idx + 1;
                contractions.push(c);
            }
            None => cursor += 1,
        }
    }
    contractions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_36_bar_series_finds_expected_last_contraction() {
        let closes: Vec<f64> = vec![
            100.0, 102.0, 101.0, 103.0, 105.0, 104.0, 102.0, 100.0, 98.0, 96.0, 97.0, 99.0, 101.0,
            103.0, 104.0, 103.0, 101.0, 99.0, 97.0, 95.0, 96.0, 98.0, 100.0, 102.0, 103.0, 102.0,
            100.0, 98.0, 96.0, 94.0, 95.0, 97.0, 99.0, 101.0, 103.0, 105.0,
        ];
        let pattern = find_pattern(&closes);
        let last = *pattern.last().expect("pattern should be non-empty");
        assert_eq!(last.high_idx, 24);
        assert_eq!(last.high_price, 103.0);
        assert_eq!(last.low_idx, 30);
        assert_eq!(last.low_price, 94.0);
    }

    #[test]
    fn ordering_invariant_holds_across_the_pattern() {
        let closes: Vec<f64> = vec![
            100.0, 102.0, 101.0, 103.0, 105.0, 104.0, 102.0, 100.0, 98.0, 96.0, 97.0, 99.0, 101.0,
            103.0, 104.0, 103.0, 101.0, 99.0, 97.0, 95.0, 96.0, 98.0, 100.0, 102.0, 103.0, 102.0,
            100.0, 98.0, 96.0, 94.0, 95.0, 97.0, 99.0, 101.0, 103.0, 105.0,
        ];
        let pattern = find_pattern(&closes);
        for pair in pattern.windows(2) {
            assert!(pair[0].low_idx < pair[1].high_idx);
            assert!(pair[1].high_idx < pair[1].low_idx);
        }
    }

    #[test]
    fn flat_series_never_contracts() {
        let flat = vec![100.0; 40];
        assert!(find_pattern(&flat).is_empty());
    }

    #[test]
    fn empty_series_returns_empty_pattern() {
        assert!(find_pattern(&[]).is_empty());
    }
}
