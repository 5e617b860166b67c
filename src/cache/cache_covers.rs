// =============================================================================
// Trading-calendar-aware cache sufficiency check
// =============================================================================
//
// Grounded on data-service/helper_functions.py::cache_covers_request. Accepts
// either an explicit start date or a named period; on any internal error,
// returns false to force a refetch rather than risk serving a stale window.
// =============================================================================

use chrono::{Duration, NaiveDate, Utc};

use super::trading_calendar;

#[derive(Debug, Clone)]
pub struct CacheCoversRequest {
    pub period: Option<String>,
    pub start_date: Option<String>,
}

fn approx_days(period: &str) -> i64 {
    match period {
        "1mo" => 31,
        "3mo" => 92,
        "6mo" => 183,
        "1y" => 365,
        "2y" => 730,
        "5y" => 1826,
        "10y" => 3652,
        _ => 365,
    }
}

fn min_rows(period: &str) -> usize {
    match period {
        "1mo" => 18,
        "3mo" => 55,
        "6mo" => 120,
        "1y" => 240,
        "2y" => 480,
        "5y" => 1200,
        "10y" => 2400,
        _ => 240,
    }
}

/// `cache_dates` must be the cache entry's bar dates (any order); returns
/// false on an empty cache.
pub fn cache_covers_request(cache_dates: &[String], req: &CacheCoversRequest) -> bool {
    if cache_dates.is_empty() {
        return false;
    }

    let parsed: Vec<NaiveDate> = match cache_dates
        .iter()
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(v) if !v.is_empty() => v,
        _ => return false,
    };
    let cache_start = *parsed.iter().min().unwrap();
    let row_count = parsed.len();

    if let Some(req_start) = &req.start_date {
        return match NaiveDate::parse_from_str(req_start, "%Y-%m-%d") {
            Ok(req_start_dt) => cache_start <= req_start_dt,
            Err(_) => false,
        };
    }

    if let Some(period) = &req.period {
        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let approx_start = yesterday - Duration::days(approx_days(period));

        let required_start = match trading_calendar::first_trading_day_on_or_after(approx_start, yesterday) {
            Some(d) => d,
            None => return true, // no trading days expected in range; cache is sufficient
        };

        return cache_start <= required_start || row_count >= min_rows(period);
    }

    // No strict requirement supplied; accept.
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize, start: &str) -> Vec<String> {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap();
        (0..n)
            .map(|i| (start + Duration::days(i as i64)).format("%Y-%m-%d").to_string())
            .collect()
    }

    #[test]
    fn empty_cache_never_covers() {
        let req = CacheCoversRequest { period: Some("1mo".into()), start_date: None };
        assert!(!cache_covers_request(&[], &req));
    }

    #[test]
    fn explicit_start_date_uses_simple_comparison() {
        let cache = dates(10, "2026-01-01");
        let req = CacheCoversRequest { period: None, start_date: Some("2026-01-05".into()) };
        assert!(cache_covers_request(&cache, &req));

        let req2 = CacheCoversRequest { period: None, start_date: Some("2025-12-01".into()) };
        assert!(!cache_covers_request(&cache, &req2));
    }

    #[test]
    fn period_accepted_by_row_count_even_with_late_start() {
        // 250 rows satisfies the 1y min-row bar (240) even if cache_start is recent.
        let cache = dates(250, "2026-01-01");
        let req = CacheCoversRequest { period: Some("1y".into()), start_date: None };
        assert!(cache_covers_request(&cache, &req));
    }

    #[test]
    fn period_rejected_when_neither_boundary_nor_row_count_satisfied() {
        let cache = dates(5, "2026-01-01");
        let req = CacheCoversRequest { period: Some("1y".into()), start_date: None };
        assert!(!cache_covers_request(&cache, &req));
    }
}
