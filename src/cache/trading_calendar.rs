// =============================================================================
// NYSE trading-calendar approximation
// =============================================================================
//
// A market calendar is needed only to find "the first trading day on or
// after a given approximate start date", used by cache_covers (§4.1). Rather
// than link a full exchange-calendar data file, this approximates NYSE
// sessions as weekdays minus the fixed-date and observed US market
// holidays — adequate for the day-count tolerance cache_covers operates
// under, and it is initialized once per process and reused (§5).
// =============================================================================

use chrono::{Datelike, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

/// Fixed-date US federal holidays NYSE observes (month, day). New Year's,
/// Juneteenth, Independence Day, Christmas — holidays anchored to a weekday
/// (Memorial Day, Labor Day, Thanksgiving, Good Friday) are computed per year.
const FIXED_HOLIDAYS: &[(u32, u32)] = &[(1, 1), (6, 19), (7, 4), (12, 25)];

static CALENDAR: Lazy<RwLock<HashSet<NaiveDate>>> = Lazy::new(|| RwLock::new(HashSet::new()));

fn nth_weekday_of_month(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (7 + weekday.num_days_from_monday() as i64 - first.weekday().num_days_from_monday() as i64) % 7;
    let first_occurrence = first + chrono::Duration::days(offset);
    first_occurrence.checked_add_signed(chrono::Duration::days(7 * (n as i64 - 1)))
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut d = next_month_first.pred_opt()?;
    while d.weekday() != weekday {
        d = d.pred_opt()?;
    }
    Some(d)
}

fn good_friday(year: i32) -> Option<NaiveDate> {
    // Meeus/Jones/Butcher Gregorian Easter algorithm, then back up two days.
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = ((h + l - 7 * m + 114) % 31) + 1;
    let easter = NaiveDate::from_ymd_opt(year, month as u32, day as u32)?;
    easter.checked_sub_signed(chrono::Duration::days(2))
}

fn holidays_for_year(year: i32) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    for &(m, d) in FIXED_HOLIDAYS {
        if let Some(date) = NaiveDate::from_ymd_opt(year, m, d) {
            out.push(date);
        }
    }
    if let Some(d) = nth_weekday_of_month(year, 1, Weekday::Mon, 3) {
        out.push(d); // MLK Day
    }
    if let Some(d) = nth_weekday_of_month(year, 2, Weekday::Mon, 3) {
        out.push(d); // Washington's Birthday
    }
    if let Some(d) = good_friday(year) {
        out.push(d);
    }
    if let Some(d) = last_weekday_of_month(year, 5, Weekday::Mon) {
        out.push(d); // Memorial Day
    }
    if let Some(d) = nth_weekday_of_month(year, 9, Weekday::Mon, 1) {
        out.push(d); // Labor Day
    }
    if let Some(d) = nth_weekday_of_month(year, 11, Weekday::Thu, 4) {
        out.push(d); // Thanksgiving
    }
    out
}

fn is_holiday(date: NaiveDate) -> bool {
    let cal = CALENDAR.read();
    if cal.contains(&date) {
        return true;
    }
    drop(cal);
    let year_holidays = holidays_for_year(date.year());
    let hit = year_holidays.contains(&date);
    CALENDAR.write().extend(year_holidays);
    hit
}

pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !is_holiday(date)
}

/// First NYSE trading day on or after `start`, scanning forward through
/// `end` inclusive. Returns `None` if no trading day falls in the range.
pub fn first_trading_day_on_or_after(start: NaiveDate, end: NaiveDate) -> Option<NaiveDate> {
    let mut d = start;
    while d <= end {
        if is_trading_day(d) {
            return Some(d);
        }
        d = d.succ_opt()?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekends_are_not_trading_days() {
        // 2026-01-03 is a Saturday.
        let sat = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        assert!(!is_trading_day(sat));
    }

    #[test]
    fn new_years_day_is_a_holiday() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(!is_trading_day(d));
    }

    #[test]
    fn first_trading_day_skips_weekend() {
        // 2026-01-03 Sat, 2026-01-04 Sun -> 2026-01-05 Mon.
        let start = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let found = first_trading_day_on_or_after(start, end).unwrap();
        assert_eq!(found, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
    }
}
