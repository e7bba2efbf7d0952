//! Visit-date parsing and the "recently active" tier derived from it.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

static KOREAN_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일").expect("valid regex"));

static DOTTED_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2,4})\.(\d{1,2})\.(\d{1,2})\.").expect("valid regex"));

static YEARLESS_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.").expect("valid regex"));

/// Parse the visit date shown on a review.
///
/// Accepts `2025년 1월 24일 금요일`, `24.12.22.` / `2024.12.22.` and `2.22.`
/// (the latter in `today`'s year). Placeholders such as `방문일 없음` or
/// `--` yield `None`.
#[must_use]
pub fn parse_visit_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() || text.contains("방문일") || text.contains("--") {
        return None;
    }

    if let Some(caps) = KOREAN_DATE.captures(text) {
        return ymd(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = DOTTED_DATE.captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let year = if year < 100 { year + 2000 } else { year };
        return NaiveDate::from_ymd_opt(year, caps[2].parse().ok()?, caps[3].parse().ok()?);
    }

    if let Some(caps) = YEARLESS_DATE.captures(text) {
        return NaiveDate::from_ymd_opt(
            today.year(),
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
        );
    }

    None
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Business activity tier from visit dates, relative to `today`:
///
/// | most recent visit within | tier |
/// |---|---|
/// | 14 days | 3 |
/// | 30 days | 2 |
/// | 90 days | 1 |
/// | otherwise, or no dates | 0 |
///
/// Dates after `today` are ignored.
#[must_use]
pub fn running_well_tier(dates: &[NaiveDate], today: NaiveDate) -> u8 {
    let freshest = dates
        .iter()
        .map(|date| (today - *date).num_days())
        .filter(|age| (0..=90).contains(age))
        .min();

    match freshest {
        None => 0,
        Some(age) if age <= 14 => 3,
        Some(age) if age <= 30 => 2,
        Some(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // -----------------------------------------------------------------------
    // parse_visit_date
    // -----------------------------------------------------------------------

    #[test]
    fn parses_korean_long_form() {
        let today = date(2025, 3, 1);
        assert_eq!(
            parse_visit_date("2025년 1월 24일 금요일", today),
            Some(date(2025, 1, 24))
        );
    }

    #[test]
    fn parses_two_and_four_digit_dotted_years() {
        let today = date(2025, 3, 1);
        assert_eq!(parse_visit_date("24.12.22.일", today), Some(date(2024, 12, 22)));
        assert_eq!(parse_visit_date("2024.12.22.", today), Some(date(2024, 12, 22)));
    }

    #[test]
    fn yearless_date_uses_current_year() {
        let today = date(2025, 3, 1);
        assert_eq!(parse_visit_date("2.22.토", today), Some(date(2025, 2, 22)));
    }

    #[test]
    fn placeholders_are_not_dates() {
        let today = date(2025, 3, 1);
        assert_eq!(parse_visit_date("방문일 없음", today), None);
        assert_eq!(parse_visit_date("--", today), None);
        assert_eq!(parse_visit_date("", today), None);
        assert_eq!(parse_visit_date("어제", today), None);
    }

    #[test]
    fn impossible_calendar_dates_are_rejected() {
        let today = date(2025, 3, 1);
        assert_eq!(parse_visit_date("2025년 2월 30일", today), None);
        assert_eq!(parse_visit_date("24.13.01.", today), None);
    }

    // -----------------------------------------------------------------------
    // running_well_tier
    // -----------------------------------------------------------------------

    #[test]
    fn visit_within_two_weeks_is_top_tier() {
        assert_eq!(running_well_tier(&[date(2024, 1, 1)], date(2024, 1, 10)), 3);
    }

    #[test]
    fn visit_older_than_ninety_days_is_no_tier() {
        assert_eq!(running_well_tier(&[date(2023, 1, 1)], date(2024, 1, 10)), 0);
    }

    #[test]
    fn tier_breakpoints_are_inclusive() {
        let today = date(2024, 6, 30);
        assert_eq!(running_well_tier(&[date(2024, 6, 16)], today), 3); // 14 days
        assert_eq!(running_well_tier(&[date(2024, 6, 15)], today), 2); // 15 days
        assert_eq!(running_well_tier(&[date(2024, 5, 31)], today), 2); // 30 days
        assert_eq!(running_well_tier(&[date(2024, 5, 30)], today), 1); // 31 days
        assert_eq!(running_well_tier(&[date(2024, 4, 1)], today), 1); // 90 days
        assert_eq!(running_well_tier(&[date(2024, 3, 31)], today), 0); // 91 days
    }

    #[test]
    fn freshest_date_decides_tier() {
        let today = date(2024, 6, 30);
        let dates = [date(2024, 1, 1), date(2024, 6, 1), date(2024, 6, 25)];
        assert_eq!(running_well_tier(&dates, today), 3);
    }

    #[test]
    fn no_dates_and_future_dates_are_no_tier() {
        let today = date(2024, 6, 30);
        assert_eq!(running_well_tier(&[], today), 0);
        assert_eq!(running_well_tier(&[date(2024, 7, 5)], today), 0);
    }
}
