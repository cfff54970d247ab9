use chrono::{NaiveDate, Weekday};
use weekplan::dates::*;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn test_start_of_week() {
    assert_eq!(start_of_week(d("2025-06-02")), d("2025-06-02"));
    assert_eq!(start_of_week(d("2025-06-04")), d("2025-06-02"));
    assert_eq!(start_of_week(d("2025-06-08")), d("2025-06-02"));
    assert_eq!(start_of_week(d("2025-01-01")), d("2024-12-30"));
}

#[test]
fn test_week_offsets() {
    assert_eq!(week_start_for_offset(d("2025-06-04"), 0), Some(d("2025-06-02")));
    assert_eq!(week_start_for_offset(d("2025-06-04"), 1), Some(d("2025-06-09")));
    assert_eq!(week_start_for_offset(d("2025-06-04"), -1), Some(d("2025-05-26")));
    assert_eq!(add_weeks(d("2025-12-29"), 1), Some(d("2026-01-05")));
}

#[test]
fn test_week_offsets_out_of_range() {
    assert_eq!(add_weeks(d("2025-06-04"), 20_000_000), None);
    assert_eq!(add_weeks(d("2025-06-04"), i64::MIN), None);
    assert_eq!(week_start_for_offset(d("2025-06-04"), 20_000_000), None);
    assert_eq!(week_start_for_offset(d("2025-06-04"), -20_000_000), None);
}

#[test]
fn test_week_dates_and_labels() {
    let dates = week_dates(d("2025-06-02"));
    assert_eq!(dates.len(), 7);
    assert_eq!(dates[6], d("2025-06-08"));
    assert_eq!(weekday_name(dates[0]), "Mon");
    assert_eq!(weekday_name(dates[6]), "Sun");
    assert_eq!(short_date(d("2025-06-02")), "Jun 2");
    assert_eq!(week_range_label(d("2025-06-30")), "Jun 30 – Jul 6");
}

#[test]
fn test_iso_week_number() {
    assert_eq!(iso_week_number(d("2025-06-02")), 23);
    assert_eq!(iso_week_number(d("2024-12-30")), 1);
    assert_eq!(iso_week_number(d("2021-01-03")), 53);
}

#[test]
fn test_weekday_index() {
    assert_eq!(weekday_from_index(0), Some(Weekday::Mon));
    assert_eq!(weekday_from_index(6), Some(Weekday::Sun));
    assert_eq!(weekday_from_index(7), None);
}

#[test]
fn test_holidays() {
    assert_eq!(holiday(d("2025-10-01")), Some("National Day"));
    assert_eq!(holiday(d("2025-01-01")), Some("New Year's Day"));
    assert_eq!(holiday(d("2025-06-03")), None);
    assert_eq!(holiday(d("2023-10-01")), None);
}
