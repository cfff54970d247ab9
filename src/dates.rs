use chrono::{Datelike, Days, Duration, NaiveDate, Weekday};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// The Monday on or before `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// `date` moved by `weeks` weeks, or `None` past the calendar's range.
pub fn add_weeks(date: NaiveDate, weeks: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_weeks(weeks)?)
}

/// Monday of the week `offset` weeks away from the week containing `today`.
///
/// `None` when that week does not fit entirely in the representable calendar.
pub fn week_start_for_offset(today: NaiveDate, offset: i64) -> Option<NaiveDate> {
    let date = add_weeks(today, offset)?;
    let back = Days::new(date.weekday().num_days_from_monday() as u64);
    let week_start = date.checked_sub_days(back)?;
    week_start.checked_add_days(Days::new(6))?;
    Some(week_start)
}

/// The seven consecutive dates starting at `week_start`.
pub fn week_dates(week_start: NaiveDate) -> Vec<NaiveDate> {
    (0..7).map(|i| week_start + Duration::days(i)).collect()
}

/// ISO-8601 week number (weeks start on Monday, week 1 holds the first Thursday).
pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Maps 0 (Monday) .. 6 (Sunday) to a weekday.
pub fn weekday_from_index(index: u32) -> Option<Weekday> {
    WEEKDAYS.get(index as usize).copied()
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Short month/day label, e.g. `Jun 2`.
pub fn short_date(date: NaiveDate) -> String {
    format!("{} {}", date.format("%b"), date.day())
}

/// `Jun 2 – Jun 8` for the week starting at `week_start`.
pub fn week_range_label(week_start: NaiveDate) -> String {
    let end = week_start + Duration::days(6);
    format!("{} – {}", short_date(week_start), short_date(end))
}

/// Name of the public holiday falling on `date`, if it is in the table.
///
/// Covers the mainland-China statutory holidays for 2024 through 2026.
pub fn holiday(date: NaiveDate) -> Option<&'static str> {
    let table: &[(u32, u32, &str)] = match date.year() {
        2024 => HOLIDAYS_2024,
        2025 => HOLIDAYS_2025,
        2026 => HOLIDAYS_2026,
        _ => return None,
    };
    table
        .iter()
        .find(|(m, d, _)| *m == date.month() && *d == date.day())
        .map(|(_, _, name)| *name)
}

const NEW_YEAR: &str = "New Year's Day";
const SPRING: &str = "Spring Festival";
const QINGMING: &str = "Qingming Festival";
const LABOUR: &str = "Labour Day";
const DRAGON_BOAT: &str = "Dragon Boat Festival";
const MID_AUTUMN: &str = "Mid-Autumn Festival";
const NATIONAL: &str = "National Day";

const HOLIDAYS_2024: &[(u32, u32, &str)] = &[
    (1, 1, NEW_YEAR),
    (2, 10, SPRING), (2, 11, SPRING), (2, 12, SPRING), (2, 13, SPRING),
    (2, 14, SPRING), (2, 15, SPRING), (2, 16, SPRING), (2, 17, SPRING),
    (4, 4, QINGMING), (4, 5, QINGMING), (4, 6, QINGMING),
    (5, 1, LABOUR), (5, 2, LABOUR), (5, 3, LABOUR), (5, 4, LABOUR), (5, 5, LABOUR),
    (6, 10, DRAGON_BOAT),
    (9, 15, MID_AUTUMN), (9, 16, MID_AUTUMN), (9, 17, MID_AUTUMN),
    (10, 1, NATIONAL), (10, 2, NATIONAL), (10, 3, NATIONAL), (10, 4, NATIONAL),
    (10, 5, NATIONAL), (10, 6, NATIONAL), (10, 7, NATIONAL),
];

const HOLIDAYS_2025: &[(u32, u32, &str)] = &[
    (1, 1, NEW_YEAR),
    (1, 28, SPRING), (1, 29, SPRING), (1, 30, SPRING), (1, 31, SPRING),
    (2, 1, SPRING), (2, 2, SPRING), (2, 3, SPRING), (2, 4, SPRING),
    (4, 4, QINGMING), (4, 5, QINGMING), (4, 6, QINGMING),
    (5, 1, LABOUR), (5, 2, LABOUR), (5, 3, LABOUR), (5, 4, LABOUR), (5, 5, LABOUR),
    (5, 31, DRAGON_BOAT), (6, 1, DRAGON_BOAT), (6, 2, DRAGON_BOAT),
    (10, 1, NATIONAL), (10, 2, NATIONAL), (10, 3, NATIONAL), (10, 4, NATIONAL),
    (10, 5, NATIONAL), (10, 6, NATIONAL), (10, 7, NATIONAL), (10, 8, NATIONAL),
];

const HOLIDAYS_2026: &[(u32, u32, &str)] = &[
    (1, 1, NEW_YEAR), (1, 2, NEW_YEAR), (1, 3, NEW_YEAR),
    (2, 16, SPRING), (2, 17, SPRING), (2, 18, SPRING), (2, 19, SPRING),
    (2, 20, SPRING), (2, 21, SPRING), (2, 22, SPRING), (2, 23, SPRING),
    (4, 4, QINGMING), (4, 5, QINGMING), (4, 6, QINGMING),
    (5, 1, LABOUR), (5, 2, LABOUR), (5, 3, LABOUR), (5, 4, LABOUR), (5, 5, LABOUR),
    (6, 19, DRAGON_BOAT), (6, 20, DRAGON_BOAT), (6, 21, DRAGON_BOAT),
    (10, 1, NATIONAL), (10, 2, NATIONAL), (10, 3, NATIONAL), (10, 4, NATIONAL),
    (10, 5, NATIONAL), (10, 6, NATIONAL), (10, 7, NATIONAL), (10, 8, NATIONAL),
];
