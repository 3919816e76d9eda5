use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

/// Order of the captured date fields in a pattern.
#[derive(Debug, Clone, Copy)]
enum FieldOrder {
    YearMonthDay,
    MonthDayYear,
    DayMonthYear,
    DayMonthNameYear,
}

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Explicit pattern families, tried in order after ISO parsing fails.
/// `M/D/Y` precedes `D/M/Y`, so `03/04/2024` reads as March 4th and
/// `31/01/2024` only matches the day-first form.
static PATTERNS: Lazy<Vec<(Regex, FieldOrder)>> = Lazy::new(|| {
    [
        (r"^(\d{4})-(\d{2})-(\d{2})$", FieldOrder::YearMonthDay),
        (
            r"^(\d{4})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})",
            FieldOrder::YearMonthDay,
        ),
        (r"^(\d{1,2})/(\d{1,2})/(\d{4})$", FieldOrder::MonthDayYear),
        (r"^(\d{1,2})-(\d{1,2})-(\d{4})$", FieldOrder::MonthDayYear),
        (r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$", FieldOrder::DayMonthYear),
        (r"^(\d{1,2})/(\d{1,2})/(\d{4})$", FieldOrder::DayMonthYear),
        (r"^(\d{4})/(\d{2})/(\d{2})$", FieldOrder::YearMonthDay),
        (r"^(\d{1,2})\s+([A-Za-z]{3})\s+(\d{4})$", FieldOrder::DayMonthNameYear),
    ]
    .into_iter()
    .map(|(pattern, order)| (Regex::new(pattern).expect("valid date pattern"), order))
    .collect()
});

/// Parse a cell as a date. Returns `None` for anything that is not a real
/// calendar date: `2023-04-31` is rejected rather than rolled into May.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Some(d) = parse_iso_timestamp(value) {
        return Some(d);
    }
    if let Ok(d) = DateTime::parse_from_rfc2822(value) {
        return Some(d.with_timezone(&Utc));
    }
    PATTERNS
        .iter()
        .find_map(|(re, order)| re.captures(value).and_then(|caps| from_captures(&caps, *order)))
}

/// ISO-8601 forms: RFC 3339 with offset, naive date-times, plain dates.
pub fn parse_iso_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(value) {
        return Some(d.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

fn from_captures(caps: &Captures<'_>, order: FieldOrder) -> Option<DateTime<Utc>> {
    let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    let (year, month, day) = match order {
        FieldOrder::YearMonthDay => (num(1)?, num(2)?, num(3)?),
        FieldOrder::MonthDayYear => (num(3)?, num(1)?, num(2)?),
        FieldOrder::DayMonthYear => (num(3)?, num(2)?, num(1)?),
        FieldOrder::DayMonthNameYear => {
            let name = caps.get(2)?.as_str().to_ascii_lowercase();
            let month = MONTH_NAMES.iter().position(|m| *m == name)? as u32 + 1;
            (num(3)?, month, num(1)?)
        }
    };
    // from_ymd_opt is the round-trip check: it refuses day 31 in a 30-day month.
    let date = NaiveDate::from_ymd_opt(year as i32, month, day)?;
    let time = match (num(4), num(5), num(6)) {
        (Some(h), Some(m), Some(s)) => NaiveTime::from_hms_opt(h, m, s)?,
        _ => NaiveTime::MIN,
    };
    Some(date.and_time(time).and_utc())
}

/// Persisted form: `2024-01-15T00:00:00.000Z`.
pub fn format_iso(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn ymd(d: DateTime<Utc>) -> (i32, u32, u32) {
        (d.year(), d.month(), d.day())
    }

    #[test]
    fn parses_iso_dates_and_timestamps() {
        assert_eq!(ymd(parse_date("2023-01-15").unwrap()), (2023, 1, 15));
        let ts = parse_date("2023-01-15T10:30:00Z").unwrap();
        assert_eq!(format_iso(&ts), "2023-01-15T10:30:00.000Z");
        let offset = parse_date("2023-01-15T10:30:00+02:00").unwrap();
        assert_eq!(format_iso(&offset), "2023-01-15T08:30:00.000Z");
    }

    #[test]
    fn parses_pattern_families() {
        assert_eq!(ymd(parse_date("03/04/2024").unwrap()), (2024, 3, 4));
        assert_eq!(ymd(parse_date("3-4-2024").unwrap()), (2024, 3, 4));
        assert_eq!(ymd(parse_date("15.01.2024").unwrap()), (2024, 1, 15));
        assert_eq!(ymd(parse_date("31/01/2024").unwrap()), (2024, 1, 31));
        assert_eq!(ymd(parse_date("2024/02/29").unwrap()), (2024, 2, 29));
        assert_eq!(ymd(parse_date("5 Mar 2024").unwrap()), (2024, 3, 5));
        assert_eq!(ymd(parse_date("5 mar 2024").unwrap()), (2024, 3, 5));
    }

    #[test]
    fn rejects_impossible_calendar_dates() {
        assert!(parse_date("2023-04-31").is_none());
        assert!(parse_date("2023/02/29").is_none());
        assert!(parse_date("31.04.2024").is_none());
        assert!(parse_date("13/13/2024").is_none());
        assert!(parse_date("5 Foo 2024").is_none());
    }

    #[test]
    fn rejects_non_dates() {
        assert!(parse_date("").is_none());
        assert!(parse_date("hello").is_none());
        assert!(parse_date("42").is_none());
    }

    #[test]
    fn iso_output_round_trips() {
        let d = parse_date("07/04/2024").unwrap();
        assert_eq!(parse_iso_timestamp(&format_iso(&d)), Some(d));
    }
}
