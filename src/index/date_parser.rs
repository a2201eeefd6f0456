use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Days between 0001-01-01 and 1970-01-01, the Arrow `Date32` epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
];

/// Parse a `month` cell into a date, dropping any time of day.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, either with a trailing time, and the
/// month-only `YYYY-MM` / `YYYY/MM` (first of the month).
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    // month-only: "2024-01"
    if s.len() == 7 && s.is_ascii() && matches!(&s[4..5], "-" | "/") {
        let year: i32 = s[0..4].parse().ok()?;
        let month: u32 = s[5..7].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }
    None
}

pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepted_formats() {
        assert_eq!(parse_month("2024-01-01"), Some(ymd(2024, 1, 1)));
        assert_eq!(parse_month("2024/03/15"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_month("2024-03-15 18:02:37"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_month("2024-03-15T00:00:00.000"), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_month("\"2024-06\""), Some(ymd(2024, 6, 1)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_month("not a date"), None);
        assert_eq!(parse_month("2024-13-01"), None);
        assert_eq!(parse_month("2024-02-30"), None);
        assert_eq!(parse_month("2024-1"), None);
        assert_eq!(parse_month(""), None);
    }

    #[test]
    fn date32_epoch() {
        assert_eq!(date_to_days(ymd(1970, 1, 1)), 0);
        assert_eq!(date_to_days(ymd(1970, 1, 2)), 1);
        assert_eq!(days_to_date(date_to_days(ymd(2024, 2, 29))), Some(ymd(2024, 2, 29)));
    }
}
