// Utility helpers for parsing, rounding and basic statistics.
//
// CSV exports from the registry are hand-edited in spreadsheets, so parsing
// is forgiving here and the rest of the code can assume clean, typed values.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Parse a quantity such as `"1,200"` or `" 40 "` into `u64`.
///
/// Returns `None` for blanks, negatives, fractions and anything containing
/// letters.
pub fn parse_u64_safe(s: Option<&str>) -> Option<u64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<u64>().ok()
}

pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i32>().ok()
}

/// Parse a report timestamp. Accepts RFC 3339 (`2024-10-01T08:30:00Z`),
/// naive `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS`, or a bare date
/// (taken as midnight).
///
/// Offset timestamps keep their local wall-clock time: reports belong to the
/// calendar day of the office that filed them, not to the UTC day.
pub fn parse_timestamp_safe(s: Option<&str>) -> Option<NaiveDateTime> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Round to two decimals, halves away from zero.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `reported / planned` as a percentage with two decimals; 0 when nothing
/// was planned.
pub fn achievement_rate(reported: u64, planned: u64) -> f64 {
    if planned == 0 {
        return 0.0;
    }
    round2(reported as f64 / planned as f64 * 100.0)
}

pub fn average(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Population standard deviation; 0 for an empty slice.
pub fn std_dev(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let mean = average(v);
    let variance = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / v.len() as f64;
    variance.sqrt()
}

pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_tolerate_separators() {
        assert_eq!(parse_u64_safe(Some(" 1,200 ")), Some(1200));
        assert_eq!(parse_u64_safe(Some("")), None);
        assert_eq!(parse_u64_safe(Some("-4")), None);
        assert_eq!(parse_u64_safe(Some("12a")), None);
        assert_eq!(parse_u64_safe(None), None);
    }

    #[test]
    fn timestamps_in_several_shapes() {
        let midnight = NaiveDate::from_ymd_opt(2024, 10, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp_safe(Some("2024-10-01")), Some(midnight));
        assert_eq!(
            parse_timestamp_safe(Some("2024-10-01T08:30:00Z")),
            Some(midnight + chrono::Duration::minutes(510))
        );
        assert_eq!(
            parse_timestamp_safe(Some("2024-10-01 08:30:00")),
            Some(midnight + chrono::Duration::minutes(510))
        );
        assert_eq!(parse_timestamp_safe(Some("01/10/2024")), None);
    }

    #[test]
    fn offset_timestamps_keep_local_day() {
        let at = parse_timestamp_safe(Some("2025-01-01T01:00:00+03:00")).unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap();
        assert_eq!(at, expected);

        let q2 = crate::calendar::quarter_date_range(2017, crate::calendar::Period::Q2);
        assert!(!q2.contains(at));
        let late = parse_timestamp_safe(Some("2024-12-31T23:30:00+03:00")).unwrap();
        assert!(q2.contains(late));
    }

    #[test]
    fn rate_guards_zero_plan() {
        assert_eq!(achievement_rate(300, 500), 60.0);
        assert_eq!(achievement_rate(7, 0), 0.0);
        assert_eq!(achievement_rate(1, 3), 33.33);
        assert!(achievement_rate(600, 500) > 100.0);
    }

    #[test]
    fn population_std_dev() {
        assert_eq!(std_dev(&[]), 0.0);
        assert_eq!(std_dev(&[50.0, 50.0]), 0.0);
        assert_eq!(std_dev(&[40.0, 60.0]), 10.0);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_int(9855), "9,855");
    }
}
