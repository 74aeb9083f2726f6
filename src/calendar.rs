// Ethiopian calendar helpers and fiscal-quarter windows.
//
// Month/day values use the fixed 30-day-month approximation the registry
// dashboards have always shown; fiscal windows are expressed in Gregorian
// dates because reports are stamped in Gregorian time.
use crate::error::AnalyticsError;
use crate::util::parse_i32_safe;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

const MONTH_NAMES: [&str; 13] = [
    "Meskerem", "Tikimt", "Hidar", "Tahsas", "Tir", "Yekatit", "Megabit", "Miazia", "Ginbot",
    "Sene", "Hamle", "Nehase", "Pagume",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EthiopianDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl EthiopianDate {
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("Unknown")
    }
}

impl fmt::Display for EthiopianDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{} E.C.", self.day, self.month, self.year)
    }
}

/// Reporting period: a cumulative quarter or the whole fiscal year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1")]
    Q1,
    #[serde(rename = "2")]
    Q2,
    #[serde(rename = "3")]
    Q3,
    #[serde(rename = "4")]
    Q4,
    #[serde(rename = "yearly")]
    #[default]
    Yearly,
}

impl Period {
    pub const ALL: [Period; 5] = [Period::Q1, Period::Q2, Period::Q3, Period::Q4, Period::Yearly];

    pub fn quarter_number(self) -> Option<u8> {
        match self {
            Period::Q1 => Some(1),
            Period::Q2 => Some(2),
            Period::Q3 => Some(3),
            Period::Q4 => Some(4),
            Period::Yearly => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::Q1 => "Q1 (cumulative)",
            Period::Q2 => "Q2 (cumulative)",
            Period::Q3 => "Q3 (cumulative)",
            Period::Q4 => "Q4 (cumulative)",
            Period::Yearly => "Full year",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quarter_number() {
            Some(q) => write!(f, "{}", q),
            None => write!(f, "yearly"),
        }
    }
}

impl FromStr for Period {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "q1" => Ok(Period::Q1),
            "2" | "q2" => Ok(Period::Q2),
            "3" | "q3" => Ok(Period::Q3),
            "4" | "q4" => Ok(Period::Q4),
            "yearly" => Ok(Period::Yearly),
            _ => Err(AnalyticsError::InvalidPeriod(s.to_string())),
        }
    }
}

/// Gregorian date window, inclusive of both the start and the end calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Any instant on the end date counts; midnight of the following day does not.
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.contains_date(at.date())
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

pub fn is_gregorian_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Ethiopian leap years end with a six-day Pagume.
pub fn is_ethiopian_leap_year(year: i32) -> bool {
    year.rem_euclid(4) == 3
}

pub fn pagume_length(ethiopian_year: i32) -> u32 {
    if is_ethiopian_leap_year(ethiopian_year) {
        6
    } else {
        5
    }
}

// Month/day pairs below exist in every Gregorian year, so the fallback only
// triggers outside chrono's representable range.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Gregorian date of the Ethiopian New Year falling in `gregorian_year`.
pub fn new_year_date(gregorian_year: i32) -> NaiveDate {
    let day = if is_gregorian_leap_year(gregorian_year + 1) {
        12
    } else {
        11
    };
    ymd(gregorian_year, 9, day)
}

pub fn to_ethiopian(date: NaiveDate) -> EthiopianDate {
    let gregorian_year = date.year();
    let this_new_year = new_year_date(gregorian_year);
    let (year, new_year) = if date >= this_new_year {
        (gregorian_year - 7, this_new_year)
    } else {
        (gregorian_year - 8, new_year_date(gregorian_year - 1))
    };

    let elapsed = (date - new_year).num_days().max(0) as u32;
    let month = elapsed / 30 + 1;
    let day = elapsed % 30 + 1;

    if month > 13 || (month == 13 && day > pagume_length(year)) {
        return EthiopianDate {
            year: year + 1,
            month: 1,
            day: 1,
        };
    }
    EthiopianDate { year, month, day }
}

/// Fiscal years accepted from input files and the command line.
pub const FISCAL_YEARS: RangeInclusive<i32> = 1..=9999;

/// Parse and range-check an Ethiopian fiscal year such as `"2017"`.
pub fn parse_fiscal_year(raw: &str) -> Result<i32, AnalyticsError> {
    parse_i32_safe(Some(raw))
        .filter(|year| FISCAL_YEARS.contains(year))
        .ok_or_else(|| AnalyticsError::InvalidFiscalYear(raw.trim().to_string()))
}

pub fn current_ethiopian_year() -> i32 {
    to_ethiopian(Local::now().date_naive()).year
}

/// Cumulative window from the fiscal-year start (Hamle, ~July 1) to the end of
/// the requested quarter.
pub fn quarter_date_range(fiscal_year: i32, period: Period) -> DateRange {
    // out-of-range years saturate and end up on the `ymd` fallback
    let closing_year = fiscal_year.saturating_add(8);
    let opening_year = closing_year.saturating_sub(1);
    let start = ymd(opening_year, 7, 1);
    let end = match period {
        Period::Q1 => ymd(opening_year, 9, 30),
        Period::Q2 => ymd(opening_year, 12, 31),
        Period::Q3 => ymd(closing_year, 3, 31),
        Period::Q4 | Period::Yearly => ymd(closing_year, 6, 30),
    };
    DateRange { start, end }
}

/// Fiscal year whose July–June window contains `date`.
pub fn fiscal_year_for(date: NaiveDate) -> i32 {
    if date.month() >= 7 {
        date.year() - 7
    } else {
        date.year() - 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn new_year_moves_to_twelfth_before_gregorian_leap_year() {
        assert_eq!(new_year_date(2023), d(2023, 9, 12));
        assert_eq!(new_year_date(2024), d(2024, 9, 11));
        assert_eq!(new_year_date(2025), d(2025, 9, 11));
    }

    #[test]
    fn year_changes_across_new_year() {
        for y in 2019..2030 {
            let before = to_ethiopian(d(y, 9, 10));
            let after = to_ethiopian(d(y, 9, 12));
            assert_eq!(before.year + 1, after.year, "gregorian year {}", y);
        }
    }

    #[test]
    fn new_year_day_is_first_of_meskerem() {
        let et = to_ethiopian(d(2024, 9, 11));
        assert_eq!(et, EthiopianDate { year: 2017, month: 1, day: 1 });
        assert_eq!(et.month_name(), "Meskerem");

        let et = to_ethiopian(d(2023, 9, 12));
        assert_eq!(et, EthiopianDate { year: 2016, month: 1, day: 1 });
        // the day before is the last day of the previous leap year's Pagume
        let eve = to_ethiopian(d(2023, 9, 11));
        assert_eq!(eve, EthiopianDate { year: 2015, month: 13, day: 6 });
    }

    #[test]
    fn thirty_day_months() {
        let et = to_ethiopian(d(2024, 10, 11));
        assert_eq!((et.month, et.day), (2, 1));
        let et = to_ethiopian(d(2025, 1, 1));
        assert_eq!(et.year, 2017);
        assert_eq!((et.month, et.day), (4, 23));
    }

    #[test]
    fn quarter_ranges_are_cumulative() {
        let q1 = quarter_date_range(2017, Period::Q1);
        let q3 = quarter_date_range(2017, Period::Q3);
        let yearly = quarter_date_range(2017, Period::Yearly);
        assert_eq!(q1.start, d(2024, 7, 1));
        assert_eq!(q1.end, d(2024, 9, 30));
        assert_eq!(q3.start, q1.start);
        assert_eq!(q3.end, d(2025, 3, 31));
        assert_eq!(yearly, quarter_date_range(2017, Period::Q4));
        assert_eq!(yearly.end, d(2025, 6, 30));
    }

    #[test]
    fn range_includes_whole_end_day() {
        let q2 = quarter_date_range(2017, Period::Q2);
        let late = d(2024, 12, 31).and_hms_opt(23, 59, 59).unwrap();
        let next = d(2025, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        let first = d(2024, 7, 1).and_hms_opt(0, 0, 0).unwrap();
        assert!(q2.contains(late));
        assert!(q2.contains(first));
        assert!(!q2.contains(next));
    }

    #[test]
    fn fiscal_year_for_matches_window() {
        let range = quarter_date_range(2017, Period::Yearly);
        assert_eq!(fiscal_year_for(range.start), 2017);
        assert_eq!(fiscal_year_for(range.end), 2017);
        assert_eq!(fiscal_year_for(d(2025, 7, 1)), 2018);
    }

    #[test]
    fn extreme_fiscal_years_do_not_overflow() {
        for year in [i32::MAX, i32::MAX - 6, i32::MIN] {
            for period in Period::ALL {
                let range = quarter_date_range(year, period);
                assert!(range.start <= range.end);
            }
        }
    }

    #[test]
    fn fiscal_year_input_is_range_checked() {
        assert_eq!(parse_fiscal_year(" 2017 ").unwrap(), 2017);
        assert_eq!(parse_fiscal_year("9999").unwrap(), 9999);
        for raw in ["0", "-5", "10000", "2147483647", "twenty", ""] {
            assert!(
                matches!(parse_fiscal_year(raw), Err(AnalyticsError::InvalidFiscalYear(_))),
                "{:?}",
                raw
            );
        }
    }

    #[test]
    fn period_parsing() {
        assert_eq!(Period::default(), Period::Yearly);
        assert_eq!("yearly".parse::<Period>().unwrap(), Period::Yearly);
        assert_eq!("2".parse::<Period>().unwrap(), Period::Q2);
        assert_eq!("Q3".parse::<Period>().unwrap(), Period::Q3);
        assert!(matches!(
            "5".parse::<Period>(),
            Err(AnalyticsError::InvalidPeriod(_))
        ));
    }
}
