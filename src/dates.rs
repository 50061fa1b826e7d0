//! Transaction date parsing.
//!
//! Caller-supplied formats are tried first, in order. When none fits, a
//! fuzzy pass looks for a recognizable date anywhere in the text (so
//! `"Posted 03/04/2023 #991"` still yields a date). Numeric dates are read
//! month-first unless the first field cannot be a month.
//!
//! Nothing here consults the clock: a candidate without an explicit year is
//! rejected rather than completed, so the same input always parses the same.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};

use crate::model::CellValue;

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%a, %d %b %Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Parses a cell; date-typed cells pass straight through.
pub fn parse_date_cell(cell: &CellValue, known_formats: &[String]) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(date) => Some(*date),
        CellValue::Empty => None,
        other => parse_date(&other.as_display(), known_formats),
    }
}

pub fn parse_date(raw: &str, known_formats: &[String]) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    known_formats
        .iter()
        .find_map(|fmt| parse_with_format(value, fmt))
        .or_else(|| parse_fuzzy(value))
}

/// The whole string must match `fmt`; time and offset parts are accepted and
/// discarded. A match outside four-digit years (`%Y` reading `"23"` as year
/// 23) is not a match.
pub fn parse_with_format(value: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, fmt)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, fmt)
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_str(value, fmt)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .filter(plausible_year)
}

fn plausible_year(date: &NaiveDate) -> bool {
    (1000..=9999).contains(&date.year())
}

pub fn parse_fuzzy(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.date_naive());
    }
    // `%Y` also accepts short years, which the embedded search handles better.
    if let Some(date) = FALLBACK_DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .find(plausible_year)
    {
        return Some(date);
    }
    if let Some(date) = FALLBACK_DATETIME_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .find(plausible_year)
    {
        return Some(date);
    }
    search_embedded(value)
}

fn search_embedded(value: &str) -> Option<NaiveDate> {
    first_match(iso_re(), value, |c| {
        ymd(field(c, 1)?, field(c, 2)?, field(c, 3)?)
    })
    .or_else(|| {
        first_match(day_month_name_re(), value, |c| {
            ymd(field(c, 3)?, month_from_name(c.get(2)?.as_str())?, field(c, 1)?)
        })
    })
    .or_else(|| {
        first_match(month_name_day_re(), value, |c| {
            ymd(field(c, 3)?, month_from_name(c.get(1)?.as_str())?, field(c, 2)?)
        })
    })
    .or_else(|| {
        first_match(numeric_re(), value, |c| {
            let first = field(c, 1)?;
            let second = field(c, 2)?;
            let year = expand_year(c.get(3)?.as_str())?;
            ymd(year, first, second).or_else(|| ymd(year, second, first))
        })
    })
    .or_else(|| {
        first_match(compact_re(), value, |c| {
            ymd(field(c, 1)?, field(c, 2)?, field(c, 3)?)
        })
    })
}

fn first_match<F>(re: &Regex, value: &str, build: F) -> Option<NaiveDate>
where
    F: Fn(&Captures<'_>) -> Option<NaiveDate>,
{
    re.captures_iter(value).find_map(|caps| build(&caps))
}

fn field(caps: &Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx)?.as_str().parse().ok()
}

fn ymd(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Two-digit years pivot at 69 the same way `%y` does.
fn expand_year(text: &str) -> Option<u32> {
    let year: u32 = text.parse().ok()?;
    match text.len() {
        4 => Some(year),
        2 if year < 69 => Some(2000 + year),
        2 => Some(1900 + year),
        _ => None,
    }
}

fn month_from_name(word: &str) -> Option<u32> {
    if word.len() < 3 {
        return None;
    }
    let lowered = word.to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| name.starts_with(&lowered))
        .map(|idx| idx as u32 + 1)
}

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b").expect("invalid iso date regex")
    })
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4}|\d{2})\b")
            .expect("invalid numeric date regex")
    })
}

fn day_month_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)?[\s.\-]+([A-Za-z]{3,9})\.?,?[\s.\-]+(\d{4})\b")
            .expect("invalid day-month-name regex")
    })
}

fn month_name_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z]{3,9})\.?[\s.\-]+(\d{1,2})(?:st|nd|rd|th)?,?[\s.\-]+(\d{4})\b")
            .expect("invalid month-name-day regex")
    })
}

fn compact_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})(\d{2})(\d{2})\b").expect("invalid compact date regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn known_formats_are_tried_in_order() {
        let formats = vec!["%d/%m/%Y".to_string(), "%m/%d/%Y".to_string()];
        assert_eq!(parse_date("03/04/2023", &formats), Some(date(2023, 4, 3)));

        let us = vec!["%m/%d/%Y".to_string()];
        assert_eq!(parse_date("03/04/2023", &us), Some(date(2023, 3, 4)));
    }

    #[test]
    fn short_year_under_four_digit_format_falls_back_to_fuzzy() {
        let us = vec!["%m/%d/%Y".to_string()];
        assert_eq!(parse_with_format("03/04/23", "%m/%d/%Y"), None);
        assert_eq!(parse_date("03/04/23", &us), Some(date(2023, 3, 4)));
    }

    #[test]
    fn known_format_accepts_time_components() {
        let formats = vec!["%Y-%m-%d %H:%M".to_string()];
        assert_eq!(parse_date("2024-02-29 13:45", &formats), Some(date(2024, 2, 29)));
    }

    #[test]
    fn blank_input_is_absent() {
        assert_eq!(parse_date("   ", &["%Y-%m-%d".to_string()]), None);
        assert_eq!(parse_date_cell(&CellValue::Empty, &[]), None);
    }

    #[test]
    fn fuzzy_handles_common_layouts() {
        assert_eq!(parse_fuzzy("2023-04-03T10:00:00Z"), Some(date(2023, 4, 3)));
        assert_eq!(parse_fuzzy("Mar 4, 2023"), Some(date(2023, 3, 4)));
        assert_eq!(parse_fuzzy("4 March 2023"), Some(date(2023, 3, 4)));
        assert_eq!(parse_fuzzy("25/12/2022"), Some(date(2022, 12, 25)));
        assert_eq!(parse_fuzzy("20230105"), Some(date(2023, 1, 5)));
    }

    #[test]
    fn fuzzy_finds_dates_inside_text() {
        assert_eq!(
            parse_fuzzy("Posted 03/04/2023 ref 991"),
            Some(date(2023, 3, 4))
        );
        assert_eq!(parse_fuzzy("value date: 5th Jan. 2024"), Some(date(2024, 1, 5)));
        assert_eq!(parse_fuzzy("12/31/99"), Some(date(1999, 12, 31)));
    }

    #[test]
    fn fuzzy_rejects_nonsense_and_yearless_text() {
        assert_eq!(parse_fuzzy("not a date"), None);
        assert_eq!(parse_fuzzy("March 5"), None);
        assert_eq!(parse_fuzzy("13/13/2023"), None);
        assert_eq!(parse_fuzzy("None"), None);
    }

    #[test]
    fn date_cells_pass_through() {
        let d = date(2020, 1, 1);
        assert_eq!(parse_date_cell(&CellValue::Date(d), &[]), Some(d));
    }
}
