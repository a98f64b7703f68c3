//! Spanish publication dates.
//!
//! The catalog writes dates either as `DD-MM-YYYY` or with the month in Roman
//! numerals, `DD-<ROMAN>-YYYY` (`18-XI-2025`). Both resolve to the same
//! [`PartialDate`]. Each component is validated on its own: a bad day or an
//! unrecognized month becomes unknown instead of discarding the year.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static DAY_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})-([IVXLivxl]+|\d{1,2})-(\d{4})\b").unwrap());
static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([IVXivx]+|\d{1,2})-(\d{4})\b").unwrap());
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(1[89]\d{2}|20\d{2})\b").unwrap());

const ROMAN_MONTHS: [&str; 12] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII"];

/// A calendar date where any component may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartialDate {
    pub year: Option<u16>,
    pub month: Option<u8>,
    pub day: Option<u8>,
}

impl PartialDate {
    /// True when no component is known.
    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none()
    }
}

/// Parses a whole date string in either Spanish spelling.
///
/// Returns `None` when the text does not have a date shape at all.
///
/// ```rust
/// use tebeo_core::date::parse_spanish_date;
///
/// let numeric = parse_spanish_date("05-11-2025").unwrap();
/// let roman = parse_spanish_date("05-XI-2025").unwrap();
/// assert_eq!(numeric, roman);
/// assert_eq!(roman.month, Some(11));
/// ```
pub fn parse_spanish_date(text: &str) -> Option<PartialDate> {
    let caps = DAY_MONTH_YEAR.captures(text.trim())?;
    if caps.get(0)?.as_str().len() != text.trim().len() {
        return None;
    }
    Some(build(Some(&caps[1]), &caps[2], &caps[3]))
}

/// Finds the first date inside free text such as a distribution row
/// ("18-XI-2025 · 18,00 €").
///
/// Falls back to month-year and then to a bare year.
pub fn find_spanish_date(text: &str) -> Option<PartialDate> {
    if let Some(caps) = DAY_MONTH_YEAR.captures(text) {
        return Some(build(Some(&caps[1]), &caps[2], &caps[3]));
    }
    if let Some(caps) = MONTH_YEAR.captures(text) {
        return Some(build(None, &caps[1], &caps[2]));
    }
    YEAR.captures(text).map(|caps| PartialDate { year: caps[1].parse().ok(), ..Default::default() })
}

/// Maps a Roman numeral month (I–XII, any case) to its number.
pub fn roman_month(token: &str) -> Option<u8> {
    let upper = token.to_ascii_uppercase();
    ROMAN_MONTHS
        .iter()
        .position(|roman| *roman == upper)
        .map(|index| index as u8 + 1)
}

fn build(day: Option<&str>, month: &str, year: &str) -> PartialDate {
    let year = year.parse::<u16>().ok();

    let token = month;
    let month = if token.chars().all(|c| c.is_ascii_digit()) {
        token.parse::<u8>().ok().filter(|m| (1..=12).contains(m))
    } else {
        roman_month(token)
    };
    if month.is_none() {
        tracing::warn!(token, "unrecognized month in date");
    }

    let day = day
        .and_then(|d| d.parse::<u8>().ok())
        .filter(|d| *d >= 1 && *d <= max_day(year, month));

    PartialDate { year, month, day }
}

fn max_day(year: Option<u16>, month: Option<u8>) -> u8 {
    match month {
        Some(4 | 6 | 9 | 11) => 30,
        Some(2) => match year {
            Some(y) if (y % 4 == 0 && y % 100 != 0) || y % 400 == 0 => 29,
            Some(_) => 28,
            None => 29,
        },
        _ => 31,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("05-11-2025")]
    #[case("05-XI-2025")]
    #[case("5-xi-2025")]
    fn test_both_shapes_resolve(#[case] input: &str) {
        let date = parse_spanish_date(input).unwrap();
        assert_eq!(date, PartialDate { year: Some(2025), month: Some(11), day: Some(5) });
    }

    #[rstest]
    #[case("I", Some(1))]
    #[case("IV", Some(4))]
    #[case("IX", Some(9))]
    #[case("XII", Some(12))]
    #[case("XIII", None)]
    #[case("IIII", None)]
    fn test_roman_month(#[case] token: &str, #[case] expected: Option<u8>) {
        assert_eq!(roman_month(token), expected);
    }

    #[test]
    fn test_unknown_month_keeps_year() {
        let date = parse_spanish_date("12-XIV-1999").unwrap();
        assert_eq!(date.year, Some(1999));
        assert_eq!(date.month, None);
        assert_eq!(date.day, Some(12));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let date = parse_spanish_date("31-13-2001").unwrap();
        assert_eq!(date.month, None);
        assert_eq!(date.year, Some(2001));

        let date = parse_spanish_date("31-IV-2001").unwrap();
        assert_eq!(date.month, Some(4));
        assert_eq!(date.day, None);

        let date = parse_spanish_date("00-01-2001").unwrap();
        assert_eq!(date.day, None);
    }

    #[test]
    fn test_leap_day() {
        assert_eq!(parse_spanish_date("29-II-2024").unwrap().day, Some(29));
        assert_eq!(parse_spanish_date("29-II-2023").unwrap().day, None);
    }

    #[test]
    fn test_not_a_date() {
        assert!(parse_spanish_date("sin fecha").is_none());
        assert!(parse_spanish_date("05-11-2025 extra").is_none());
    }

    #[test]
    fn test_find_in_free_text() {
        let date = find_spanish_date("Distribuido el 18-XI-2025 · 18,00 €").unwrap();
        assert_eq!(date, PartialDate { year: Some(2025), month: Some(11), day: Some(18) });

        let date = find_spanish_date("XI-1978").unwrap();
        assert_eq!(date, PartialDate { year: Some(1978), month: Some(11), day: None });

        let date = find_spanish_date("circa 1985").unwrap();
        assert_eq!(date, PartialDate { year: Some(1985), month: None, day: None });
    }
}
