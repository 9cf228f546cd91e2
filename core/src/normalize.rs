//! Cleanup of raw spreadsheet values before they reach the store.

use crate::customer::CustomerGrade;
use chrono::NaiveDate;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Strip everything but digits and hyphenate Korean mobile numbers.
///
/// 11 digits starting with `010` become `010-XXXX-XXXX`, 10 digits starting
/// with `01` become `01X-XXX-XXXX`. Anything else is returned as bare digits.
pub fn clean_phone_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        11 if digits.starts_with("010") => {
            format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..])
        }
        10 if digits.starts_with("01") => {
            format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
        }
        _ => digits,
    }
}

/// Spreadsheet grade label to `CustomerGrade`. Unknown labels map to `None`.
pub fn map_customer_grade(raw: &str) -> CustomerGrade {
    match raw.trim() {
        "VIP" | "vip" => CustomerGrade::Vip,
        "정회원" | "regular" => CustomerGrade::Regular,
        "준회원" | "associate" => CustomerGrade::Associate,
        "신규" | "new" => CustomerGrade::New,
        _ => CustomerGrade::None,
    }
}

/// Parse a spreadsheet date. Blank or malformed values yield `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    // Spreadsheet exports often append a midnight time component.
    let date_part = raw.split_whitespace().next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Visit counts arrive as text, sometimes as "3.0". Blank or garbage is 0.
pub fn parse_visit_count(raw: &str) -> i64 {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_numbers_are_hyphenated() {
        assert_eq!(clean_phone_number("01012345678"), "010-1234-5678");
        assert_eq!(clean_phone_number("010 1234 5678"), "010-1234-5678");
        assert_eq!(clean_phone_number("010-1234-5678"), "010-1234-5678");
        assert_eq!(clean_phone_number("0111234567"), "011-123-4567");
    }

    #[test]
    fn other_numbers_keep_bare_digits() {
        assert_eq!(clean_phone_number("02-123-4567"), "021234567");
        assert_eq!(clean_phone_number("(031) 555 1234"), "0315551234");
        assert_eq!(clean_phone_number(""), "");
    }

    #[test]
    fn grade_labels_map_in_both_languages() {
        assert_eq!(map_customer_grade("VIP"), CustomerGrade::Vip);
        assert_eq!(map_customer_grade(" 정회원 "), CustomerGrade::Regular);
        assert_eq!(map_customer_grade("준회원"), CustomerGrade::Associate);
        assert_eq!(map_customer_grade("신규"), CustomerGrade::New);
        assert_eq!(map_customer_grade("associate"), CustomerGrade::Associate);
        assert_eq!(map_customer_grade("Vip"), CustomerGrade::None);
        assert_eq!(map_customer_grade(""), CustomerGrade::None);
    }

    #[test]
    fn dates_accept_three_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15);
        assert_eq!(parse_date("2024-03-15"), expected);
        assert_eq!(parse_date("2024/03/15"), expected);
        assert_eq!(parse_date("20240315"), expected);
        assert_eq!(parse_date("2024-03-15 00:00:00"), expected);
    }

    #[test]
    fn blank_or_malformed_dates_are_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("next tuesday"), None);
    }

    #[test]
    fn visit_counts_tolerate_spreadsheet_floats() {
        assert_eq!(parse_visit_count("4"), 4);
        assert_eq!(parse_visit_count("3.0"), 3);
        assert_eq!(parse_visit_count(""), 0);
        assert_eq!(parse_visit_count("many"), 0);
    }
}
