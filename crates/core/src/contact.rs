//! Contact field masks and shape checks (e-mail, phone, CEP, URL).

use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static e-mail pattern compiles")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^\s/?#.]+(\.[^\s/?#.]+)*(:\d+)?([/?#]\S*)?$")
        .expect("static url pattern compiles")
});

static ZIP_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{5}-\d{3}|\d{8})$").expect("static zip pattern compiles"));

/// Longest phone number accepted by the mask (area code + 9-digit mobile).
pub const PHONE_MAX_DIGITS: usize = 11;

/// Digits in a CEP (Brazilian postal code).
pub const ZIP_CODE_DIGITS: usize = 8;

/// Keep only ASCII digits.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_valid_email(input: &str) -> bool {
    EMAIL.is_match(input)
}

pub fn is_valid_url(input: &str) -> bool {
    URL.is_match(input)
}

/// Accepts `ddddd-ddd` or eight bare digits.
pub fn is_valid_zip_code(input: &str) -> bool {
    ZIP_CODE.is_match(input)
}

/// Phone input mask.
///
/// Digits beyond eleven are discarded. Ten digits format as a landline
/// `(dd) dddd-dddd`, eleven as a mobile `(dd) ddddd-dddd`; anything shorter is
/// left as bare digits until it is complete.
pub fn format_phone(input: &str) -> String {
    let digits: String = digits_only(input).chars().take(PHONE_MAX_DIGITS).collect();
    match digits.len() {
        10 => format!("({}) {}-{}", &digits[..2], &digits[2..6], &digits[6..]),
        11 => format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..]),
        _ => digits,
    }
}

/// CEP input mask: at most eight digits, `ddddd-ddd` once complete.
pub fn format_zip_code(input: &str) -> String {
    let digits: String = digits_only(input).chars().take(ZIP_CODE_DIGITS).collect();
    if digits.len() == ZIP_CODE_DIGITS {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("admin@isp.com.br"));
        assert!(!is_valid_email("admin@isp"));
        assert!(!is_valid_email("admin isp@x.com"));
        assert!(!is_valid_email("@isp.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn url_shape() {
        assert!(is_valid_url("https://isp.com.br"));
        assert!(is_valid_url("http://localhost:8080/path?q=1"));
        assert!(!is_valid_url("isp.com.br"));
        assert!(!is_valid_url("ftp://isp.com.br"));
        assert!(!is_valid_url("https://"));
    }

    #[test]
    fn phone_mask() {
        assert_eq!(format_phone("1133334444"), "(11) 3333-4444");
        assert_eq!(format_phone("11988887777"), "(11) 98888-7777");
        assert_eq!(format_phone("(11) 98888-77776666"), "(11) 98888-7777");
        assert_eq!(format_phone("1198"), "1198");
    }

    #[test]
    fn zip_code_mask_and_shape() {
        assert_eq!(format_zip_code("01310100"), "01310-100");
        assert_eq!(format_zip_code("01310-1009999"), "01310-100");
        assert_eq!(format_zip_code("0131"), "0131");
        assert!(is_valid_zip_code("01310-100"));
        assert!(is_valid_zip_code("01310100"));
        assert!(!is_valid_zip_code("0131-0100"));
    }
}
