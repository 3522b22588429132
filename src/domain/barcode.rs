//! GTIN barcode helpers (EAN-13, EAN-8, UPC-A).
//!
//! All three formats share the GS1 mod-10 check digit: starting from the
//! digit left of the check digit and moving left, digits are weighted
//! 3, 1, 3, 1, ...

use crate::config::IN_STORE_BARCODE_PREFIX;
use crate::errors::{AppError, AppResult};

/// Compute the GS1 check digit for a payload of ASCII digits.
///
/// Returns `None` if the payload is empty or contains a non-digit.
pub fn check_digit(payload: &str) -> Option<u8> {
    if payload.is_empty() {
        return None;
    }

    let mut sum: u32 = 0;
    for (i, c) in payload.chars().rev().enumerate() {
        let digit = c.to_digit(10)?;
        let weight = if i % 2 == 0 { 3 } else { 1 };
        sum += digit * weight;
    }

    Some(((10 - (sum % 10)) % 10) as u8)
}

/// Validate a full barcode (payload + check digit).
pub fn is_valid(code: &str) -> bool {
    // ASCII digits only, so byte offsets below are char boundaries
    if !code.bytes().all(|b| b.is_ascii_digit()) || !matches!(code.len(), 8 | 12 | 13) {
        return false;
    }
    let (payload, check) = code.split_at(code.len() - 1);
    match (check_digit(payload), check.chars().next().and_then(|c| c.to_digit(10))) {
        (Some(expected), Some(actual)) => expected as u32 == actual,
        _ => false,
    }
}

/// Validate and normalize user input, trimming surrounding whitespace.
pub fn normalize(code: &str) -> AppResult<String> {
    let trimmed = code.trim();
    if is_valid(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(AppError::validation(format!(
            "Invalid barcode '{}': expected 8, 12 or 13 digits with a valid check digit",
            trimmed
        )))
    }
}

/// Build an in-store EAN-13 from a numeric seed.
///
/// Layout: `200` prefix, 9 payload digits (seed modulo 10^9, zero padded),
/// check digit.
pub fn generate_in_store(seed: u64) -> String {
    let payload = format!("{}{:09}", IN_STORE_BARCODE_PREFIX, seed % 1_000_000_000);
    // payload is all digits, so the check digit always exists
    let check = check_digit(&payload).unwrap_or(0);
    format!("{}{}", payload, check)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ean13() {
        assert!(is_valid("4006381333931"));
        assert!(is_valid("5901234123457"));
        assert!(!is_valid("4006381333932"));
    }

    #[test]
    fn test_known_upc_a_and_ean8() {
        assert!(is_valid("036000291452"));
        assert!(is_valid("96385074"));
        assert!(!is_valid("96385075"));
    }

    #[test]
    fn test_check_digit_rejects_non_digits() {
        assert_eq!(check_digit("12A4"), None);
        assert_eq!(check_digit(""), None);
        assert!(!is_valid("40063813339X1"));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(!is_valid("12345"));
        assert!(!is_valid("12345678901234"));
    }

    #[test]
    fn test_generate_in_store() {
        let code = generate_in_store(42);
        assert_eq!(code.len(), 13);
        assert!(code.starts_with("200000000042"));
        assert!(is_valid(&code));

        let wrapped = generate_in_store(12_345_678_901);
        assert!(wrapped.starts_with("200"));
        assert!(is_valid(&wrapped));
    }

    #[test]
    fn test_multibyte_input_rejected() {
        assert!(!is_valid("123456é"));
        assert!(!is_valid("400638133393٣"));
        assert!(matches!(normalize("123456é"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize(" 4006381333931 ").unwrap(), "4006381333931");
        assert!(normalize("4006381333930").is_err());
    }
}
