//! Phone number helpers for the scanner path.
//!
//! Scanned QR payloads are free-form text, so these functions normalize and
//! validate before any link is built. All of them are pure and infallible
//! except where a `Result` is explicit.

use thiserror::Error;

/// Minimum number of digits for a plausible international number.
pub const MIN_DIGITS: usize = 8;

/// Maximum number of digits (ITU-T E.164 limit).
pub const MAX_DIGITS: usize = 15;

/// Errors produced by phone handling.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PhoneError {
    /// The number does not sanitize to 8-15 digits.
    #[error("Formato de número telefónico inválido")]
    InvalidFormat,
}

/// Sanitize a phone number by keeping digits only, preserving a single
/// leading `+` if present.
///
/// Empty or whitespace-only input yields an empty string.
///
/// # Examples
///
/// ```
/// use scanbridge_core::phone::sanitize;
///
/// assert_eq!(sanitize("+54 911 1234-5678"), "+5491112345678");
/// assert_eq!(sanitize("(011) 4321 9876"), "01143219876");
/// assert_eq!(sanitize("   "), "");
/// ```
#[must_use]
pub fn sanitize(phone: &str) -> String {
    let trimmed = phone.trim();
    let plus_prefix = if trimmed.starts_with('+') { "+" } else { "" };
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    format!("{plus_prefix}{digits}")
}

/// Returns the digits of a phone string, dropping everything else
/// (including a leading `+`).
#[must_use]
pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Whether the input contains between 8 and 15 digits (ignoring a `+`
/// prefix and separators).
///
/// # Examples
///
/// ```
/// use scanbridge_core::phone::is_valid;
///
/// assert!(is_valid("+54 911 1234 5678"));
/// assert!(!is_valid("123"));
/// ```
#[must_use]
pub fn is_valid(phone: &str) -> bool {
    let count = phone.chars().filter(char::is_ascii_digit).count();
    (MIN_DIGITS..=MAX_DIGITS).contains(&count)
}

/// Best-effort country label for a number, matched on known international
/// calling-code prefixes in a fixed order.
///
/// This is a display hint, not authoritative parsing: numbers scanned
/// without a country code will mismatch, and that is accepted.
#[must_use]
pub fn country_hint(phone: &str) -> &'static str {
    let clean = digits_only(phone);
    if clean.is_empty() {
        return "Desconocido";
    }
    // Two-digit codes are checked before the NANP '1' so e.g. 54... never
    // falls through to the US/Canada bucket.
    const PREFIXES: &[(&str, &str)] = &[
        ("54", "Argentina"),
        ("52", "México"),
        ("34", "España"),
        ("1", "EE.UU. / Canadá"),
        ("55", "Brasil"),
        ("57", "Colombia"),
        ("51", "Perú"),
        ("56", "Chile"),
    ];
    for (prefix, label) in PREFIXES {
        if clean.starts_with(prefix) {
            return label;
        }
    }
    "Internacional"
}
