//! Classifier for decoded QR payloads.
//!
//! A scanned QR code carries either a shareable card URL
//! (`<origin>/card/<id>`) or a raw phone number. The scanner UI hands the
//! decoded text here and acts on the classification: open the card, or
//! bridge to a WhatsApp chat.

use url::Url;

use crate::phone;
use crate::types::CardId;

/// What a decoded QR payload turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedPayload {
    /// A shareable card link; carries the card id from the URL path.
    Card(CardId),
    /// A phone number, already sanitized to digits.
    Phone(String),
    /// Neither a card link nor a plausible phone number.
    Unrecognized,
}

/// Classify decoded QR text.
///
/// Card links are checked first: an `http(s)` URL whose path reads
/// `/card/<id>`. Anything else is treated as a phone number candidate and
/// validated; payloads that are neither come back as
/// [`ScannedPayload::Unrecognized`].
#[must_use]
pub fn classify(decoded: &str) -> ScannedPayload {
    let lower = decoded.to_lowercase();
    if lower.starts_with("http") && lower.contains("/card/") {
        if let Some(id) = card_id_from_url(decoded) {
            return ScannedPayload::Card(id);
        }
    }

    let digits = phone::digits_only(decoded);
    if phone::is_valid(&digits) {
        return ScannedPayload::Phone(digits);
    }

    ScannedPayload::Unrecognized
}

/// Extract the card id from a `/card/<id>` URL path, if present.
fn card_id_from_url(text: &str) -> Option<CardId> {
    let url = Url::parse(text).ok()?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some("card"), Some(id)) => Some(CardId::new(id)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_url_is_classified_first() {
        let payload = classify("https://scanbridge.io/card/550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(
            payload,
            ScannedPayload::Card(CardId::new("550e8400-e29b-41d4-a716-446655440000"))
        );
    }

    #[test]
    fn test_card_url_with_trailing_slash() {
        let payload = classify("https://scanbridge.io/card/abc123/");
        assert_eq!(payload, ScannedPayload::Card(CardId::new("abc123")));
    }

    #[test]
    fn test_plain_phone_number() {
        assert_eq!(
            classify("+54 911 1234 5678"),
            ScannedPayload::Phone("5491112345678".to_owned())
        );
    }

    #[test]
    fn test_card_url_without_id_falls_through() {
        // `/card/` with no id is not a card link, and its digits don't form
        // a phone number either.
        assert_eq!(classify("https://scanbridge.io/card/"), ScannedPayload::Unrecognized);
    }

    #[test]
    fn test_unrelated_url_is_unrecognized() {
        assert_eq!(
            classify("https://example.com/about"),
            ScannedPayload::Unrecognized
        );
    }

    #[test]
    fn test_garbage_is_unrecognized() {
        assert_eq!(classify("hello world"), ScannedPayload::Unrecognized);
        assert_eq!(classify(""), ScannedPayload::Unrecognized);
        assert_eq!(classify("123"), ScannedPayload::Unrecognized);
    }
}
