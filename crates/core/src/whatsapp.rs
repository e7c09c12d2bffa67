//! WhatsApp deep-link builder.
//!
//! Expands a message template with card fields and composes a `wa.me` link
//! that opens a chat with the scanned number and a pre-filled message.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::phone::{self, PhoneError};

/// Base URL for WhatsApp click-to-chat links.
const WA_BASE: &str = "https://wa.me";

/// Fields available to the message template.
///
/// The template may reference `{name}`, `{title}`, `{company}` and
/// `{website}`; every occurrence is replaced. Missing values expand to the
/// empty string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardConfig {
    pub name: String,
    pub title: String,
    pub company: String,
    pub email: String,
    pub website: String,
    pub message_template: String,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            name: "Alex Rivera".to_owned(),
            title: "Senior Solutions Architect".to_owned(),
            company: "ScanBridge Tech".to_owned(),
            email: "alex@scanbridge.io".to_owned(),
            website: "https://scanbridge.io".to_owned(),
            message_template: "Hi! I just scanned your QR code at the event. \
                Here is my digital business card:\n\n*Name:* {name}\n*Title:* {title}\n\
                *Company:* {company}\n*Website:* {website}\n\nLet's connect!"
                .to_owned(),
        }
    }
}

impl CardConfig {
    /// Expand the message template with this config's fields.
    #[must_use]
    pub fn expand_template(&self) -> String {
        self.message_template
            .replace("{name}", &self.name)
            .replace("{title}", &self.title)
            .replace("{company}", &self.company)
            .replace("{website}", &self.website)
    }
}

/// Build a WhatsApp deep link for `phone` with the templated message.
///
/// The phone is reduced to digits only (`wa.me` links carry no `+`). If the
/// composed URL somehow fails to parse, the link degrades to a phone-only
/// chat without a pre-filled message rather than failing.
///
/// # Errors
///
/// Returns [`PhoneError::InvalidFormat`] when the number does not sanitize
/// to 8-15 digits.
///
/// # Examples
///
/// ```
/// use scanbridge_core::whatsapp::{CardConfig, build_message_link};
///
/// let config = CardConfig {
///     message_template: "Hi {name} from {company}".to_owned(),
///     name: "Ana".to_owned(),
///     company: "Acme".to_owned(),
///     ..CardConfig::default()
/// };
/// let link = build_message_link("+5491112345678", &config).unwrap();
/// assert!(link.starts_with("https://wa.me/5491112345678?text="));
/// ```
pub fn build_message_link(phone: &str, config: &CardConfig) -> Result<String, PhoneError> {
    let clean_phone = phone::digits_only(phone);
    if !phone::is_valid(&clean_phone) {
        return Err(PhoneError::InvalidFormat);
    }

    let message = config.expand_template();
    let encoded = urlencoding::encode(&message);
    let link = format!("{WA_BASE}/{clean_phone}?text={encoded}");

    // Degrade to a phone-only link rather than returning a malformed URL.
    if Url::parse(&link).is_ok() {
        Ok(link)
    } else {
        Ok(format!("{WA_BASE}/{clean_phone}"))
    }
}
