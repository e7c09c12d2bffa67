//! The digital business card record.

use serde::{Deserialize, Serialize};

use super::{CardId, OwnerId};

/// Placeholder shown when a card is created without a name.
pub const DEFAULT_NAME: &str = "Sin nombre";

/// Placeholder shown when a card is created without a company.
pub const DEFAULT_COMPANY: &str = "Empresa";

/// A stored digital business card.
///
/// Cards are created once and never updated in place; the only lifecycle is
/// create → (get | list)* → delete. The `id` is assigned by the server and
/// the `owner_id` is immutable after creation.
///
/// Serialized in camelCase to match the HTTP wire format
/// (`imageData`, `ownerId`, `createdAt`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Server-assigned unique identifier, never client-supplied.
    pub id: CardId,
    /// Display name; defaulted to [`DEFAULT_NAME`] when empty at creation.
    pub name: String,
    /// Company name; defaulted to [`DEFAULT_COMPANY`] when empty at creation.
    pub company: String,
    /// Encoded image payload (opaque text blob, size-bounded at creation).
    pub image_data: String,
    /// Opaque owner token scoping listing and deletion.
    pub owner_id: OwnerId,
    /// Creation instant, milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Input for creating a card.
///
/// All fields are optional at the wire level; the store validates presence
/// of `image_data` and `owner_id` and applies placeholder defaults for the
/// display fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub name: Option<String>,
    pub company: Option<String>,
    pub image_data: Option<String>,
    pub owner_id: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_card_wire_format_is_camel_case() {
        let card = Card {
            id: CardId::new("abc"),
            name: "Ana".to_owned(),
            company: "Acme".to_owned(),
            image_data: "data:image/webp;base64,xyz".to_owned(),
            owner_id: OwnerId::new("owner-1"),
            created_at: 1_700_000_000_000,
        };

        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["imageData"], "data:image/webp;base64,xyz");
        assert_eq!(json["ownerId"], "owner-1");
        assert_eq!(json["createdAt"], 1_700_000_000_000_i64);
    }

    #[test]
    fn test_card_deserializes_from_wire_format() {
        let json = r#"{
            "id": "abc",
            "name": "Ana",
            "company": "Acme",
            "imageData": "blob",
            "ownerId": "owner-1",
            "createdAt": 42
        }"#;

        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.id, CardId::new("abc"));
        assert_eq!(card.created_at, 42);
    }

    #[test]
    fn test_new_card_tolerates_missing_fields() {
        let new: NewCard = serde_json::from_str("{}").unwrap();
        assert!(new.image_data.is_none());
        assert!(new.owner_id.is_none());
    }
}
