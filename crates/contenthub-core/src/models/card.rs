//! Card model and its document encoding

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Document, DocumentSnapshot, FieldValue};
use crate::text::EMPTY_PARAGRAPH;

/// A unique identifier for a card, assigned by the store at creation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    /// Wrap a store-assigned document id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CardId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Document field names used in the cards collections.
pub mod fields {
    pub const BOARD: &str = "board";
    pub const CONTENT: &str = "content";
    pub const ORDER: &str = "order";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// A card on a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Store-assigned identifier, stable across reorders and moves
    pub id: CardId,
    /// Owning board id
    pub board: String,
    /// Sanitized HTML fragment
    pub content: String,
    /// Zero-based position within the board
    pub order: i64,
    /// Stamped by the store's clock; absent until the server resolves it
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Card {
    /// Decode a card from a delivered document.
    ///
    /// Remote documents are schemaless, so missing or mistyped fields fall
    /// back to defaults instead of poisoning the whole board feed.
    #[must_use]
    pub fn from_snapshot(board_id: &str, snapshot: &DocumentSnapshot) -> Self {
        let doc = &snapshot.fields;
        let board = match doc.get(fields::BOARD) {
            Some(FieldValue::Text(value)) => value.clone(),
            _ => board_id.to_string(),
        };
        let content = match doc.get(fields::CONTENT) {
            Some(FieldValue::Text(value)) => value.clone(),
            _ => EMPTY_PARAGRAPH.to_string(),
        };
        let order = match doc.get(fields::ORDER) {
            Some(FieldValue::Integer(value)) => *value,
            _ => 0,
        };

        Self {
            id: CardId::new(snapshot.id.clone()),
            board,
            content,
            order,
            created_at: timestamp(doc, fields::CREATED_AT),
            updated_at: timestamp(doc, fields::UPDATED_AT),
        }
    }
}

/// Read a timestamp field, accepting epoch milliseconds from older writers.
fn timestamp(doc: &Document, name: &str) -> Option<DateTime<Utc>> {
    match doc.get(name) {
        Some(FieldValue::Timestamp(value)) => Some(*value),
        Some(FieldValue::Integer(millis)) => DateTime::from_timestamp_millis(*millis),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(fields_list: Vec<(&str, FieldValue)>) -> DocumentSnapshot {
        DocumentSnapshot {
            id: "card-1".to_string(),
            fields: fields_list
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    #[test]
    fn test_card_id_roundtrip() {
        let id = CardId::new("abc123");
        assert_eq!(id.as_str(), "abc123");
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(CardId::from("abc123"), id);
    }

    #[test]
    fn test_decode_full_document() {
        let stamped = Utc::now();
        let snapshot = snapshot_with(vec![
            (fields::BOARD, FieldValue::Text("drafting".to_string())),
            (fields::CONTENT, FieldValue::Text("<p>hello</p>".to_string())),
            (fields::ORDER, FieldValue::Integer(3)),
            (fields::CREATED_AT, FieldValue::Timestamp(stamped)),
            (fields::UPDATED_AT, FieldValue::Timestamp(stamped)),
        ]);

        let card = Card::from_snapshot("ideas", &snapshot);
        assert_eq!(card.id.as_str(), "card-1");
        assert_eq!(card.board, "drafting");
        assert_eq!(card.content, "<p>hello</p>");
        assert_eq!(card.order, 3);
        assert_eq!(card.created_at, Some(stamped));
    }

    #[test]
    fn test_decode_tolerates_missing_fields() {
        let snapshot = snapshot_with(vec![(fields::ORDER, FieldValue::Integer(1))]);

        let card = Card::from_snapshot("ideas", &snapshot);
        assert_eq!(card.board, "ideas");
        assert_eq!(card.content, EMPTY_PARAGRAPH);
        assert_eq!(card.created_at, None);
        assert_eq!(card.updated_at, None);
    }

    #[test]
    fn test_decode_accepts_epoch_millis() {
        let snapshot = snapshot_with(vec![(
            fields::UPDATED_AT,
            FieldValue::Integer(1_700_000_000_000),
        )]);

        let card = Card::from_snapshot("ideas", &snapshot);
        let updated = card.updated_at.unwrap();
        assert_eq!(updated.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_card_serializes_camel_case() {
        let card = Card {
            id: CardId::new("c1"),
            board: "ideas".to_string(),
            content: "<p>x</p>".to_string(),
            order: 0,
            created_at: None,
            updated_at: None,
        };

        let json = serde_json::to_string(&card).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"updatedAt\""));
        assert!(json.contains("\"id\":\"c1\""));
    }
}
