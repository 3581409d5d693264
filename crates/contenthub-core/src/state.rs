//! Application state snapshots
//!
//! The presentation layer renders from immutable [`BoardsState`] values
//! published over a watch channel: intents flow in through
//! [`crate::services::BoardsService`] methods, new snapshots flow out here.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Card, CardId, BOARDS};
use crate::reorder::DragState;

/// Connection lifecycle of the live board feeds.
///
/// Serialized into the snapshot as a `phase` discriminant plus a `notice`
/// message once failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "notice", rename_all = "camelCase")]
pub enum Phase {
    /// Feeds are opening; no snapshot has arrived yet.
    Connecting,
    /// At least one snapshot has been delivered; the mirror tracks the store.
    Ready,
    /// Configuration or a feed failed; all mutations are blocked.
    Failed(String),
}

impl Phase {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Reference to the card currently open in the rich-text editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCard {
    pub board_id: String,
    pub card_id: CardId,
}

/// One immutable snapshot of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardsState {
    /// Cards per board id, ascending by `order`.
    pub cards: BTreeMap<String, Vec<Card>>,
    #[serde(flatten)]
    pub phase: Phase,
    /// Card open in the editor, if any.
    pub editor: Option<ActiveCard>,
    /// Gesture state of an in-flight drag, if any.
    pub drag: Option<DragState>,
}

impl BoardsState {
    /// Initial state: one empty list per known board, feeds still opening.
    #[must_use]
    pub fn connecting() -> Self {
        Self::with_phase(Phase::Connecting)
    }

    /// Degraded state for a missing configuration or a dead feed.
    #[must_use]
    pub fn failed(notice: impl Into<String>) -> Self {
        Self::with_phase(Phase::Failed(notice.into()))
    }

    fn with_phase(phase: Phase) -> Self {
        Self {
            cards: BOARDS
                .iter()
                .map(|board| (board.id.to_string(), Vec::new()))
                .collect(),
            phase,
            editor: None,
            drag: None,
        }
    }

    /// Cards on `board_id`, ascending by `order`.
    #[must_use]
    pub fn board_cards(&self, board_id: &str) -> &[Card] {
        self.cards.get(board_id).map_or(&[], Vec::as_slice)
    }

    /// Find one card in the mirror.
    #[must_use]
    pub fn card(&self, board_id: &str, card_id: &CardId) -> Option<&Card> {
        self.board_cards(board_id)
            .iter()
            .find(|card| card.id == *card_id)
    }

    /// Current id sequence of `board_id`.
    #[must_use]
    pub fn ordered_ids(&self, board_id: &str) -> Vec<CardId> {
        self.board_cards(board_id)
            .iter()
            .map(|card| card.id.clone())
            .collect()
    }

    /// Resolve the editor reference against the mirror.
    ///
    /// Returns `None` when no editor is open or the referenced card no
    /// longer exists on its board.
    #[must_use]
    pub fn editor_card(&self) -> Option<&Card> {
        let active = self.editor.as_ref()?;
        self.card(&active.board_id, &active.card_id)
    }
}

impl Default for BoardsState {
    fn default() -> Self {
        Self::connecting()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn card(id: &str, board: &str, order: i64) -> Card {
        Card {
            id: CardId::new(id),
            board: board.to_string(),
            content: "<p>x</p>".to_string(),
            order,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn connecting_state_has_an_empty_list_per_board() {
        let state = BoardsState::connecting();
        assert_eq!(state.cards.len(), BOARDS.len());
        for board in BOARDS {
            assert!(state.board_cards(board.id).is_empty());
        }
        assert_eq!(state.phase, Phase::Connecting);
    }

    #[test]
    fn unknown_board_reads_as_empty() {
        let state = BoardsState::connecting();
        assert!(state.board_cards("archive").is_empty());
        assert!(state.ordered_ids("archive").is_empty());
    }

    #[test]
    fn ordered_ids_follow_card_order() {
        let mut state = BoardsState::connecting();
        state.cards.insert(
            "ideas".to_string(),
            vec![card("a", "ideas", 0), card("b", "ideas", 1)],
        );

        assert_eq!(
            state.ordered_ids("ideas"),
            vec![CardId::new("a"), CardId::new("b")]
        );
    }

    #[test]
    fn editor_card_resolves_against_the_mirror() {
        let mut state = BoardsState::connecting();
        state
            .cards
            .insert("ideas".to_string(), vec![card("a", "ideas", 0)]);
        state.editor = Some(ActiveCard {
            board_id: "ideas".to_string(),
            card_id: CardId::new("a"),
        });

        assert_eq!(state.editor_card().map(|card| card.id.as_str()), Some("a"));

        state.cards.insert("ideas".to_string(), Vec::new());
        assert_eq!(state.editor_card(), None);
    }

    #[test]
    fn snapshot_serializes_with_a_flat_phase() {
        let json = serde_json::to_string(&BoardsState::failed("feed lost")).unwrap();
        assert!(json.contains("\"phase\":\"failed\""));
        assert!(json.contains("\"notice\":\"feed lost\""));
        assert!(json.contains("\"editor\":null"));

        let json = serde_json::to_string(&BoardsState::connecting()).unwrap();
        assert!(json.contains("\"phase\":\"connecting\""));
        assert!(!json.contains("notice"));
    }

    #[test]
    fn snapshot_serializes_camel_case_drag_state() {
        let mut state = BoardsState::connecting();
        state.drag = Some(DragState {
            board_id: "ideas".to_string(),
            card_id: CardId::new("a"),
        });

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"boardId\":\"ideas\""));
        assert!(json.contains("\"cardId\":\"a\""));
    }
}
