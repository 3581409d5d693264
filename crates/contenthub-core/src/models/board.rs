//! The fixed board set

use serde::Serialize;

/// A fixed column on the hub. Boards are compiled in; users cannot create
/// or delete them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: &'static str,
    /// Column heading shown above the card list
    pub label: &'static str,
    /// Prompt shown in the empty add-card form
    pub placeholder: &'static str,
    /// Short helper line under the add-card form
    pub hint: &'static str,
}

/// Every board, in display order.
pub const BOARDS: &[Board] = &[
    Board {
        id: "ideas",
        label: "Idea Inbox",
        placeholder: "Jot down the next post or video idea...",
        hint: "One idea per card. Plain text is fine.",
    },
    Board {
        id: "drafting",
        label: "In Drafting",
        placeholder: "What are you actively writing?",
        hint: "Drag cards here once work starts.",
    },
    Board {
        id: "shipped",
        label: "Shipped",
        placeholder: "Log a piece that just went live...",
        hint: "The archive of everything published.",
    },
];

/// Look up a board by id.
#[must_use]
pub fn board_by_id(id: &str) -> Option<&'static Board> {
    BOARDS.iter().find(|board| board.id == id)
}

/// Ids of every board, in display order.
pub fn board_ids() -> impl Iterator<Item = &'static str> {
    BOARDS.iter().map(|board| board.id)
}

/// Collection path holding a board's cards.
#[must_use]
pub fn cards_collection(board_id: &str) -> String {
    format!("boards/{board_id}/cards")
}
