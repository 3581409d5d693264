//! Drag-and-drop reconciliation
//!
//! Turns a drop gesture into the minimal set of writes: the insertion index
//! comes from the pointer position against the sibling card geometry, and
//! [`resolve_drop`] reduces that to a [`DropPlan`] over the current mirror.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Card, CardId};

/// Gesture state carried from drag-start to drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragState {
    pub board_id: String,
    pub card_id: CardId,
}

/// Vertical geometry of one card element in the drop target, as measured
/// by the presentation layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiblingCard {
    pub card_id: CardId,
    pub top: f64,
    pub height: f64,
}

impl SiblingCard {
    fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Compute the insertion index for a pointer dropped at `pointer_y`.
///
/// The dragged card itself is skipped; the index is the position of the
/// first remaining sibling whose vertical midpoint lies below the pointer,
/// or the end of the list when none does.
#[must_use]
pub fn drop_index(pointer_y: f64, dragged: &CardId, siblings: &[SiblingCard]) -> usize {
    let mut index = 0;
    for sibling in siblings {
        if sibling.card_id == *dragged {
            continue;
        }
        if pointer_y < sibling.midpoint() {
            return index;
        }
        index += 1;
    }
    index
}

/// Arguments of a cross-board move: the moved card plus the complete next
/// id sequence of both boards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCard {
    pub card_id: CardId,
    pub from_board: String,
    pub to_board: String,
    pub next_from_order: Vec<CardId>,
    pub next_to_order: Vec<CardId>,
}

/// The write set one drop gesture reduces to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPlan {
    /// The gesture left the ordering unchanged; nothing to write.
    None,
    /// Same-board drop: persist the full reordered sequence.
    Reorder {
        board_id: String,
        ordered_ids: Vec<CardId>,
    },
    /// Cross-board drop: remove from the source, insert into the target.
    Move(MoveCard),
}

/// Reduce a drop at `index` on `target_board` to a [`DropPlan`] against
/// the current mirror.
///
/// An index past the end of the target list appends. A same-board drop
/// that reproduces the current sequence plans no writes.
#[must_use]
pub fn resolve_drop(
    drag: &DragState,
    target_board: &str,
    index: usize,
    cards: &BTreeMap<String, Vec<Card>>,
) -> DropPlan {
    if drag.board_id == target_board {
        let current = board_ids(cards, target_board);
        let mut next: Vec<CardId> = current
            .iter()
            .filter(|id| **id != drag.card_id)
            .cloned()
            .collect();
        next.insert(index.min(next.len()), drag.card_id.clone());

        if next == current {
            DropPlan::None
        } else {
            DropPlan::Reorder {
                board_id: target_board.to_string(),
                ordered_ids: next,
            }
        }
    } else {
        let next_from: Vec<CardId> = board_ids(cards, &drag.board_id)
            .into_iter()
            .filter(|id| *id != drag.card_id)
            .collect();
        let mut next_to = board_ids(cards, target_board);
        next_to.insert(index.min(next_to.len()), drag.card_id.clone());

        DropPlan::Move(MoveCard {
            card_id: drag.card_id.clone(),
            from_board: drag.board_id.clone(),
            to_board: target_board.to_string(),
            next_from_order: next_from,
            next_to_order: next_to,
        })
    }
}

fn board_ids(cards: &BTreeMap<String, Vec<Card>>, board_id: &str) -> Vec<CardId> {
    cards.get(board_id).map_or_else(Vec::new, |list| {
        list.iter().map(|card| card.id.clone()).collect()
    })
}
