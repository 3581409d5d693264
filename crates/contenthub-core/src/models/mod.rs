//! Data models for Content Hub

mod board;
mod card;

pub use board::{board_by_id, board_ids, cards_collection, Board, BOARDS};
pub use card::{fields, Card, CardId};
