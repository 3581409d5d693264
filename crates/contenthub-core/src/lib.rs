//! contenthub-core - Core library for Content Hub
//!
//! This crate contains the shared models, the document-store interface, and
//! the board synchronization logic used by the Content Hub clients. The
//! rendering layer and the rich-text editing surface live elsewhere; they
//! consume state snapshots from [`services::BoardsService`] and feed user
//! intents back into it.

pub mod config;
pub mod error;
pub mod models;
pub mod reorder;
pub mod services;
pub mod state;
pub mod store;
pub mod text;
pub mod time;

pub use error::{Error, Result};
pub use models::{Board, Card, CardId};
