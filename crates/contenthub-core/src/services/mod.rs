//! Application services

mod boards;

pub use boards::{BoardsService, NOT_CONFIGURED_NOTICE};
