//! Error types for contenthub-core

use thiserror::Error;

/// Result type alias using contenthub-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in contenthub-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Required connection credentials are absent
    #[error("Store is not configured: {0}")]
    ConfigurationMissing(#[from] crate::config::ConfigError),

    /// A live board feed failed to open or stopped delivering snapshots
    #[error("Board feed lost for '{0}'")]
    Subscription(String),

    /// The store rejected a write
    #[error("Remote write failed: {0}")]
    RemoteWrite(String),
}
