//! Error types for STAC search and asset loading.

use thiserror::Error;

/// Errors produced while talking to a STAC catalog or loading its assets.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("item '{item}' has no asset '{key}'")]
    AssetNotFound { item: String, key: String },

    #[error("invalid STAC item '{item}': {reason}")]
    InvalidItem { item: String, reason: String },

    #[error("core error: {0}")]
    Core(#[from] vistack_core::Error),
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
