//! Error types shared by the router and the catalog store.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No registered route template matches the path.
    #[error("no route matches path {0:?}")]
    UnknownPath(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown movie id {0:?}")]
    UnknownMovie(String),

    #[error("duplicate movie id {0:?} in catalog")]
    DuplicateId(String),

    /// Writing the favourites file failed; the in-memory flag was reverted.
    #[error("failed to persist favourites: {0}")]
    Persist(#[source] std::io::Error),

    #[error("failed to encode favourites: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid catalog: {0}")]
    Catalog(#[from] toml::de::Error),

    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
}
