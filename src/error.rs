use thiserror::Error;

/// Errors surfaced by record detection.
///
/// The pipeline is deterministic, so every variant describes bad input
/// rather than a transient failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// The encoding scheme name is not one of `tag`, `signature`, `htp` or `structure`.
    #[error("unknown encoding scheme `{0}`, expected one of: tag, signature, htp, structure")]
    InvalidEncoding(String),

    /// A threshold that must be at least 1 was 0.
    #[error("`{name}` must be at least 1, got {value}")]
    InvalidThreshold { name: &'static str, value: usize },

    /// The reference selection used for evaluation matched no nodes.
    #[error("reference selection matched no nodes")]
    EmptyReference,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
