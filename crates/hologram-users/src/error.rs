//! Error types for the user cache.

use hologram_directory::DirectoryError;

/// Errors that can occur while loading or consulting the user cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The directory search behind a refresh failed.
    /// The previous generation of users stays in place.
    #[error("user cache refresh failed: {0}")]
    Directory(#[from] DirectoryError),
}
