//! Error types for avatar generation.
//!
//! Generators return [`AvatarResult<T>`]. The façade in
//! [`crate::generator`] contains every variant and reports a plain failure to
//! its caller, so none of these escape a single `build()` call.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for avatar operations.
pub type AvatarResult<T> = Result<T, AvatarError>;

/// All errors that can occur while producing an avatar.
#[derive(Error, Debug)]
pub enum AvatarError {
    // Catalog / selection errors
    #[error("no parts found for category `{category}`")]
    PartsNotFound { category: String },

    #[error("invalid seed `{seed}`: {reason}")]
    InvalidSeed { seed: String, reason: String },

    // Composition errors
    #[error("composition error: {0}")]
    Composition(String),

    // Codec / adapter errors
    #[error("codec error: {0}")]
    Codec(String),

    #[error("{format} output is not supported by the {style} generator")]
    UnsupportedFormat { style: String, format: String },

    // Configuration errors
    #[error("invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("transient store error: {0}")]
    Store(String),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl AvatarError {
    pub fn parts_not_found(category: impl Into<String>) -> Self {
        Self::PartsNotFound {
            category: category.into(),
        }
    }

    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_seed(seed: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSeed {
            seed: seed.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true for catalog/selection failures.
    pub fn is_catalog_error(&self) -> bool {
        matches!(self, Self::PartsNotFound { .. } | Self::InvalidSeed { .. })
    }
}

impl From<image::ImageError> for AvatarError {
    fn from(err: image::ImageError) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Result type alias for cache proxy operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Errors surfaced by the cache proxy.
///
/// An [`InvalidPath`](ProxyError::InvalidPath) is an ordinary miss the host
/// answers with "not found". The other variants end the request.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("not a cache path: {path}")]
    InvalidPath { path: String },

    #[error("could not regenerate {path}")]
    Regeneration { path: String },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Avatar(#[from] AvatarError),
}

impl ProxyError {
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into() }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns true when the request cannot continue.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidPath { .. })
    }
}
