//! Canonical cache path grammar.
//!
//! ```text
//! <type>/<subdir><hash>[-<size>].<ext>
//!
//! type    letters, e.g. "monster" or "gravatar"
//! subdir  zero or more single-character segments, e.g. "1/9/"
//! hash    64 hex digits
//! size    optional pixel size
//! ext     jpg | png | svg
//! ```
//!
//! Matching ignores case.

use crate::error::{ProxyError, ProxyResult};
use crate::generator::{AvatarStyle, OutputFormat};
use regex::{Regex, RegexBuilder};
use std::fmt;

const PATTERN: &str = r"^([a-z]+)/((?:[0-9a-z]/)*)([a-f0-9]{64})(?:-([0-9]+))?\.(jpg|png|svg)$";

/// Largest pixel size a cache path may request.
pub const MAX_SIZE: u32 = 2048;

/// Origin of a cached image, decoded from the path's type segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageKind {
    /// Fetched from the Gravatar service.
    Gravatar,
    /// Uploaded by a user.
    User,
    /// Produced by an avatar generator.
    Avatar(AvatarStyle),
    /// Any other type name; served with the default icon.
    Default(String),
}

impl ImageKind {
    pub fn from_type(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "gravatar" => Self::Gravatar,
            "user" => Self::User,
            _ => match AvatarStyle::from_name(&lower) {
                Some(style) => Self::Avatar(style),
                None => Self::Default(lower),
            },
        }
    }

    /// Whether images of this kind come from outside the engine.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Gravatar | Self::User)
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Gravatar => "gravatar",
            Self::User => "user",
            Self::Avatar(style) => style.as_str(),
            Self::Default(name) => name,
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A parsed cache path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePath {
    pub kind: ImageKind,
    /// Intermediate directories including the trailing slash; may be empty.
    pub subdir: String,
    /// The identity hash, lowercased.
    pub hash: String,
    pub size: u32,
    pub format: OutputFormat,
    /// The path as requested.
    pub relative: String,
}

/// Parses relative cache paths.
#[derive(Debug, Clone)]
pub struct CachePathParser {
    regex: Regex,
    default_size: u32,
}

impl CachePathParser {
    /// Creates a parser that fills in `default_size` when a path has none.
    pub fn new(default_size: u32) -> ProxyResult<Self> {
        let regex = RegexBuilder::new(PATTERN)
            .case_insensitive(true)
            .build()
            .map_err(|e| ProxyError::invalid_path(format!("bad cache path pattern: {e}")))?;
        Ok(Self {
            regex,
            default_size,
        })
    }

    pub fn default_size(&self) -> u32 {
        self.default_size
    }

    pub fn parse(&self, relative: &str) -> ProxyResult<CachePath> {
        let caps = self
            .regex
            .captures(relative)
            .ok_or_else(|| ProxyError::invalid_path(relative))?;

        let size = match caps.get(4) {
            None => self.default_size,
            Some(m) => m
                .as_str()
                .parse::<u32>()
                .ok()
                .filter(|size| (1..=MAX_SIZE).contains(size))
                .ok_or_else(|| ProxyError::invalid_path(relative))?,
        };
        let format = OutputFormat::from_extension(&caps[5])
            .ok_or_else(|| ProxyError::invalid_path(relative))?;

        Ok(CachePath {
            kind: ImageKind::from_type(&caps[1]),
            subdir: caps[2].to_string(),
            hash: caps[3].to_ascii_lowercase(),
            size,
            format,
            relative: relative.to_string(),
        })
    }
}
