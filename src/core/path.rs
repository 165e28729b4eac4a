//! Path module for rtdb-proxy
//!
//! This module defines the Path structure, which represents
//! a location in the hierarchical namespace of a realtime database
//! (e.g. "users/alice/profile"). Paths are only interpreted by the
//! stores; the CRUD proxy forwards raw strings untouched.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between path segments
pub const DELIMITER: char = '/';

/// Maximum length of a single key, in bytes
pub const MAX_KEY_BYTES: usize = 768;

/// Maximum number of segments in a path
pub const MAX_DEPTH: usize = 32;

/// Characters a key may never contain
const FORBIDDEN_CHARS: [char; 6] = ['.', '#', '$', '[', ']', '/'];

/// Errors that can occur when working with paths
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Invalid key `{0}`: keys must not contain '.', '#', '$', '[', ']', '/' or control characters")]
    ForbiddenCharacter(String),
    #[error("Invalid key: keys must not be empty")]
    EmptyKey,
    #[error("Invalid key: keys must not exceed {} bytes", MAX_KEY_BYTES)]
    KeyTooLong,
    #[error("Invalid path `{0}`: paths must not exceed {} segments", MAX_DEPTH)]
    TooDeep(String),
}

/// Check that a single key can name a child in the tree
pub fn validate_key(key: &str) -> Result<(), PathError> {
    if key.is_empty() {
        return Err(PathError::EmptyKey);
    }

    if key.len() > MAX_KEY_BYTES {
        return Err(PathError::KeyTooLong);
    }

    if key.chars().any(|c| FORBIDDEN_CHARS.contains(&c) || c.is_ascii_control()) {
        return Err(PathError::ForbiddenCharacter(key.to_string()));
    }

    Ok(())
}

/// A validated path in the database
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The root of the namespace
    pub fn root() -> Self {
        Path { segments: Vec::new() }
    }

    /// Check if this is the root path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Get the number of segments in the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Get all segments in the path
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment of the path, `None` for the root
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Append the segments of a relative path
    pub fn join(&self, relative: &Path) -> Result<Path, PathError> {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());

        if segments.len() > MAX_DEPTH {
            return Err(PathError::TooDeep(segments.join("/")));
        }

        Ok(Path { segments })
    }

    /// Check if this path starts with the given prefix path
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Key used by flat storages: the segments joined by the delimiter
    pub fn storage_key(&self) -> String {
        self.segments.join("/")
    }
}

/// Parse a string into a Path
impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s
            .split(DELIMITER)
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .collect();

        if segments.len() > MAX_DEPTH {
            return Err(PathError::TooDeep(s.to_string()));
        }

        for segment in &segments {
            validate_key(segment)?;
        }

        Ok(Path { segments })
    }
}

/// Format a Path with slash separators; the root formats as "/"
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }

        write!(f, "{}", self.segments.join("/"))
    }
}
