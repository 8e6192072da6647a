//! Document paths
//!
//! This module defines:
//! - PathSegment: Individual path component (Key or Index)
//! - DocPath: Path into a nested document (e.g. `config.moderation.enabled`
//!   or `items.3.quantity`)
//!
//! Paths are an explicit sequence of typed segments rather than strings
//! split at access time; every component that navigates, merges, or
//! compiles paths works on segments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum path depth in segments
///
/// Guards recursive walks against pathological input; checked at parse time.
pub const MAX_PATH_DEPTH: usize = 64;

/// Error type for document path parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Empty key in path
    #[error("empty key in path at position {0}")]
    EmptyKey(usize),
    /// Unclosed bracket
    #[error("unclosed bracket starting at position {0}")]
    UnclosedBracket(usize),
    /// Invalid array index
    #[error("invalid array index at position {0}: {1}")]
    InvalidIndex(usize, String),
    /// Unexpected character
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    /// Path exceeds [`MAX_PATH_DEPTH`]
    #[error("path depth {0} exceeds maximum of {1} segments")]
    TooDeep(usize, usize),
}

/// A segment in a document path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object key: `.foo`
    Key(String),
    /// Array index: `[0]` or a bare numeric segment `.0`
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// A path into a nested document
///
/// Supports object property access, array index access, and nesting:
/// `user.address.city`, `items[0].name`, `items.0.name` (bare numeric
/// segments are indices).
///
/// # Examples
///
/// ```
/// use veneer_core::DocPath;
///
/// let path: DocPath = "items.3.quantity".parse().unwrap();
/// assert_eq!(path.len(), 3);
///
/// let parent: DocPath = "items".parse().unwrap();
/// assert!(parent.is_strict_ancestor_of(&path));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DocPath {
    segments: Vec<PathSegment>,
}

impl DocPath {
    /// Create the empty root path
    pub fn root() -> Self {
        DocPath {
            segments: Vec::new(),
        }
    }

    /// Create a path from a vector of segments
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        DocPath { segments }
    }

    /// Create a single-key path
    pub fn field(name: impl Into<String>) -> Self {
        DocPath {
            segments: vec![PathSegment::Key(name.into())],
        }
    }

    /// Get the path segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Get the number of segments in the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if this is the root path (empty)
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a key segment (builder pattern)
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    /// Append an index segment (builder pattern)
    pub fn index(mut self, idx: usize) -> Self {
        self.segments.push(PathSegment::Index(idx));
        self
    }

    /// Push a segment (mutating)
    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    /// Pop the last segment (mutating)
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    /// Get the parent path (None if root)
    pub fn parent(&self) -> Option<DocPath> {
        if self.segments.is_empty() {
            None
        } else {
            let mut parent = self.clone();
            parent.segments.pop();
            Some(parent)
        }
    }

    /// Get the last segment (None if root)
    pub fn last_segment(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Get the first segment's key, i.e. the top-level column name
    ///
    /// None when the path is empty or starts with an index.
    pub fn first_key(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// Check if this path is an ancestor of another (or equal)
    pub fn is_ancestor_of(&self, other: &DocPath) -> bool {
        if self.segments.len() > other.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| a == b)
    }

    /// Check if this path is a strict ancestor of another (proper prefix)
    pub fn is_strict_ancestor_of(&self, other: &DocPath) -> bool {
        self.segments.len() < other.segments.len() && self.is_ancestor_of(other)
    }

    /// Check if this path is a descendant of another (or equal)
    pub fn is_descendant_of(&self, other: &DocPath) -> bool {
        other.is_ancestor_of(self)
    }

    /// Check if this path is a strict descendant of another
    pub fn is_strict_descendant_of(&self, other: &DocPath) -> bool {
        other.is_strict_ancestor_of(self)
    }

    /// Validate the depth limit
    pub fn validate(&self) -> Result<(), PathParseError> {
        if self.segments.len() > MAX_PATH_DEPTH {
            Err(PathParseError::TooDeep(self.segments.len(), MAX_PATH_DEPTH))
        } else {
            Ok(())
        }
    }

    /// Render the segments after the first as a SQL JSON path expression
    ///
    /// `items.3.quantity` becomes `$[3].quantity` relative to the `items`
    /// column; a single-segment path is just `$` (the column root).
    pub fn sql_json_path(&self) -> String {
        let mut out = String::from("$");
        for segment in self.segments.iter().skip(1) {
            match segment {
                PathSegment::Key(k) => {
                    out.push('.');
                    out.push_str(k);
                }
                PathSegment::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

impl FromStr for DocPath {
    type Err = PathParseError;

    /// Parse a dotted path with optional bracket indices
    ///
    /// `a.b.3.c` and `a.b[3].c` parse to the same segments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = Vec::new();
        let bytes = s.as_bytes();
        let mut pos = 0;
        let mut expect_key = true;

        while pos < bytes.len() {
            match bytes[pos] {
                b'.' => {
                    if expect_key {
                        return Err(PathParseError::EmptyKey(pos));
                    }
                    expect_key = true;
                    pos += 1;
                }
                b'[' => {
                    let close = s[pos..]
                        .find(']')
                        .map(|off| pos + off)
                        .ok_or(PathParseError::UnclosedBracket(pos))?;
                    let digits = &s[pos + 1..close];
                    let idx: usize = digits
                        .parse()
                        .map_err(|_| PathParseError::InvalidIndex(pos + 1, digits.to_string()))?;
                    segments.push(PathSegment::Index(idx));
                    expect_key = false;
                    pos = close + 1;
                }
                b']' => return Err(PathParseError::UnexpectedChar(']', pos)),
                _ => {
                    if !expect_key {
                        return Err(PathParseError::UnexpectedChar(s[pos..].chars().next().unwrap_or('?'), pos));
                    }
                    let end = s[pos..]
                        .find(|c| c == '.' || c == '[')
                        .map(|off| pos + off)
                        .unwrap_or(bytes.len());
                    let raw = &s[pos..end];
                    if raw.is_empty() {
                        return Err(PathParseError::EmptyKey(pos));
                    }
                    // bare numeric segments address array elements
                    match raw.parse::<usize>() {
                        Ok(idx) if raw.bytes().all(|b| b.is_ascii_digit()) => {
                            segments.push(PathSegment::Index(idx));
                        }
                        _ => segments.push(PathSegment::Key(raw.to_string())),
                    }
                    expect_key = false;
                    pos = end;
                }
            }
        }
        if expect_key && !s.is_empty() {
            return Err(PathParseError::EmptyKey(bytes.len()));
        }

        let path = DocPath { segments };
        path.validate()?;
        Ok(path)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
            first = false;
        }
        Ok(())
    }
}
