//! Field paths addressing nodes of a value tree
#![allow(clippy::must_use_candidate)] // Small accessors read clearly without #[must_use].
#![allow(clippy::return_self_not_must_use)] // Child-path builders are designed for chaining.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object member by name
    Key(String),
    /// Array element by position
    Index(usize),
}

/// Sequence of keys and indices from the root of a value tree.
///
/// Rendered as `personalInfo.fullName`, `tags[2]` or `rows[0].name`; the
/// empty path addresses the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The root path
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from segments
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Parse a dotted/bracketed path string
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] on empty keys, unclosed brackets or
    /// non-numeric indices.
    pub fn parse(input: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut key = String::new();
        let mut chars = input.chars().peekable();
        // Set after `]` so `a[0].b` does not see an empty key before `.`
        let mut after_index = false;

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() && !after_index {
                        return Err(Error::invalid_path(input, "empty key"));
                    }
                    if !key.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut key)));
                    }
                    after_index = false;
                    if chars.peek().is_none() {
                        return Err(Error::invalid_path(input, "trailing '.'"));
                    }
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(PathSegment::Key(std::mem::take(&mut key)));
                    }
                    let mut digits = String::new();
                    let mut closed = false;
                    for d in chars.by_ref() {
                        if d == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(d);
                    }
                    if !closed {
                        return Err(Error::invalid_path(input, "unclosed bracket"));
                    }
                    let index = digits.trim().parse::<usize>().map_err(|_| {
                        Error::invalid_path(input, format!("invalid index '{digits}'"))
                    })?;
                    segments.push(PathSegment::Index(index));
                    after_index = true;
                }
                ']' => return Err(Error::invalid_path(input, "unexpected ']'")),
                other => {
                    if after_index {
                        return Err(Error::invalid_path(input, "expected '.' or '[' after index"));
                    }
                    key.push(other);
                }
            }
        }

        if !key.is_empty() {
            segments.push(PathSegment::Key(key));
        }

        Ok(Self(segments))
    }

    /// Child path under an object key
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    /// Child path under an array index
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// Append all segments of `relative` to this path
    pub fn join(&self, relative: &FieldPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(relative.0.iter().cloned());
        Self(segments)
    }

    /// Push a segment in place
    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    /// Parent path, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Last segment, `None` for the root
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// All segments from the root
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` equals `prefix` or lies below it
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Same path with every index replaced by 0.
    ///
    /// Array elements share a single descriptor, addressed at index 0.
    pub fn normalized(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|s| match s {
                    PathSegment::Index(_) => PathSegment::Index(0),
                    PathSegment::Key(k) => PathSegment::Key(k.clone()),
                })
                .collect(),
        )
    }

    /// Re-key this path after element `removed` of `array` was deleted.
    ///
    /// Returns `None` when the path lies under the removed element, the
    /// path with its index decremented when it lies under a later element,
    /// and an unchanged copy otherwise.
    pub fn shift_after_remove(&self, array: &FieldPath, removed: usize) -> Option<Self> {
        if !self.starts_with(array) || self.len() == array.len() {
            return Some(self.clone());
        }
        match self.0[array.len()] {
            PathSegment::Index(i) if i == removed => None,
            PathSegment::Index(i) if i > removed => {
                let mut segments = self.0.clone();
                segments[array.len()] = PathSegment::Index(i - 1);
                Some(Self(segments))
            }
            _ => Some(self.clone()),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pos, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if pos == 0 => write!(f, "{k}")?,
                PathSegment::Key(k) => write!(f, ".{k}")?,
                PathSegment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Vec<PathSegment>> for FieldPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = FieldPath::parse("personalInfo.fullName").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("personalInfo".to_string()),
                PathSegment::Key("fullName".to_string())
            ]
        );
        assert_eq!(path.to_string(), "personalInfo.fullName");

        let path = FieldPath::parse("rows[3].tags[0]").unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.to_string(), "rows[3].tags[0]");
    }

    #[test]
    fn test_parse_root() {
        let path = FieldPath::parse("").unwrap();
        assert!(path.is_empty());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn test_parse_errors() {
        assert!(FieldPath::parse("a..b").is_err());
        assert!(FieldPath::parse("a.").is_err());
        assert!(FieldPath::parse("a[1").is_err());
        assert!(FieldPath::parse("a[x]").is_err());
        assert!(FieldPath::parse("a[0]b").is_err());
        assert!(FieldPath::parse("a]").is_err());
    }

    #[test]
    fn test_builders() {
        let path = FieldPath::root().key("items").index(2).key("name");
        assert_eq!(path.to_string(), "items[2].name");
        assert_eq!(path.parent().unwrap().to_string(), "items[2]");
        assert_eq!(path.last(), Some(&PathSegment::Key("name".to_string())));
        assert!(path.starts_with(&FieldPath::root().key("items")));
        assert_eq!(path.normalized().to_string(), "items[0].name");
    }

    #[test]
    fn test_shift_after_remove() {
        let array = FieldPath::parse("items").unwrap();

        let before = FieldPath::parse("items[0].name").unwrap();
        let removed = FieldPath::parse("items[1].name").unwrap();
        let after = FieldPath::parse("items[3]").unwrap();
        let outside = FieldPath::parse("other[5]").unwrap();

        assert_eq!(before.shift_after_remove(&array, 1), Some(before.clone()));
        assert_eq!(removed.shift_after_remove(&array, 1), None);
        assert_eq!(
            after.shift_after_remove(&array, 1).unwrap().to_string(),
            "items[2]"
        );
        assert_eq!(outside.shift_after_remove(&array, 1), Some(outside.clone()));
        assert_eq!(array.shift_after_remove(&array, 1), Some(array.clone()));
    }
}
