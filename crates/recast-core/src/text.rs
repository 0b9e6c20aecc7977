//! Text model primitives: file identities and offset regions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for a workspace file.
///
/// Stores treat this as an opaque key; it is usually a workspace-relative path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A contiguous run of UTF-8 byte offsets, `offset..offset + length`.
///
/// There are two containment predicates and they answer different questions:
/// [`Region::covers`] is the closed check ("is this node covered by the edit")
/// while [`Region::encloses`] is the open check ("is this selection strictly
/// inside the node, touching neither boundary"). Pick one deliberately.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Region {
    pub offset: usize,
    pub length: usize,
}

impl Region {
    #[inline]
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Builds a region from a start and an exclusive end.
    pub fn from_bounds(start: usize, end: usize) -> Self {
        assert!(start <= end, "invalid region bounds: {start}..{end}");
        Self {
            offset: start,
            length: end - start,
        }
    }

    /// Zero-length region at `offset`, the shape of an insertion point.
    #[inline]
    pub const fn empty(offset: usize) -> Self {
        Self { offset, length: 0 }
    }

    #[inline]
    pub const fn start(self) -> usize {
        self.offset
    }

    /// Exclusive end.
    #[inline]
    pub const fn end(self) -> usize {
        self.offset + self.length
    }

    /// Offset of the last character, `None` for an empty region.
    #[inline]
    pub fn inclusive_end(self) -> Option<usize> {
        self.end().checked_sub(1).filter(|_| self.length > 0)
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.length
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.length == 0
    }

    /// Closed containment: `self.start <= other.start && other.end <= self.end`.
    #[inline]
    pub fn covers(self, other: Region) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }

    /// Open containment: `self.start < other.start && other.end < self.end`.
    #[inline]
    pub fn encloses(self, other: Region) -> bool {
        self.start() < other.start() && other.end() < self.end()
    }

    /// Whether `offset` addresses a character inside this region.
    #[inline]
    pub fn covers_offset(self, offset: usize) -> bool {
        self.start() <= offset && offset < self.end()
    }

    /// Whether the last character of `self` lies inside `other` while `self` starts
    /// somewhere else.
    pub fn ends_in(self, other: Region) -> bool {
        match self.inclusive_end() {
            Some(last) => other.covers_offset(last) && self.start() < other.start(),
            None => false,
        }
    }

    /// Whether the two regions share at least one character.
    #[inline]
    pub fn overlaps(self, other: Region) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }

    /// Whether one region ends exactly where the other starts.
    #[inline]
    pub fn is_adjacent_to(self, other: Region) -> bool {
        self.end() == other.start() || other.end() == self.start()
    }

    /// The text this region addresses, if it lies on character boundaries inside `text`.
    pub fn slice(self, text: &str) -> Option<&str> {
        text.get(self.start()..self.end())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.offset, self.offset.saturating_add(self.length))
    }
}
