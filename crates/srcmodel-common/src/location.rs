//! Source locations.
//!
//! A location is a byte range inside one version of a document. Locations
//! are leaf data: copies of a declaration share them unchanged, except on
//! the incremental-edit path where a [`DocumentEdit`] maps them from the
//! old document version to the new one.

use serde::Serialize;

/// One version of one source document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Default, PartialOrd, Ord)]
pub struct DocumentId(pub u32);

impl DocumentId {
    /// Synthesized nodes with no source text.
    pub const SYNTHETIC: DocumentId = DocumentId(0);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Default)]
pub struct SourceLocation {
    pub document: DocumentId,
    pub start: u32,
    pub length: u32,
}

impl SourceLocation {
    pub const SYNTHETIC: SourceLocation = SourceLocation {
        document: DocumentId::SYNTHETIC,
        start: 0,
        length: 0,
    };

    pub fn new(document: DocumentId, start: u32, length: u32) -> Self {
        SourceLocation {
            document,
            start,
            length,
        }
    }

    #[inline]
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.length)
    }

    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.document == DocumentId::SYNTHETIC
    }

    /// True when `other` lies entirely inside this location.
    pub fn contains(&self, other: &SourceLocation) -> bool {
        self.document == other.document && self.start <= other.start && other.end() <= self.end()
    }
}

/// A single text replacement turning `before` into `after`.
///
/// `offset..offset + removed` in the old version is replaced by `inserted`
/// bytes in the new version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentEdit {
    pub before: DocumentId,
    pub after: DocumentId,
    pub offset: u32,
    pub removed: u32,
    pub inserted: u32,
}

impl DocumentEdit {
    /// Map a location of the old document version into the new version.
    ///
    /// Locations in other documents are returned unchanged. A location
    /// overlapping the edited range is stretched to cover the inserted text.
    pub fn remap(&self, loc: SourceLocation) -> SourceLocation {
        if loc.document != self.before {
            return loc;
        }
        let edit_end = self.offset.saturating_add(self.removed);
        let (start, end) = if loc.end() <= self.offset {
            (loc.start, loc.end())
        } else if loc.start >= edit_end {
            (self.shift(loc.start), self.shift(loc.end()))
        } else {
            let start = loc.start.min(self.offset);
            let end = if loc.end() > edit_end {
                self.shift(loc.end())
            } else {
                self.offset.saturating_add(self.inserted)
            };
            (start, end)
        };
        SourceLocation::new(self.after, start, end.saturating_sub(start))
    }

    fn shift(&self, pos: u32) -> u32 {
        (pos as i64 + self.inserted as i64 - self.removed as i64).max(0) as u32
    }
}

#[cfg(test)]
#[path = "../tests/location_tests.rs"]
mod tests;
