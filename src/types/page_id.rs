//! Page number type.

use serde::Serialize;
use std::fmt;

/// Page number within the database file.
///
/// Page numbers are 1-based. Page 0 never exists on disk and is used as the
/// "no page" value in parent links and chain pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct PageId(pub u32);

impl PageId {
    /// The absent page (null pointer, parent of a root page)
    pub const NONE: PageId = PageId(0);

    /// Page 1, which carries the database header and the schema table root
    pub const FIRST: PageId = PageId(1);

    /// Create a new page ID
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw page number
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Check whether this is a real page number (non-zero)
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    /// Byte offset of this page in the file
    pub const fn file_offset(self, page_size: u32) -> u64 {
        (self.0 as u64).saturating_sub(1) * page_size as u64
    }

    /// Offset of the b-tree page header within this page
    pub const fn btree_header_offset(self) -> usize {
        if self.0 == 1 {
            crate::storage::DB_HEADER_SIZE
        } else {
            0
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<PageId> for u32 {
    fn from(id: PageId) -> Self {
        id.0
    }
}
