//! Common types used throughout the reader.

mod page_id;
mod varint;

pub use page_id::PageId;
pub use varint::{decode_be_uint, decode_fixed32, decode_varint, encode_varint, varint_len};

use crate::page::{INTERIOR_HEADER_SIZE, LEAF_HEADER_SIZE};
use serde::Serialize;

/// Page size assumed when the file is too short to declare one
pub const DEFAULT_PAGE_SIZE: u32 = 4096;

/// Smallest page size the format allows
pub const MIN_PAGE_SIZE: u32 = 512;

/// Largest page size the format allows
pub const MAX_PAGE_SIZE: u32 = 65536;

/// Whether `size` is a power of two in `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`
pub fn is_legal_page_size(size: u32) -> bool {
    size.is_power_of_two() && (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size)
}

/// B-tree page kind, taken from the first byte of the page header.
///
/// Any byte other than the four defined codes is kept as `Corrupt` so the
/// anomaly can be reported with its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    /// Interior node of an index b-tree (code 2)
    InteriorIndex,
    /// Interior node of a table b-tree (code 5)
    InteriorTable,
    /// Leaf node of an index b-tree (code 10)
    LeafIndex,
    /// Leaf node of a table b-tree (code 13)
    LeafTable,
    /// Unrecognised type byte
    Corrupt(u8),
}

impl PageType {
    /// Convert from the on-disk type byte
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x02 => Self::InteriorIndex,
            0x05 => Self::InteriorTable,
            0x0A => Self::LeafIndex,
            0x0D => Self::LeafTable,
            other => Self::Corrupt(other),
        }
    }

    /// The on-disk type byte
    pub fn code(self) -> u8 {
        match self {
            Self::InteriorIndex => 0x02,
            Self::InteriorTable => 0x05,
            Self::LeafIndex => 0x0A,
            Self::LeafTable => 0x0D,
            Self::Corrupt(b) => b,
        }
    }

    /// Interior pages carry a right-child pointer and child pointers per cell
    pub fn is_interior(self) -> bool {
        matches!(self, Self::InteriorIndex | Self::InteriorTable)
    }

    /// Check if this is a leaf page type
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::LeafIndex | Self::LeafTable)
    }

    /// Table b-tree cells carry a rowid
    pub fn has_rowid(self) -> bool {
        matches!(self, Self::InteriorTable | Self::LeafTable)
    }

    /// Every cell kind except interior-table cells carries a payload
    pub fn has_payload(self) -> bool {
        !matches!(self, Self::InteriorTable)
    }

    /// Cells of these pages may spill into overflow chains
    pub fn may_overflow(self) -> bool {
        matches!(self, Self::InteriorIndex | Self::LeafIndex | Self::LeafTable)
    }

    /// Size of the b-tree page header (12 for interior pages, 8 otherwise)
    pub fn header_len(self) -> usize {
        if self.is_interior() {
            INTERIOR_HEADER_SIZE
        } else {
            LEAF_HEADER_SIZE
        }
    }

    /// Human-readable kind, as used in page descriptions
    pub fn describe(self) -> &'static str {
        match self {
            Self::InteriorIndex => "interior node of index",
            Self::InteriorTable => "interior node of table",
            Self::LeafIndex => "leaf of index",
            Self::LeafTable => "leaf of table",
            Self::Corrupt(_) => "corrupt node",
        }
    }
}

/// Role a page plays in a traversal result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PageRole {
    InteriorIndex,
    InteriorTable,
    LeafIndex,
    LeafTable,
    Overflow,
    Corrupt,
}

impl PageRole {
    /// Short label for listings
    pub fn label(self) -> &'static str {
        match self {
            Self::InteriorIndex => "interior-index",
            Self::InteriorTable => "interior-table",
            Self::LeafIndex => "leaf-index",
            Self::LeafTable => "leaf-table",
            Self::Overflow => "overflow",
            Self::Corrupt => "corrupt",
        }
    }
}

impl From<PageType> for PageRole {
    fn from(page_type: PageType) -> Self {
        match page_type {
            PageType::InteriorIndex => Self::InteriorIndex,
            PageType::InteriorTable => Self::InteriorTable,
            PageType::LeafIndex => Self::LeafIndex,
            PageType::LeafTable => Self::LeafTable,
            PageType::Corrupt(_) => Self::Corrupt,
        }
    }
}
