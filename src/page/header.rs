//! B-tree page header.
//!
//! The page header occupies the first bytes of each b-tree page (after the
//! 100-byte database header on page 1) and describes the page contents.

use crate::types::{decode_be_uint, PageId, PageType};

/// Size of the page header for leaf pages (no right child pointer)
pub const LEAF_HEADER_SIZE: usize = 8;

/// Size of the page header for interior pages (includes right child pointer)
pub const INTERIOR_HEADER_SIZE: usize = 12;

/// Page header structure
///
/// Layout (for leaf pages, 8 bytes):
/// ```text
/// Offset  Size  Description
/// 0       1     Page type flag
/// 1       2     Offset to first freeblock (0 if none)
/// 3       2     Number of cells on this page
/// 5       2     Offset to start of cell content area
/// 7       1     Number of fragmented free bytes
/// ```
///
/// For interior pages, add 4 bytes at offset 8:
/// ```text
/// 8       4     Right-most child page pointer
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Type of this page (leaf, interior, or corrupt)
    pub page_type: PageType,
    /// Offset to the first freeblock, or 0 if there are no freeblocks
    pub first_freeblock: u16,
    /// Number of cells declared on this page
    pub cell_count: u16,
    /// Offset to the start of the cell content area
    pub cell_content_start: u16,
    /// Number of fragmented free bytes within the cell content area
    pub fragmented_bytes: u8,
    /// Right-most child pointer (`PageId::NONE` for non-interior pages)
    pub right_child: PageId,
}

impl PageHeader {
    /// Read a page header starting at `base` within the page bytes.
    ///
    /// Never fails: bytes past the end of the page read as zero and an
    /// unknown type byte becomes `PageType::Corrupt`.
    pub fn read(page: &[u8], base: usize) -> Self {
        let page_type = PageType::from_byte(page.get(base).copied().unwrap_or(0));

        let right_child = if page_type.is_interior() {
            PageId::new(decode_be_uint(page, base + 8, 4))
        } else {
            PageId::NONE
        };

        Self {
            page_type,
            first_freeblock: decode_be_uint(page, base + 1, 2) as u16,
            cell_count: decode_be_uint(page, base + 3, 2) as u16,
            cell_content_start: decode_be_uint(page, base + 5, 2) as u16,
            fragmented_bytes: decode_be_uint(page, base + 7, 1) as u8,
            right_child,
        }
    }

    /// Get the size of this header in bytes
    pub fn size(&self) -> usize {
        self.page_type.header_len()
    }
}
