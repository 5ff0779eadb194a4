//! Cell layout and local-payload sizing.
//!
//! A cell is parsed in a fixed order: an optional 4-byte left-child pointer
//! (interior pages), a payload-length varint (every kind except interior
//! table cells), a rowid varint (table pages), the local part of the payload,
//! and a 4-byte overflow pointer when the payload does not fit locally.

use crate::types::{decode_be_uint, decode_varint, PageId, PageType};

/// Number of payload bytes stored inside the page for a payload of
/// `payload_len` bytes on a page of the given type.
///
/// Leaf-table cells may keep up to `page_size - 35` bytes locally; every
/// other kind is limited to `(page_size - 12) * 64 / 255 - 23`. Larger
/// payloads keep `min_local + (len - min_local) % (page_size - 4)` bytes if
/// that does not exceed the maximum, otherwise exactly `min_local`.
///
/// The result always lies in `[0, payload_len]`, even for page sizes too
/// small for the formula to make sense.
pub fn local_payload(page_size: u32, payload_len: i64, page_type: PageType) -> i64 {
    let usable = i64::from(page_size);
    let payload_len = payload_len.max(0);

    let max_local = if page_type == PageType::LeafTable {
        usable - 35
    } else {
        (usable - 12) * 64 / 255 - 23
    };
    let min_local = (usable - 12) * 32 / 255 - 23;

    if payload_len <= max_local {
        return payload_len;
    }

    let surplus = min_local + payload_len.saturating_sub(min_local) % (usable - 4).max(1);
    let local = if surplus <= max_local { surplus } else { min_local };
    local.clamp(0, payload_len)
}

/// Parsed framing of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLayout {
    /// Left child pointer (interior pages only)
    pub left_child: Option<PageId>,
    /// Declared total payload length (0 for interior table cells)
    pub payload_len: i64,
    /// Rowid (table pages only)
    pub rowid: Option<i64>,
    /// Bytes before the payload: child pointer and varints
    pub prefix_len: usize,
    /// Payload bytes stored in the page
    pub local_len: usize,
    /// First overflow page, when the payload spills
    pub first_overflow: Option<PageId>,
}

impl CellLayout {
    /// Parse the framing of a cell starting at the beginning of `bytes`.
    ///
    /// `bytes` runs from the cell start to the end of the page; reads past
    /// its end see zeroes, so a damaged cell still yields a layout.
    pub fn parse(page_type: PageType, bytes: &[u8], page_size: u32) -> Self {
        let mut offset = 0;

        let left_child = if page_type.is_interior() {
            offset += 4;
            Some(PageId::new(decode_be_uint(bytes, 0, 4)))
        } else {
            None
        };

        let (payload_len, local) = if page_type.has_payload() {
            let (len, n) = decode_varint(bytes.get(offset..).unwrap_or(&[]));
            offset += n;
            (len.max(0), local_payload(page_size, len, page_type))
        } else {
            (0, 0)
        };

        let rowid = if page_type.has_rowid() {
            let (rowid, n) = decode_varint(bytes.get(offset..).unwrap_or(&[]));
            offset += n;
            Some(rowid)
        } else {
            None
        };

        let local_len = local as usize;
        let first_overflow = if (local_len as i64) < payload_len {
            Some(PageId::new(decode_be_uint(bytes, offset + local_len, 4)))
        } else {
            None
        };

        Self {
            left_child,
            payload_len,
            rowid,
            prefix_len: offset,
            local_len,
            first_overflow,
        }
    }

    /// Whether the payload continues on overflow pages
    pub fn spills(&self) -> bool {
        self.first_overflow.is_some()
    }

    /// Total bytes this cell occupies in the page, including the overflow
    /// pointer when present
    pub fn size(&self) -> usize {
        self.prefix_len + self.local_len + if self.spills() { 4 } else { 0 }
    }

    /// Range of the local payload within the cell bytes
    pub fn local_range(&self) -> std::ops::Range<usize> {
        self.prefix_len..self.prefix_len + self.local_len
    }
}
