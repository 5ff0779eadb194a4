//! Decoded b-tree pages and the single-slot page decoder.
//!
//! A b-tree page has the following layout:
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │     (page 1 only) 100-byte database header          │
//! ├────────────────────────────────────────────────────┤
//! │                    Page Header                      │
//! ├────────────────────────────────────────────────────┤
//! │                 Cell Pointer Array                  │
//! │  [ptr0][ptr1][ptr2]...      →                      │
//! ├────────────────────────────────────────────────────┤
//! │                   Unused Area                       │
//! ├────────────────────────────────────────────────────┤
//! │          Cell Content Area (with freeblocks)        │
//! │      ←  [cell2][cell1][cell0]                      │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! All offsets recorded on a `Page` are absolute within the page buffer.

use crate::page::{CellLayout, PageAnomaly, PageHeader, Region};
use crate::storage::PageReader;
use crate::types::{decode_be_uint, PageId, PageType};
use tracing::trace;

/// Size of a freeblock header: next pointer and block size
const FREEBLOCK_HEADER: usize = 4;

/// A fully decoded b-tree page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Page number (1-based)
    pub pgno: PageId,
    /// Raw page bytes, exactly one page long
    pub data: Vec<u8>,
    /// Decoded b-tree page header
    pub header: PageHeader,
    /// Bytes occupied by the b-tree page header
    pub header_area: Region,
    /// Bytes occupied by the cell pointer array
    pub cell_index_area: Region,
    /// Cell start offsets, in pointer-array order
    pub cell_pointers: Vec<u16>,
    /// Region of each cell, parallel to `cell_pointers`
    pub cells: Vec<Region>,
    /// Gap between the pointer array and the first cell
    pub unused_area: Region,
    /// Freeblock chain in the cell content area
    pub free_blocks: Vec<Region>,
    /// Structural problems found while decoding
    pub anomalies: Vec<PageAnomaly>,
}

impl Page {
    /// Decode a page from the reader.
    ///
    /// Returns `None` if `pgno` is outside `[1, page_count]`.
    pub fn decode(reader: &PageReader, pgno: PageId) -> Option<Self> {
        let data = reader.read_page(pgno)?;
        Some(Self::from_bytes(pgno, data, reader.page_size()))
    }

    /// Decode a page from bytes already read.
    pub fn from_bytes(pgno: PageId, data: Vec<u8>, page_size: u32) -> Self {
        let base = pgno.btree_header_offset();
        let page_len = data.len();
        let header = PageHeader::read(&data, base);
        let page_type = header.page_type;
        let mut anomalies = Vec::new();

        if let PageType::Corrupt(byte) = page_type {
            anomalies.push(PageAnomaly::CorruptType(byte));
        }

        let header_area = Region::new(base, header.size());
        let index_start = header_area.end();

        let room = page_len.saturating_sub(index_start) / 2;
        let declared = header.cell_count as usize;
        let cell_count = declared.min(room);
        if cell_count < declared {
            anomalies.push(PageAnomaly::CellIndexOverflow {
                declared,
                fits: cell_count,
            });
        }
        let cell_index_area = Region::new(index_start, cell_count * 2);
        let index_end = cell_index_area.end();

        let mut cell_pointers = Vec::with_capacity(cell_count);
        let mut cells = Vec::with_capacity(cell_count);
        for index in 0..cell_count {
            let pointer = decode_be_uint(&data, index_start + index * 2, 2) as u16;
            cell_pointers.push(pointer);

            let offset = pointer as usize;
            if offset < index_end || offset >= page_len {
                anomalies.push(PageAnomaly::CellPointerOutOfBounds { index, offset });
                cells.push(Region::new(offset, 0));
                continue;
            }

            let layout = CellLayout::parse(page_type, &data[offset..], page_size);
            let len = layout.size();
            if offset + len > page_len {
                anomalies.push(PageAnomaly::CellExceedsPage { index });
                cells.push(Region::new(offset, page_len - offset));
            } else {
                cells.push(Region::new(offset, len));
            }
        }

        let content_start = cells
            .iter()
            .filter(|cell| cell.len > 0)
            .map(|cell| cell.offset)
            .min()
            .unwrap_or(page_len);
        let unused_area = Region::new(index_end, content_start.saturating_sub(index_end));

        let free_blocks = read_free_blocks(&data, header.first_freeblock, index_end, &mut anomalies);

        Self {
            pgno,
            data,
            header,
            header_area,
            cell_index_area,
            cell_pointers,
            cells,
            unused_area,
            free_blocks,
            anomalies,
        }
    }

    /// Get the page type
    pub fn page_type(&self) -> PageType {
        self.header.page_type
    }

    /// Number of cells actually decoded (declared count clamped to the page)
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Raw bytes of the cell at `index`, or `None` if out of range
    pub fn cell_bytes(&self, index: usize) -> Option<&[u8]> {
        let region = self.cells.get(index)?;
        self.data.get(region.offset..region.end())
    }

    /// Framing of the cell at `index`
    pub fn cell_layout(&self, index: usize, page_size: u32) -> Option<CellLayout> {
        let region = self.cells.get(index)?;
        if region.len == 0 {
            return None;
        }
        Some(CellLayout::parse(
            self.page_type(),
            &self.data[region.offset..],
            page_size,
        ))
    }

    /// Child page pointers of an interior page as `(child_index, pgno)`, in
    /// order, with the right child last at index `cell_count`. Cells whose
    /// pointer fell outside the page contribute no child. Empty for any
    /// other page type.
    pub fn child_pointers(&self) -> Vec<(usize, PageId)> {
        if !self.page_type().is_interior() {
            return Vec::new();
        }
        let mut children: Vec<(usize, PageId)> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.len > 0)
            .map(|(index, cell)| (index, PageId::new(decode_be_uint(&self.data, cell.offset, 4))))
            .collect();
        children.push((self.cells.len(), self.header.right_child));
        children
    }

    /// Whether the type byte is unknown or the structure is damaged
    pub fn is_corrupt(&self) -> bool {
        !self.anomalies.is_empty()
    }
}

fn read_free_blocks(
    data: &[u8],
    first: u16,
    index_end: usize,
    anomalies: &mut Vec<PageAnomaly>,
) -> Vec<Region> {
    let mut blocks = Vec::new();
    let mut next = first as usize;
    let mut previous = 0usize;

    while next != 0 {
        if next < index_end || next + FREEBLOCK_HEADER > data.len() {
            anomalies.push(PageAnomaly::FreeBlockOutOfBounds { offset: next });
            break;
        }
        if next <= previous {
            anomalies.push(PageAnomaly::FreeBlockLoop { offset: next });
            break;
        }

        let size = decode_be_uint(data, next + 2, 2) as usize;
        blocks.push(Region::new(next, size));

        previous = next;
        next = decode_be_uint(data, next, 2) as usize;
    }

    blocks
}

/// Decoder holding at most one decoded page.
///
/// Decoding a different page replaces the slot. The returned reference
/// borrows the decoder, so a view of one page cannot outlive the decode of
/// the next; copy out what must be kept.
#[derive(Debug, Default)]
pub struct PageDecoder {
    slot: Option<Page>,
}

impl PageDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self { slot: None }
    }

    /// Decode `pgno`, reusing the slot if it already holds that page.
    ///
    /// An out-of-range page number empties the slot and returns `None`.
    pub fn decode(&mut self, reader: &PageReader, pgno: PageId) -> Option<&Page> {
        let cached = self.slot.as_ref().is_some_and(|page| page.pgno == pgno);
        if !cached {
            trace!(%pgno, "decoding page");
            self.slot = Page::decode(reader, pgno);
        }
        self.slot.as_ref()
    }

    /// The page currently held, if any
    pub fn current(&self) -> Option<&Page> {
        self.slot.as_ref()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{ImageBuilder, PageSpec};
    use crate::record::Value;

    const PAGE: u32 = 1024;

    #[test]
    fn test_leaf_page_regions() {
        let mut image = ImageBuilder::new(PAGE);
        image.add_page(PageSpec::leaf_table(vec![
            (1, vec![Value::Integer(10)]),
            (2, vec![Value::Text(b"abc".to_vec())]),
        ]));
        let reader = image.reader();

        let page = Page::decode(&reader, PageId::new(2)).expect("page 2");
        assert_eq!(page.page_type(), PageType::LeafTable);
        assert_eq!(page.header_area, Region::new(0, 8));
        assert_eq!(page.cell_index_area, Region::new(8, 4));
        assert_eq!(page.cell_count(), 2);
        assert!(page.anomalies.is_empty());

        let first_cell = page.cells.iter().map(|c| c.offset).min().unwrap();
        assert_eq!(page.unused_area, Region::new(12, first_cell - 12));
        // cell 0: len varint, rowid varint, record [2, 1, 10]
        assert_eq!(page.cells[0].len, 1 + 1 + 3);
        assert_eq!(page.cell_bytes(0).unwrap(), &[3, 1, 2, 1, 10]);
    }

    #[test]
    fn test_page_one_header_offset() {
        let mut image = ImageBuilder::new(PAGE);
        image.set_schema(vec![]);
        let reader = image.reader();

        let page = Page::decode(&reader, PageId::FIRST).expect("page 1");
        assert_eq!(page.header_area, Region::new(100, 8));
        assert_eq!(page.page_type(), PageType::LeafTable);
        assert_eq!(page.cell_count(), 0);
        assert_eq!(page.unused_area, Region::new(108, PAGE as usize - 108));
    }

    #[test]
    fn test_interior_children() {
        let mut image = ImageBuilder::new(PAGE);
        let leaf_a = image.add_page(PageSpec::leaf_table(vec![(1, vec![])]));
        let leaf_b = image.add_page(PageSpec::leaf_table(vec![(2, vec![])]));
        let root = image.add_page(PageSpec::interior_table(vec![(leaf_a, 1)], leaf_b));
        let reader = image.reader();

        let page = Page::decode(&reader, root).expect("root");
        assert_eq!(page.header_area.len, 12);
        assert_eq!(page.header.right_child, leaf_b);
        assert_eq!(page.child_pointers(), vec![(0, leaf_a), (1, leaf_b)]);
    }

    #[test]
    fn test_bad_cell_pointer_yields_no_child() {
        let mut data = vec![0u8; PAGE as usize];
        data[0] = 0x05;
        data[3..5].copy_from_slice(&1u16.to_be_bytes());
        data[8..12].copy_from_slice(&2u32.to_be_bytes());
        // the only cell pointer aims into the page header
        data[12..14].copy_from_slice(&8u16.to_be_bytes());

        let page = Page::from_bytes(PageId::new(3), data, PAGE);
        assert_eq!(
            page.anomalies,
            vec![PageAnomaly::CellPointerOutOfBounds { index: 0, offset: 8 }]
        );
        assert_eq!(page.child_pointers(), vec![(1, PageId::new(2))]);
    }

    #[test]
    fn test_tiny_page_size_does_not_overflow() {
        let mut data = vec![0u8; 100];
        data[0] = 0x0D;
        data[3..5].copy_from_slice(&1u16.to_be_bytes());
        data[8..10].copy_from_slice(&10u16.to_be_bytes());
        // payload length 180 and rowid 1, each as a padded 8-byte varint
        data[10..18].copy_from_slice(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x81, 0x34]);
        data[18..26].copy_from_slice(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);

        let page = Page::from_bytes(PageId::new(2), data, 100);
        assert_eq!(page.cell_count(), 1);
        let layout = page.cell_layout(0, 100).expect("cell 0");
        assert_eq!(layout.payload_len, 180);
        assert_eq!(layout.rowid, Some(1));
        assert_eq!(layout.local_len, 0);
        assert!(layout.spills());
        assert_eq!(page.cells[0], Region::new(10, 20));
    }

    #[test]
    fn test_free_block_chain() {
        let mut data = vec![0u8; PAGE as usize];
        data[0] = 0x0D;
        data[1..3].copy_from_slice(&200u16.to_be_bytes());
        data[200..202].copy_from_slice(&300u16.to_be_bytes());
        data[202..204].copy_from_slice(&16u16.to_be_bytes());
        data[300..302].copy_from_slice(&0u16.to_be_bytes());
        data[302..304].copy_from_slice(&8u16.to_be_bytes());

        let page = Page::from_bytes(PageId::new(2), data, PAGE);
        assert_eq!(
            page.free_blocks,
            vec![Region::new(200, 16), Region::new(300, 8)]
        );
        assert!(page.anomalies.is_empty());
    }

    #[test]
    fn test_free_block_loop_is_cut() {
        let mut data = vec![0u8; PAGE as usize];
        data[0] = 0x0D;
        data[1..3].copy_from_slice(&200u16.to_be_bytes());
        data[200..202].copy_from_slice(&200u16.to_be_bytes());

        let page = Page::from_bytes(PageId::new(2), data, PAGE);
        assert_eq!(page.free_blocks.len(), 1);
        assert_eq!(page.anomalies, vec![PageAnomaly::FreeBlockLoop { offset: 200 }]);
    }

    #[test]
    fn test_corrupt_type_and_bad_pointers() {
        let mut data = vec![0u8; PAGE as usize];
        data[0] = 0xFF;
        data[3..5].copy_from_slice(&2u16.to_be_bytes());
        data[8..10].copy_from_slice(&4u16.to_be_bytes());
        data[10..12].copy_from_slice(&2000u16.to_be_bytes());

        let page = Page::from_bytes(PageId::new(3), data, PAGE);
        assert_eq!(page.page_type(), PageType::Corrupt(0xFF));
        assert!(page.is_corrupt());
        assert!(page.anomalies.contains(&PageAnomaly::CorruptType(0xFF)));
        assert!(page
            .anomalies
            .contains(&PageAnomaly::CellPointerOutOfBounds { index: 0, offset: 4 }));
        assert!(page
            .anomalies
            .contains(&PageAnomaly::CellPointerOutOfBounds { index: 1, offset: 2000 }));
        assert_eq!(page.cell_bytes(0), Some(&[][..]));
    }

    #[test]
    fn test_oversized_cell_count_is_clamped() {
        let mut data = vec![0u8; 512];
        data[0] = 0x0D;
        data[3..5].copy_from_slice(&u16::MAX.to_be_bytes());

        let page = Page::from_bytes(PageId::new(2), data, 512);
        assert_eq!(page.cell_count(), (512 - 8) / 2);
        assert!(page.anomalies.contains(&PageAnomaly::CellIndexOverflow {
            declared: u16::MAX as usize,
            fits: 252,
        }));
    }

    #[test]
    fn test_decoder_slot_and_idempotence() {
        let mut image = ImageBuilder::new(PAGE);
        let a = image.add_page(PageSpec::leaf_table(vec![(1, vec![Value::Integer(5)])]));
        let b = image.add_page(PageSpec::leaf_index(vec![vec![Value::Integer(5), Value::Integer(1)]]));
        let reader = image.reader();

        let mut decoder = PageDecoder::new();
        let first = decoder.decode(&reader, a).cloned().expect("page a");
        let again = decoder.decode(&reader, a).cloned().expect("page a");
        assert_eq!(first, again);
        assert_eq!(first, Page::decode(&reader, a).unwrap());

        let other = decoder.decode(&reader, b).expect("page b");
        assert_eq!(other.pgno, b);
        assert_eq!(decoder.current().map(|p| p.pgno), Some(b));

        assert!(decoder.decode(&reader, PageId::new(999)).is_none());
        assert!(decoder.current().is_none());
    }
}
