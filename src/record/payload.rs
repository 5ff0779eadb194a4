//! Cell payload reconstruction.
//!
//! Given one cell's bytes, reassemble its full payload from the local part
//! and any overflow chain, then decode the payload as a record.

use crate::page::CellLayout;
use crate::record::{OverflowChain, Record};
use crate::storage::PageReader;
use crate::types::{PageId, PageType};
use tracing::debug;

/// A cell with its payload reassembled and decoded
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCell {
    /// Framing of the cell within its page
    pub layout: CellLayout,
    /// Payload bytes: local part plus overflow content, trimmed to the
    /// declared length (shorter if the chain was cut)
    pub payload: Vec<u8>,
    /// Overflow pages the payload was read from, in chain order
    pub overflow_pages: Vec<PageId>,
    /// Decoded record (empty for interior table cells)
    pub record: Record,
    /// Fewer payload bytes were recovered than the cell declares
    pub truncated: bool,
}

/// Decode one cell of a page of type `page_type`.
///
/// `cell` holds the cell's bytes as stored in the page. Nothing here fails:
/// a cut chain or a short cell produces a partial payload with `truncated`
/// set.
pub fn decode_cell(reader: &PageReader, page_type: PageType, cell: &[u8]) -> DecodedCell {
    let layout = CellLayout::parse(page_type, cell, reader.page_size());
    let declared = usize::try_from(layout.payload_len).unwrap_or(usize::MAX);

    let local = layout.local_range();
    let local_end = local.end.min(cell.len());
    let local_start = local.start.min(local_end);
    let mut payload = cell[local_start..local_end].to_vec();
    let mut overflow_pages = Vec::new();

    if let Some(first) = layout.first_overflow {
        let needed = declared.saturating_sub(layout.local_len);
        for page in OverflowChain::new(reader, first, needed) {
            overflow_pages.push(page.pgno);
            payload.extend_from_slice(&page.content);
        }
        payload.truncate(declared);
    }

    let truncated = payload.len() < declared;
    if truncated {
        debug!(
            declared,
            recovered = payload.len(),
            "cell payload shorter than declared"
        );
    }

    let record = if page_type.has_payload() {
        Record::decode(&payload)
    } else {
        Record::default()
    };

    DecodedCell {
        layout,
        payload,
        overflow_pages,
        record,
        truncated,
    }
}
