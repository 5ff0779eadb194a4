//! Overflow page chains.
//!
//! Each overflow page starts with a 4-byte pointer to the next page in the
//! chain (0 ends it); the remaining `page_size - 4` bytes continue the
//! payload.

use crate::storage::PageReader;
use crate::types::{decode_fixed32, PageId};
use tracing::debug;

/// One page of an overflow chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowPage {
    /// Page number of this link
    pub pgno: PageId,
    /// 1-based position in the chain
    pub position: u32,
    /// Payload bytes taken from this page (empty when content is not read)
    pub content: Vec<u8>,
}

/// Iterator over the pages of one overflow chain.
///
/// The walk ends at a null pointer, once `remaining` payload bytes have been
/// covered, at an out-of-range page number, or after `page_count` pages,
/// whichever comes first.
pub struct OverflowChain<'a> {
    reader: &'a PageReader,
    next: PageId,
    remaining: usize,
    budget: u32,
    position: u32,
    with_content: bool,
}

impl<'a> OverflowChain<'a> {
    /// Follow a chain, reading the payload bytes it carries
    pub fn new(reader: &'a PageReader, first: PageId, remaining: usize) -> Self {
        Self {
            reader,
            next: first,
            remaining,
            budget: reader.page_count(),
            position: 0,
            with_content: true,
        }
    }

    /// Follow a chain reading only the next-page pointers
    pub fn pages_only(reader: &'a PageReader, first: PageId, remaining: usize) -> Self {
        Self {
            with_content: false,
            ..Self::new(reader, first, remaining)
        }
    }

    /// Payload bytes not yet covered by the pages visited so far
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Iterator for OverflowChain<'_> {
    type Item = OverflowPage;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.next.is_some() || self.remaining == 0 {
            return None;
        }
        if self.budget == 0 {
            debug!(pgno = %self.next, "overflow chain exceeded page budget");
            return None;
        }
        self.budget -= 1;

        let pgno = self.next;
        if !self.reader.contains(pgno) {
            debug!(%pgno, "overflow pointer out of range");
            self.next = PageId::NONE;
            return None;
        }

        let capacity = (self.reader.page_size() as usize).saturating_sub(4);
        let take = self.remaining.min(capacity);
        let read_len = if self.with_content { 4 + take } else { 4 };
        let bytes = self.reader.read_page_prefix(pgno, read_len)?;

        self.next = PageId::new(decode_fixed32(&bytes));
        self.remaining -= take;
        self.position += 1;

        let content = if self.with_content {
            bytes[4..].to_vec()
        } else {
            Vec::new()
        };

        Some(OverflowPage {
            pgno,
            position: self.position,
            content,
        })
    }
}
