//! Database freelist pages.
//!
//! Unused pages are tracked in a chain of trunk pages rooted in the database
//! header. Each trunk holds a pointer to the next trunk, a count of leaf
//! entries, and that many leaf page numbers.

use crate::storage::PageReader;
use crate::types::{decode_fixed32, PageId};
use tracing::debug;

/// Pages found on the database freelist
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FreeList {
    /// Trunk pages in chain order
    pub trunks: Vec<PageId>,
    /// Leaf pages in the order they are listed
    pub leaves: Vec<PageId>,
}

impl FreeList {
    /// Walk the trunk chain starting at `first_trunk`.
    ///
    /// Out-of-range pointers end the walk; the number of trunks visited is
    /// bounded by the page count so a looping chain terminates.
    pub fn read(reader: &PageReader, first_trunk: u32) -> Self {
        let mut list = Self::default();
        let max_leaves = (reader.page_size() as usize / 4).saturating_sub(2);
        let mut next = PageId::new(first_trunk);
        let mut budget = reader.page_count();

        while next.is_some() {
            if budget == 0 {
                debug!(trunk = %next, "freelist walk exceeded page budget");
                break;
            }
            budget -= 1;

            let Some(page) = reader.read_page(next) else {
                debug!(trunk = %next, "freelist trunk out of range");
                break;
            };
            list.trunks.push(next);

            let declared = decode_fixed32(&page[4..8]) as usize;
            let count = declared.min(max_leaves);
            for i in 0..count {
                let offset = 8 + i * 4;
                let leaf = PageId::new(decode_fixed32(&page[offset..offset + 4]));
                if reader.contains(leaf) {
                    list.leaves.push(leaf);
                }
            }

            next = PageId::new(decode_fixed32(&page[0..4]));
        }

        list
    }

    /// All freelist pages, trunks and leaves, ascending and deduplicated
    pub fn page_ids(&self) -> Vec<PageId> {
        let mut ids: Vec<PageId> = self.trunks.iter().chain(&self.leaves).copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Get the number of freelist pages
    pub fn len(&self) -> usize {
        self.trunks.len() + self.leaves.len()
    }

    /// Check if the freelist is empty
    pub fn is_empty(&self) -> bool {
        self.trunks.is_empty() && self.leaves.is_empty()
    }
}
