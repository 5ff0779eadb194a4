//! B-tree traversal.
//!
//! The walk starts at a root page and visits every reachable page in
//! pre-order, recording each one in a `PageUsage`. Interior pages push their
//! children; pages whose cells may spill also contribute the overflow pages
//! of every spilling cell.
//!
//! Damaged files are expected. A corrupt type byte becomes a `Corrupt`
//! entry with no children, out-of-range child pointers are skipped, and the
//! number of pages visited, as well as the size of the pending work-list, is
//! capped at the file's page count so a cyclic tree still terminates.

use crate::btree::{OverflowLink, PageUsage, PageUsageEntry};
use crate::page::Page;
use crate::record::OverflowChain;
use crate::storage::PageReader;
use crate::types::{PageId, PageRole, PageType};
use tracing::{debug, trace};

/// A page waiting to be visited
#[derive(Debug, Clone, Copy)]
struct Visit {
    pgno: PageId,
    parent: PageId,
    child_index: usize,
}

/// Walks b-trees of one database
pub struct BTreeWalker<'a> {
    reader: &'a PageReader,
}

impl<'a> BTreeWalker<'a> {
    /// Create a walker over `reader`
    pub fn new(reader: &'a PageReader) -> Self {
        Self { reader }
    }

    /// Walk the b-tree rooted at `root`, labelling entries with `table`
    pub fn walk(&self, root: PageId, table: &str) -> PageUsage {
        let budget = self.reader.page_count() as usize;
        let mut usage = PageUsage {
            table: table.to_string(),
            entries: Vec::new(),
        };

        let mut pending = vec![Visit {
            pgno: root,
            parent: PageId::NONE,
            child_index: 0,
        }];
        let mut visited = 0usize;

        while let Some(visit) = pending.pop() {
            if !self.reader.contains(visit.pgno) {
                debug!(pgno = %visit.pgno, parent = %visit.parent, "child pointer out of range");
                continue;
            }
            if visited >= budget {
                debug!(table, budget, "walk exceeded page budget");
                break;
            }
            visited += 1;

            let Some(page) = Page::decode(self.reader, visit.pgno) else {
                continue;
            };
            let page_type = page.page_type();
            trace!(pgno = %visit.pgno, ?page_type, "visiting page");
            if let PageType::Corrupt(byte) = page_type {
                debug!(pgno = %visit.pgno, parent = %visit.parent, byte, "corrupt node");
            }

            usage.entries.push(PageUsageEntry {
                pgno: visit.pgno,
                role: PageRole::from(page_type),
                type_byte: Some(page_type.code()),
                parent: visit.parent,
                child_index: visit.child_index,
                cell_count: page.cell_count(),
                overflow: None,
            });

            if page_type.may_overflow() {
                self.record_overflow(&page, &mut usage);
            }

            if page_type.is_interior() {
                let children = page.child_pointers();
                // reversed so the leftmost child is popped first
                for (index, child) in children.into_iter().rev() {
                    if pending.len() >= budget {
                        debug!(pgno = %visit.pgno, "work-list exceeded page budget");
                        break;
                    }
                    pending.push(Visit {
                        pgno: child,
                        parent: visit.pgno,
                        child_index: index,
                    });
                }
            }
        }

        usage
    }

    /// Add an entry for every overflow page of every spilling cell on `page`
    fn record_overflow(&self, page: &Page, usage: &mut PageUsage) {
        let page_size = self.reader.page_size();

        for cell_index in 0..page.cell_count() {
            let Some(layout) = page.cell_layout(cell_index, page_size) else {
                continue;
            };
            let Some(first) = layout.first_overflow else {
                continue;
            };

            let needed = usize::try_from(layout.payload_len)
                .unwrap_or(usize::MAX)
                .saturating_sub(layout.local_len);
            let mut parent = page.pgno;
            for link in OverflowChain::pages_only(self.reader, first, needed) {
                usage.entries.push(PageUsageEntry {
                    pgno: link.pgno,
                    role: PageRole::Overflow,
                    type_byte: None,
                    parent,
                    child_index: cell_index,
                    cell_count: 0,
                    overflow: Some(OverflowLink {
                        source_page: page.pgno,
                        cell_index,
                        position: link.position,
                    }),
                });
                parent = link.pgno;
            }
        }
    }
}
