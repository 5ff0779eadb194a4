//! Page-usage model produced by a b-tree walk.
//!
//! Each entry says which role a page plays, which page points at it, and,
//! for overflow pages, which cell the chain belongs to. The model can be
//! rendered as text descriptions, a Graphviz digraph, or JSON.

use crate::types::{PageId, PageRole};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Where an overflow page's chain starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverflowLink {
    /// B-tree page holding the spilling cell
    pub source_page: PageId,
    /// Index of the cell on the source page
    pub cell_index: usize,
    /// 1-based position of this page in the chain
    pub position: u32,
}

/// One page visited during a walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUsageEntry {
    /// Page number
    pub pgno: PageId,
    /// Role of the page
    pub role: PageRole,
    /// Raw type byte (b-tree pages only)
    pub type_byte: Option<u8>,
    /// Page holding the pointer to this page (`NONE` for the root)
    pub parent: PageId,
    /// Child slot under the parent; the right child of an interior page
    /// has index `cell_count`. For overflow pages, the source cell index.
    pub child_index: usize,
    /// Cells on the page (0 for overflow pages)
    pub cell_count: usize,
    /// Chain details for overflow pages
    pub overflow: Option<OverflowLink>,
}

impl PageUsageEntry {
    /// Whether this entry is the root of the walk
    pub fn is_root(&self) -> bool {
        !self.parent.is_some() && self.overflow.is_none()
    }
}

/// Result of walking one table or index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUsage {
    /// Name of the walked schema object
    pub table: String,
    /// Visited pages in visit order
    pub entries: Vec<PageUsageEntry>,
}

impl PageUsage {
    /// Leaf-table pages, ascending, without duplicates
    pub fn leaf_page_ids(&self) -> Vec<PageId> {
        self.entries
            .iter()
            .filter(|entry| entry.role == PageRole::LeafTable)
            .map(|entry| entry.pgno)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every visited page with its role, in visit order
    pub fn pages_and_roles(&self) -> Vec<(PageId, PageRole)> {
        self.entries.iter().map(|entry| (entry.pgno, entry.role)).collect()
    }

    /// One-line description of an entry
    pub fn describe(&self, entry: &PageUsageEntry) -> String {
        if let Some(link) = entry.overflow {
            return format!(
                "{} overflow {} from cell {} of page {}",
                entry.pgno, link.position, link.cell_index, link.source_page
            );
        }

        let kind = describe_role(entry);
        if entry.parent.is_some() {
            format!(
                "{} {} [{}], child {} of page {}",
                entry.pgno, kind, self.table, entry.child_index, entry.parent
            )
        } else {
            format!("{} root {} [{}]", entry.pgno, kind, self.table)
        }
    }

    /// Descriptions of all entries, in visit order
    pub fn descriptions(&self) -> Vec<String> {
        self.entries.iter().map(|entry| self.describe(entry)).collect()
    }

    /// Graphviz digraph of the page relationships
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph g {\n");
        dot.push_str("  node [shape = record, style = \"filled\"];\n");
        dot.push_str("  rankdir = LR;\n");

        for entry in &self.entries {
            let color = match entry.role {
                PageRole::Overflow => "#FEE3BA",
                PageRole::InteriorIndex | PageRole::InteriorTable => "#E1C4C4",
                PageRole::LeafIndex | PageRole::LeafTable => "#62C544",
                PageRole::Corrupt => "#D0D0D0",
            };
            let label = match entry.overflow {
                Some(link) => format!(
                    "{} overflow {} from cell {}",
                    entry.pgno, link.position, link.cell_index
                ),
                None if entry.cell_count > 0 => {
                    format!("{} ncell {}", entry.pgno, entry.cell_count)
                }
                None if entry.role == PageRole::Corrupt => format!("{} corrupt", entry.pgno),
                None => entry.pgno.to_string(),
            };
            let _ = writeln!(dot, "  {}[color=\"{}\", label=\"{}\"];", entry.pgno, color, label);
        }

        for entry in self.entries.iter().filter(|entry| entry.parent.is_some()) {
            let _ = writeln!(dot, "  {} -> {};", entry.parent, entry.pgno);
        }

        dot.push_str("}\n");
        dot
    }

    /// JSON form of the whole model
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn describe_role(entry: &PageUsageEntry) -> &'static str {
    match entry.role {
        PageRole::InteriorIndex => "interior node of index",
        PageRole::InteriorTable => "interior node of table",
        PageRole::LeafIndex => "leaf of index",
        PageRole::LeafTable => "leaf of table",
        PageRole::Overflow => "overflow",
        PageRole::Corrupt => "corrupt node",
    }
}
