//! B-tree traversal and the page-usage model.
//!
//! `BTreeWalker` classifies every page reachable from a root; the resulting
//! `PageUsage` records roles, parent links, and overflow chains.

mod usage;
mod walker;

pub use usage::{OverflowLink, PageUsage, PageUsageEntry};
pub use walker::BTreeWalker;
