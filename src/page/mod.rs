//! Page layer: b-tree page headers, cell framing, and page decoding.
//!
//! This module reads the fixed on-disk page structure. It never writes and
//! never fails: damaged pages decode to a best-effort `Page` whose
//! `anomalies` say what was wrong and where.

mod cell;
mod decoder;
mod header;

pub use cell::{local_payload, CellLayout};
pub use decoder::{Page, PageDecoder};
pub use header::{PageHeader, INTERIOR_HEADER_SIZE, LEAF_HEADER_SIZE};

use serde::Serialize;
use std::fmt;

/// A byte range within a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Region {
    /// Offset from the start of the page
    pub offset: usize,
    /// Length in bytes
    pub len: usize,
}

impl Region {
    /// Create a new region
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// One past the last byte of the region
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Structural problem found while decoding a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PageAnomaly {
    /// Type byte is not one of the four b-tree page codes
    CorruptType(u8),
    /// Declared cell count does not fit in the page after the header
    CellIndexOverflow { declared: usize, fits: usize },
    /// Cell pointer points into the header/pointer array or past the page
    CellPointerOutOfBounds { index: usize, offset: usize },
    /// Cell runs past the end of the page
    CellExceedsPage { index: usize },
    /// Freeblock outside the cell content area
    FreeBlockOutOfBounds { offset: usize },
    /// Freeblock chain does not move strictly forward
    FreeBlockLoop { offset: usize },
}

impl fmt::Display for PageAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorruptType(b) => write!(f, "unknown page type byte 0x{:02x}", b),
            Self::CellIndexOverflow { declared, fits } => {
                write!(f, "{} cells declared, only {} fit", declared, fits)
            }
            Self::CellPointerOutOfBounds { index, offset } => {
                write!(f, "cell {} points outside the content area ({})", index, offset)
            }
            Self::CellExceedsPage { index } => write!(f, "cell {} runs past the page end", index),
            Self::FreeBlockOutOfBounds { offset } => {
                write!(f, "freeblock at {} is outside the content area", offset)
            }
            Self::FreeBlockLoop { offset } => write!(f, "freeblock chain loops at {}", offset),
        }
    }
}
