//! Storage layer: byte sources, padded page reads, and file-level metadata.
//!
//! This module turns a raw database image into fixed-size pages and exposes
//! the file header and freelist that live outside any b-tree.

mod file_header;
mod freelist;
mod reader;
mod source;

pub use file_header::{page_size_from_raw, DatabaseHeader, DB_HEADER_SIZE, MAGIC};
pub use freelist::FreeList;
pub use reader::{validate_page_size, PageReader};
pub use source::{ByteSource, FileSource, MemorySource};
