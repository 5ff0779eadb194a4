//! # SQLite Page Map
//!
//! A read-only, forensic reader for SQLite database files. It maps how each
//! table and index is laid out across pages and decodes individual cells,
//! and it keeps going on damaged files instead of failing.
//!
//! ## Architecture
//!
//! The reader is composed of small layers, each usable on its own:
//!
//! - **Storage Layer** (`storage`): byte sources, zero-padded page reads,
//!   the 100-byte database header and the freelist
//! - **Page Layer** (`page`): b-tree page decoding into regions, cell framing
//!   and the local-payload formula
//! - **Record Layer** (`record`): overflow chains, payload reassembly and
//!   record decoding into typed values
//! - **B-Tree Layer** (`btree`): traversal from a root page into a page-usage
//!   model
//! - **Schema** (`schema`): root-page and column-name resolution
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sqlite_pagemap::{Config, Database};
//!
//! let db = Database::open(Config::new("evidence.db"))?;
//!
//! for table in db.table_names()? {
//!     println!("{}: leaves {:?}", table, db.leaf_page_ids(&table)?);
//! }
//!
//! // Cells of a single page
//! let pgno = 2.into();
//! for idx in 0..db.cell_count(pgno)? {
//!     println!("{:?}", db.decode_cell(pgno, idx)?);
//! }
//! ```

pub mod btree;
pub mod error;
pub mod page;
pub mod record;
pub mod schema;
pub mod storage;
pub mod types;

#[cfg(test)]
mod fixture;

pub use error::{InspectError, Result};
pub use types::{PageId, PageRole, PageType};

// Re-export main public API
pub use btree::{BTreeWalker, OverflowLink, PageUsage, PageUsageEntry};
pub use page::{Page, PageAnomaly, PageDecoder, Region};
pub use record::{DecodedCell, Record, Value};
pub use schema::{MasterSchema, SchemaObject, SchemaProvider};
pub use storage::{ByteSource, DatabaseHeader, FileSource, MemorySource, PageReader};

use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use tracing::debug;

/// Database configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the database file
    pub path: PathBuf,
    /// Page size to use instead of the one in the header
    pub page_size: Option<u32>,
}

impl Config {
    /// Create a new configuration with default settings
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            page_size: None,
        }
    }

    /// Force a page size (a power of two in `[512, 65536]`)
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }
}

/// Handle on one database image.
///
/// Opening reads the page size and computes the page count; everything else
/// is decoded on demand. The schema is read once, on first use.
pub struct Database {
    reader: PageReader,
    decoder: Mutex<PageDecoder>,
    schema: RwLock<Option<Vec<SchemaObject>>>,
    provider: Box<dyn SchemaProvider>,
}

impl Database {
    /// Open the database file named by `config`
    pub fn open(config: Config) -> Result<Self> {
        let source = FileSource::open(&config.path)?;
        debug!(path = %config.path.display(), "opening database file");
        Self::from_source(Box::new(source), config.page_size)
    }

    /// Open an image from any byte source
    pub fn from_source(source: Box<dyn ByteSource>, page_size: Option<u32>) -> Result<Self> {
        let reader = PageReader::new(source, page_size)?;

        Ok(Self {
            reader,
            decoder: Mutex::new(PageDecoder::new()),
            schema: RwLock::new(None),
            provider: Box::new(MasterSchema::new()),
        })
    }

    /// Replace the schema provider, dropping any cached schema
    pub fn with_schema_provider(mut self, provider: Box<dyn SchemaProvider>) -> Self {
        self.provider = provider;
        *self.schema.get_mut() = None;
        self
    }

    /// Underlying page reader
    pub fn reader(&self) -> &PageReader {
        &self.reader
    }

    /// Page size in bytes
    pub fn page_size(&self) -> u32 {
        self.reader.page_size()
    }

    /// Number of pages, computed from the file size
    pub fn page_count(&self) -> u32 {
        self.reader.page_count()
    }

    /// Parsed database header
    pub fn header(&self) -> DatabaseHeader {
        self.reader.database_header()
    }

    /// All schema objects, read once and cached
    pub fn schema_objects(&self) -> Result<Vec<SchemaObject>> {
        if let Some(objects) = self.schema.read().as_ref() {
            return Ok(objects.clone());
        }

        let mut cache = self.schema.write();
        if let Some(objects) = cache.as_ref() {
            return Ok(objects.clone());
        }
        let objects = self.provider.list_schema_objects(&self.reader)?;
        debug!(count = objects.len(), "loaded schema");
        *cache = Some(objects.clone());
        Ok(objects)
    }

    /// Names of all tables, ordered case-insensitively
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .schema_objects()?
            .into_iter()
            .filter(|object| object.kind == "table")
            .map(|object| object.name)
            .collect();
        names.sort_by_cached_key(|name| name.to_lowercase());
        Ok(names)
    }

    /// Resolve a table or index name to its schema entry.
    ///
    /// The schema table itself resolves to page 1 under any of its names.
    pub fn find_object(&self, name: &str) -> Result<SchemaObject> {
        if schema::is_schema_table(name) {
            return Ok(SchemaObject::schema_table());
        }

        self.schema_objects()?
            .into_iter()
            .find(|object| object.has_btree() && object.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| InspectError::UnknownObject(name.to_string()))
    }

    /// Walk the b-tree of `name` into a page-usage model
    pub fn page_usage(&self, name: &str) -> Result<PageUsage> {
        let object = self.find_object(name)?;
        Ok(BTreeWalker::new(&self.reader).walk(object.rootpage, &object.name))
    }

    /// Every page used by `name`, in visit order
    pub fn page_usage_entries(&self, name: &str) -> Result<Vec<PageUsageEntry>> {
        Ok(self.page_usage(name)?.entries)
    }

    /// Leaf-table pages of `name`, ascending
    pub fn leaf_page_ids(&self, name: &str) -> Result<Vec<PageId>> {
        Ok(self.page_usage(name)?.leaf_page_ids())
    }

    /// Every page used by `name` with its role
    pub fn page_ids_and_roles(&self, name: &str) -> Result<Vec<(PageId, PageRole)>> {
        Ok(self.page_usage(name)?.pages_and_roles())
    }

    /// Declared column names of `table`
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        self.provider.column_names(&self.reader, table)
    }

    fn check_page(&self, pgno: PageId) -> Result<()> {
        if self.reader.contains(pgno) {
            Ok(())
        } else {
            Err(InspectError::PageOutOfRange {
                pgno: pgno.value(),
                page_count: self.reader.page_count(),
            })
        }
    }

    /// Run `f` on the decoded page `pgno`, through the shared decoder slot
    fn with_page<T>(&self, pgno: PageId, f: impl FnOnce(&Page) -> T) -> Result<T> {
        self.check_page(pgno)?;
        let mut decoder = self.decoder.lock();
        let page = decoder
            .decode(&self.reader, pgno)
            .ok_or(InspectError::PageOutOfRange {
                pgno: pgno.value(),
                page_count: self.reader.page_count(),
            })?;
        Ok(f(page))
    }

    /// Decoded copy of page `pgno`
    pub fn decode_page(&self, pgno: PageId) -> Result<Page> {
        self.with_page(pgno, Page::clone)
    }

    /// Number of cells on page `pgno`
    pub fn cell_count(&self, pgno: PageId) -> Result<usize> {
        self.with_page(pgno, Page::cell_count)
    }

    /// Raw bytes of cell `idx` on page `pgno`; empty if there is no such
    /// cell or its pointer is out of bounds
    pub fn load_cell(&self, pgno: PageId, idx: usize) -> Result<Vec<u8>> {
        self.with_page(pgno, |page| {
            page.cell_bytes(idx).map(<[u8]>::to_vec).unwrap_or_default()
        })
    }

    /// Cell `idx` on page `pgno` with payload reassembled and decoded
    pub fn decode_cell_full(&self, pgno: PageId, idx: usize) -> Result<Option<DecodedCell>> {
        let (page_type, bytes) = self.with_page(pgno, |page| {
            (page.page_type(), page.cell_bytes(idx).map(<[u8]>::to_vec))
        })?;

        // the decoder lock is released before following overflow chains
        Ok(bytes
            .filter(|bytes| !bytes.is_empty())
            .map(|bytes| record::decode_cell(&self.reader, page_type, &bytes)))
    }

    /// Column values of cell `idx` on page `pgno`
    pub fn decode_cell(&self, pgno: PageId, idx: usize) -> Result<Vec<Value>> {
        Ok(self
            .decode_cell_full(pgno, idx)?
            .map(|cell| cell.record.values)
            .unwrap_or_default())
    }

    /// Pages on the database freelist, ascending
    pub fn free_page_ids(&self) -> Vec<PageId> {
        let header = self.reader.database_header();
        storage::FreeList::read(&self.reader, header.first_freelist_trunk).page_ids()
    }

    /// Name/value listing of the database header and computed file facts
    pub fn database_info(&self) -> Vec<(String, String)> {
        let mut info = self.reader.database_header().fields();
        info.push(("file_size".to_string(), self.reader.file_size().to_string()));
        info.push(("page_count".to_string(), self.reader.page_count().to_string()));
        info.push(("effective_page_size".to_string(), self.reader.page_size().to_string()));
        info.push(("io_errors".to_string(), self.reader.io_error_count().to_string()));
        info
    }
}
