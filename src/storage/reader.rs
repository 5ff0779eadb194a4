//! Padded page reads over a byte source.
//!
//! `PageReader` fixes the page geometry of an image (page size and page
//! count) and turns every read into an exact-length buffer. Short reads are
//! zero-padded; unrecoverable I/O errors are logged once, counted, and
//! degrade to an all-zero buffer so a traversal can still finish.

use crate::error::{InspectError, Result};
use crate::storage::{page_size_from_raw, ByteSource, DatabaseHeader, DB_HEADER_SIZE};
use crate::types::{
    decode_be_uint, is_legal_page_size, PageId, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_PAGE_SIZE,
};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Offset of the page-size field in the database header
const PAGE_SIZE_OFFSET: u64 = 16;

/// Page-geometry-aware reader over a byte source
pub struct PageReader {
    source: Box<dyn ByteSource>,
    file_size: u64,
    page_size: u32,
    page_count: u32,
    io_errors: AtomicU64,
    last_io_error: Mutex<Option<String>>,
}

impl PageReader {
    /// Create a reader, taking the page size from the file unless overridden.
    ///
    /// Fails only if the size of the source cannot be determined or the
    /// override is not a legal page size.
    pub fn new(source: Box<dyn ByteSource>, page_size_override: Option<u32>) -> Result<Self> {
        let file_size = source.size()?;

        let mut reader = Self {
            source,
            file_size,
            page_size: DEFAULT_PAGE_SIZE,
            page_count: 0,
            io_errors: AtomicU64::new(0),
            last_io_error: Mutex::new(None),
        };

        reader.page_size = match page_size_override {
            Some(size) => {
                validate_page_size(size)?;
                size
            }
            None if file_size < PAGE_SIZE_OFFSET + 2 => DEFAULT_PAGE_SIZE,
            None => {
                let raw = decode_be_uint(&reader.read(PAGE_SIZE_OFFSET, 2), 0, 2);
                page_size_from_raw(raw).unwrap_or_else(|| {
                    warn!(raw, "illegal page size in header, using default");
                    DEFAULT_PAGE_SIZE
                })
            }
        };

        let pages = file_size.div_ceil(u64::from(reader.page_size));
        reader.page_count = u32::try_from(pages).unwrap_or(u32::MAX);

        debug!(
            file_size,
            page_size = reader.page_size,
            page_count = reader.page_count,
            "opened database image"
        );

        Ok(reader)
    }

    /// Page size in bytes
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of pages, `ceil(file_size / page_size)`
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Size of the underlying image in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Check that a page number lies in `[1, page_count]`
    pub fn contains(&self, pgno: PageId) -> bool {
        pgno.value() >= 1 && pgno.value() <= self.page_count
    }

    /// Read exactly `len` bytes at `offset`.
    ///
    /// The tail past end-of-file is zero. On an unrecoverable error the
    /// whole buffer is zero and the error is recorded on this reader.
    pub fn read(&self, offset: u64, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        let mut filled = 0;

        while filled < len {
            match self.source.read_at(offset + filled as u64, &mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.report_io_error(offset, len, &e);
                    buf.fill(0);
                    break;
                }
            }
        }

        buf
    }

    /// Read a whole page, or `None` if the page number is out of range
    pub fn read_page(&self, pgno: PageId) -> Option<Vec<u8>> {
        if !self.contains(pgno) {
            return None;
        }
        Some(self.read(pgno.file_offset(self.page_size), self.page_size as usize))
    }

    /// Read `len` bytes from the start of a page, or `None` if out of range
    pub fn read_page_prefix(&self, pgno: PageId, len: usize) -> Option<Vec<u8>> {
        if !self.contains(pgno) {
            return None;
        }
        Some(self.read(pgno.file_offset(self.page_size), len))
    }

    /// Read and parse the 100-byte database header
    pub fn database_header(&self) -> DatabaseHeader {
        DatabaseHeader::read(&self.read(0, DB_HEADER_SIZE))
    }

    /// Number of unrecoverable I/O errors seen so far
    pub fn io_error_count(&self) -> u64 {
        self.io_errors.load(Ordering::Relaxed)
    }

    /// Message of the most recent unrecoverable I/O error
    pub fn last_io_error(&self) -> Option<String> {
        self.last_io_error.lock().clone()
    }

    fn report_io_error(&self, offset: u64, len: usize, err: &io::Error) {
        let previous = self.io_errors.fetch_add(1, Ordering::Relaxed);
        if previous == 0 {
            warn!(offset, len, error = %err, "read failed, substituting zeroes");
        } else {
            debug!(offset, len, error = %err, "read failed again");
        }
        *self.last_io_error.lock() = Some(err.to_string());
    }
}

/// Check a configured page size against the format's limits
pub fn validate_page_size(size: u32) -> Result<()> {
    if !is_legal_page_size(size) {
        return Err(InspectError::invalid_config(format!(
            "page size must be a power of two in [{}, {}], got {}",
            MIN_PAGE_SIZE, MAX_PAGE_SIZE, size
        )));
    }
    Ok(())
}
