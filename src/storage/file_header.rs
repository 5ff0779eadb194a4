//! Database file header.
//!
//! The first 100 bytes of page 1 hold file-wide metadata. The b-tree header
//! of page 1 follows immediately after.

use crate::types::{decode_be_uint, is_legal_page_size, DEFAULT_PAGE_SIZE};

/// Magic bytes identifying the file format
pub const MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Size of the database header at the start of page 1
pub const DB_HEADER_SIZE: usize = 100;

/// Database file header
///
/// Layout (all integers big-endian):
/// ```text
/// Offset  Size  Description
/// 0       16    Magic string "SQLite format 3\0"
/// 16      2     Page size (0 is read as 1024, 1 as 65536)
/// 18      1     File format write version
/// 19      1     File format read version
/// 20      1     Reserved bytes at the end of each page
/// 24      4     File change counter
/// 28      4     Database size in pages
/// 32      4     First freelist trunk page
/// 36      4     Number of freelist pages
/// 40      4     Schema cookie
/// 44      4     Schema format number
/// 48      4     Default page cache size
/// 52      4     Largest root b-tree page (auto-vacuum)
/// 56      4     Text encoding (1 UTF-8, 2 UTF-16le, 3 UTF-16be)
/// 60      4     User version
/// 64      4     Incremental vacuum flag
/// 68      4     Application id
/// 92      4     Version-valid-for number
/// 96      4     Library version number that last wrote the file
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHeader {
    /// Whether the first 16 bytes carry the expected magic string
    pub magic_ok: bool,
    /// Page size in bytes, after the 0/1 reinterpretation. An illegal value
    /// is replaced by `DEFAULT_PAGE_SIZE` and flagged in `page_size_ok`.
    pub page_size: u32,
    /// Whether the stored page size field was legal
    pub page_size_ok: bool,
    pub write_version: u8,
    pub read_version: u8,
    pub reserved_space: u8,
    pub change_counter: u32,
    /// Page count as recorded in the header (may disagree with the file size)
    pub page_count: u32,
    pub first_freelist_trunk: u32,
    pub freelist_count: u32,
    pub schema_cookie: u32,
    pub schema_format: u32,
    pub default_cache_size: u32,
    pub largest_root_page: u32,
    pub text_encoding: u32,
    pub user_version: u32,
    pub incremental_vacuum: u32,
    pub application_id: u32,
    pub version_valid_for: u32,
    pub library_version: u32,
}

impl DatabaseHeader {
    /// Read a header from the first bytes of the file.
    ///
    /// Missing bytes read as zero; nothing here fails.
    pub fn read(bytes: &[u8]) -> Self {
        let u32_at = |offset| decode_be_uint(bytes, offset, 4);
        let byte_at = |offset: usize| bytes.get(offset).copied().unwrap_or(0);
        let page_size = page_size_from_raw(decode_be_uint(bytes, 16, 2));

        Self {
            magic_ok: bytes.len() >= MAGIC.len() && &bytes[..MAGIC.len()] == MAGIC,
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            page_size_ok: page_size.is_some(),
            write_version: byte_at(18),
            read_version: byte_at(19),
            reserved_space: byte_at(20),
            change_counter: u32_at(24),
            page_count: u32_at(28),
            first_freelist_trunk: u32_at(32),
            freelist_count: u32_at(36),
            schema_cookie: u32_at(40),
            schema_format: u32_at(44),
            default_cache_size: u32_at(48),
            largest_root_page: u32_at(52),
            text_encoding: u32_at(56),
            user_version: u32_at(60),
            incremental_vacuum: u32_at(64),
            application_id: u32_at(68),
            version_valid_for: u32_at(92),
            library_version: u32_at(96),
        }
    }

    /// Name of the declared text encoding
    pub fn text_encoding_name(&self) -> &'static str {
        match self.text_encoding {
            1 => "UTF-8",
            2 => "UTF-16le",
            3 => "UTF-16be",
            _ => "unknown",
        }
    }

    /// Name/value listing of every header field
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("magic".to_string(), if self.magic_ok { "ok" } else { "mismatch" }.to_string()),
            ("page_size".to_string(), self.page_size.to_string()),
            ("page_size_ok".to_string(), self.page_size_ok.to_string()),
            ("write_version".to_string(), self.write_version.to_string()),
            ("read_version".to_string(), self.read_version.to_string()),
            ("reserved_space".to_string(), self.reserved_space.to_string()),
            ("change_counter".to_string(), self.change_counter.to_string()),
            ("header_page_count".to_string(), self.page_count.to_string()),
            ("first_freelist_trunk".to_string(), self.first_freelist_trunk.to_string()),
            ("freelist_count".to_string(), self.freelist_count.to_string()),
            ("schema_cookie".to_string(), self.schema_cookie.to_string()),
            ("schema_format".to_string(), self.schema_format.to_string()),
            ("default_cache_size".to_string(), self.default_cache_size.to_string()),
            ("largest_root_page".to_string(), self.largest_root_page.to_string()),
        ];
        fields.push((
            "text_encoding".to_string(),
            format!("{} ({})", self.text_encoding, self.text_encoding_name()),
        ));
        fields.push(("user_version".to_string(), self.user_version.to_string()));
        fields.push(("incremental_vacuum".to_string(), self.incremental_vacuum.to_string()));
        fields.push(("application_id".to_string(), self.application_id.to_string()));
        fields.push(("version_valid_for".to_string(), self.version_valid_for.to_string()));
        fields.push(("library_version".to_string(), self.library_version.to_string()));
        fields
    }
}

/// Interpret the raw 16-bit page size field.
///
/// 0 reads as 1024 and 1 as 65536; anything else must already be a legal
/// page size, otherwise `None`.
pub fn page_size_from_raw(raw: u32) -> Option<u32> {
    let size = match raw {
        0 => 1024,
        1 => 65536,
        n => n,
    };
    is_legal_page_size(size).then_some(size)
}
