//! Synthetic database images for tests.
//!
//! `ImageBuilder` lays out pages byte by byte: page 1 with the database
//! header and schema table, b-tree pages built from cell lists, and
//! overflow chains for payloads that do not fit locally.

use crate::page::local_payload;
use crate::record::Value;
use crate::storage::{MemorySource, PageReader, DB_HEADER_SIZE, MAGIC};
use crate::types::{encode_varint, varint_len, PageId, PageType};
use std::io;
use std::path::Path;

/// Cells of one b-tree page
pub enum PageSpec {
    LeafTable(Vec<(i64, Vec<Value>)>),
    LeafIndex(Vec<Vec<Value>>),
    InteriorTable {
        cells: Vec<(PageId, i64)>,
        right: PageId,
    },
    InteriorIndex {
        cells: Vec<(PageId, Vec<Value>)>,
        right: PageId,
    },
}

impl PageSpec {
    pub fn leaf_table(rows: Vec<(i64, Vec<Value>)>) -> Self {
        Self::LeafTable(rows)
    }

    pub fn leaf_index(keys: Vec<Vec<Value>>) -> Self {
        Self::LeafIndex(keys)
    }

    pub fn interior_table(cells: Vec<(PageId, i64)>, right: PageId) -> Self {
        Self::InteriorTable { cells, right }
    }

    pub fn interior_index(cells: Vec<(PageId, Vec<Value>)>, right: PageId) -> Self {
        Self::InteriorIndex { cells, right }
    }

    fn page_type(&self) -> PageType {
        match self {
            Self::LeafTable(_) => PageType::LeafTable,
            Self::LeafIndex(_) => PageType::LeafIndex,
            Self::InteriorTable { .. } => PageType::InteriorTable,
            Self::InteriorIndex { .. } => PageType::InteriorIndex,
        }
    }
}

/// One row of the schema table
pub struct SchemaRow {
    pub kind: &'static str,
    pub name: &'static str,
    pub tbl_name: &'static str,
    pub rootpage: PageId,
    pub sql: &'static str,
}

impl SchemaRow {
    pub fn table(name: &'static str, rootpage: PageId, sql: &'static str) -> Self {
        Self {
            kind: "table",
            name,
            tbl_name: name,
            rootpage,
            sql,
        }
    }

    pub fn index(
        name: &'static str,
        tbl_name: &'static str,
        rootpage: PageId,
        sql: &'static str,
    ) -> Self {
        Self {
            kind: "index",
            name,
            tbl_name,
            rootpage,
            sql,
        }
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.kind.as_bytes().to_vec()),
            Value::Text(self.name.as_bytes().to_vec()),
            Value::Text(self.tbl_name.as_bytes().to_vec()),
            Value::Integer(i64::from(self.rootpage.value())),
            Value::Text(self.sql.as_bytes().to_vec()),
        ]
    }
}

/// Builder for an in-memory database image
pub struct ImageBuilder {
    page_size: u32,
    pages: Vec<Vec<u8>>,
}

impl ImageBuilder {
    /// Image with page 1 holding an empty schema table
    pub fn new(page_size: u32) -> Self {
        let mut builder = Self {
            page_size,
            pages: vec![vec![0u8; page_size as usize]],
        };
        builder.set_schema(Vec::new());
        builder
    }

    /// Rewrite page 1 with the given schema rows
    pub fn set_schema(&mut self, rows: Vec<SchemaRow>) {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i as i64 + 1, row.values()))
            .collect();
        self.render(PageId::FIRST, PageSpec::LeafTable(rows));
    }

    /// Append a zeroed page
    pub fn reserve_page(&mut self) -> PageId {
        self.pages.push(vec![0u8; self.page_size as usize]);
        PageId::new(self.pages.len() as u32)
    }

    /// Append a b-tree page built from `contents`
    pub fn add_page(&mut self, contents: PageSpec) -> PageId {
        let pgno = self.reserve_page();
        self.render(pgno, contents);
        pgno
    }

    /// Render `contents` into an existing page
    pub fn render(&mut self, pgno: PageId, contents: PageSpec) {
        let page_type = contents.page_type();
        let mut right_child = PageId::NONE;

        let cells: Vec<Vec<u8>> = match contents {
            PageSpec::LeafTable(rows) => rows
                .into_iter()
                .map(|(rowid, values)| {
                    let payload = encode_record(&values);
                    let mut prefix = encode_varint(payload.len() as u64);
                    prefix.extend(encode_varint(rowid as u64));
                    self.payload_cell(prefix, &payload, page_type)
                })
                .collect(),
            PageSpec::LeafIndex(keys) => keys
                .into_iter()
                .map(|values| {
                    let payload = encode_record(&values);
                    let prefix = encode_varint(payload.len() as u64);
                    self.payload_cell(prefix, &payload, page_type)
                })
                .collect(),
            PageSpec::InteriorTable { cells, right } => {
                right_child = right;
                cells
                    .into_iter()
                    .map(|(child, rowid)| {
                        let mut cell = child.value().to_be_bytes().to_vec();
                        cell.extend(encode_varint(rowid as u64));
                        cell
                    })
                    .collect()
            }
            PageSpec::InteriorIndex { cells, right } => {
                right_child = right;
                cells
                    .into_iter()
                    .map(|(child, values)| {
                        let payload = encode_record(&values);
                        let mut prefix = child.value().to_be_bytes().to_vec();
                        prefix.extend(encode_varint(payload.len() as u64));
                        self.payload_cell(prefix, &payload, page_type)
                    })
                    .collect()
            }
        };

        let base = pgno.btree_header_offset();
        let page_len = self.page_size as usize;
        let header_len = page_type.header_len();
        let page = &mut self.pages[pgno.value() as usize - 1];
        page[base..].fill(0);

        let mut content_start = page_len;
        let pointer_start = base + header_len;
        for (i, cell) in cells.iter().enumerate() {
            content_start -= cell.len();
            assert!(
                content_start >= pointer_start + 2 * cells.len(),
                "cells do not fit on page {}",
                pgno
            );
            page[content_start..content_start + cell.len()].copy_from_slice(cell);
            let ptr = pointer_start + i * 2;
            page[ptr..ptr + 2].copy_from_slice(&(content_start as u16).to_be_bytes());
        }

        page[base] = page_type.code();
        page[base + 3..base + 5].copy_from_slice(&(cells.len() as u16).to_be_bytes());
        page[base + 5..base + 7].copy_from_slice(&(content_start as u16).to_be_bytes());
        if page_type.is_interior() {
            page[base + 8..base + 12].copy_from_slice(&right_child.value().to_be_bytes());
        }
    }

    fn payload_cell(&mut self, mut cell: Vec<u8>, payload: &[u8], page_type: PageType) -> Vec<u8> {
        let local = local_payload(self.page_size, payload.len() as i64, page_type) as usize;
        cell.extend_from_slice(&payload[..local]);
        if local < payload.len() {
            let first = self.add_overflow_chain(&payload[local..]);
            cell.extend(first.value().to_be_bytes());
        }
        cell
    }

    /// Store `content` in a fresh overflow chain, returning its first page
    pub fn add_overflow_chain(&mut self, content: &[u8]) -> PageId {
        let capacity = self.page_size as usize - 4;
        let chunks: Vec<&[u8]> = content.chunks(capacity).collect();
        let ids: Vec<PageId> = chunks.iter().map(|_| self.reserve_page()).collect();

        for (i, chunk) in chunks.iter().enumerate() {
            let next = ids.get(i + 1).copied().unwrap_or(PageId::NONE);
            let page = &mut self.pages[ids[i].value() as usize - 1];
            page[..4].copy_from_slice(&next.value().to_be_bytes());
            page[4..4 + chunk.len()].copy_from_slice(chunk);
        }

        ids[0]
    }

    /// Overwrite bytes at the start of a page
    pub fn write_raw(&mut self, pgno: PageId, bytes: &[u8]) {
        self.write_at(pgno, 0, bytes);
    }

    /// Overwrite bytes at `offset` within a page
    pub fn write_at(&mut self, pgno: PageId, offset: usize, bytes: &[u8]) {
        let page = &mut self.pages[pgno.value() as usize - 1];
        page[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Set the freelist fields of the database header
    pub fn set_freelist(&mut self, first_trunk: PageId, count: u32) {
        self.write_at(PageId::FIRST, 32, &first_trunk.value().to_be_bytes());
        self.write_at(PageId::FIRST, 36, &count.to_be_bytes());
    }

    /// The complete image, with the database header filled in
    pub fn bytes(&self) -> Vec<u8> {
        let mut image: Vec<u8> = self.pages.concat();
        let header = &mut image[..DB_HEADER_SIZE];
        header[..16].copy_from_slice(MAGIC);
        let raw_size = if self.page_size == 65536 { 1 } else { self.page_size as u16 };
        header[16..18].copy_from_slice(&raw_size.to_be_bytes());
        header[18] = 1;
        header[19] = 1;
        header[28..32].copy_from_slice(&(self.pages.len() as u32).to_be_bytes());
        header[44..48].copy_from_slice(&4u32.to_be_bytes());
        header[56..60].copy_from_slice(&1u32.to_be_bytes());
        image
    }

    /// Reader over a snapshot of the image
    pub fn reader(&self) -> PageReader {
        PageReader::new(Box::new(MemorySource::new(self.bytes())), None)
            .expect("in-memory image has a size")
    }

    /// Write the image to a file
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.bytes())
    }
}

/// Serialize values as a record with minimal serial types
pub fn encode_record(values: &[Value]) -> Vec<u8> {
    let mut types = Vec::new();
    let mut body = Vec::new();

    for value in values {
        let code: u64 = match value {
            Value::Null => 0,
            Value::Integer(0) => 8,
            Value::Integer(1) => 9,
            Value::Integer(i) => {
                let (code, width) = integer_width(*i);
                body.extend_from_slice(&i.to_be_bytes()[8 - width..]);
                code
            }
            Value::Float(x) => {
                body.extend_from_slice(&x.to_be_bytes());
                7
            }
            Value::Blob(b) => {
                body.extend_from_slice(b);
                b.len() as u64 * 2 + 12
            }
            Value::Text(t) => {
                body.extend_from_slice(t);
                t.len() as u64 * 2 + 13
            }
        };
        types.extend(encode_varint(code));
    }

    let mut prefix_len = 1;
    let header_len = loop {
        let candidate = types.len() + prefix_len;
        if varint_len(candidate as u64) == prefix_len {
            break candidate;
        }
        prefix_len += 1;
    };

    let mut record = encode_varint(header_len as u64);
    record.extend(types);
    record.extend(body);
    record
}

fn integer_width(i: i64) -> (u64, usize) {
    match i {
        -128..=127 => (1, 1),
        -32768..=32767 => (2, 2),
        -8388608..=8388607 => (3, 3),
        -2147483648..=2147483647 => (4, 4),
        -140737488355328..=140737488355327 => (5, 6),
        _ => (6, 8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_record_matches_reference_bytes() {
        let bytes = encode_record(&[Value::Integer(0), Value::Integer(1)]);
        assert_eq!(bytes, vec![3, 8, 9]);

        let bytes = encode_record(&[Value::Integer(10), Value::Text(b"ab".to_vec())]);
        assert_eq!(bytes, vec![3, 1, 17, 10, b'a', b'b']);
    }
}
