//! Schema resolution.
//!
//! The reader needs two things from the schema: which root page belongs to a
//! table or index, and the declared column names of a table. Both come from
//! a `SchemaProvider`. The built-in `MasterSchema` answers them from the
//! file alone by decoding the schema table on page 1 and parsing the stored
//! `CREATE TABLE` text.

use crate::btree::BTreeWalker;
use crate::error::{InspectError, Result};
use crate::page::Page;
use crate::record::{decode_cell, Value};
use crate::storage::PageReader;
use crate::types::{PageId, PageRole};
use serde::Serialize;
use sqlparser::ast::{CreateTable, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::debug;

/// Names under which the schema table itself can be addressed
pub const SCHEMA_TABLE_NAMES: [&str; 3] = ["sqlite_master", "sqlite_schema", "sqlite_temp_master"];

/// Columns of the schema table
pub const SCHEMA_TABLE_COLUMNS: [&str; 5] = ["type", "name", "tbl_name", "rootpage", "sql"];

/// One row of the schema table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaObject {
    /// `table`, `index`, `view` or `trigger`
    pub kind: String,
    pub name: String,
    /// Table the object belongs to
    pub tbl_name: String,
    /// Root b-tree page (`NONE` for views and triggers)
    pub rootpage: PageId,
    /// Stored CREATE statement, absent for automatic indexes
    pub sql: Option<String>,
}

impl SchemaObject {
    /// The schema table's own entry
    pub fn schema_table() -> Self {
        Self {
            kind: "table".to_string(),
            name: SCHEMA_TABLE_NAMES[0].to_string(),
            tbl_name: SCHEMA_TABLE_NAMES[0].to_string(),
            rootpage: PageId::FIRST,
            sql: None,
        }
    }

    /// Whether this object is stored as a b-tree
    pub fn has_btree(&self) -> bool {
        self.rootpage.is_some()
    }

    fn from_values(values: &[Value]) -> Option<Self> {
        let text = |i: usize| values.get(i).and_then(Value::as_text_lossy);
        let rootpage = values
            .get(3)
            .and_then(Value::as_integer)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);

        Some(Self {
            kind: text(0)?,
            name: text(1)?,
            tbl_name: text(2).unwrap_or_default(),
            rootpage: PageId::new(rootpage),
            sql: text(4),
        })
    }
}

/// Whether `name` addresses the schema table itself
pub fn is_schema_table(name: &str) -> bool {
    SCHEMA_TABLE_NAMES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// Source of schema information
pub trait SchemaProvider: Send + Sync {
    /// All rows of the schema table
    fn list_schema_objects(&self, reader: &PageReader) -> Result<Vec<SchemaObject>>;

    /// Declared column names of `table`, in declaration order
    fn column_names(&self, reader: &PageReader, table: &str) -> Result<Vec<String>>;
}

/// Schema provider that decodes the schema table straight from the file
#[derive(Debug, Default, Clone, Copy)]
pub struct MasterSchema;

impl MasterSchema {
    pub fn new() -> Self {
        Self
    }
}

impl SchemaProvider for MasterSchema {
    fn list_schema_objects(&self, reader: &PageReader) -> Result<Vec<SchemaObject>> {
        let usage = BTreeWalker::new(reader).walk(PageId::FIRST, SCHEMA_TABLE_NAMES[0]);
        let root_role = usage.entries.first().map(|entry| entry.role);
        if !matches!(root_role, Some(PageRole::LeafTable | PageRole::InteriorTable)) {
            return Err(InspectError::schema("page 1 is not a table b-tree"));
        }

        let mut objects = Vec::new();
        // visit order keeps rows in b-tree order
        let leaves = usage
            .entries
            .iter()
            .filter(|entry| entry.role == PageRole::LeafTable);
        for entry in leaves {
            let Some(page) = Page::decode(reader, entry.pgno) else {
                continue;
            };
            for index in 0..page.cell_count() {
                let Some(bytes) = page.cell_bytes(index) else {
                    continue;
                };
                let cell = decode_cell(reader, page.page_type(), bytes);
                match SchemaObject::from_values(&cell.record.values) {
                    Some(object) => objects.push(object),
                    None => debug!(pgno = %entry.pgno, index, "unreadable schema row"),
                }
            }
        }

        Ok(objects)
    }

    fn column_names(&self, reader: &PageReader, table: &str) -> Result<Vec<String>> {
        if is_schema_table(table) {
            return Ok(SCHEMA_TABLE_COLUMNS.iter().map(|c| c.to_string()).collect());
        }

        let object = self
            .list_schema_objects(reader)?
            .into_iter()
            .find(|o| o.kind == "table" && o.name.eq_ignore_ascii_case(table))
            .ok_or_else(|| InspectError::UnknownObject(table.to_string()))?;
        let sql = object
            .sql
            .ok_or_else(|| InspectError::schema(format!("table {} has no CREATE statement", table)))?;

        parse_column_names(&sql)
    }
}

/// Column names declared by a `CREATE TABLE` statement
pub fn parse_column_names(sql: &str) -> Result<Vec<String>> {
    let dialect = SQLiteDialect {};
    let statements = Parser::parse_sql(&dialect, sql)?;

    match statements.first() {
        Some(Statement::CreateTable(CreateTable { columns, .. })) => {
            Ok(columns.iter().map(|column| column.name.value.clone()).collect())
        }
        Some(_) => Err(InspectError::schema(format!(
            "not a CREATE TABLE statement: {}",
            sql
        ))),
        None => Err(InspectError::schema("empty CREATE statement")),
    }
}
