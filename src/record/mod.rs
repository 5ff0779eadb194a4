//! Record format: serial types and typed column values.
//!
//! A record is a varint header length, a header of one serial-type varint
//! per column, and a body holding each column's encoding in header order.

mod overflow;
mod payload;

pub use overflow::{OverflowChain, OverflowPage};
pub use payload::{decode_cell, DecodedCell};

use crate::types::decode_varint;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Typed column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Blob(Vec<u8>),
    /// Text bytes in the database encoding
    Text(Vec<u8>),
}

impl Value {
    /// Text content decoded as UTF-8, replacing invalid sequences
    pub fn as_text_lossy(&self) -> Option<String> {
        match self {
            Self::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    /// Integer content
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Blob(bytes) => {
                write!(f, "x'")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "'")
            }
            Self::Text(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
        }
    }
}

/// Serial type code of a record column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialType {
    Null,
    Int8,
    Int16,
    Int24,
    Int32,
    Int48,
    Int64,
    Float64,
    Zero,
    One,
    /// Codes 10 and 11, and anything negative
    Reserved(i64),
    /// Blob of the given length
    Blob(u64),
    /// Text of the given length
    Text(u64),
}

impl SerialType {
    /// Parse a serial type code
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Null,
            1 => Self::Int8,
            2 => Self::Int16,
            3 => Self::Int24,
            4 => Self::Int32,
            5 => Self::Int48,
            6 => Self::Int64,
            7 => Self::Float64,
            8 => Self::Zero,
            9 => Self::One,
            n if n >= 12 && n % 2 == 0 => Self::Blob(((n - 12) / 2) as u64),
            n if n >= 13 => Self::Text(((n - 13) / 2) as u64),
            n => Self::Reserved(n),
        }
    }

    /// Body bytes this column occupies
    pub fn content_size(self) -> u64 {
        match self {
            Self::Null | Self::Zero | Self::One | Self::Reserved(_) => 0,
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Int24 => 3,
            Self::Int32 => 4,
            Self::Int48 => 6,
            Self::Int64 | Self::Float64 => 8,
            Self::Blob(n) | Self::Text(n) => n,
        }
    }

    /// Decode a value from exactly `content_size()` bytes
    fn read_value(self, data: &[u8]) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Reserved(code) => {
                debug!(code, "reserved serial type decoded as NULL");
                Value::Null
            }
            Self::Int8 | Self::Int16 | Self::Int24 | Self::Int32 | Self::Int48 | Self::Int64 => {
                Value::Integer(read_signed_be(data))
            }
            Self::Float64 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(data);
                Value::Float(f64::from_be_bytes(buf))
            }
            Self::Zero => Value::Integer(0),
            Self::One => Value::Integer(1),
            Self::Blob(_) => Value::Blob(data.to_vec()),
            Self::Text(_) => Value::Text(data.to_vec()),
        }
    }
}

/// Big-endian two's-complement integer, sign-extended from the first byte
fn read_signed_be(data: &[u8]) -> i64 {
    let Some((&first, rest)) = data.split_first() else {
        return 0;
    };
    rest.iter()
        .fold(i64::from(first as i8), |acc, &b| (acc << 8) | i64::from(b))
}

/// Decoded record: one value per header-declared column
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    /// Column values in declaration order
    pub values: Vec<Value>,
    /// The header or body ran past the end of the payload
    pub truncated: bool,
}

impl Record {
    /// Decode a record from an assembled payload.
    ///
    /// Decoding stops at the first column whose bytes are not all present;
    /// the values before it are kept and `truncated` is set.
    pub fn decode(payload: &[u8]) -> Self {
        let mut record = Self::default();
        if payload.is_empty() {
            return record;
        }

        let (header_len, n) = decode_varint(payload);
        let header_len = usize::try_from(header_len).unwrap_or(usize::MAX);
        let header_end = if header_len > payload.len() {
            record.truncated = true;
            payload.len()
        } else {
            header_len
        };

        let mut serial_types = Vec::new();
        let mut offset = n;
        while offset < header_end {
            let (code, k) = decode_varint(&payload[offset..header_end]);
            if k == 0 {
                break;
            }
            serial_types.push(SerialType::from_code(code));
            offset += k;
        }

        let mut body = header_end;
        for serial_type in serial_types {
            let size = serial_type.content_size();
            let available = (payload.len() - body) as u64;
            if size > available {
                record.truncated = true;
                break;
            }
            let size = size as usize;
            record.values.push(serial_type.read_value(&payload[body..body + size]));
            body += size;
        }

        record
    }
}
