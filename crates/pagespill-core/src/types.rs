//! In-memory pages handed to the spiller.
//!
//! A page is a small columnar unit: named columns of scalars with equal
//! lengths. The spiller never looks inside a page except to ask for its
//! logical size.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
}

impl Scalar {
    /// In-memory footprint of the value, excluding enum overhead.
    pub fn size_in_bytes(&self) -> u64 {
        match self {
            Scalar::Null | Scalar::Bool(_) => 1,
            Scalar::I32(_) | Scalar::F32(_) => 4,
            Scalar::I64(_) | Scalar::F64(_) => 8,
            Scalar::Str(s) => s.len() as u64,
            Scalar::Bin(b) => b.len() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.values.iter().map(Scalar::size_in_bytes).sum()
    }
}

/// Immutable unit of tabular data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    columns: Vec<Column>,
}

impl Page {
    /// Build a page, rejecting columns of differing lengths.
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let rows = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
                return Err(Error::Page(format!(
                    "column '{}' has {} rows, expected {}",
                    bad.name,
                    bad.len(),
                    rows
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of rows.
    pub fn position_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Logical in-memory size: the sum of every scalar's footprint.
    pub fn size_in_bytes(&self) -> u64 {
        self.columns.iter().map(Column::size_in_bytes).sum()
    }
}
