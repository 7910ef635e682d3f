//! Purpose: Row-storage boundary; one registered codec per column, one codec call per field access.
//! Exports: `RawRow`, `MemoryRow`, `CodecRegistry`.
//! Role: The storage layer implements `RawRow`; the registry turns raw text into typed values and back.
//! Invariants: `read` decodes exactly once and `write` encodes exactly once before a single `put_raw`.
//! Invariants: Decode failures surface with the column attached; no default is substituted.
//! Invariants: A column has at most one codec; re-registration is `AlreadyExists`.

use std::collections::BTreeMap;

use crate::api::column::{ColumnCodec, ColumnKind, ColumnSpec, ColumnValue};
use crate::core::error::{Error, ErrorKind};

/// Raw text access implemented by the row-storage layer.
pub trait RawRow {
    /// Stored text for `column`; `None` when the column is NULL or missing.
    fn raw(&self, column: &str) -> Option<&str>;

    fn put_raw(&mut self, column: &str, raw: Option<String>);
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MemoryRow {
    cells: BTreeMap<String, Option<String>>,
}

impl MemoryRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(mut self, column: impl Into<String>, raw: Option<&str>) -> Self {
        self.cells.insert(column.into(), raw.map(str::to_string));
        self
    }

    pub fn cells(&self) -> &BTreeMap<String, Option<String>> {
        &self.cells
    }
}

impl RawRow for MemoryRow {
    fn raw(&self, column: &str) -> Option<&str> {
        self.cells.get(column).and_then(|raw| raw.as_deref())
    }

    fn put_raw(&mut self, column: &str, raw: Option<String>) {
        self.cells.insert(column.to_string(), raw);
    }
}

impl FromIterator<(String, Option<String>)> for MemoryRow {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

#[derive(Default)]
pub struct CodecRegistry {
    codecs: BTreeMap<String, Box<dyn ColumnCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        column: impl Into<String>,
        codec: Box<dyn ColumnCodec>,
    ) -> Result<(), Error> {
        let column = column.into();
        if self.codecs.contains_key(&column) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message("column already has a codec")
                .with_column(column));
        }
        tracing::debug!(column = %column, kind = %codec.kind(), "registered column codec");
        self.codecs.insert(column, codec);
        Ok(())
    }

    pub fn register_spec(&mut self, column: impl Into<String>, spec: &ColumnSpec) -> Result<(), Error> {
        let column = column.into();
        let codec = spec.build().map_err(|err| err.with_column(column.clone()))?;
        self.register(column, codec)
    }

    pub fn codec(&self, column: &str) -> Result<&dyn ColumnCodec, Error> {
        self.codecs
            .get(column)
            .map(|codec| codec.as_ref())
            .ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message("no codec registered for column")
                    .with_column(column)
            })
    }

    pub fn kind(&self, column: &str) -> Result<ColumnKind, Error> {
        self.codec(column).map(|codec| codec.kind())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, ColumnKind)> {
        self.codecs
            .iter()
            .map(|(column, codec)| (column.as_str(), codec.kind()))
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    pub fn read<R: RawRow + ?Sized>(&self, row: &R, column: &str) -> Result<ColumnValue, Error> {
        let codec = self.codec(column)?;
        codec.decode(row.raw(column)).map_err(|err| {
            tracing::debug!(column, kind = %codec.kind(), error = %err, "column decode failed");
            err.with_column(column)
        })
    }

    pub fn write<R: RawRow + ?Sized>(
        &self,
        row: &mut R,
        column: &str,
        value: &ColumnValue,
    ) -> Result<(), Error> {
        let codec = self.codec(column)?;
        let raw = codec.encode(value).map_err(|err| {
            tracing::debug!(column, kind = %codec.kind(), error = %err, "column encode failed");
            err.with_column(column)
        })?;
        row.put_raw(column, raw);
        Ok(())
    }

    /// Decodes every registered column; the first failure aborts the read.
    pub fn read_all<R: RawRow + ?Sized>(&self, row: &R) -> Result<BTreeMap<String, ColumnValue>, Error> {
        self.codecs
            .keys()
            .map(|column| self.read(row, column).map(|value| (column.clone(), value)))
            .collect()
    }
}
