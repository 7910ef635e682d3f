//! Purpose: Load column schemas (column name -> codec spec) from JSON config.
//! Exports: `Schema`.
//! Role: Config boundary for the CLI and for storage layers that declare columns in files.
//! Invariants: Unknown kinds and malformed documents fail with `Usage`; nothing is defaulted silently.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::column::ColumnSpec;
use crate::api::registry::CodecRegistry;
use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: BTreeMap<String, ColumnSpec>,
}

impl Schema {
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid column schema: {err}"))
                .with_hint(r#"Expected {"columns": {"<name>": {"kind": "tags|array|mapping|json"}}}."#)
                .with_source(err)
        })
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read schema {}", path.display()))
                .with_source(err)
        })?;
        Self::from_json_str(&text)
    }

    pub fn registry(&self) -> Result<CodecRegistry, Error> {
        let mut registry = CodecRegistry::new();
        for (column, spec) in &self.columns {
            registry.register_spec(column.clone(), spec)?;
        }
        Ok(registry)
    }
}
