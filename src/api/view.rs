//! Purpose: Container-style access to a decoded mapping column.
//! Exports: `MappingView`.
//! Role: Transient wrapper created per access; composes with a row instead of being one.
//! Invariants: Mutations touch only the in-memory mapping until `commit`/`encode` is called.
//! Invariants: `get`/`delete` of a missing key is `KeyNotFound`.

use serde_json::Value;

use crate::api::column::ColumnValue;
use crate::api::registry::{CodecRegistry, RawRow};
use crate::core::error::{Error, ErrorKind};
use crate::core::mapping::{Mapping, MappingCodec};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingView {
    data: Mapping,
}

impl MappingView {
    pub fn new(data: Mapping) -> Self {
        Self { data }
    }

    pub fn decode(raw: Option<&str>) -> Result<Self, Error> {
        MappingCodec.decode(raw).map(Self::new)
    }

    /// Reads `column` of `row` through the registry; the column must hold a mapping.
    pub fn load<R: RawRow + ?Sized>(
        registry: &CodecRegistry,
        row: &R,
        column: &str,
    ) -> Result<Self, Error> {
        match registry.read(row, column)? {
            ColumnValue::Mapping(data) => Ok(Self::new(data)),
            other => Err(Error::new(ErrorKind::UnsupportedValue)
                .with_message(format!("column holds {} values, not a mapping", other.kind()))
                .with_column(column)),
        }
    }

    pub fn get(&self, key: &str) -> Result<&Value, Error> {
        self.data.get(key).ok_or_else(|| missing_key(key))
    }

    /// Returns the previous value for `key`, if any.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    pub fn delete(&mut self, key: &str) -> Result<Value, Error> {
        self.data.remove(key).ok_or_else(|| missing_key(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.data.values()
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.data
    }

    pub fn into_inner(self) -> Mapping {
        self.data
    }

    pub fn encode(&self) -> Result<String, Error> {
        MappingCodec.encode(&self.data)
    }

    /// Writes the current mapping back to `column`; the only persisting call.
    pub fn commit<R: RawRow + ?Sized>(
        &self,
        registry: &CodecRegistry,
        row: &mut R,
        column: &str,
    ) -> Result<(), Error> {
        registry.write(row, column, &ColumnValue::Mapping(self.data.clone()))
    }
}

impl From<Mapping> for MappingView {
    fn from(data: Mapping) -> Self {
        Self::new(data)
    }
}

fn missing_key(key: &str) -> Error {
    Error::new(ErrorKind::KeyNotFound).with_message(format!("key {key:?} not found"))
}

#[cfg(test)]
mod tests {
    use super::MappingView;
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn set_replaces_and_reports_previous_value() {
        let mut view = MappingView::default();
        assert_eq!(view.set("a", 1), None);
        assert_eq!(view.set("a", "x"), Some(json!(1)));
        assert_eq!(view.get("a").expect("get"), &json!("x"));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn missing_keys_are_errors() {
        let mut view = MappingView::default();
        assert_eq!(view.get("nope").expect_err("get").kind(), ErrorKind::KeyNotFound);
        assert_eq!(view.delete("nope").expect_err("delete").kind(), ErrorKind::KeyNotFound);
    }

    #[test]
    fn mutations_stay_in_memory_until_encoded() {
        let raw = r#"{"a":1}"#;
        let mut view = MappingView::decode(Some(raw)).expect("decode");
        view.set("b", json!([1, 2]));
        assert_eq!(raw, r#"{"a":1}"#);
        assert_eq!(view.encode().expect("encode"), r#"{"a":1,"b":[1,2]}"#);
    }
}
