//! Purpose: Type-erased column codec contract used at the row-storage boundary.
//! Exports: `ColumnKind`, `ColumnValue`, `ColumnCodec`, `ColumnSpec`.
//! Role: Lets one registry hold every codec and route raw text by declared kind.
//! Invariants: `None` raw text is SQL NULL; only JSON columns ever encode to `None`.
//! Invariants: A value of the wrong kind is `UnsupportedValue`, never coerced.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::array::{NumericArray, NumericArrayCodec};
use crate::core::error::{Error, ErrorKind};
use crate::core::json::{JsonCell, JsonCodec};
use crate::core::mapping::{Mapping, MappingCodec, value_kind};
use crate::core::tags::{DEFAULT_TAG_DELIMITER, TagListCodec};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Tags,
    Array,
    Mapping,
    Json,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Tags => f.write_str("tags"),
            ColumnKind::Array => f.write_str("array"),
            ColumnKind::Mapping => f.write_str("mapping"),
            ColumnKind::Json => f.write_str("json"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValue {
    Tags(Vec<String>),
    Array(NumericArray),
    Mapping(Mapping),
    Json(JsonCell),
}

impl ColumnValue {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnValue::Tags(_) => ColumnKind::Tags,
            ColumnValue::Array(_) => ColumnKind::Array,
            ColumnValue::Mapping(_) => ColumnKind::Mapping,
            ColumnValue::Json(_) => ColumnKind::Json,
        }
    }

    /// Interprets a JSON document as a value of `kind`.
    ///
    /// Tags take a list of strings, arrays take nested numeric lists, mappings
    /// take an object. For JSON columns `null` means the column is NULL.
    pub fn from_json(kind: ColumnKind, value: Value) -> Result<Self, Error> {
        match kind {
            ColumnKind::Tags => {
                let items = match value {
                    Value::Array(items) => items,
                    other => return Err(unsupported_input(kind, &other)),
                };
                let mut tags = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(tag) => tags.push(tag),
                        other => return Err(unsupported_input(kind, &other)),
                    }
                }
                Ok(ColumnValue::Tags(tags))
            }
            ColumnKind::Array => NumericArray::from_json(&value).map(ColumnValue::Array),
            ColumnKind::Mapping => match value {
                Value::Object(mapping) => Ok(ColumnValue::Mapping(mapping)),
                other => Err(unsupported_input(kind, &other)),
            },
            ColumnKind::Json => Ok(ColumnValue::Json(match value {
                Value::Null => JsonCell::Null,
                other => JsonCell::Value(other),
            })),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ColumnValue::Tags(tags) => Value::from(tags.clone()),
            ColumnValue::Array(array) => array.to_json(),
            ColumnValue::Mapping(mapping) => Value::Object(mapping.clone()),
            ColumnValue::Json(JsonCell::Value(value)) => value.clone(),
            ColumnValue::Json(JsonCell::Null) => Value::Null,
            ColumnValue::Json(JsonCell::Blank) => Value::String(String::new()),
        }
    }
}

fn unsupported_input(kind: ColumnKind, value: &Value) -> Error {
    Error::new(ErrorKind::UnsupportedValue).with_message(format!(
        "{kind} column cannot hold a JSON {}",
        value_kind(value)
    ))
}

fn wrong_kind(expected: ColumnKind, value: &ColumnValue) -> Error {
    Error::new(ErrorKind::UnsupportedValue).with_message(format!(
        "{expected} column cannot store a {} value",
        value.kind()
    ))
}

/// Codec contract the row-storage layer calls once per field read or write.
pub trait ColumnCodec: Send + Sync {
    fn kind(&self) -> ColumnKind;

    fn encode(&self, value: &ColumnValue) -> Result<Option<String>, Error>;

    fn decode(&self, raw: Option<&str>) -> Result<ColumnValue, Error>;
}

impl ColumnCodec for TagListCodec {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Tags
    }

    fn encode(&self, value: &ColumnValue) -> Result<Option<String>, Error> {
        match value {
            ColumnValue::Tags(tags) => self.encode_configured(tags.as_slice()).map(Some),
            other => Err(wrong_kind(ColumnKind::Tags, other)),
        }
    }

    fn decode(&self, raw: Option<&str>) -> Result<ColumnValue, Error> {
        Ok(ColumnValue::Tags(TagListCodec::decode(self, raw)))
    }
}

impl ColumnCodec for NumericArrayCodec {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Array
    }

    fn encode(&self, value: &ColumnValue) -> Result<Option<String>, Error> {
        match value {
            ColumnValue::Array(array) => Ok(Some(NumericArrayCodec::encode(self, array))),
            other => Err(wrong_kind(ColumnKind::Array, other)),
        }
    }

    fn decode(&self, raw: Option<&str>) -> Result<ColumnValue, Error> {
        NumericArrayCodec::decode(self, raw).map(ColumnValue::Array)
    }
}

impl ColumnCodec for MappingCodec {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Mapping
    }

    fn encode(&self, value: &ColumnValue) -> Result<Option<String>, Error> {
        match value {
            ColumnValue::Mapping(mapping) => MappingCodec::encode(self, mapping).map(Some),
            other => Err(wrong_kind(ColumnKind::Mapping, other)),
        }
    }

    fn decode(&self, raw: Option<&str>) -> Result<ColumnValue, Error> {
        MappingCodec::decode(self, raw).map(ColumnValue::Mapping)
    }
}

impl ColumnCodec for JsonCodec {
    fn kind(&self) -> ColumnKind {
        ColumnKind::Json
    }

    fn encode(&self, value: &ColumnValue) -> Result<Option<String>, Error> {
        match value {
            ColumnValue::Json(cell) => self.encode_cell(cell),
            other => Err(wrong_kind(ColumnKind::Json, other)),
        }
    }

    fn decode(&self, raw: Option<&str>) -> Result<ColumnValue, Error> {
        JsonCodec::decode(self, raw).map(ColumnValue::Json)
    }
}

/// Declarative codec choice for one column, as read from a schema file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSpec {
    Tags {
        #[serde(default = "default_delimiter")]
        delimiter: String,
        #[serde(default)]
        strict: bool,
    },
    Array,
    Mapping,
    Json,
}

fn default_delimiter() -> String {
    DEFAULT_TAG_DELIMITER.to_string()
}

impl ColumnSpec {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnSpec::Tags { .. } => ColumnKind::Tags,
            ColumnSpec::Array => ColumnKind::Array,
            ColumnSpec::Mapping => ColumnKind::Mapping,
            ColumnSpec::Json => ColumnKind::Json,
        }
    }

    pub fn build(&self) -> Result<Box<dyn ColumnCodec>, Error> {
        Ok(match self {
            ColumnSpec::Tags { delimiter, strict } => {
                Box::new(TagListCodec::new(delimiter.clone())?.with_strict(*strict))
            }
            ColumnSpec::Array => Box::new(NumericArrayCodec),
            ColumnSpec::Mapping => Box::new(MappingCodec),
            ColumnSpec::Json => Box::new(JsonCodec),
        })
    }
}

impl From<ColumnKind> for ColumnSpec {
    fn from(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Tags => ColumnSpec::Tags {
                delimiter: default_delimiter(),
                strict: false,
            },
            ColumnKind::Array => ColumnSpec::Array,
            ColumnKind::Mapping => ColumnSpec::Mapping,
            ColumnKind::Json => ColumnSpec::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnCodec, ColumnKind, ColumnSpec, ColumnValue};
    use crate::core::array::NumericArray;
    use crate::core::error::ErrorKind;
    use crate::core::json::JsonCell;
    use serde_json::json;

    #[test]
    fn every_spec_builds_a_codec_of_its_kind() {
        for kind in [ColumnKind::Tags, ColumnKind::Array, ColumnKind::Mapping, ColumnKind::Json] {
            let codec = ColumnSpec::from(kind).build().expect("codec");
            assert_eq!(codec.kind(), kind);
        }
    }

    #[test]
    fn wrong_value_kind_is_rejected() {
        let codec = ColumnSpec::Array.build().expect("codec");
        let err = codec
            .encode(&ColumnValue::Tags(vec!["a".to_string()]))
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    }

    #[test]
    fn only_json_null_encodes_to_sql_null() {
        let json = ColumnSpec::Json.build().expect("codec");
        assert_eq!(json.encode(&ColumnValue::Json(JsonCell::Null)).expect("encode"), None);

        let array = ColumnSpec::Array.build().expect("codec");
        let raw = array
            .encode(&ColumnValue::Array(NumericArray::empty()))
            .expect("encode");
        assert_eq!(raw.as_deref(), Some("nda1;f8;0;"));
    }

    #[test]
    fn strict_tag_spec_guards_the_write_path() {
        let spec = ColumnSpec::Tags {
            delimiter: ",".to_string(),
            strict: true,
        };
        let codec = spec.build().expect("codec");
        let err = codec
            .encode(&ColumnValue::Tags(vec!["a,b".to_string()]))
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    }

    #[test]
    fn from_json_checks_shape_per_kind() {
        let tags = ColumnValue::from_json(ColumnKind::Tags, json!(["x", "y"])).expect("tags");
        assert_eq!(tags, ColumnValue::Tags(vec!["x".to_string(), "y".to_string()]));

        let err = ColumnValue::from_json(ColumnKind::Tags, json!(["x", 1])).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);

        let err = ColumnValue::from_json(ColumnKind::Mapping, json!([1])).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);

        let json_null = ColumnValue::from_json(ColumnKind::Json, json!(null)).expect("json");
        assert_eq!(json_null, ColumnValue::Json(JsonCell::Null));
        assert_eq!(json_null.to_json(), json!(null));
    }

    #[test]
    fn column_spec_deserializes_with_defaults() {
        let spec: ColumnSpec = serde_json::from_value(json!({"kind": "tags"})).expect("spec");
        assert_eq!(
            spec,
            ColumnSpec::Tags {
                delimiter: "|".to_string(),
                strict: false
            }
        );
        let spec: ColumnSpec = serde_json::from_value(json!({"kind": "array"})).expect("spec");
        assert_eq!(spec.kind(), ColumnKind::Array);
    }
}
