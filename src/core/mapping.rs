//! Purpose: Mapping column codec (text keys to nested JSON-representable values).
//! Exports: `Mapping`, `MappingCodec`.
//! Role: Leaf codec behind `MappingView` and mapping columns.
//! Invariants: Exactly one parser (JSON); there is no fallback parse on failure.
//! Invariants: Encoded text is compact JSON with keys in sorted order, so encode is deterministic.
//! Invariants: Absent or empty column text decodes to an empty mapping.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};

pub type Mapping = Map<String, Value>;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MappingCodec;

impl MappingCodec {
    pub fn encode(&self, mapping: &Mapping) -> Result<String, Error> {
        serde_json::to_string(mapping).map_err(|err| {
            Error::new(ErrorKind::UnsupportedValue)
                .with_message("mapping cannot be serialized")
                .with_source(err)
        })
    }

    /// Encodes any serde value whose serialized form is a JSON object.
    ///
    /// Non-string map keys, failing `Serialize` impls and non-object values are
    /// rejected instead of being written as partial text.
    pub fn encode_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Error> {
        let value = serde_json::to_value(value).map_err(|err| {
            Error::new(ErrorKind::UnsupportedValue)
                .with_message("value cannot be represented as a mapping")
                .with_source(err)
        })?;
        match value {
            Value::Object(mapping) => self.encode(&mapping),
            other => Err(Error::new(ErrorKind::UnsupportedValue)
                .with_message(format!("expected a mapping, got {}", value_kind(&other)))),
        }
    }

    pub fn decode(&self, raw: Option<&str>) -> Result<Mapping, Error> {
        let text = match raw {
            None | Some("") => return Ok(Mapping::new()),
            Some(text) => text,
        };
        let value: Value = serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::MalformedMapping)
                .with_message(format!("mapping text is not valid JSON: {err}"))
                .with_source(err)
        })?;
        match value {
            Value::Object(mapping) => Ok(mapping),
            other => Err(Error::new(ErrorKind::MalformedMapping)
                .with_message(format!("expected a JSON object, got {}", value_kind(&other)))),
        }
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{Mapping, MappingCodec};
    use crate::core::error::ErrorKind;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};

    fn mapping(value: serde_json::Value) -> Mapping {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn nested_values_round_trip() {
        let original = mapping(json!({
            "energy": -3.25,
            "count": 4,
            "elements": ["Fe", "O"],
            "lattice": {"a": 1.0, "angles": [90, 90, 120]},
            "stable": true,
            "note": null
        }));
        let text = MappingCodec.encode(&original).expect("encode");
        assert_eq!(MappingCodec.decode(Some(text.as_str())).expect("decode"), original);
    }

    #[test]
    fn encode_is_key_order_independent() {
        let mut first = Mapping::new();
        first.insert("b".to_string(), json!(2));
        first.insert("a".to_string(), json!(1));
        let mut second = Mapping::new();
        second.insert("a".to_string(), json!(1));
        second.insert("b".to_string(), json!(2));
        let text = MappingCodec.encode(&first).expect("encode");
        assert_eq!(text, r#"{"a":1,"b":2}"#);
        assert_eq!(text, MappingCodec.encode(&second).expect("encode"));
    }

    #[test]
    fn shortest_float_text_parses_back_exactly() {
        for value in [1.0715660391465826e-75, -1.603964615428183e143, 5e-324, f64::MAX] {
            let original = mapping(json!({"x": value}));
            let text = MappingCodec.encode(&original).expect("encode");
            let decoded = MappingCodec.decode(Some(text.as_str())).expect("decode");
            assert_eq!(decoded["x"].as_f64(), Some(value), "{text}");
            assert_eq!(MappingCodec.encode(&decoded).expect("encode"), text);
        }
    }

    #[test]
    fn absent_decodes_to_empty_mapping() {
        assert!(MappingCodec.decode(None).expect("decode").is_empty());
        assert!(MappingCodec.decode(Some("")).expect("decode").is_empty());
    }

    #[test]
    fn loose_literal_text_is_rejected() {
        let cases = ["{'a': 1}", "a: 1\nb: 2", "{\"a\": 1", "[1, 2]", "42", "null"];
        for case in cases {
            let err = MappingCodec.decode(Some(case)).expect_err(case);
            assert_eq!(err.kind(), ErrorKind::MalformedMapping, "{case}");
        }
    }

    #[test]
    fn encode_value_accepts_serde_maps() {
        let mut source = BTreeMap::new();
        source.insert("x", vec![1, 2]);
        let text = MappingCodec.encode_value(&source).expect("encode");
        assert_eq!(text, r#"{"x":[1,2]}"#);
    }

    #[test]
    fn encode_value_rejects_unrepresentable_input() {
        let mut tuple_keys = HashMap::new();
        tuple_keys.insert((1, 2), "pair");
        let err = MappingCodec.encode_value(&tuple_keys).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);

        let err = MappingCodec.encode_value(&vec![1, 2]).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    }
}
