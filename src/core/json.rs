// JSON column codec. Unlike the other codecs an absent or blank column is
// carried through as-is: "nothing stored" is a different state from `{}`.
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq)]
pub enum JsonCell {
    /// Column is NULL.
    Null,
    /// Column holds the empty string.
    Blank,
    Value(Value),
}

impl JsonCell {
    pub fn value(&self) -> Option<&Value> {
        match self {
            JsonCell::Value(value) => Some(value),
            JsonCell::Null | JsonCell::Blank => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            JsonCell::Value(value) => Some(value),
            JsonCell::Null | JsonCell::Blank => None,
        }
    }
}

impl From<Value> for JsonCell {
    fn from(value: Value) -> Self {
        JsonCell::Value(value)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode(&self, value: &Value) -> Result<String, Error> {
        serde_json::to_string(value).map_err(|err| {
            Error::new(ErrorKind::UnsupportedValue)
                .with_message("value cannot be serialized as JSON")
                .with_source(err)
        })
    }

    pub fn encode_cell(&self, cell: &JsonCell) -> Result<Option<String>, Error> {
        match cell {
            JsonCell::Null => Ok(None),
            JsonCell::Blank => Ok(Some(String::new())),
            JsonCell::Value(value) => self.encode(value).map(Some),
        }
    }

    pub fn decode(&self, raw: Option<&str>) -> Result<JsonCell, Error> {
        match raw {
            None => Ok(JsonCell::Null),
            Some("") => Ok(JsonCell::Blank),
            Some(text) => serde_json::from_str(text).map(JsonCell::Value).map_err(|err| {
                Error::new(ErrorKind::JsonParse)
                    .with_message(format!("column text is not valid JSON: {err}"))
                    .with_source(err)
            }),
        }
    }
}
