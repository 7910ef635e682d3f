//! Purpose: Tag-list column codec (ordered text tokens joined by a delimiter).
//! Exports: `TagListCodec`, `DEFAULT_TAG_DELIMITER`.
//! Role: Leaf codec; never fails on decode, optional strict guard on encode.
//! Invariants: Absent or empty column text decodes to an empty list.
//! Invariants: Plain `encode` joins verbatim; tags containing the delimiter do not round-trip.

use crate::core::error::{Error, ErrorKind};

pub const DEFAULT_TAG_DELIMITER: &str = "|";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TagListCodec {
    delimiter: String,
    strict: bool,
}

impl TagListCodec {
    pub fn new(delimiter: impl Into<String>) -> Result<Self, Error> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("tag delimiter must not be empty")
                .with_hint("Use a single character that never appears inside a tag, e.g. \"|\"."));
        }
        Ok(Self {
            delimiter,
            strict: false,
        })
    }

    /// In strict mode the registry write path rejects tag lists that would not
    /// survive a round trip instead of storing corrupted text.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn encode<S: AsRef<str>>(&self, tags: &[S]) -> String {
        let text = tags
            .iter()
            .map(|tag| tag.as_ref())
            .collect::<Vec<_>>()
            .join(self.delimiter.as_str());
        if self.offending_tag(tags).is_some() {
            tracing::warn!(
                delimiter = %self.delimiter,
                "tag list will not round-trip through its column text"
            );
        }
        text
    }

    pub fn encode_strict<S: AsRef<str>>(&self, tags: &[S]) -> Result<String, Error> {
        if let Some(tag) = self.offending_tag(tags) {
            return Err(Error::new(ErrorKind::UnsupportedValue)
                .with_message(format!(
                    "tag {tag:?} cannot be stored with delimiter {:?}",
                    self.delimiter
                ))
                .with_hint("Remove the delimiter from the tag or configure a different delimiter."));
        }
        Ok(self.encode(tags))
    }

    /// Encodes with the guard selected by `with_strict`.
    pub fn encode_configured<S: AsRef<str>>(&self, tags: &[S]) -> Result<String, Error> {
        if self.strict {
            self.encode_strict(tags)
        } else {
            Ok(self.encode(tags))
        }
    }

    pub fn decode(&self, raw: Option<&str>) -> Vec<String> {
        match raw {
            None | Some("") => Vec::new(),
            Some(text) => text.split(self.delimiter.as_str()).map(str::to_string).collect(),
        }
    }

    fn offending_tag<'a, S: AsRef<str>>(&self, tags: &'a [S]) -> Option<&'a str> {
        // A single empty tag encodes to "" which reads back as no tags at all.
        if let [only] = tags {
            if only.as_ref().is_empty() {
                return Some(only.as_ref());
            }
        }
        tags.iter()
            .map(|tag| tag.as_ref())
            .find(|tag| tag.contains(self.delimiter.as_str()))
    }
}

impl Default for TagListCodec {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_TAG_DELIMITER.to_string(),
            strict: false,
        }
    }
}
