//! Purpose: Define the stable public Rust API boundary for coltext.
//! Exports: Codecs, column registry, schema config, `MappingView`, errors.
//! Role: Public, additive-only surface; hides the internal `core` module tree.
//! Invariants: This module is the only public path to codec primitives.

mod column;
mod registry;
mod schema;
mod view;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::array::{
    ARRAY_FORMAT_VERSION, DType, Elements, NumericArray, NumericArrayCodec,
    SUPPORTED_ARRAY_FORMAT_VERSIONS,
};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::json::{JsonCell, JsonCodec};
pub use crate::core::mapping::{Mapping, MappingCodec};
pub use crate::core::tags::{DEFAULT_TAG_DELIMITER, TagListCodec};
pub use column::{ColumnCodec, ColumnKind, ColumnSpec, ColumnValue};
pub use registry::{CodecRegistry, MemoryRow, RawRow};
pub use schema::Schema;
pub use view::MappingView;
