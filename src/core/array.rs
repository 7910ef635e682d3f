//! Purpose: Shape- and dtype-preserving numeric array type plus its column codec.
//! Exports: `NumericArray`, `Elements`, `DType`, `NumericArrayCodec`, format version constants.
//! Role: Portable, versioned text form for numeric arrays stored in a text column.
//! Invariants: Text layout is `nda<version>;<dtype>;<shape>;<data>`; every field is plain ASCII.
//! Invariants: Decode accepts only canonical encoder output; anything else is `MalformedArray`.
//! Invariants: Element count always equals the product of the shape.
//! Invariants: Version list is additive; encoders always write the current version.

use serde_json::{Number, Value};

use crate::core::error::{Error, ErrorKind};

pub const ARRAY_FORMAT_VERSION: u32 = 1;
pub const SUPPORTED_ARRAY_FORMAT_VERSIONS: &[u32] = &[ARRAY_FORMAT_VERSION];

const ARRAY_MAGIC: &str = "nda";
const FIELD_SEP: char = ';';
const ITEM_SEP: char = ',';
/// Most nested lists an element-free array may expand to, e.g. shape `[n, 0]`.
const MAX_EMPTY_NESTING: usize = 1 << 20;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DType {
    Int64,
    Float64,
}

impl DType {
    pub fn tag(self) -> &'static str {
        match self {
            DType::Int64 => "i8",
            DType::Float64 => "f8",
        }
    }

    fn from_tag(tag: &str) -> Result<Self, Error> {
        match tag {
            "i8" => Ok(DType::Int64),
            "f8" => Ok(DType::Float64),
            other => Err(malformed(format!("unknown dtype {other:?}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Elements {
    Int64(Vec<i64>),
    Float64(Vec<f64>),
}

impl Elements {
    pub fn len(&self) -> usize {
        match self {
            Elements::Int64(values) => values.len(),
            Elements::Float64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match self {
            Elements::Int64(_) => DType::Int64,
            Elements::Float64(_) => DType::Float64,
        }
    }
}

/// Dense row-major array of rank >= 0.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericArray {
    shape: Vec<usize>,
    elements: Elements,
}

impl NumericArray {
    pub fn new(shape: Vec<usize>, elements: Elements) -> Result<Self, Error> {
        let expected = element_count(&shape).ok_or_else(|| {
            Error::new(ErrorKind::UnsupportedValue).with_message("array shape overflows usize")
        })?;
        if expected != elements.len() {
            return Err(Error::new(ErrorKind::UnsupportedValue).with_message(format!(
                "shape {shape:?} needs {expected} elements, got {}",
                elements.len()
            )));
        }
        if expected == 0
            && nested_list_count(&shape).is_none_or(|lists| lists > MAX_EMPTY_NESTING)
        {
            return Err(Error::new(ErrorKind::UnsupportedValue).with_message(format!(
                "shape {shape:?} expands to more than {MAX_EMPTY_NESTING} empty lists"
            )));
        }
        Ok(Self { shape, elements })
    }

    /// One-dimensional, zero-length float array.
    pub fn empty() -> Self {
        Self {
            shape: vec![0],
            elements: Elements::Float64(Vec::new()),
        }
    }

    pub fn from_ints(values: Vec<i64>) -> Self {
        Self {
            shape: vec![values.len()],
            elements: Elements::Int64(values),
        }
    }

    pub fn from_floats(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            elements: Elements::Float64(values),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn dtype(&self) -> DType {
        self.elements.dtype()
    }

    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    pub fn into_parts(self) -> (Vec<usize>, Elements) {
        (self.shape, self.elements)
    }

    /// Builds an array from a bare number or rectangular nested JSON lists.
    ///
    /// The dtype is `Int64` when every leaf is an integer, otherwise `Float64`.
    /// Integers outside the `i64` range are `UnsupportedValue` rather than
    /// being widened to floats. An empty list yields [`NumericArray::empty`].
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let mut shape = Vec::new();
        let mut cursor = value;
        while let Value::Array(items) = cursor {
            shape.push(items.len());
            match items.first() {
                Some(first) => cursor = first,
                None => break,
            }
        }
        if shape == [0] {
            return Ok(Self::empty());
        }

        let mut leaves = Vec::new();
        collect_leaves(value, &shape, &mut leaves)?;
        if let Some(leaf) = leaves.iter().find(|leaf| leaf.is_u64() && !leaf.is_i64()) {
            return Err(Error::new(ErrorKind::UnsupportedValue)
                .with_message(format!("integer {leaf} does not fit a 64-bit signed element")));
        }

        let elements = if leaves.iter().all(|leaf| leaf.is_i64()) {
            Elements::Int64(leaves.iter().filter_map(|leaf| leaf.as_i64()).collect())
        } else {
            let mut floats = Vec::with_capacity(leaves.len());
            for leaf in &leaves {
                let float = leaf.as_f64().ok_or_else(|| {
                    Error::new(ErrorKind::UnsupportedValue)
                        .with_message(format!("number {leaf} has no f64 representation"))
                })?;
                floats.push(float);
            }
            Elements::Float64(floats)
        };
        Self::new(shape, elements)
    }

    /// Nested JSON lists following the shape. Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        let mut leaves: Box<dyn Iterator<Item = Value> + '_> = match &self.elements {
            Elements::Int64(values) => Box::new(values.iter().map(|value| Value::from(*value))),
            Elements::Float64(values) => Box::new(
                values
                    .iter()
                    .map(|value| Number::from_f64(*value).map_or(Value::Null, Value::Number)),
            ),
        };
        nest(&self.shape, leaves.as_mut())
    }
}

impl Default for NumericArray {
    fn default() -> Self {
        Self::empty()
    }
}

fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
}

// Lists emitted by `to_json`: one per index prefix shorter than the rank.
fn nested_list_count(shape: &[usize]) -> Option<usize> {
    let mut lists = 0usize;
    let mut width = 1usize;
    for dim in shape {
        lists = lists.checked_add(width)?;
        width = width.checked_mul(*dim)?;
    }
    Some(lists)
}

fn collect_leaves<'a>(
    value: &'a Value,
    shape: &[usize],
    out: &mut Vec<&'a Number>,
) -> Result<(), Error> {
    match (shape.split_first(), value) {
        (None, Value::Number(number)) => {
            out.push(number);
            Ok(())
        }
        (None, Value::Array(_)) | (Some(_), Value::Number(_)) => Err(Error::new(
            ErrorKind::UnsupportedValue,
        )
        .with_message("ragged nested sequence cannot form an array")),
        (Some((dim, rest)), Value::Array(items)) => {
            if items.len() != *dim {
                return Err(Error::new(ErrorKind::UnsupportedValue)
                    .with_message("ragged nested sequence cannot form an array"));
            }
            for item in items {
                collect_leaves(item, rest, out)?;
            }
            Ok(())
        }
        (_, other) => Err(Error::new(ErrorKind::UnsupportedValue)
            .with_message(format!("array elements must be numbers, got {other}"))),
    }
}

fn nest(shape: &[usize], leaves: &mut dyn Iterator<Item = Value>) -> Value {
    match shape.split_first() {
        None => leaves.next().unwrap_or(Value::Null),
        Some((dim, rest)) => Value::Array((0..*dim).map(|_| nest(rest, &mut *leaves)).collect()),
    }
}

fn array_version_error(detected: u32) -> Error {
    let supported = SUPPORTED_ARRAY_FORMAT_VERSIONS
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    malformed(format!(
        "unsupported array format version {detected} (supported: {supported})"
    ))
    .with_hint("The column was written by a newer encoder. Upgrade coltext to read it.")
}

fn malformed(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::MalformedArray).with_message(message)
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct NumericArrayCodec;

impl NumericArrayCodec {
    pub fn encode(&self, array: &NumericArray) -> String {
        let shape = array
            .shape
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let data = match &array.elements {
            Elements::Int64(values) => join_items(values.iter().map(i64::to_string)),
            // `{:?}` is the shortest text that parses back to the same f64.
            Elements::Float64(values) => join_items(values.iter().map(|value| format!("{value:?}"))),
        };
        format!(
            "{ARRAY_MAGIC}{ARRAY_FORMAT_VERSION}{FIELD_SEP}{}{FIELD_SEP}{shape}{FIELD_SEP}{data}",
            array.dtype().tag()
        )
    }

    pub fn decode(&self, raw: Option<&str>) -> Result<NumericArray, Error> {
        let text = match raw {
            None | Some("") => return Ok(NumericArray::empty()),
            Some(text) => text,
        };
        let array = parse_array(text)?;
        if self.encode(&array) != text {
            return Err(malformed("array text is not in canonical form"));
        }
        Ok(array)
    }
}

fn join_items(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(",")
}

fn parse_array(text: &str) -> Result<NumericArray, Error> {
    let mut fields = text.splitn(4, FIELD_SEP);
    let header = fields.next().unwrap_or_default();
    let (Some(dtype), Some(shape), Some(data)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(malformed("array text is missing header fields"));
    };

    let version = header
        .strip_prefix(ARRAY_MAGIC)
        .and_then(|version| version.parse::<u32>().ok())
        .ok_or_else(|| malformed("array text has no format header"))?;
    if !SUPPORTED_ARRAY_FORMAT_VERSIONS.contains(&version) {
        return Err(array_version_error(version));
    }

    let dtype = DType::from_tag(dtype)?;
    let shape = split_items(shape)
        .map(|dim| {
            dim.parse::<usize>()
                .map_err(|err| malformed(format!("invalid dimension {dim:?}")).with_source(err))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let items = split_items(data);
    let elements = match dtype {
        DType::Int64 => Elements::Int64(
            items
                .map(|item| {
                    item.parse::<i64>()
                        .map_err(|err| malformed(format!("invalid integer {item:?}")).with_source(err))
                })
                .collect::<Result<_, _>>()?,
        ),
        DType::Float64 => Elements::Float64(
            items
                .map(|item| {
                    item.parse::<f64>()
                        .map_err(|err| malformed(format!("invalid float {item:?}")).with_source(err))
                })
                .collect::<Result<_, _>>()?,
        ),
    };

    NumericArray::new(shape, elements).map_err(|err| {
        malformed(err.message().unwrap_or("element count does not match shape").to_string())
    })
}

fn split_items(field: &str) -> impl Iterator<Item = &str> {
    let mut items = field.split(ITEM_SEP);
    if field.is_empty() {
        items.next();
    }
    items
}

#[cfg(test)]
mod tests {
    use super::{
        ARRAY_FORMAT_VERSION, DType, Elements, MAX_EMPTY_NESTING, NumericArray,
        NumericArrayCodec, SUPPORTED_ARRAY_FORMAT_VERSIONS,
    };
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn encodes_shape_and_dtype_in_header() {
        let array = NumericArray::new(vec![2, 3], Elements::Int64(vec![1, 2, 3, 4, 5, 6]))
            .expect("array");
        let text = NumericArrayCodec.encode(&array);
        assert_eq!(text, "nda1;i8;2,3;1,2,3,4,5,6");
        assert_eq!(NumericArrayCodec.decode(Some(text.as_str())).expect("decode"), array);
    }

    #[test]
    fn float_elements_keep_full_precision() {
        let array = NumericArray::from_floats(vec![0.1, -2.5, 1e300, f64::MIN_POSITIVE, -0.0]);
        let text = NumericArrayCodec.encode(&array);
        let decoded = NumericArrayCodec.decode(Some(text.as_str())).expect("decode");
        assert_eq!(decoded.dtype(), DType::Float64);
        match decoded.elements() {
            Elements::Float64(values) => {
                assert_eq!(values[0], 0.1);
                assert_eq!(values[2], 1e300);
                assert!(values[4].is_sign_negative());
            }
            other => panic!("expected floats, got {other:?}"),
        }
    }

    #[test]
    fn whole_floats_stay_floats() {
        let array = NumericArray::from_floats(vec![1.0, 2.0]);
        let text = NumericArrayCodec.encode(&array);
        assert_eq!(text, "nda1;f8;2;1.0,2.0");
        assert_eq!(
            NumericArrayCodec.decode(Some(text.as_str())).expect("decode").dtype(),
            DType::Float64
        );
    }

    #[test]
    fn rank_zero_round_trips() {
        let scalar = NumericArray::new(Vec::new(), Elements::Int64(vec![7])).expect("scalar");
        let text = NumericArrayCodec.encode(&scalar);
        assert_eq!(text, "nda1;i8;;7");
        let decoded = NumericArrayCodec.decode(Some(text.as_str())).expect("decode");
        assert_eq!(decoded.rank(), 0);
        assert_eq!(decoded, scalar);
    }

    #[test]
    fn zero_sized_dimensions_round_trip() {
        let array = NumericArray::new(vec![3, 0], Elements::Float64(Vec::new())).expect("array");
        let text = NumericArrayCodec.encode(&array);
        assert_eq!(text, "nda1;f8;3,0;");
        assert_eq!(NumericArrayCodec.decode(Some(text.as_str())).expect("decode"), array);
    }

    #[test]
    fn absent_decodes_to_empty_array() {
        let empty = NumericArrayCodec.decode(None).expect("decode");
        assert_eq!(empty, NumericArray::empty());
        assert_eq!(empty.shape(), &[0]);
        assert_eq!(NumericArrayCodec.decode(Some("")).expect("decode"), empty);
    }

    #[test]
    fn rejects_foreign_and_damaged_text() {
        let cases = [
            "(lp0\nF1.0\na.",
            "nda1;i8;2;1",
            "nda1;i8;2;1,x",
            "nda1;c16;1;1",
            "nda1;i8;2;1,2;",
            "nda1;i8;+2;1,2",
            "nda1;f8;1;1",
            "nda1;i8;2",
            "nda;i8;1;1",
        ];
        for case in cases {
            let err = NumericArrayCodec.decode(Some(case)).expect_err(case);
            assert_eq!(err.kind(), ErrorKind::MalformedArray, "{case}");
        }
    }

    #[test]
    fn rejects_unknown_format_version() {
        assert!(SUPPORTED_ARRAY_FORMAT_VERSIONS.contains(&ARRAY_FORMAT_VERSION));
        let err = NumericArrayCodec.decode(Some("nda2;i8;1;1")).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedArray);
        assert!(err.message().unwrap_or_default().contains("version 2"));
        assert!(err.message().unwrap_or_default().contains("supported: 1"));
        assert!(err.hint().is_some());
    }

    #[test]
    fn empty_shapes_with_huge_outer_dimensions_are_rejected() {
        let err = NumericArrayCodec
            .decode(Some("nda1;f8;18446744073709551615,0;"))
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedArray);

        let err = NumericArray::new(vec![MAX_EMPTY_NESTING * 2, 0], Elements::Float64(Vec::new()))
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);

        let wide = NumericArray::new(vec![1000, 0], Elements::Int64(Vec::new())).expect("wide");
        assert_eq!(wide.to_json().as_array().map(Vec::len), Some(1000));

        let leading_zero = NumericArray::new(vec![0, usize::MAX], Elements::Int64(Vec::new()))
            .expect("leading zero");
        assert_eq!(leading_zero.to_json(), json!([]));
    }

    #[test]
    fn from_json_rejects_integers_beyond_i64() {
        let err = NumericArray::from_json(&json!([1, u64::MAX])).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);

        let edge = NumericArray::from_json(&json!([i64::MIN, i64::MAX])).expect("edge");
        assert_eq!(edge.elements(), &Elements::Int64(vec![i64::MIN, i64::MAX]));
    }

    #[test]
    fn shape_mismatch_is_unsupported() {
        let err = NumericArray::new(vec![2, 2], Elements::Int64(vec![1, 2, 3]))
            .expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    }

    #[test]
    fn from_json_infers_shape_and_dtype() {
        let ints = NumericArray::from_json(&json!([[1, 2], [3, 4], [5, 6]])).expect("ints");
        assert_eq!(ints.shape(), &[3, 2]);
        assert_eq!(ints.dtype(), DType::Int64);

        let floats = NumericArray::from_json(&json!([1, 2.5])).expect("floats");
        assert_eq!(floats.dtype(), DType::Float64);
        assert_eq!(floats.elements(), &Elements::Float64(vec![1.0, 2.5]));

        let scalar = NumericArray::from_json(&json!(3)).expect("scalar");
        assert_eq!(scalar.rank(), 0);

        assert_eq!(
            NumericArray::from_json(&json!([])).expect("empty"),
            NumericArray::empty()
        );
    }

    #[test]
    fn from_json_rejects_ragged_and_non_numeric() {
        for value in [json!([[1, 2], [3]]), json!([1, [2]]), json!(["a"]), json!({"a": 1})] {
            let err = NumericArray::from_json(&value).expect_err("should fail");
            assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
        }
    }

    #[test]
    fn to_json_nests_by_shape() {
        let array = NumericArray::new(vec![2, 2], Elements::Float64(vec![1.0, f64::NAN, 3.0, 4.5]))
            .expect("array");
        assert_eq!(array.to_json(), json!([[1.0, null], [3.0, 4.5]]));
    }
}
