// File: crates/chart-data/src/types.rs
// Summary: Shared types and constants (dimension types, source formats, parsed values, extents).

use std::fmt;
use std::rc::Rc;

use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::IntoDeserializer;
use serde::Deserialize;

/// Raw user-supplied value, as it arrives from a chart option or dataset.
pub type RawValue = serde_json::Value;

/// Stand-in for absent cells, so getters can always hand out a reference.
pub static NULL_VALUE: RawValue = RawValue::Null;

/// Dimension position in a store.
pub type DimensionIndex = usize;

/// `[min, max]` of a dimension. Empty extent is `[+inf, -inf]`.
pub type Extent = [f64; 2];

/// Datasets wider than this may omit dimensions nobody references.
pub const OMIT_DIMENSION_THRESHOLD: usize = 30;

/// Rows sampled when guessing whether a column is categorical.
pub const GUESS_ORDINAL_SAMPLE: usize = 5;

/// Cells of the first row inspected when detecting a header row.
pub const HEADER_DETECT_SAMPLE: usize = 10;

#[inline]
pub fn initial_extent() -> Extent {
    [f64::INFINITY, f64::NEG_INFINITY]
}

/// Read an option keyword (`"minmax"`, `"samesign"`, `"itemName"`) into its enum.
pub fn from_option_name<'de, T: Deserialize<'de>>(name: &'de str) -> Option<T> {
    let de: StrDeserializer<'de, ValueError> = name.into_deserializer();
    T::deserialize(de).ok()
}

/// Declared type of a dimension; decides the backing column representation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    #[default]
    Float,
    Int,
    Ordinal,
    Number,
    Time,
}

impl DimensionType {
    /// One-letter code used in store sharing hashes.
    pub fn short_code(self) -> char {
        match self {
            DimensionType::Float => 'f',
            DimensionType::Int => 'i',
            DimensionType::Ordinal => 'o',
            DimensionType::Number => 'n',
            DimensionType::Time => 't',
        }
    }
}

/// Shape of the raw input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// `series.data` items, possibly `{ value, name, .. }` objects.
    Original,
    ArrayRows,
    ObjectRows,
    KeyedColumns,
    TypedArray,
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesLayoutBy {
    #[default]
    Column,
    Row,
}

impl fmt::Display for SeriesLayoutBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesLayoutBy::Column => f.write_str("column"),
            SeriesLayoutBy::Row => f.write_str("row"),
        }
    }
}

/// Visual roles a data dimension can feed besides a coordinate axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualDimension {
    Tooltip,
    Label,
    ItemName,
    ItemId,
    ItemGroupId,
    ItemChildGroupId,
    SeriesName,
}

impl VisualDimension {
    pub fn from_name(name: &str) -> Option<Self> {
        from_option_name(name)
    }
}

/// A value after parsing: a number (possibly NaN, an ordinal code or a timestamp),
/// or a category string not yet interned.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedValue {
    Number(f64),
    Text(Rc<str>),
}

impl ParsedValue {
    pub const NAN: ParsedValue = ParsedValue::Number(f64::NAN);

    /// Numeric view; text reads as NaN.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match self {
            ParsedValue::Number(v) => *v,
            ParsedValue::Text(_) => f64::NAN,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParsedValue::Text(s) => Some(s),
            ParsedValue::Number(_) => None,
        }
    }

    pub fn is_nan(&self) -> bool {
        self.as_f64().is_nan()
    }
}

impl Default for ParsedValue {
    fn default() -> Self {
        ParsedValue::NAN
    }
}

impl From<f64> for ParsedValue {
    fn from(v: f64) -> Self {
        ParsedValue::Number(v)
    }
}

impl From<&str> for ParsedValue {
    fn from(s: &str) -> Self {
        ParsedValue::Text(Rc::from(s))
    }
}
