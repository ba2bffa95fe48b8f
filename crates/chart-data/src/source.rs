// File: crates/chart-data/src/source.rs
// Summary: Raw source model; shape detection, header rows, dimension names, encode and ordinal guessing.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Deserializer};
use serde_json::Map;
use tracing::debug;

use crate::parse::{number_to_key, str_to_number};
use crate::types::{
    DimensionType, RawValue, SeriesLayoutBy, SourceFormat, GUESS_ORDINAL_SAMPLE, HEADER_DETECT_SAMPLE,
    NULL_VALUE,
};

/// Raw input data, one variant per supported shape.
#[derive(Clone, Debug)]
pub enum SourceData {
    /// `[[..], [..]]`; rows are arrays (a header row may lead).
    ArrayRows(Vec<RawValue>),
    /// `[{ "a": 1, "b": 2 }, ..]`
    ObjectRows(Vec<RawValue>),
    /// `{ "a": [..], "b": [..] }`
    KeyedColumns(Map<String, RawValue>),
    /// Series data items: scalars, arrays or `{ "value": .. }` objects.
    Original(Vec<RawValue>),
    /// Flat numbers, `dim_size` per row.
    TypedArray(Vec<f64>),
}

impl SourceData {
    pub fn format(&self) -> SourceFormat {
        match self {
            SourceData::ArrayRows(_) => SourceFormat::ArrayRows,
            SourceData::ObjectRows(_) => SourceFormat::ObjectRows,
            SourceData::KeyedColumns(_) => SourceFormat::KeyedColumns,
            SourceData::Original(_) => SourceFormat::Original,
            SourceData::TypedArray(_) => SourceFormat::TypedArray,
        }
    }

    /// Wrap a dataset value in the variant its shape calls for; `None` when unrecognized.
    pub fn from_dataset(raw: RawValue) -> Option<SourceData> {
        match (detect_source_format(&raw), raw) {
            (SourceFormat::ArrayRows, RawValue::Array(rows)) => Some(SourceData::ArrayRows(rows)),
            (SourceFormat::ObjectRows, RawValue::Array(rows)) => Some(SourceData::ObjectRows(rows)),
            (SourceFormat::KeyedColumns, RawValue::Object(cols)) => Some(SourceData::KeyedColumns(cols)),
            _ => None,
        }
    }
}

/// Detect the shape of a dataset value.
///
/// An empty array is array rows. Arrays of scalars are not a dataset shape.
pub fn detect_source_format(data: &RawValue) -> SourceFormat {
    match data {
        RawValue::Array(items) => {
            if items.is_empty() {
                return SourceFormat::ArrayRows;
            }
            for item in items {
                match item {
                    RawValue::Null => continue,
                    RawValue::Array(_) => return SourceFormat::ArrayRows,
                    RawValue::Object(_) => return SourceFormat::ObjectRows,
                    _ => {}
                }
            }
            SourceFormat::Unknown
        }
        RawValue::Object(map) => {
            if map.values().any(RawValue::is_array) {
                SourceFormat::KeyedColumns
            } else {
                SourceFormat::Unknown
            }
        }
        _ => SourceFormat::Unknown,
    }
}

/// A declared or detected source dimension.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceDimension {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub dim_type: Option<DimensionType>,
}

impl SourceDimension {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Default::default() }
    }

    pub fn typed(name: impl Into<String>, dim_type: DimensionType) -> Self {
        Self { name: Some(name.into()), dim_type: Some(dim_type), ..Default::default() }
    }
}

/// One entry of a `dimensions` option: a bare name or `{ name, displayName, type }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum DimensionOption {
    Object(DimensionObject),
    Name(RawValue),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DimensionObject {
    name: Option<RawValue>,
    display_name: Option<RawValue>,
    #[serde(rename = "type", default, deserialize_with = "known_type")]
    dim_type: Option<DimensionType>,
}

/// Unknown type names leave the type undeclared.
fn known_type<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<DimensionType>, D::Error> {
    let raw = RawValue::deserialize(de)?;
    Ok(serde_json::from_value(raw).ok())
}

/// Read a `dimensions` option: `["a", {"name": "b", "type": "int"}, null]`.
pub fn dimensions_from_json(raw: &RawValue) -> Vec<SourceDimension> {
    let Ok(items) = Vec::<DimensionOption>::deserialize(raw) else {
        return Vec::new();
    };
    items
        .into_iter()
        .map(|item| match item {
            DimensionOption::Object(obj) => SourceDimension {
                name: obj.name.as_ref().and_then(name_of),
                display_name: obj.display_name.as_ref().and_then(name_of),
                dim_type: obj.dim_type,
            },
            DimensionOption::Name(other) => SourceDimension { name: name_of(&other), ..Default::default() },
        })
        .collect()
}

fn name_of(value: &RawValue) -> Option<String> {
    match value {
        RawValue::Null => None,
        RawValue::String(s) => Some(s.clone()),
        RawValue::Number(n) => Some(number_to_key(n.as_f64().unwrap_or(f64::NAN))),
        other => Some(other.to_string()),
    }
}

/// Stringify names, default display names, suffix duplicates with `-1`, `-2`, ...
fn normalize_dimensions(dims: Vec<SourceDimension>) -> Vec<SourceDimension> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    dims.into_iter()
        .map(|mut dim| {
            let Some(name) = dim.name.take() else {
                return dim;
            };
            if dim.display_name.is_none() {
                dim.display_name = Some(name.clone());
            }
            let name = match seen.get_mut(&name) {
                Some(count) => {
                    let renamed = format!("{name}-{count}");
                    *count += 1;
                    renamed
                }
                None => {
                    seen.insert(name.clone(), 1);
                    name
                }
            };
            dim.name = Some(name);
            dim
        })
        .collect()
}

/// A reference from an encode entry to a data dimension.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DimensionRef {
    Index(i64),
    Name(String),
}

/// `{ coordDim or visual role: [data dims] }`, in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EncodeDefine {
    pub entries: Vec<(String, Vec<DimensionRef>)>,
}

impl EncodeDefine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, dims: Vec<DimensionRef>) -> Self {
        self.set(key, dims);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, dims: Vec<DimensionRef>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = dims,
            None => self.entries.push((key, dims)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[DimensionRef]> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_slice())
    }

    /// Parse `{"x": 0, "y": [1, "close"], "tooltip": [2]}`. Unusable entries are dropped.
    pub fn from_json(raw: &RawValue) -> Option<Self> {
        let RawValue::Object(map) = raw else {
            return None;
        };
        let mut encode = EncodeDefine::new();
        for (key, value) in map {
            let refs = match value {
                RawValue::Array(items) => items.iter().filter_map(|v| DimensionRef::deserialize(v).ok()).collect(),
                single => DimensionRef::deserialize(single).ok().into_iter().collect(),
            };
            encode.set(key.clone(), refs);
        }
        Some(encode)
    }
}

/// How to treat the first row(s) of array rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceHeaderOption {
    /// Header if the first row holds only strings (`'-'` and null ignored).
    #[default]
    Auto,
    Yes,
    No,
    /// Skip exactly this many leading rows.
    Rows(usize),
}

impl SourceHeaderOption {
    /// `true`, `false`, a row count, or anything else for auto detection.
    pub fn from_json(raw: &RawValue) -> Self {
        match raw {
            RawValue::Bool(true) => SourceHeaderOption::Yes,
            RawValue::Bool(false) => SourceHeaderOption::No,
            RawValue::Number(n) => n.as_u64().map_or(SourceHeaderOption::Auto, |n| SourceHeaderOption::Rows(n as usize)),
            _ => SourceHeaderOption::Auto,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SourceOptions {
    pub series_layout_by: SeriesLayoutBy,
    pub source_header: SourceHeaderOption,
    pub dimensions: Option<Vec<SourceDimension>>,
    pub encode: Option<EncodeDefine>,
}

impl SourceOptions {
    /// Read dataset options: `{"seriesLayoutBy": "row", "sourceHeader": true, "dimensions": [..], "encode": {..}}`.
    pub fn from_json(raw: &RawValue) -> Self {
        SourceOptions {
            series_layout_by: raw
                .get("seriesLayoutBy")
                .and_then(|v| SeriesLayoutBy::deserialize(v).ok())
                .unwrap_or_default(),
            source_header: raw.get("sourceHeader").map_or(SourceHeaderOption::Auto, SourceHeaderOption::from_json),
            dimensions: raw.get("dimensions").map(dimensions_from_json),
            encode: raw.get("encode").and_then(EncodeDefine::from_json),
        }
    }
}

/// Everything about a source except the data rows; shared by schemas and providers.
#[derive(Debug)]
pub struct SourceHeader {
    pub format: SourceFormat,
    pub series_layout_by: SeriesLayoutBy,
    pub start_index: usize,
    pub dimensions_define: Option<Vec<SourceDimension>>,
    pub dimensions_detected_count: Option<usize>,
    pub encode_define: Option<EncodeDefine>,
    name_map: OnceCell<HashMap<String, usize>>,
}

impl SourceHeader {
    /// Index of a named source dimension; built lazily.
    pub fn dimension_index_by_name(&self, name: &str) -> Option<usize> {
        let map = self.name_map.get_or_init(|| {
            let mut map = HashMap::new();
            for (i, dim) in self.dimensions_define.iter().flatten().enumerate() {
                if let Some(name) = &dim.name {
                    map.entry(name.clone()).or_insert(i);
                }
            }
            map
        });
        map.get(name).copied()
    }

    pub fn dimension(&self, index: usize) -> Option<&SourceDimension> {
        self.dimensions_define.as_ref().and_then(|d| d.get(index))
    }
}

/// Raw data plus its header.
#[derive(Clone, Debug)]
pub struct Source {
    pub data: SourceData,
    pub header: Rc<SourceHeader>,
}

impl Source {
    pub fn new(data: SourceData, options: SourceOptions) -> Self {
        let format = data.format();
        let layout = options.series_layout_by;
        let mut start_index = 0;
        let mut dims = options.dimensions;
        let mut detected = None;

        match &data {
            SourceData::ArrayRows(rows) => {
                start_index = match options.source_header {
                    SourceHeaderOption::Auto => usize::from(first_row_is_header(rows, layout)),
                    SourceHeaderOption::Yes => 1,
                    SourceHeaderOption::No => 0,
                    SourceHeaderOption::Rows(n) => n,
                };
                if dims.is_none() && start_index == 1 {
                    let mut names = Vec::new();
                    travel_first(rows, layout, usize::MAX, |v, _| {
                        names.push(SourceDimension { name: name_of(v).or(Some(String::new())), ..Default::default() });
                    });
                    dims = Some(names);
                }
                detected = match (&dims, layout) {
                    (Some(d), _) => Some(d.len()),
                    (None, SeriesLayoutBy::Row) => Some(rows.len()),
                    (None, SeriesLayoutBy::Column) => rows.first().and_then(RawValue::as_array).map(Vec::len),
                };
            }
            SourceData::ObjectRows(rows) => {
                if dims.is_none() {
                    dims = rows.iter().find_map(RawValue::as_object).map(|obj| {
                        obj.keys().map(|k| SourceDimension::named(k.clone())).collect()
                    });
                }
            }
            SourceData::KeyedColumns(cols) => {
                if dims.is_none() {
                    dims = Some(cols.keys().map(|k| SourceDimension::named(k.clone())).collect());
                }
            }
            // The first item's value length, or one for scalars and empty arrays.
            SourceData::Original(items) => {
                detected = Some(
                    items.first().map(item_value).and_then(RawValue::as_array).map_or(1, |a| a.len().max(1)),
                );
            }
            SourceData::TypedArray(_) => {}
        }

        let dimensions_define = dims.map(normalize_dimensions);
        debug!(
            ?format,
            start_index,
            dims = dimensions_define.as_ref().map_or(0, Vec::len),
            "source created"
        );
        Source {
            data,
            header: Rc::new(SourceHeader {
                format,
                series_layout_by: layout,
                start_index,
                dimensions_define,
                dimensions_detected_count: detected,
                encode_define: options.encode,
                name_map: OnceCell::new(),
            }),
        }
    }

    /// Source for `series.data` items; the column count comes from the first item.
    pub fn from_series_data(items: Vec<RawValue>) -> Self {
        Self::new(SourceData::Original(items), SourceOptions::default())
    }

    /// Like [`from_series_data`](Self::from_series_data) but with no detected column count,
    /// leaving the schema to size the dimensions from coordinates and declarations.
    pub fn from_series_data_unsized(items: Vec<RawValue>) -> Self {
        let mut source = Self::from_series_data(items);
        if let Some(header) = Rc::get_mut(&mut source.header) {
            header.dimensions_detected_count = None;
        }
        source
    }

    /// Source for a dataset value of any supported shape; `None` when unrecognized.
    pub fn from_dataset(raw: RawValue, options: SourceOptions) -> Option<Self> {
        SourceData::from_dataset(raw).map(|data| Self::new(data, options))
    }

    pub fn format(&self) -> SourceFormat {
        self.header.format
    }

    /// Whether values are read by property name rather than position.
    pub fn retrieves_by_name(&self) -> bool {
        self.header.format == SourceFormat::ObjectRows
    }

    /// Guess whether a source dimension holds categories. A declared type decides outright.
    pub fn guess_ordinal(&self, dim_index: usize) -> BeOrdinal {
        let header = &self.header;
        let def = header.dimension(dim_index);
        if let Some(t) = def.and_then(|d| d.dim_type) {
            return if t == DimensionType::Ordinal { BeOrdinal::Must } else { BeOrdinal::Not };
        }
        let dim_name = def.and_then(|d| d.name.as_deref());
        let start = header.start_index;

        let found = match &self.data {
            SourceData::TypedArray(_) => None,
            SourceData::ArrayRows(rows) => match header.series_layout_by {
                SeriesLayoutBy::Row => rows.get(dim_index).and_then(RawValue::as_array).and_then(|sample| {
                    (0..sample.len().min(GUESS_ORDINAL_SAMPLE))
                        .find_map(|i| sample.get(start + i).and_then(detect_value))
                }),
                SeriesLayoutBy::Column => (0..rows.len().min(GUESS_ORDINAL_SAMPLE)).find_map(|i| {
                    rows.get(start + i)
                        .and_then(RawValue::as_array)
                        .and_then(|row| row.get(dim_index))
                        .and_then(detect_value)
                }),
            },
            SourceData::ObjectRows(rows) => {
                let Some(name) = dim_name else {
                    return BeOrdinal::Not;
                };
                rows.iter()
                    .take(GUESS_ORDINAL_SAMPLE)
                    .find_map(|row| row.as_object().and_then(|o| o.get(name)).and_then(detect_value))
            }
            SourceData::KeyedColumns(cols) => {
                let Some(name) = dim_name else {
                    return BeOrdinal::Not;
                };
                cols.get(name).and_then(RawValue::as_array).and_then(|sample| {
                    sample.iter().take(GUESS_ORDINAL_SAMPLE).find_map(detect_value)
                })
            }
            SourceData::Original(items) => {
                let mut found = None;
                for item in items.iter().take(GUESS_ORDINAL_SAMPLE) {
                    let Some(values) = item_value(item).as_array() else {
                        return BeOrdinal::Not;
                    };
                    if let Some(r) = values.get(dim_index).and_then(detect_value) {
                        found = Some(r);
                        break;
                    }
                }
                found
            }
        };
        found.unwrap_or(BeOrdinal::Not)
    }
}

/// Outcome of [`Source::guess_ordinal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeOrdinal {
    Must,
    Might,
    Not,
}

fn detect_value(value: &RawValue) -> Option<BeOrdinal> {
    match value {
        RawValue::Number(_) | RawValue::Bool(_) => Some(BeOrdinal::Not),
        RawValue::String(s) if !s.is_empty() && str_to_number(s).is_finite() => Some(BeOrdinal::Might),
        RawValue::String(s) if s != "-" => Some(BeOrdinal::Must),
        _ => None,
    }
}

/// The `value` of a `{ "value": .. }` item, or the item itself.
pub(crate) fn item_value(item: &RawValue) -> &RawValue {
    match item {
        RawValue::Object(obj) => match obj.get("value") {
            Some(v) if !v.is_null() => v,
            _ => item,
        },
        other => other,
    }
}

fn first_row_is_header(rows: &[RawValue], layout: SeriesLayoutBy) -> bool {
    let mut header: Option<bool> = None;
    travel_first(rows, layout, HEADER_DETECT_SAMPLE, |v, _| match v {
        RawValue::Null => {}
        RawValue::String(s) if s == "-" => {}
        RawValue::String(_) => {
            header.get_or_insert(true);
        }
        _ => header = Some(false),
    });
    header.unwrap_or(false)
}

fn travel_first(rows: &[RawValue], layout: SeriesLayoutBy, max: usize, mut f: impl FnMut(&RawValue, usize)) {
    match layout {
        SeriesLayoutBy::Row => {
            for (i, row) in rows.iter().take(max).enumerate() {
                let first = row.as_array().and_then(|r| r.first()).unwrap_or(&NULL_VALUE);
                f(first, i);
            }
        }
        SeriesLayoutBy::Column => {
            if let Some(first) = rows.first().and_then(RawValue::as_array) {
                for (i, v) in first.iter().take(max).enumerate() {
                    f(v, i);
                }
            }
        }
    }
}
