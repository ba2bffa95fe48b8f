// File: crates/chart-data/src/provider.rs
// Summary: Row access over a source; counts rows, hands out items and appends new data.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Map;

use crate::column::Column;
use crate::error::{DataError, Result};
use crate::source::{item_value, Source, SourceData, SourceDimension, SourceHeader};
use crate::parse::coerce_number;
use crate::types::{Extent, RawValue, SeriesLayoutBy, SourceFormat, NULL_VALUE};

/// Provider shared between a store and its derived stores.
pub type SharedProvider = Rc<RefCell<dyn DataProvider>>;

/// One row as seen by a value getter. Borrowed from the provider; nothing is copied.
#[derive(Clone, Copy, Debug)]
pub enum DataItem<'a> {
    /// An array row.
    Row(&'a [RawValue]),
    /// Column `column` of every row (row layout).
    Transposed { rows: &'a [RawValue], column: usize },
    /// Entry `index` of each named column.
    Keyed { columns: &'a Map<String, RawValue>, dims: &'a [SourceDimension], index: usize },
    Object(&'a Map<String, RawValue>),
    /// A series data item: scalar, array or `{ "value": .. }`.
    Original(&'a RawValue),
    Numbers(&'a [f64]),
    Missing,
}

impl<'a> DataItem<'a> {
    /// Cell by position; `null` when absent.
    pub fn value_at(&self, dim_index: usize) -> &'a RawValue {
        let found = match *self {
            DataItem::Row(row) => row.get(dim_index),
            DataItem::Transposed { rows, column } => {
                rows.get(dim_index).and_then(RawValue::as_array).and_then(|r| r.get(column))
            }
            DataItem::Keyed { columns, dims, index } => dims
                .get(dim_index)
                .and_then(|d| d.name.as_deref())
                .and_then(|name| columns.get(name))
                .and_then(RawValue::as_array)
                .and_then(|col| col.get(index)),
            DataItem::Original(item) => {
                let value = item_value(item);
                match value {
                    RawValue::Array(values) => values.get(dim_index),
                    single => Some(single),
                }
            }
            DataItem::Object(_) | DataItem::Numbers(_) | DataItem::Missing => None,
        };
        found.unwrap_or(&NULL_VALUE)
    }

    /// Cell by object property; `null` for anything but object rows.
    pub fn property(&self, name: &str) -> &'a RawValue {
        match *self {
            DataItem::Object(obj) => obj.get(name).unwrap_or(&NULL_VALUE),
            _ => &NULL_VALUE,
        }
    }

    pub fn number_at(&self, dim_index: usize) -> f64 {
        match *self {
            DataItem::Numbers(values) => values.get(dim_index).copied().unwrap_or(f64::NAN),
            _ => coerce_number(self.value_at(dim_index)),
        }
    }

    /// Owned copy of the item in its source shape.
    pub fn to_raw(&self) -> RawValue {
        match *self {
            DataItem::Row(row) => RawValue::Array(row.to_vec()),
            DataItem::Transposed { rows, .. } => {
                RawValue::Array((0..rows.len()).map(|i| self.value_at(i).clone()).collect())
            }
            DataItem::Keyed { dims, .. } => {
                RawValue::Array((0..dims.len()).map(|i| self.value_at(i).clone()).collect())
            }
            DataItem::Object(obj) => RawValue::Object(obj.clone()),
            DataItem::Original(item) => item.clone(),
            DataItem::Numbers(values) => RawValue::from(values.to_vec()),
            DataItem::Missing => RawValue::Null,
        }
    }
}

/// Row access consumed by the columnar store during ingestion.
pub trait DataProvider {
    fn header(&self) -> &Rc<SourceHeader>;

    fn count(&self) -> usize;

    fn get_item(&self, idx: usize) -> DataItem<'_>;

    /// Bulk copy `[start, end)` straight into the columns, updating extents.
    /// Returns `false` when the provider has no such fast path.
    fn fill_storage(&self, _start: usize, _end: usize, _columns: &mut [Rc<Column>], _extents: &mut [Extent]) -> bool {
        false
    }

    /// Whether rows stay available after ingestion.
    fn persistent(&self) -> bool {
        true
    }

    fn append_data(&mut self, data: SourceData) -> Result<()>;

    /// Release rows that have been ingested; only called on non-persistent providers.
    fn clean(&mut self) {}
}

/// Provider over an in-memory [`Source`].
#[derive(Debug)]
pub struct DefaultDataProvider {
    source: Source,
    offset: usize,
    dim_size: usize,
}

impl DefaultDataProvider {
    /// `dim_size` is required for typed arrays (values per row) and ignored otherwise.
    pub fn new(source: Source, dim_size: Option<usize>) -> Result<Self> {
        let mut provider = Self { source, offset: 0, dim_size: 0 };
        match provider.source.format() {
            SourceFormat::TypedArray => {
                provider.dim_size = dim_size.ok_or(DataError::TypedArrayWithoutDimSize)?;
            }
            SourceFormat::KeyedColumns => {
                let dims = provider.source.header.dimensions_define.as_deref().unwrap_or(&[]);
                if let Some(i) = dims.iter().position(|d| d.name.is_none()) {
                    return Err(DataError::KeyedColumnWithoutName(i));
                }
            }
            _ => {}
        }
        Ok(provider)
    }

    pub fn from_series_data(items: Vec<RawValue>) -> Self {
        Self { source: Source::from_series_data(items), offset: 0, dim_size: 0 }
    }

    pub fn into_shared(self) -> SharedProvider {
        Rc::new(RefCell::new(self))
    }

    pub fn source(&self) -> &Source {
        &self.source
    }
}

impl DataProvider for DefaultDataProvider {
    fn header(&self) -> &Rc<SourceHeader> {
        &self.source.header
    }

    fn count(&self) -> usize {
        let header = &self.source.header;
        match &self.source.data {
            SourceData::ArrayRows(rows) => match header.series_layout_by {
                SeriesLayoutBy::Column => rows.len().saturating_sub(header.start_index),
                SeriesLayoutBy::Row => rows
                    .first()
                    .and_then(RawValue::as_array)
                    .map_or(0, |r| r.len().saturating_sub(header.start_index)),
            },
            SourceData::ObjectRows(rows) | SourceData::Original(rows) => rows.len(),
            SourceData::KeyedColumns(cols) => header
                .dimension(0)
                .and_then(|d| d.name.as_deref())
                .and_then(|name| cols.get(name))
                .and_then(RawValue::as_array)
                .map_or(0, Vec::len),
            SourceData::TypedArray(values) => match self.dim_size {
                0 => 0,
                n => values.len() / n,
            },
        }
    }

    fn get_item(&self, idx: usize) -> DataItem<'_> {
        let header = &self.source.header;
        match &self.source.data {
            SourceData::ArrayRows(rows) => match header.series_layout_by {
                SeriesLayoutBy::Column => rows
                    .get(idx + header.start_index)
                    .and_then(RawValue::as_array)
                    .map_or(DataItem::Missing, |r| DataItem::Row(r)),
                SeriesLayoutBy::Row => DataItem::Transposed { rows, column: idx + header.start_index },
            },
            SourceData::ObjectRows(rows) => {
                rows.get(idx).and_then(RawValue::as_object).map_or(DataItem::Missing, DataItem::Object)
            }
            SourceData::KeyedColumns(columns) => DataItem::Keyed {
                columns,
                dims: header.dimensions_define.as_deref().unwrap_or(&[]),
                index: idx,
            },
            SourceData::Original(items) => items.get(idx).map_or(DataItem::Missing, DataItem::Original),
            SourceData::TypedArray(values) => {
                let Some(local) = idx.checked_sub(self.offset) else {
                    return DataItem::Missing;
                };
                let start = local * self.dim_size;
                values.get(start..start + self.dim_size).map_or(DataItem::Missing, DataItem::Numbers)
            }
        }
    }

    fn fill_storage(&self, start: usize, end: usize, columns: &mut [Rc<Column>], extents: &mut [Extent]) -> bool {
        let SourceData::TypedArray(values) = &self.source.data else {
            return false;
        };
        let dim_size = self.dim_size;
        for dim in 0..dim_size.min(columns.len()).min(extents.len()) {
            let column = Rc::make_mut(&mut columns[dim]);
            let [mut min, mut max] = extents[dim];
            for i in 0..end.saturating_sub(start) {
                // Appended typed arrays replace the buffer, so rows are read from 0.
                let val = values.get(i * dim_size + dim).copied().unwrap_or(f64::NAN);
                column.set_f64(start + i, val);
                if val < min {
                    min = val;
                }
                if val > max {
                    max = val;
                }
            }
            extents[dim] = [min, max];
        }
        true
    }

    fn persistent(&self) -> bool {
        self.source.format() != SourceFormat::TypedArray
    }

    fn append_data(&mut self, data: SourceData) -> Result<()> {
        let expected = self.source.format();
        if expected == SourceFormat::ArrayRows && self.source.header.series_layout_by == SeriesLayoutBy::Row {
            return Err(DataError::AppendByRow);
        }
        match (&mut self.source.data, data) {
            (SourceData::ArrayRows(rows), SourceData::ArrayRows(more))
            | (SourceData::ObjectRows(rows), SourceData::ObjectRows(more))
            | (SourceData::Original(rows), SourceData::Original(more)) => rows.extend(more),
            (SourceData::KeyedColumns(cols), SourceData::KeyedColumns(more)) => {
                for (key, new_col) in more {
                    let slot = cols.entry(key).or_insert_with(|| RawValue::Array(Vec::new()));
                    if !slot.is_array() {
                        *slot = RawValue::Array(Vec::new());
                    }
                    if let (RawValue::Array(old), RawValue::Array(new)) = (slot, new_col) {
                        old.extend(new);
                    }
                }
            }
            (SourceData::TypedArray(values), SourceData::TypedArray(more)) => *values = more,
            (_, other) => {
                return Err(DataError::AppendFormatMismatch { expected, got: other.format() });
            }
        }
        Ok(())
    }

    fn clean(&mut self) {
        if let SourceData::TypedArray(values) = &mut self.source.data {
            self.offset += match self.dim_size {
                0 => 0,
                n => values.len() / n,
            };
            values.clear();
        }
    }
}
