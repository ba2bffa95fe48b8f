// File: crates/chart-data/src/getter.rs
// Summary: Value getters; pull one dimension's parsed value out of a provider item.

use crate::parse::parse_data_value;
use crate::provider::DataItem;
use crate::store::StoreDimension;
use crate::types::{ParsedValue, SourceFormat, NULL_VALUE};

/// Reads the value of dimension `dim_index` from `item`.
pub trait DimValueGetter {
    fn get(&self, item: &DataItem<'_>, dim: &StoreDimension, data_index: usize, dim_index: usize) -> ParsedValue;
}

/// Default getter per source shape, chosen once when ingestion starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceValueGetter {
    /// Positional read; also used for keyed columns and row layout.
    ByPosition,
    /// Read by the dimension's property name.
    ByProperty,
    /// Series items: scalar values fill every dimension.
    Original,
    /// Numbers are taken as is.
    Typed,
}

impl SourceValueGetter {
    pub fn for_format(format: SourceFormat) -> Self {
        match format {
            SourceFormat::ArrayRows | SourceFormat::KeyedColumns => SourceValueGetter::ByPosition,
            SourceFormat::ObjectRows => SourceValueGetter::ByProperty,
            SourceFormat::TypedArray => SourceValueGetter::Typed,
            SourceFormat::Original | SourceFormat::Unknown => SourceValueGetter::Original,
        }
    }
}

impl DimValueGetter for SourceValueGetter {
    #[inline]
    fn get(&self, item: &DataItem<'_>, dim: &StoreDimension, _data_index: usize, dim_index: usize) -> ParsedValue {
        let meta = dim.ordinal_meta.as_deref();
        match self {
            SourceValueGetter::ByPosition | SourceValueGetter::Original => {
                parse_data_value(item.value_at(dim_index), dim.dim_type, meta)
            }
            SourceValueGetter::ByProperty => {
                let raw = dim.property.as_deref().map_or(&NULL_VALUE, |p| item.property(p));
                parse_data_value(raw, dim.dim_type, meta)
            }
            SourceValueGetter::Typed => ParsedValue::Number(item.number_at(dim_index)),
        }
    }
}

/// For series data on a category axis given only values: the category dimension
/// reads the row's data index, every other dimension reads through `inner`.
#[derive(Clone, Copy, Debug)]
pub struct CategoryIndexGetter {
    pub category_dim: usize,
    pub inner: SourceValueGetter,
}

impl DimValueGetter for CategoryIndexGetter {
    fn get(&self, item: &DataItem<'_>, dim: &StoreDimension, data_index: usize, dim_index: usize) -> ParsedValue {
        if dim_index == self.category_dim {
            ParsedValue::Number(data_index as f64)
        } else {
            self.inner.get(item, dim, data_index, dim_index)
        }
    }
}
