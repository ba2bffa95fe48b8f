// File: crates/chart-data/src/store.rs
// Summary: Columnar store; ingestion, raw/filtered index translation, queries, filtering and mapping.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::column::Column;
use crate::error::{DataError, Result};
use crate::getter::{DimValueGetter, SourceValueGetter};
use crate::ordinal::OrdinalRegistry;
use crate::parse::parse_data_value;
use crate::provider::SharedProvider;
use crate::source::SourceData;
use crate::types::{initial_extent, DimensionType, Extent, ParsedValue, RawValue, SourceFormat, NULL_VALUE};

/// Physical description of one store column.
#[derive(Clone, Debug, Default)]
pub struct StoreDimension {
    pub dim_type: DimensionType,
    /// Property to read from object rows.
    pub property: Option<String>,
    /// Registry used to intern categories while ingesting.
    pub ordinal_meta: Option<Rc<OrdinalRegistry>>,
    /// Rows already interned by [`ColumnarStore::collect_ordinal_meta`].
    pub ordinal_offset: usize,
}

impl StoreDimension {
    pub fn new(dim_type: DimensionType) -> Self {
        Self { dim_type, ..Default::default() }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn with_ordinal_meta(mut self, meta: Rc<OrdinalRegistry>) -> Self {
        self.ordinal_meta = Some(meta);
        self
    }
}

/// Result of a map/modify callback for one row.
#[derive(Clone, Debug, PartialEq)]
pub enum MapValue {
    /// Leave the row untouched.
    Keep,
    One(f64),
    Pair(f64, f64),
    Many(Vec<f64>),
}

impl MapValue {
    fn len(&self) -> usize {
        match self {
            MapValue::Keep => 0,
            MapValue::One(_) => 1,
            MapValue::Pair(..) => 2,
            MapValue::Many(v) => v.len(),
        }
    }

    fn get(&self, i: usize) -> f64 {
        match (self, i) {
            (MapValue::One(v), 0) | (MapValue::Pair(v, _), 0) | (MapValue::Pair(_, v), 1) => *v,
            (MapValue::Many(values), i) => values.get(i).copied().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }
}

impl From<f64> for MapValue {
    fn from(v: f64) -> Self {
        MapValue::One(v)
    }
}

impl From<(f64, f64)> for MapValue {
    fn from((a, b): (f64, f64)) -> Self {
        MapValue::Pair(a, b)
    }
}

impl From<Vec<f64>> for MapValue {
    fn from(v: Vec<f64>) -> Self {
        MapValue::Many(v)
    }
}

impl From<Option<f64>> for MapValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(MapValue::Keep, MapValue::One)
    }
}

impl From<()> for MapValue {
    fn from(_: ()) -> Self {
        MapValue::Keep
    }
}

/// Typed columns plus an optional filtered-to-raw index map.
///
/// Derived stores (filter, select, map, sampling) share column buffers with their
/// parent through `Rc`; any write goes through `Rc::make_mut`, so a buffer still
/// referenced elsewhere is copied before it changes.
#[derive(Clone, Default)]
pub struct ColumnarStore {
    columns: Vec<Rc<Column>>,
    provider: Option<SharedProvider>,
    raw_extent: Vec<Extent>,
    extent: RefCell<Vec<Option<Extent>>>,
    indices: Option<Vec<u32>>,
    count: usize,
    raw_count: usize,
    dimensions: Vec<StoreDimension>,
    getter: Option<Rc<dyn DimValueGetter>>,
    calc_dim_name_to_idx: HashMap<String, usize>,
}

impl ColumnarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest every row of `provider`. Without a getter the source shape decides how
    /// values are read.
    pub fn init_data(
        &mut self,
        provider: SharedProvider,
        dimensions: Vec<StoreDimension>,
        getter: Option<Rc<dyn DimValueGetter>>,
    ) -> Result<()> {
        let (format, count) = {
            let p = provider.borrow();
            (p.header().format, p.count())
        };
        if format == SourceFormat::ObjectRows {
            if let Some(i) = dimensions.iter().position(|d| d.property.is_none()) {
                return Err(DataError::MissingProperty(i));
            }
        }

        self.columns.clear();
        self.indices = None;
        self.raw_extent.clear();
        self.extent.borrow_mut().clear();
        self.calc_dim_name_to_idx.clear();
        self.getter = Some(getter.unwrap_or_else(|| Rc::new(SourceValueGetter::for_format(format))));
        self.dimensions = dimensions;
        self.provider = Some(provider);

        debug!(?format, rows = count, dims = self.dimensions.len(), "init store");
        self.init_from_provider(0, count, false)
    }

    fn init_from_provider(&mut self, start: usize, end: usize, append: bool) -> Result<()> {
        let provider = self.provider.clone().ok_or(DataError::NotInitialized)?;
        let getter = self.getter.clone().ok_or(DataError::NotInitialized)?;
        let dim_len = self.dimensions.len();

        if self.raw_extent.len() < dim_len {
            self.raw_extent.resize(dim_len, initial_extent());
        }
        for i in 0..dim_len {
            self.prepare_column(i, end, append);
        }

        let persistent = {
            let p = provider.borrow();
            if !p.fill_storage(start, end, &mut self.columns, &mut self.raw_extent) {
                let mut columns: Vec<&mut Column> = self.columns.iter_mut().map(Rc::make_mut).collect();
                for idx in start..end {
                    let item = p.get_item(idx);
                    for (dim_idx, column) in columns.iter_mut().enumerate().take(dim_len) {
                        let val = getter.get(&item, &self.dimensions[dim_idx], idx, dim_idx);
                        let num = val.as_f64();
                        column.set(idx, val);
                        let ext = &mut self.raw_extent[dim_idx];
                        if num < ext[0] {
                            ext[0] = num;
                        }
                        if num > ext[1] {
                            ext[1] = num;
                        }
                    }
                }
            }
            p.persistent()
        };
        if !persistent {
            provider.borrow_mut().clean();
        }

        self.raw_count = end;
        self.count = end;
        self.extent.borrow_mut().clear();
        Ok(())
    }

    fn prepare_column(&mut self, dim: usize, end: usize, append: bool) {
        let dim_type = self.dimensions[dim].dim_type;
        if dim >= self.columns.len() {
            self.columns.resize_with(dim + 1, || Rc::new(Column::with_len(dim_type, 0)));
        }
        if append {
            if self.columns[dim].len() != end {
                Rc::make_mut(&mut self.columns[dim]).resize(end);
            }
        } else {
            self.columns[dim] = Rc::new(Column::with_len(dim_type, end));
        }
    }

    pub fn provider(&self) -> Option<&SharedProvider> {
        self.provider.as_ref()
    }

    /// Column for a calculated dimension, reused by name when the type still matches.
    pub fn ensure_calculation_dimension(&mut self, name: &str, dim_type: DimensionType) -> usize {
        let idx = match self.calc_dim_name_to_idx.get(name) {
            Some(&idx) if self.dimensions.get(idx).is_some_and(|d| d.dim_type == dim_type) => return idx,
            Some(&idx) => idx,
            None => self.dimensions.len(),
        };

        if idx >= self.dimensions.len() {
            self.dimensions.resize_with(idx + 1, StoreDimension::default);
        }
        self.dimensions[idx] = StoreDimension::new(dim_type);
        self.calc_dim_name_to_idx.insert(name.to_string(), idx);

        let column = Rc::new(Column::with_len(dim_type, self.raw_count));
        if idx >= self.columns.len() {
            self.columns.resize_with(idx + 1, || Rc::new(Column::with_len(dim_type, 0)));
        }
        self.columns[idx] = column;
        if idx >= self.raw_extent.len() {
            self.raw_extent.resize(idx + 1, initial_extent());
        }
        self.raw_extent[idx] = initial_extent();
        if let Some(slot) = self.extent.borrow_mut().get_mut(idx) {
            *slot = None;
        }
        trace!(name, idx, "calculation dimension");
        idx
    }

    /// Intern the raw strings of `dim` through `meta`, continuing after previously collected rows.
    pub fn collect_ordinal_meta(&mut self, dim: usize, meta: Rc<OrdinalRegistry>) -> Result<()> {
        let dim_count = self.dimensions.len();
        if dim >= dim_count || dim >= self.columns.len() {
            return Err(DataError::DimensionOutOfRange { dim, count: dim_count });
        }
        let offset = self.dimensions[dim].ordinal_offset;
        if offset == 0 {
            // A guessed numeric type may have produced a meaningless extent.
            self.raw_extent[dim] = initial_extent();
        }
        let column = Rc::make_mut(&mut self.columns[dim]);
        let len = column.len();
        let ext = &mut self.raw_extent[dim];
        for i in offset..len {
            let val = meta.parse_and_collect_parsed(&column.get_parsed(i));
            column.set_f64(i, val);
            if !val.is_nan() {
                ext[0] = ext[0].min(val);
                ext[1] = ext[1].max(val);
            }
        }
        let info = &mut self.dimensions[dim];
        info.ordinal_meta = Some(meta);
        info.ordinal_offset = len;
        info.dim_type = DimensionType::Ordinal;
        if let Some(slot) = self.extent.borrow_mut().get_mut(dim) {
            *slot = None;
        }
        Ok(())
    }

    pub fn get_ordinal_meta(&self, dim: usize) -> Option<Rc<OrdinalRegistry>> {
        self.dimensions.get(dim).and_then(|d| d.ordinal_meta.clone())
    }

    pub fn get_dimension_property(&self, dim: usize) -> Option<&str> {
        self.dimensions.get(dim).and_then(|d| d.property.as_deref())
    }

    pub fn dimension(&self, dim: usize) -> Option<&StoreDimension> {
        self.dimensions.get(dim)
    }

    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }

    /// Append rows through the provider. Only valid before any filtering.
    pub fn append_data(&mut self, data: SourceData) -> Result<Range<usize>> {
        if self.indices.is_some() {
            return Err(DataError::AppendAfterFilter);
        }
        let provider = self.provider.clone().ok_or(DataError::NotInitialized)?;
        let start = self.count;
        provider.borrow_mut().append_data(data)?;
        let (mut end, persistent) = {
            let p = provider.borrow();
            (p.count(), p.persistent())
        };
        if !persistent {
            end += start;
        }
        if start < end {
            self.init_from_provider(start, end, true)?;
        }
        debug!(start, end, "append data");
        Ok(start..end)
    }

    /// Append already-split rows, reading cells by position. At least `min_fill` rows
    /// are added; missing rows are empty.
    pub fn append_values(&mut self, values: &[Vec<RawValue>], min_fill: usize) -> Result<Range<usize>> {
        if self.indices.is_some() {
            return Err(DataError::AppendAfterFilter);
        }
        let dim_len = self.dimensions.len();
        let start = self.count;
        let end = start + values.len().max(min_fill);

        if self.raw_extent.len() < dim_len {
            self.raw_extent.resize(dim_len, initial_extent());
        }
        for i in 0..dim_len {
            self.prepare_column(i, end, true);
        }

        for idx in start..end {
            let row = values.get(idx - start).map_or(&[][..], Vec::as_slice);
            for dim_idx in 0..dim_len {
                let dim = &self.dimensions[dim_idx];
                let raw = row.get(dim_idx).unwrap_or(&NULL_VALUE);
                let val = parse_data_value(raw, dim.dim_type, dim.ordinal_meta.as_deref());
                let num = val.as_f64();
                Rc::make_mut(&mut self.columns[dim_idx]).set(idx, val);
                let ext = &mut self.raw_extent[dim_idx];
                if num < ext[0] {
                    ext[0] = num;
                }
                if num > ext[1] {
                    ext[1] = num;
                }
            }
        }

        self.raw_count = end;
        self.count = end;
        self.extent.borrow_mut().clear();
        debug!(start, end, "append values");
        Ok(start..end)
    }

    /// Rows visible after filtering.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Rows ingested.
    pub fn raw_count(&self) -> usize {
        self.raw_count
    }

    #[inline]
    fn raw_index_unchecked(&self, idx: usize) -> usize {
        match &self.indices {
            Some(indices) => indices[idx] as usize,
            None => idx,
        }
    }

    /// Raw index of a filtered index; `None` when out of range.
    #[inline]
    pub fn get_raw_index(&self, idx: usize) -> Option<usize> {
        (idx < self.count).then(|| self.raw_index_unchecked(idx))
    }

    #[inline]
    fn column(&self, dim: usize) -> Option<&Column> {
        self.columns.get(dim).map(|c| &**c)
    }

    /// Numeric value at a filtered index; NaN when out of range.
    #[inline]
    pub fn get(&self, dim: usize, idx: usize) -> f64 {
        match (self.get_raw_index(idx), self.column(dim)) {
            (Some(raw), Some(col)) => col.get(raw),
            _ => f64::NAN,
        }
    }

    /// Parsed value at a filtered index, keeping uncollected category strings.
    pub fn get_parsed(&self, dim: usize, idx: usize) -> ParsedValue {
        match (self.get_raw_index(idx), self.column(dim)) {
            (Some(raw), Some(col)) => col.get_parsed(raw),
            _ => ParsedValue::NAN,
        }
    }

    pub fn get_values(&self, dims: &[usize], idx: usize) -> Vec<f64> {
        dims.iter().map(|&d| self.get(d, idx)).collect()
    }

    /// Every dimension's value at a filtered index.
    pub fn get_all_values(&self, idx: usize) -> Vec<f64> {
        (0..self.dimensions.len()).map(|d| self.get(d, idx)).collect()
    }

    pub fn get_by_raw_index(&self, dim: usize, raw_idx: usize) -> f64 {
        if raw_idx >= self.raw_count {
            return f64::NAN;
        }
        self.column(dim).map_or(f64::NAN, |c| c.get(raw_idx))
    }

    /// Sum over visible rows; NaN is skipped.
    pub fn get_sum(&self, dim: usize) -> f64 {
        let Some(col) = self.column(dim) else {
            return 0.0;
        };
        (0..self.count)
            .map(|i| col.get(self.raw_index_unchecked(i)))
            .filter(|v| !v.is_nan())
            .sum()
    }

    /// Median over visible non-NaN rows; 0 when there are none.
    pub fn get_median(&self, dim: usize) -> f64 {
        let mut values = Vec::with_capacity(self.count);
        self.each(&[dim], |v, _| {
            if !v[0].is_nan() {
                values.push(v[0]);
            }
        });
        values.sort_by(f64::total_cmp);
        let len = values.len();
        match len {
            0 => 0.0,
            n if n % 2 == 1 => values[(n - 1) / 2],
            n => (values[n / 2] + values[n / 2 - 1]) / 2.0,
        }
    }

    /// Filtered index holding `raw_index`, if it is visible.
    pub fn index_of_raw_index(&self, raw_index: usize) -> Option<usize> {
        if raw_index >= self.raw_count {
            return None;
        }
        let Some(indices) = &self.indices else {
            return Some(raw_index);
        };
        if raw_index < self.count && indices.get(raw_index).is_some_and(|&r| r as usize == raw_index) {
            return Some(raw_index);
        }
        indices[..self.count.min(indices.len())].binary_search(&(raw_index as u32)).ok()
    }

    /// Filtered indices whose value is nearest to `value`.
    pub fn indices_of_nearest(&self, dim: usize, value: f64) -> Vec<usize> {
        self.indices_of_nearest_within(dim, value, f64::INFINITY)
    }

    /// Like [`indices_of_nearest`](Self::indices_of_nearest), ignoring rows farther than
    /// `max_distance`. Between two equally distant rows on either side, the one at or
    /// below `value` wins; rows with identical values are all returned.
    pub fn indices_of_nearest_within(&self, dim: usize, value: f64, max_distance: f64) -> Vec<usize> {
        let mut nearest = Vec::new();
        let Some(col) = self.column(dim) else {
            return nearest;
        };
        let mut min_dist = f64::INFINITY;
        let mut min_diff = -1.0;
        for i in 0..self.count {
            let diff = value - col.get(self.raw_index_unchecked(i));
            let dist = diff.abs();
            if dist <= max_distance {
                if dist < min_dist || (dist == min_dist && diff >= 0.0 && min_diff < 0.0) {
                    min_dist = dist;
                    min_diff = diff;
                    nearest.clear();
                }
                if diff == min_diff {
                    nearest.push(i);
                }
            }
        }
        nearest
    }

    /// Visible raw indices, in filtered order.
    pub fn get_indices(&self) -> Vec<usize> {
        match &self.indices {
            Some(indices) => indices[..self.count.min(indices.len())].iter().map(|&r| r as usize).collect(),
            None => (0..self.count).collect(),
        }
    }

    /// Visit visible rows with the values of `dims` and the filtered index.
    pub fn each(&self, dims: &[usize], mut f: impl FnMut(&[f64], usize)) {
        let columns: Vec<Option<&Column>> = dims.iter().map(|&d| self.column(d)).collect();
        let mut values = vec![f64::NAN; dims.len()];
        for i in 0..self.count {
            let raw = self.raw_index_unchecked(i);
            for (slot, col) in values.iter_mut().zip(&columns) {
                *slot = col.map_or(f64::NAN, |c| c.get(raw));
            }
            f(&values, i);
        }
    }

    /// New store keeping the rows for which `predicate` holds.
    pub fn filter(&self, dims: &[usize], mut predicate: impl FnMut(&[f64], usize) -> bool) -> ColumnarStore {
        if self.count == 0 {
            return self.clone();
        }
        let mut target = self.clone();
        let count = target.count;
        let mut kept: Vec<u32> = Vec::with_capacity(count);
        {
            let columns: Vec<Option<&Column>> = dims.iter().map(|&d| self.column(d)).collect();
            let mut values = vec![f64::NAN; dims.len()];
            for i in 0..count {
                let raw = self.raw_index_unchecked(i);
                for (slot, col) in values.iter_mut().zip(&columns) {
                    *slot = col.map_or(f64::NAN, |c| c.get(raw));
                }
                if predicate(&values, i) {
                    kept.push(raw as u32);
                }
            }
        }
        target.commit_indices(kept, count);
        trace!(before = count, after = target.count, "filter");
        target
    }

    /// New store keeping rows inside every `[min, max]` range. NaN cells always pass.
    pub fn select_range(&self, ranges: &[(usize, Extent)]) -> ColumnarStore {
        let len = self.count;
        if len == 0 || ranges.is_empty() {
            return self.clone();
        }
        let mut target = self.clone();
        let mut kept: Vec<u32> = Vec::with_capacity(len);
        let (dim0, [min, max]) = ranges[0];
        let inside = |v: f64, lo: f64, hi: f64| (v >= lo && v <= hi) || v.is_nan();

        let mut quick_finished = false;
        if self.indices.is_none() {
            match ranges {
                [_] => {
                    if let Some(col) = self.column(dim0) {
                        for i in 0..len {
                            if inside(col.get(i), min, max) {
                                kept.push(i as u32);
                            }
                        }
                        quick_finished = true;
                    }
                }
                [_, (dim1, [min2, max2])] => {
                    if let (Some(col), Some(col2)) = (self.column(dim0), self.column(*dim1)) {
                        for i in 0..len {
                            if inside(col.get(i), min, max) && inside(col2.get(i), *min2, *max2) {
                                kept.push(i as u32);
                            }
                        }
                        quick_finished = true;
                    }
                }
                _ => {}
            }
        }
        if !quick_finished {
            let columns: Vec<(Option<&Column>, Extent)> =
                ranges.iter().map(|&(d, range)| (self.column(d), range)).collect();
            for i in 0..len {
                let raw = self.raw_index_unchecked(i);
                let keep = columns.iter().all(|(col, [lo, hi])| {
                    let v = col.map_or(f64::NAN, |c| c.get(raw));
                    !(v < *lo || v > *hi)
                });
                if keep {
                    kept.push(raw as u32);
                }
            }
        }
        target.commit_indices(kept, len);
        trace!(before = len, after = target.count, "select range");
        target
    }

    fn commit_indices(&mut self, kept: Vec<u32>, previous_count: usize) {
        self.count = kept.len();
        if kept.len() < previous_count {
            self.indices = Some(kept);
        }
        self.extent.borrow_mut().clear();
    }

    /// New store where `f` may rewrite the values of `dims`; those columns are copied first.
    pub fn map<R: Into<MapValue>>(&self, dims: &[usize], f: impl FnMut(&[f64], usize) -> R) -> ColumnarStore {
        let mut target = self.clone_store(dims);
        target.update_dims(dims, f);
        target
    }

    /// In-place variant of [`map`](Self::map), meant for calculated dimensions. Columns
    /// shared with other stores are copied before the write.
    pub fn modify<R: Into<MapValue>>(&mut self, dims: &[usize], f: impl FnMut(&[f64], usize) -> R) {
        self.update_dims(dims, f);
    }

    fn update_dims<R: Into<MapValue>>(&mut self, dims: &[usize], mut f: impl FnMut(&[f64], usize) -> R) {
        for &d in dims {
            if let Some(ext) = self.raw_extent.get_mut(d) {
                *ext = initial_extent();
            }
            if let Some(slot) = self.extent.borrow_mut().get_mut(d) {
                *slot = None;
            }
        }
        let mut values = vec![f64::NAN; dims.len()];
        for idx in 0..self.count {
            let raw = self.raw_index_unchecked(idx);
            for (slot, &d) in values.iter_mut().zip(dims) {
                *slot = self.column(d).map_or(f64::NAN, |c| c.get(raw));
            }
            let ret: MapValue = f(&values, idx).into();
            for i in 0..ret.len().min(dims.len()) {
                let dim = dims[i];
                let val = ret.get(i);
                if let Some(col) = self.columns.get_mut(dim) {
                    Rc::make_mut(col).set_f64(raw, val);
                }
                if let Some(ext) = self.raw_extent.get_mut(dim) {
                    if val < ext[0] {
                        ext[0] = val;
                    }
                    if val > ext[1] {
                        ext[1] = val;
                    }
                }
            }
        }
    }

    /// `[min, max]` over visible rows. Unfiltered stores answer from the raw extent.
    pub fn get_data_extent(&self, dim: usize) -> Extent {
        let Some(col) = self.column(dim) else {
            return initial_extent();
        };
        if self.indices.is_none() {
            return self.raw_extent.get(dim).copied().unwrap_or_else(initial_extent);
        }
        if let Some(Some(cached)) = self.extent.borrow().get(dim) {
            return *cached;
        }
        let [mut min, mut max] = initial_extent();
        for i in 0..self.count {
            let v = col.get(self.raw_index_unchecked(i));
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        let mut cache = self.extent.borrow_mut();
        if cache.len() <= dim {
            cache.resize(dim + 1, None);
        }
        cache[dim] = Some([min, max]);
        [min, max]
    }

    /// The source item behind a filtered index. Providers that drop their rows after
    /// ingestion get an array rebuilt from the columns.
    pub fn get_raw_data_item(&self, idx: usize) -> Option<RawValue> {
        let raw = self.get_raw_index(idx)?;
        let provider = self.provider.as_ref()?.borrow();
        if provider.persistent() {
            return Some(provider.get_item(raw).to_raw());
        }
        let values = self
            .columns
            .iter()
            .map(|c| match c.get_parsed(raw) {
                ParsedValue::Text(s) => RawValue::from(s.as_ref()),
                ParsedValue::Number(n) => serde_json::Number::from_f64(n).map_or(RawValue::Null, RawValue::Number),
            })
            .collect();
        Some(RawValue::Array(values))
    }

    /// Shallow clone keeping indices; `cloned_dims` get private column copies.
    pub fn clone_store(&self, cloned_dims: &[usize]) -> ColumnarStore {
        self.clone_with(cloned_dims, false)
    }

    pub(crate) fn clone_with(&self, cloned_dims: &[usize], ignore_indices: bool) -> ColumnarStore {
        let mut target = self.clone();
        for &d in cloned_dims {
            if let Some(col) = target.columns.get_mut(d) {
                *col = Rc::new(Column::clone(col));
            }
        }
        if ignore_indices {
            target.indices = None;
        }
        target
    }

    /// Whether both stores read `dim` from the same buffer.
    pub fn shares_column_with(&self, other: &ColumnarStore, dim: usize) -> bool {
        match (self.columns.get(dim), other.columns.get(dim)) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn column_mut(&mut self, dim: usize) -> Option<&mut Column> {
        self.columns.get_mut(dim).map(Rc::make_mut)
    }

    pub(crate) fn raw_extent_mut(&mut self, dim: usize) -> Option<&mut Extent> {
        self.raw_extent.get_mut(dim)
    }

    pub(crate) fn raw_index_at(&self, idx: usize) -> usize {
        self.raw_index_unchecked(idx)
    }

    pub(crate) fn set_sampled_indices(&mut self, indices: Vec<u32>) {
        self.count = indices.len();
        self.indices = Some(indices);
        self.extent.borrow_mut().clear();
    }
}
