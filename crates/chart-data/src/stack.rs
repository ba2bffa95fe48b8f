// File: crates/chart-data/src/stack.rs
// Summary: Data stacking; picks stacked/stacked-by dimensions and computes cumulative values.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::dimensions::SeriesDimensionDefine;
use crate::schema::SeriesDataSchema;
use crate::series::SeriesData;
use crate::store::ColumnarStore;
use crate::types::{from_option_name, DimensionType};

/// Which earlier values a series stacks onto.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackStrategy {
    /// Positive values stack on positive, negative on negative.
    #[default]
    SameSign,
    All,
    Positive,
    Negative,
}

impl StackStrategy {
    pub fn from_name(name: &str) -> Option<Self> {
        from_option_name(name)
    }

    /// Whether an earlier result `below` can carry a value whose running sum is `sum`.
    fn accepts(self, sum: f64, below: f64) -> bool {
        match self {
            StackStrategy::All => true,
            StackStrategy::Positive => below > 0.0,
            StackStrategy::Negative => below < 0.0,
            StackStrategy::SameSign => (sum >= 0.0 && below > 0.0) || (sum <= 0.0 && below < 0.0),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StackOptions {
    /// Only a dimension on this coordinate may be stacked.
    pub stacked_coord_dimension: Option<String>,
    /// Stack by row position rather than by category value.
    pub by_index: Option<bool>,
    pub strategy: StackStrategy,
}

/// Dimensions involved in stacking one series, by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackInfo {
    pub stacked_dimension: Option<String>,
    pub stacked_by_dimension: Option<String>,
    pub is_stacked_by_index: bool,
    pub stacked_over_dimension: Option<String>,
    pub stack_result_dimension: Option<String>,
}

impl StackInfo {
    /// Whether stacking was enabled and has something to match rows by.
    pub fn is_stacked(&self) -> bool {
        self.stacked_dimension.is_some()
            && self.stack_result_dimension.is_some()
            && (self.is_stacked_by_index || self.stacked_by_dimension.is_some())
    }
}

struct Selection {
    stacked: Option<usize>,
    stacked_by: Option<usize>,
    by_index: bool,
}

fn select_dimensions(dims: &[SeriesDimensionDefine], may_stack: bool, options: &StackOptions) -> Selection {
    let mut by_index = options.by_index.unwrap_or(false);
    let mut stacked = None;
    let mut stacked_by = None;
    if may_stack {
        for (i, dim) in dims.iter().enumerate().filter(|(_, d)| !d.is_extra_coord) {
            if !by_index && stacked_by.is_none() && (dim.ordinal_meta.is_some() || dim.is_ordinal()) {
                stacked_by = Some(i);
            }
            let stackable = !matches!(dim.dim_type, Some(DimensionType::Ordinal | DimensionType::Time));
            let coord_ok = options
                .stacked_coord_dimension
                .as_ref()
                .map_or(true, |c| dim.coord_dim.as_ref() == Some(c));
            if stacked.is_none() && stackable && coord_ok {
                stacked = Some(i);
            }
        }
    }
    if stacked.is_some() && !by_index && stacked_by.is_none() {
        by_index = true;
    }
    Selection { stacked, stacked_by, by_index }
}

/// The two calculated dimensions: cumulative result, then the baseline it sits on.
/// The baseline gets a coordinate of its own so it stays out of the stacked axis extent.
fn calculation_dimensions(
    dims: &[SeriesDimensionDefine],
    stacked: &SeriesDimensionDefine,
    series_id: &str,
) -> (SeriesDimensionDefine, SeriesDimensionDefine) {
    let result_name = format!("__ecstackresult_{series_id}");
    let over_name = format!("__ecstackedover_{series_id}");
    let coord_index = dims.iter().filter(|d| d.coord_dim == stacked.coord_dim).count();
    let base = SeriesDimensionDefine {
        dim_type: stacked.dim_type,
        is_extra_coord: true,
        is_calculation_coord: true,
        ..Default::default()
    };
    let result = SeriesDimensionDefine {
        name: Some(result_name),
        coord_dim: stacked.coord_dim.clone(),
        coord_dim_index: Some(coord_index),
        store_dim_index: dims.len(),
        ..base.clone()
    };
    let over = SeriesDimensionDefine {
        name: Some(over_name.clone()),
        coord_dim: Some(over_name),
        coord_dim_index: Some(coord_index + 1),
        store_dim_index: dims.len() + 1,
        ..base
    };
    (result, over)
}

fn stack_info(dims: &[SeriesDimensionDefine], sel: &Selection) -> StackInfo {
    let name_of = |i: Option<usize>| i.and_then(|i| dims.get(i)).and_then(|d| d.name.clone());
    StackInfo {
        stacked_dimension: name_of(sel.stacked),
        stacked_by_dimension: name_of(sel.stacked_by),
        is_stacked_by_index: sel.by_index,
        stacked_over_dimension: None,
        stack_result_dimension: None,
    }
}

/// Enable stacking on a schema, allocating the calculated columns in `store` when given.
/// An empty or absent `stack` key leaves everything untouched.
pub fn enable_data_stack(
    series_id: &str,
    stack: Option<&str>,
    schema: &mut SeriesDataSchema,
    store: Option<&mut ColumnarStore>,
    options: &StackOptions,
) -> StackInfo {
    let may_stack = stack.is_some_and(|s| !s.is_empty());
    let sel = select_dimensions(&schema.dimensions, may_stack, options);
    let mut info = stack_info(&schema.dimensions, &sel);
    let Some(stacked) = sel.stacked.and_then(|i| schema.dimensions.get(i)) else {
        return info;
    };

    let (mut result, mut over) = calculation_dimensions(&schema.dimensions, stacked, series_id);
    if let Some(store) = store {
        let dim_type = stacked.resolved_type();
        if let Some(name) = &result.name {
            result.store_dim_index = store.ensure_calculation_dimension(name, dim_type);
        }
        if let Some(name) = &over.name {
            over.store_dim_index = store.ensure_calculation_dimension(name, dim_type);
        }
    } else {
        result.store_dim_index = schema.full_dimension_count();
        over.store_dim_index = schema.full_dimension_count() + 1;
    }
    info.stack_result_dimension = result.name.clone();
    info.stacked_over_dimension = over.name.clone();
    schema.append_calculation_dimension(result);
    schema.append_calculation_dimension(over);
    debug!(series_id, ?info, "stack enabled");
    info
}

/// [`enable_data_stack`] over a bare dimension list.
pub fn enable_data_stack_for_dimensions(
    series_id: &str,
    stack: Option<&str>,
    dims: &mut Vec<SeriesDimensionDefine>,
    options: &StackOptions,
) -> StackInfo {
    let may_stack = stack.is_some_and(|s| !s.is_empty());
    let sel = select_dimensions(dims, may_stack, options);
    let mut info = stack_info(dims, &sel);
    let Some(stacked) = sel.stacked.and_then(|i| dims.get(i)) else {
        return info;
    };
    let (result, over) = calculation_dimensions(dims, stacked, series_id);
    info.stack_result_dimension = result.name.clone();
    info.stacked_over_dimension = over.name.clone();
    dims.push(result);
    dims.push(over);
    info
}

/// Sum two decimals, rounding to the finer of their precisions so `0.1 + 0.2` is `0.3`.
pub fn add_safe(a: f64, b: f64) -> f64 {
    let sum = a + b;
    let precision = decimal_places(a).max(decimal_places(b));
    if precision > 20 || !sum.is_finite() {
        return sum;
    }
    format!("{sum:.precision$}").parse().unwrap_or(sum)
}

fn decimal_places(v: f64) -> usize {
    if !v.is_finite() {
        return 0;
    }
    let text = v.to_string();
    text.split_once('.').map_or(0, |(_, frac)| frac.len())
}

fn value_key(v: f64) -> u64 {
    // -0 and 0 are one category.
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

/// What a later series needs to know about an earlier one in the same stack.
struct Below<'a> {
    store: &'a ColumnarStore,
    result_dim: usize,
    /// Stacked-by value to raw index; the last row with a value wins.
    by_value: Option<HashMap<u64, usize>>,
}

impl<'a> Below<'a> {
    fn new(series: &'a SeriesData, by_index: bool) -> Option<Self> {
        let info = series.get_calculation_info();
        let result_dim = info.stack_result_dimension.as_deref().and_then(|n| series.get_dimension_index(n))?;
        let store = series.store();
        let by_value = if by_index {
            None
        } else {
            let by_dim = info.stacked_by_dimension.as_deref().and_then(|n| series.get_dimension_index(n));
            let mut inverted = HashMap::new();
            if let Some(dim) = by_dim {
                for raw in 0..store.raw_count() {
                    let v = store.get_by_raw_index(dim, raw);
                    if !v.is_nan() {
                        inverted.insert(value_key(v), raw);
                    }
                }
            }
            Some(inverted)
        };
        Some(Self { store, result_dim, by_value })
    }

    fn raw_index(&self, raw: usize, by_value: f64) -> Option<usize> {
        match &self.by_value {
            None => Some(raw),
            Some(_) if by_value.is_nan() => None,
            Some(map) => map.get(&value_key(by_value)).copied(),
        }
    }
}

/// Compute stack results for series sharing one stack key, in series order.
pub fn calculate_stack(group: &mut [&mut SeriesData]) {
    for i in 0..group.len() {
        let (before, rest) = group.split_at_mut(i);
        let target = &mut *rest[0];
        let info = target.get_calculation_info().clone();
        if !info.is_stacked() {
            continue;
        }
        let dim = |name: &Option<String>| name.as_deref().and_then(|n| target.get_dimension_index(n));
        let (Some(stacked), Some(result), Some(over)) =
            (dim(&info.stacked_dimension), dim(&info.stack_result_dimension), dim(&info.stacked_over_dimension))
        else {
            continue;
        };
        let stacked_by = dim(&info.stacked_by_dimension);
        let by_index = info.is_stacked_by_index;
        let strategy = target.stack_strategy();

        let below: Vec<Below<'_>> = before
            .iter()
            .rev()
            .filter_map(|s| Below::new(s, by_index))
            .collect();

        let store = target.store_mut();
        let own: Vec<f64> = (0..store.count()).map(|idx| store.get(stacked, idx)).collect();
        let keys: Vec<(usize, f64)> = (0..store.count())
            .map(|idx| {
                let raw = store.get_raw_index(idx).unwrap_or(idx);
                let by = if by_index { f64::NAN } else { stacked_by.map_or(f64::NAN, |d| store.get(d, idx)) };
                (raw, by)
            })
            .collect();

        store.modify(&[result, over], |_, idx| {
            let mut sum = own[idx];
            if sum.is_nan() {
                return (f64::NAN, f64::NAN);
            }
            let (raw, by) = keys[idx];
            let mut stacked_over = f64::NAN;
            for b in &below {
                let Some(raw_below) = b.raw_index(raw, by) else {
                    continue;
                };
                let val = b.store.get_by_raw_index(b.result_dim, raw_below);
                if strategy.accepts(sum, val) {
                    sum = add_safe(sum, val);
                    stacked_over = val;
                    break;
                }
            }
            (sum, stacked_over)
        });
    }
}

/// Group `series` by stack key (first appearance order) and stack each group.
pub fn calculate_stacks(series: &mut [SeriesData]) {
    let mut groups: Vec<(String, Vec<&mut SeriesData>)> = Vec::new();
    for s in series.iter_mut() {
        let Some(key) = s.stack().map(str::to_string) else {
            continue;
        };
        if !s.get_calculation_info().is_stacked() {
            continue;
        }
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(s),
            None => groups.push((key, vec![s])),
        }
    }
    for (key, members) in &mut groups {
        debug!(stack = %key, series = members.len(), "calculate stack");
        calculate_stack(members);
    }
}

/// Whether `dim` is the stacked dimension (or its result) of `series`.
pub fn is_dimension_stacked(series: &SeriesData, dim: &str) -> bool {
    let info = series.get_calculation_info();
    info.is_stacked()
        && (info.stacked_dimension.as_deref() == Some(dim) || info.stack_result_dimension.as_deref() == Some(dim))
}

/// The dimension to read for `target`: the stack result when `target` is stacked.
pub fn get_stacked_dimension<'a>(series: &'a SeriesData, target: &'a str) -> &'a str {
    let info = series.get_calculation_info();
    match (&info.stacked_dimension, &info.stack_result_dimension) {
        (Some(stacked), Some(result)) if stacked == target && info.is_stacked() => result,
        _ => target,
    }
}
