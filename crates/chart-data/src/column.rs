// File: crates/chart-data/src/column.rs
// Summary: Typed column buffers backing one store dimension each.

use crate::types::{DimensionType, ParsedValue};

/// Dense per-dimension storage. The representation follows the declared type:
/// float/time are `f64`, int is `i32` (missing reads back as 0), ordinal/number keep
/// parsed values so uncollected category strings survive until interned.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Float(Vec<f64>),
    Int(Vec<i32>),
    Generic(Vec<ParsedValue>),
}

impl Column {
    pub fn with_len(dim_type: DimensionType, len: usize) -> Self {
        match dim_type {
            DimensionType::Float | DimensionType::Time => Column::Float(vec![f64::NAN; len]),
            DimensionType::Int => Column::Int(vec![0; len]),
            DimensionType::Ordinal | DimensionType::Number => Column::Generic(vec![ParsedValue::NAN; len]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Int(v) => v.len(),
            Column::Generic(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow or shrink, keeping existing cells.
    pub fn resize(&mut self, len: usize) {
        match self {
            Column::Float(v) => v.resize(len, f64::NAN),
            Column::Int(v) => v.resize(len, 0),
            Column::Generic(v) => v.resize(len, ParsedValue::NAN),
        }
    }

    /// Numeric read; text and out-of-range cells are NaN.
    #[inline]
    pub fn get(&self, idx: usize) -> f64 {
        match self {
            Column::Float(v) => v.get(idx).copied().unwrap_or(f64::NAN),
            Column::Int(v) => v.get(idx).map_or(f64::NAN, |x| f64::from(*x)),
            Column::Generic(v) => v.get(idx).map_or(f64::NAN, ParsedValue::as_f64),
        }
    }

    pub fn get_parsed(&self, idx: usize) -> ParsedValue {
        match self {
            Column::Generic(v) => v.get(idx).cloned().unwrap_or_default(),
            other => ParsedValue::Number(other.get(idx)),
        }
    }

    #[inline]
    pub fn set(&mut self, idx: usize, value: ParsedValue) {
        match self {
            Column::Generic(v) => {
                if let Some(cell) = v.get_mut(idx) {
                    *cell = value;
                }
            }
            other => other.set_f64(idx, value.as_f64()),
        }
    }

    #[inline]
    pub fn set_f64(&mut self, idx: usize, value: f64) {
        match self {
            Column::Float(v) => {
                if let Some(cell) = v.get_mut(idx) {
                    *cell = value;
                }
            }
            Column::Int(v) => {
                if let Some(cell) = v.get_mut(idx) {
                    *cell = to_int32(value);
                }
            }
            Column::Generic(v) => {
                if let Some(cell) = v.get_mut(idx) {
                    *cell = ParsedValue::Number(value);
                }
            }
        }
    }
}

/// Integer storage truncates toward zero; NaN and infinities store as 0.
#[inline]
fn to_int32(value: f64) -> i32 {
    if value.is_finite() {
        value as i32
    } else {
        0
    }
}
