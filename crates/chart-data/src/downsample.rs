// File: crates/chart-data/src/downsample.rs
// Summary: Down-sampling of stores (bucket aggregation and LTTB) plus pixel-driven sampling.

use serde::Deserialize;
use tracing::debug;

use crate::store::ColumnarStore;
use crate::types::{from_option_name, initial_extent};

/// Frame aggregators for [`ColumnarStore::down_sample`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sampler {
    /// Mean of the non-NaN values; NaN when there are none.
    Average,
    /// NaN counts as 0.
    Sum,
    Max,
    Min,
    /// The value farthest from zero.
    MinMax,
    /// First value of the frame.
    Nearest,
}

impl Sampler {
    pub fn from_name(name: &str) -> Option<Self> {
        from_option_name(name)
    }

    pub fn sample(self, frame: &[f64]) -> f64 {
        match self {
            Sampler::Average => {
                let (sum, n) = frame.iter().filter(|v| !v.is_nan()).fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 { f64::NAN } else { sum / n as f64 }
            }
            Sampler::Sum => frame.iter().map(|v| if v.is_nan() { 0.0 } else { *v }).sum(),
            Sampler::Max => finite_or_nan(frame.iter().fold(f64::NEG_INFINITY, |m, &v| if v > m { v } else { m })),
            Sampler::Min => finite_or_nan(frame.iter().fold(f64::INFINITY, |m, &v| if v < m { v } else { m })),
            Sampler::MinMax => {
                let mut turning_abs = f64::NEG_INFINITY;
                let mut turning = f64::NEG_INFINITY;
                for &v in frame {
                    if v.abs() > turning_abs {
                        turning_abs = v.abs();
                        turning = v;
                    }
                }
                finite_or_nan(turning)
            }
            Sampler::Nearest => frame.first().copied().unwrap_or(f64::NAN),
        }
    }
}

fn finite_or_nan(v: f64) -> f64 {
    if v.is_finite() { v } else { f64::NAN }
}

/// Default representative of a frame: its middle row.
pub fn middle_index(frame: &[f64], _value: f64) -> usize {
    (frame.len() as f64 / 2.0).round() as usize
}

/// How a series wants to be thinned when it has more rows than pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingMethod {
    Lttb,
    Bucket(Sampler),
}

#[derive(Clone, Copy, Debug)]
pub struct SamplingOptions {
    pub method: SamplingMethod,
    /// Pixel length of the base axis.
    pub pixels: f64,
    pub device_pixel_ratio: f64,
    /// Stores at or below this many rows are left alone.
    pub min_count: usize,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self { method: SamplingMethod::Lttb, pixels: 800.0, device_pixel_ratio: 1.0, min_count: 10 }
    }
}

/// Rows per pixel, rounded; `None` unless it exceeds 1.
pub fn sampling_rate(count: usize, pixels: f64) -> Option<usize> {
    let rate = (count as f64 / pixels).round();
    (rate.is_finite() && rate > 1.0).then_some(rate as usize)
}

/// Thin `dim` of `store` for display at `options.pixels`; `None` when no sampling is needed.
pub fn sample_for_pixels(store: &ColumnarStore, dim: usize, options: &SamplingOptions) -> Option<ColumnarStore> {
    let count = store.count();
    if count <= options.min_count {
        return None;
    }
    let size = options.pixels.abs() * if options.device_pixel_ratio > 0.0 { options.device_pixel_ratio } else { 1.0 };
    let rate = sampling_rate(count, size)?;
    let frac = 1.0 / rate as f64;
    Some(match options.method {
        SamplingMethod::Lttb => store.lttb_down_sample(dim, frac),
        SamplingMethod::Bucket(sampler) => store.down_sample(dim, frac, |f| sampler.sample(f), middle_index),
    })
}

impl ColumnarStore {
    /// Aggregate `dim` over frames of `floor(1 / rate)` visible rows.
    ///
    /// Each frame keeps one row, picked by `index_picker` (relative to the frame start),
    /// and that row of a private copy of `dim` receives the aggregate.
    pub fn down_sample(
        &self,
        dim: usize,
        rate: f64,
        aggregator: impl Fn(&[f64]) -> f64,
        index_picker: impl Fn(&[f64], f64) -> usize,
    ) -> ColumnarStore {
        let mut target = self.clone_with(&[dim], true);
        let len = self.count();
        let mut frame_size = frame_size(rate);
        let mut frame = Vec::with_capacity(frame_size);
        let mut indices = Vec::with_capacity(len.div_ceil(frame_size));
        let mut extent = initial_extent();

        if let Some(column) = target.column_mut(dim) {
            let mut i = 0;
            while i < len {
                if frame_size > len - i {
                    frame_size = len - i;
                }
                frame.clear();
                frame.extend((0..frame_size).map(|k| column.get(self.raw_index_at(i + k))));
                let value = aggregator(&frame);
                let pick = (i + index_picker(&frame, value)).min(len - 1);
                let raw = self.raw_index_at(pick);
                column.set_f64(raw, value);
                if value < extent[0] {
                    extent[0] = value;
                }
                if value > extent[1] {
                    extent[1] = value;
                }
                indices.push(raw as u32);
                i += frame_size;
            }
        }
        if let Some(slot) = target.raw_extent_mut(dim) {
            *slot = extent;
        }
        target.set_sampled_indices(indices);
        debug!(dim, before = len, after = target.count(), "down sample");
        target
    }

    /// Largest-Triangle-Three-Buckets over `dim`, with the visible index as x.
    ///
    /// First and last rows are always kept. A frame mixing NaN and numbers also keeps its
    /// first NaN row, so gaps survive sampling.
    pub fn lttb_down_sample(&self, dim: usize, rate: f64) -> ColumnarStore {
        let len = self.count();
        if len < 3 {
            return self.clone();
        }
        let mut target = self.clone_with(&[], true);
        let frame_size = frame_size(rate);
        let y = |idx: usize| self.get_by_raw_index(dim, self.raw_index_at(idx));
        let y_raw = |raw: usize| self.get_by_raw_index(dim, raw);

        let mut indices: Vec<u32> = Vec::with_capacity(((len.div_ceil(frame_size) + 2) * 2).min(len));
        let mut current_raw = self.raw_index_at(0);
        indices.push(current_raw as u32);

        let mut i = 1;
        while i < len - 1 {
            let next_start = (i + frame_size).min(len - 1);
            let next_end = (i + frame_size * 2).min(len);
            let avg_x = (next_end + next_start) as f64 / 2.0;
            let avg_y = (next_start..next_end).map(y).filter(|v| !v.is_nan()).sum::<f64>()
                / (next_end - next_start) as f64;

            let frame_start = i;
            let frame_end = (i + frame_size).min(len);
            let point_ax = (i - 1) as f64;
            let point_ay = y_raw(current_raw);

            let mut max_area = -1.0;
            let mut next_raw = self.raw_index_at(frame_start);
            let mut first_nan: Option<usize> = None;
            let mut nan_count = 0;

            for idx in frame_start..frame_end {
                let raw = self.raw_index_at(idx);
                let value = y_raw(raw);
                if value.is_nan() {
                    nan_count += 1;
                    first_nan.get_or_insert(raw);
                    continue;
                }
                let area = ((point_ax - avg_x) * (value - point_ay) - (point_ax - idx as f64) * (avg_y - point_ay)).abs();
                if area > max_area {
                    max_area = area;
                    next_raw = raw;
                }
            }

            if let Some(nan_raw) = first_nan.filter(|_| nan_count < frame_end - frame_start) {
                indices.push(nan_raw.min(next_raw) as u32);
                next_raw = nan_raw.max(next_raw);
            }
            indices.push(next_raw as u32);
            current_raw = next_raw;
            i += frame_size;
        }

        indices.push(self.raw_index_at(len - 1) as u32);
        target.set_sampled_indices(indices);
        debug!(dim, before = len, after = target.count(), "lttb down sample");
        target
    }
}

fn frame_size(rate: f64) -> usize {
    let size = (1.0 / rate).floor();
    if size.is_finite() && size >= 1.0 { size as usize } else { 1 }
}
