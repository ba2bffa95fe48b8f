// File: crates/demo/src/main.rs
// Summary: Demo loads an OHLC CSV as a dataset, builds series over a shared store, zooms, samples and stacks.

use anyhow::{Context, Result};
use chart_data::{
    calculate_stacks, sample_for_pixels, CoordDimension, DimensionRef, DimensionType, EncodeDefine, Sampler,
    SamplingMethod, SamplingOptions, SchemaOptions, SeriesData, SharedStoreCache, Source, SourceOptions,
    StackOptions,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TIME_HEADERS: &[&str] = &["time", "timestamp", "open_time", "date", "datetime"];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let rows = match std::env::args().nth(1) {
        Some(raw) => {
            let (path, used_alt) = resolve_path(&raw)?;
            info!(path = %path.display(), used_alt, "using input file");
            load_csv_rows(&path).with_context(|| format!("failed to load CSV '{}'", path.display()))?
        }
        None => {
            info!("no input file given; generating a synthetic series");
            synthetic_rows(5_000)
        }
    };
    if rows.len() < 2 {
        anyhow::bail!("no data rows loaded; check headers/delimiter.");
    }

    let headers: Vec<String> = rows[0]
        .as_array()
        .map(|h| h.iter().filter_map(Value::as_str).map(str::to_lowercase).collect())
        .unwrap_or_default();
    let time_col = headers.iter().position(|h| TIME_HEADERS.contains(&h.as_str()));
    let find = |name: &str| headers.iter().position(|h| h == name);
    let (Some(open_col), Some(close_col)) = (find("open"), find("close")) else {
        anyhow::bail!("could not find open/close columns in {headers:?}");
    };

    let source = Source::from_dataset(Value::Array(rows), SourceOptions::default())
        .context("rows are not a dataset shape")?;
    info!(header_rows = source.header.start_index, dims = headers.len(), "source ready");

    let mut cache = SharedStoreCache::new(source.clone());
    let mut series = Vec::new();
    for (id, col) in [("open", open_col), ("close", close_col)] {
        let x = match time_col {
            Some(_) => CoordDimension::new("x").with_type(DimensionType::Time),
            None => CoordDimension::new("x"),
        };
        let mut encode = EncodeDefine::new().with("y", vec![DimensionRef::Index(col as i64)]);
        if let Some(t) = time_col {
            encode.set("x", vec![DimensionRef::Index(t as i64)]);
        }
        let options = SchemaOptions {
            coord_dimensions: vec![x, CoordDimension::new("y")],
            encode_define: Some(encode),
            ..Default::default()
        };
        let schema = chart_data::prepare_series_data_schema(&source, options);
        let store = cache.get_or_create(&schema)?;
        series.push(SeriesData::new(id, schema, store));
    }
    info!(series = series.len(), stores = cache.len(), "series built");

    let x_name = series[1].map_dimension("x").unwrap_or("x").to_string();
    let y_name = series[1].map_dimension("y").unwrap_or("y").to_string();
    let close = &series[1];
    let (Some(x_dim), Some(y_dim)) = (close.get_dimension_index(&x_name), close.get_dimension_index(&y_name)) else {
        anyhow::bail!("series dimensions did not resolve");
    };
    let [x_min, x_max] = close.store().get_data_extent(x_dim);
    let [y_min, y_max] = close.store().get_data_extent(y_dim);
    info!(count = close.count(), x_min, x_max, y_min, y_max, median = close.store().get_median(y_dim), "close loaded");

    // Zoom into the second half of the x range.
    let zoomed = close.store().select_range(&[(x_dim, [x_min + (x_max - x_min) / 2.0, x_max])]);
    info!(count = zoomed.count(), extent = ?zoomed.get_data_extent(y_dim), "zoomed");

    for method in [SamplingMethod::Lttb, SamplingMethod::Bucket(Sampler::MinMax)] {
        let options = SamplingOptions { method, pixels: 600.0, ..Default::default() };
        match sample_for_pixels(&zoomed, y_dim, &options) {
            Some(sampled) => info!(?method, count = sampled.count(), extent = ?sampled.get_data_extent(y_dim), "sampled"),
            None => warn!(?method, count = zoomed.count(), "few enough rows; sampling skipped"),
        }
    }

    let stack = StackOptions { stacked_coord_dimension: Some("y".into()), ..Default::default() };
    for s in &mut series {
        s.enable_stack("total", &stack);
    }
    calculate_stacks(&mut series);
    let top = &series[1];
    if let Some(result) = top.get_calculation_info().stack_result_dimension.clone() {
        let last = top.count().saturating_sub(1);
        info!(stacked = top.get(&result, last), own = top.get(&y_name, last), "stacked open+close at last row");
    }
    Ok(())
}

/// Resolve path, trying .csv/.cvs swap if needed.
/// Returns (actual_path, used_alt)
fn resolve_path(raw: &str) -> Result<(PathBuf, bool)> {
    let p = Path::new(raw);
    if p.exists() {
        return Ok((p.to_path_buf(), false));
    }
    if let Some(alt) = swap_ext(p) {
        if alt.exists() {
            return Ok((alt, true));
        }
    }
    anyhow::bail!("file not found: {}", p.display());
}

fn swap_ext(p: &Path) -> Option<PathBuf> {
    let mut alt = p.to_path_buf();
    let ext = p.extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "cvs" => alt.set_extension("csv"),
        "csv" => alt.set_extension("cvs"),
        _ => return None,
    };
    Some(alt)
}

/// CSV as array rows: the header row first, numeric cells as numbers.
fn load_csv_rows(path: &Path) -> Result<Vec<Value>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers: Vec<Value> = rdr.headers()?.iter().map(|h| Value::from(h.trim())).collect();
    info!(?headers, "csv headers");
    let mut rows = vec![Value::Array(headers)];
    for rec in rdr.records() {
        let rec = rec?;
        rows.push(Value::Array(rec.iter().map(cell).collect()));
    }
    Ok(rows)
}

fn cell(raw: &str) -> Value {
    let s = raw.trim();
    match s.parse::<f64>() {
        Ok(n) => serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number),
        Err(_) if s.is_empty() => Value::Null,
        Err(_) => Value::from(s),
    }
}

fn synthetic_rows(n: usize) -> Vec<Value> {
    let mut rows = vec![serde_json::json!(["time", "open", "high", "low", "close"])];
    let mut price = 100.0f64;
    let start = 1_735_689_600_000i64;
    for i in 0..n {
        let open = price;
        let close = open + (i as f64 * 0.05).sin() * 0.8;
        let (high, low) = (open.max(close) + 0.5, open.min(close) - 0.5);
        price = close;
        rows.push(serde_json::json!([start + i as i64 * 21_600_000, open, high, low, close]));
    }
    rows
}
