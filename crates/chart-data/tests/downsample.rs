// File: crates/chart-data/tests/downsample.rs
// Purpose: Bucket aggregation, LTTB and pixel-driven sampling over columnar stores.

use chart_data::downsample::{middle_index, sampling_rate};
use chart_data::{
    sample_for_pixels, ColumnarStore, DefaultDataProvider, DimensionType, Sampler, SamplingMethod, SamplingOptions,
    Source, SourceOptions, StoreDimension,
};
use serde_json::{json, Value};

fn xy_store(ys: &[Value]) -> ColumnarStore {
    let rows: Vec<Value> = ys.iter().enumerate().map(|(i, y)| json!([i, y])).collect();
    let source = Source::from_dataset(Value::Array(rows), SourceOptions::default()).expect("rows");
    let provider = DefaultDataProvider::new(source, None).expect("provider").into_shared();
    let mut store = ColumnarStore::new();
    store
        .init_data(provider, vec![StoreDimension::new(DimensionType::Float); 2], None)
        .expect("ingest");
    store
}

fn numbers(ys: &[f64]) -> Vec<Value> {
    ys.iter().map(|y| if y.is_nan() { Value::Null } else { json!(y) }).collect()
}

#[test]
fn samplers() {
    let nan = f64::NAN;
    assert_eq!(Sampler::Average.sample(&[1.0, nan, 3.0]), 2.0);
    assert!(Sampler::Average.sample(&[nan, nan]).is_nan());
    assert_eq!(Sampler::Sum.sample(&[1.0, nan, 2.0]), 3.0);
    assert_eq!(Sampler::Max.sample(&[1.0, 5.0, nan]), 5.0);
    assert_eq!(Sampler::Min.sample(&[4.0, nan, -1.0]), -1.0);
    assert_eq!(Sampler::MinMax.sample(&[-7.0, 3.0, 6.0]), -7.0);
    assert_eq!(Sampler::Nearest.sample(&[8.0, 1.0]), 8.0);
    assert!(Sampler::Max.sample(&[]).is_nan());
    assert!(Sampler::Min.sample(&[nan]).is_nan());

    assert_eq!(Sampler::from_name("minmax"), Some(Sampler::MinMax));
    assert_eq!(Sampler::from_name("lttb"), None);
}

#[test]
fn middle_of_frame() {
    assert_eq!(middle_index(&[0.0; 4], 0.0), 2);
    assert_eq!(middle_index(&[0.0; 3], 0.0), 2);
    assert_eq!(middle_index(&[0.0], 0.0), 1);
}

#[test]
fn bucket_down_sample_keeps_one_row_per_frame() {
    let store = xy_store(&numbers(&[1.0, 2.0, 3.0, 4.0, 5.0]));
    let sampled = store.down_sample(1, 0.5, |f| Sampler::Average.sample(f), middle_index);
    assert_eq!(sampled.get_indices(), vec![1, 3, 4]);
    assert_eq!((0..3).map(|i| sampled.get(1, i)).collect::<Vec<_>>(), vec![1.5, 3.5, 5.0]);
    assert_eq!(sampled.get_data_extent(1), [1.5, 5.0]);
    // Only the sampled dimension is rewritten.
    assert_eq!(sampled.get(0, 0), 1.0);
    assert_eq!(store.get(1, 1), 2.0);
    assert!(sampled.shares_column_with(&store, 0));
    assert!(!sampled.shares_column_with(&store, 1));
}

#[test]
fn bucket_down_sample_of_filtered_store() {
    let store = xy_store(&numbers(&[9.0, 1.0, 9.0, 3.0, 9.0, 5.0, 9.0, 7.0]));
    let odd = store.filter(&[1], |v, _| v[0] < 9.0);
    let sampled = odd.down_sample(1, 0.5, |f| Sampler::Max.sample(f), |_, _| 0);
    assert_eq!(sampled.get_indices(), vec![1, 5]);
    assert_eq!(sampled.get(1, 0), 3.0);
    assert_eq!(sampled.get(1, 1), 7.0);
}

#[test]
fn lttb_keeps_peaks_and_gaps() {
    let nan = f64::NAN;
    let store = xy_store(&numbers(&[0.0, 1.0, nan, 3.0, 2.0, 9.0, 1.0, 0.0]));
    let sampled = store.lttb_down_sample(1, 1.0 / 3.0);
    assert_eq!(sampled.get_indices(), vec![0, 2, 3, 5, 7]);
    assert!(sampled.get(1, 1).is_nan());
    assert_eq!(sampled.get(1, 3), 9.0);
    // Columns are shared, nothing is rewritten.
    assert!(sampled.shares_column_with(&store, 1));
}

#[test]
fn lttb_keeps_endpoints() {
    let ys: Vec<f64> = (0..100).map(|i| ((i as f64) * 0.3).sin()).collect();
    let store = xy_store(&numbers(&ys));
    let sampled = store.lttb_down_sample(1, 0.1);
    let indices = sampled.get_indices();
    assert_eq!(indices.first(), Some(&0));
    assert_eq!(indices.last(), Some(&99));
    assert!(sampled.count() < store.count());
    assert!(indices.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn lttb_leaves_tiny_stores_alone() {
    let store = xy_store(&numbers(&[1.0, 2.0]));
    let sampled = store.lttb_down_sample(1, 0.1);
    assert_eq!(sampled.get_indices(), vec![0, 1]);
}

#[test]
fn rate_from_pixels() {
    assert_eq!(sampling_rate(1000, 800.0), None);
    assert_eq!(sampling_rate(2000, 800.0), Some(3));
    assert_eq!(sampling_rate(10, 0.0), None);
}

#[test]
fn sampling_follows_pixel_budget() {
    let ys: Vec<f64> = (0..2000).map(|i| (i % 17) as f64).collect();
    let store = xy_store(&numbers(&ys));

    let options = SamplingOptions { pixels: 100.0, ..Default::default() };
    let lttb = sample_for_pixels(&store, 1, &options).expect("sampled");
    assert!(lttb.count() <= 2 * 2000 / 20 + 2);
    assert_eq!(lttb.get_raw_index(0), Some(0));

    let bucket = SamplingOptions { method: SamplingMethod::Bucket(Sampler::Max), ..options };
    let maxed = sample_for_pixels(&store, 1, &bucket).expect("sampled");
    assert_eq!(maxed.count(), 100);
    assert_eq!(maxed.get(1, 0), 16.0);

    let wide = SamplingOptions { pixels: 4000.0, ..Default::default() };
    assert!(sample_for_pixels(&store, 1, &wide).is_none());

    let small = xy_store(&numbers(&[1.0, 2.0, 3.0]));
    assert!(sample_for_pixels(&small, 1, &SamplingOptions { pixels: 1.0, ..Default::default() }).is_none());
}
