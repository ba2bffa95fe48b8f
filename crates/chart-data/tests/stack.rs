// File: crates/chart-data/tests/stack.rs
// Purpose: Stack dimension selection, cumulative results per strategy, and shared stores.

use std::rc::Rc;

use chart_data::stack::{add_safe, enable_data_stack_for_dimensions, get_stacked_dimension, is_dimension_stacked};
use chart_data::{
    calculate_stacks, create_dimensions, CoordDimension, DimensionType, OrdinalRegistry, SchemaOptions, SeriesData,
    SharedStoreCache, Source, SourceHeaderOption, SourceOptions, StackOptions, StackStrategy,
};
use serde_json::{json, Value};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).with_test_writer().try_init();
}

fn rows(data: Value) -> Source {
    init_logging();
    Source::from_dataset(data, SourceOptions { source_header: SourceHeaderOption::No, ..Default::default() })
        .expect("array rows")
}

fn category_series(id: &str, data: Value, meta: &Rc<OrdinalRegistry>) -> SeriesData {
    let options = SchemaOptions::with_coords([
        CoordDimension::new("x").with_type(DimensionType::Ordinal).with_ordinal_meta(meta.clone()),
        CoordDimension::new("y"),
    ]);
    SeriesData::from_source(id, rows(data), options).expect("series")
}

fn value_series(id: &str, data: Value) -> SeriesData {
    SeriesData::from_source(id, rows(data), SchemaOptions::with_coords(["x", "y"])).expect("series")
}

fn on_y() -> StackOptions {
    StackOptions { stacked_coord_dimension: Some("y".into()), ..Default::default() }
}

fn results(series: &SeriesData) -> Vec<f64> {
    let name = series.get_calculation_info().stack_result_dimension.clone().expect("stacked");
    (0..series.count()).map(|i| series.get(&name, i)).collect()
}

fn baselines(series: &SeriesData) -> Vec<f64> {
    let name = series.get_calculation_info().stacked_over_dimension.clone().expect("stacked");
    (0..series.count()).map(|i| series.get(&name, i)).collect()
}

fn same(actual: &[f64], expected: &[f64]) -> bool {
    actual.len() == expected.len()
        && actual.iter().zip(expected).all(|(a, e)| (a.is_nan() && e.is_nan()) || a == e)
}

fn weekdays() -> Rc<OrdinalRegistry> {
    Rc::new(OrdinalRegistry::fixed(["Mon", "Tue"]))
}

#[test]
fn category_axis_stacks_by_value() {
    let meta = weekdays();
    let mut a = category_series("a", json!([["Mon", 1], ["Tue", 2]]), &meta);
    let mut b = category_series("b", json!([["Mon", 3], ["Tue", 4]]), &meta);
    let info = a.enable_stack("total", &StackOptions::default()).clone();
    b.enable_stack("total", &StackOptions::default());

    assert_eq!(info.stacked_dimension.as_deref(), Some("y"));
    assert_eq!(info.stacked_by_dimension.as_deref(), Some("x"));
    assert!(!info.is_stacked_by_index);
    assert_eq!(info.stack_result_dimension.as_deref(), Some("__ecstackresult_a"));
    assert_eq!(info.stacked_over_dimension.as_deref(), Some("__ecstackedover_a"));

    let mut all = vec![a, b];
    calculate_stacks(&mut all);
    assert_eq!(results(&all[0]), vec![1.0, 2.0]);
    assert!(same(&baselines(&all[0]), &[f64::NAN, f64::NAN]));
    assert_eq!(results(&all[1]), vec![4.0, 6.0]);
    assert_eq!(baselines(&all[1]), results(&all[0]));
}

#[test]
fn category_rows_pair_by_category_not_position() {
    let meta = weekdays();
    let mut a = category_series("a", json!([["Mon", 1], ["Tue", 2]]), &meta);
    let mut b = category_series("b", json!([["Tue", 4], ["Mon", 3]]), &meta);
    a.enable_stack("s", &StackOptions::default());
    b.enable_stack("s", &StackOptions::default());
    let mut all = vec![a, b];
    calculate_stacks(&mut all);
    assert_eq!(results(&all[1]), vec![6.0, 4.0]);
    assert_eq!(baselines(&all[1]), vec![2.0, 1.0]);
}

#[test]
fn value_axes_stack_by_index() {
    let mut a = value_series("a", json!([[0, 4], [1, 8]]));
    let mut b = value_series("b", json!([[0, 3], [1, 9]]));
    let info = a.enable_stack("s", &on_y()).clone();
    b.enable_stack("s", &on_y());
    assert!(info.is_stacked_by_index);
    assert_eq!(info.stacked_by_dimension, None);
    assert_eq!(info.stacked_dimension.as_deref(), Some("y"));

    let mut all = vec![a, b];
    calculate_stacks(&mut all);
    assert_eq!(results(&all[1]), vec![7.0, 17.0]);
    assert_eq!(baselines(&all[1]), vec![4.0, 8.0]);
}

#[test]
fn missing_value_is_skipped_below() {
    let meta = weekdays();
    let mut a = category_series("a", json!([["Mon", null], ["Tue", 8]]), &meta);
    let mut b = category_series("b", json!([["Mon", 5], ["Tue", 3]]), &meta);
    a.enable_stack("s", &StackOptions::default());
    b.enable_stack("s", &StackOptions::default());
    let mut all = vec![a, b];
    calculate_stacks(&mut all);

    assert!(same(&results(&all[0]), &[f64::NAN, 8.0]));
    assert!(same(&results(&all[1]), &[5.0, 11.0]));
    assert!(same(&baselines(&all[1]), &[f64::NAN, 8.0]));
}

#[test]
fn missing_own_value_stays_missing() {
    let mut a = value_series("a", json!([[0, 1], [1, 2]]));
    let mut b = value_series("b", json!([[0, null], [1, 5]]));
    a.enable_stack("s", &on_y());
    b.enable_stack("s", &on_y());
    let mut all = vec![a, b];
    calculate_stacks(&mut all);
    assert!(same(&results(&all[1]), &[f64::NAN, 7.0]));
    assert!(same(&baselines(&all[1]), &[f64::NAN, 2.0]));
}

fn stacked_pair(strategy: StackStrategy) -> Vec<SeriesData> {
    let mut a = value_series("a", json!([[0, 5], [1, -3]]));
    let mut b = value_series("b", json!([[0, -2], [1, 4]]));
    a.enable_stack("s", &on_y());
    b.enable_stack("s", &StackOptions { strategy, ..on_y() });
    let mut all = vec![a, b];
    calculate_stacks(&mut all);
    all
}

#[test]
fn strategies_pick_values_below() {
    let same_sign = stacked_pair(StackStrategy::SameSign);
    assert_eq!(results(&same_sign[1]), vec![-2.0, 4.0]);
    assert!(same(&baselines(&same_sign[1]), &[f64::NAN, f64::NAN]));

    let all = stacked_pair(StackStrategy::All);
    assert_eq!(results(&all[1]), vec![3.0, 1.0]);
    assert_eq!(baselines(&all[1]), vec![5.0, -3.0]);

    let positive = stacked_pair(StackStrategy::Positive);
    assert!(same(&results(&positive[1]), &[3.0, 4.0]));
    assert!(same(&baselines(&positive[1]), &[5.0, f64::NAN]));

    let negative = stacked_pair(StackStrategy::Negative);
    assert!(same(&results(&negative[1]), &[-2.0, 1.0]));
    assert!(same(&baselines(&negative[1]), &[f64::NAN, -3.0]));
}

#[test]
fn nearest_accepted_series_below_wins() {
    let mut series = vec![
        value_series("a", json!([[0, 1]])),
        value_series("b", json!([[0, 2]])),
        value_series("c", json!([[0, 3]])),
    ];
    for s in &mut series {
        s.enable_stack("s", &on_y());
    }
    calculate_stacks(&mut series);
    assert_eq!(results(&series[2]), vec![6.0]);
    assert_eq!(baselines(&series[2]), vec![3.0]);

    // A rejected series is passed over in favour of the one beneath it.
    let mut series = vec![
        value_series("a", json!([[0, 1]])),
        value_series("b", json!([[0, -2]])),
        value_series("c", json!([[0, 3]])),
    ];
    for s in &mut series {
        s.enable_stack("s", &on_y());
    }
    calculate_stacks(&mut series);
    assert_eq!(results(&series[1]), vec![-2.0]);
    assert_eq!(results(&series[2]), vec![4.0]);
    assert_eq!(baselines(&series[2]), vec![1.0]);
}

#[test]
fn stacks_are_grouped_by_key() {
    let mut series = vec![
        value_series("a", json!([[0, 1]])),
        value_series("b", json!([[0, 10]])),
        value_series("c", json!([[0, 2]])),
        value_series("d", json!([[0, 20]])),
    ];
    for (s, key) in series.iter_mut().zip(["one", "two", "one", "two"]) {
        s.enable_stack(key, &on_y());
    }
    calculate_stacks(&mut series);
    assert_eq!(results(&series[2]), vec![3.0]);
    assert_eq!(results(&series[3]), vec![30.0]);
}

#[test]
fn empty_stack_key_disables_stacking() {
    let mut a = value_series("a", json!([[0, 1]]));
    let dims_before = a.dimensions().len();
    let info = a.enable_stack("", &on_y()).clone();
    assert!(!info.is_stacked());
    assert_eq!(info.stack_result_dimension, None);
    assert_eq!(a.dimensions().len(), dims_before);
    assert_eq!(a.stack(), None);
    assert!(!is_dimension_stacked(&a, "y"));
    assert_eq!(get_stacked_dimension(&a, "y"), "y");
}

#[test]
fn calculation_dimensions_join_the_schema() {
    let mut a = value_series("a", json!([[0, 1], [1, 2]]));
    a.enable_stack("s", &on_y());
    let dims = a.dimensions();
    assert_eq!(dims.len(), 4);
    let result = &dims[2];
    assert_eq!(result.coord_dim.as_deref(), Some("y"));
    assert_eq!(result.coord_dim_index, Some(1));
    assert!(result.is_calculation_coord && result.is_extra_coord);
    let over = &dims[3];
    assert_eq!(over.coord_dim.as_deref(), Some("__ecstackedover_a"));
    assert_eq!(over.coord_dim_index, Some(2));
    assert!(a.schema().is_dimension_omitted());
    assert_eq!(a.store().dimension_count(), 4);
    assert_eq!(a.get_dimension_index("__ecstackresult_a"), Some(2));

    assert!(is_dimension_stacked(&a, "y"));
    assert!(!is_dimension_stacked(&a, "x"));
    assert_eq!(get_stacked_dimension(&a, "y"), "__ecstackresult_a");
    assert_eq!(get_stacked_dimension(&a, "x"), "x");

    // Enabling again keeps the existing dimensions.
    a.enable_stack("other", &StackOptions { strategy: StackStrategy::All, ..on_y() });
    assert_eq!(a.dimensions().len(), 4);
    assert_eq!(a.stack(), Some("other"));
    assert_eq!(a.stack_strategy(), StackStrategy::All);
}

#[test]
fn time_axis_stacks_by_index() {
    let options = SchemaOptions::with_coords([CoordDimension::new("x").with_type(DimensionType::Time), "y".into()]);
    let mut a =
        SeriesData::from_source("a", rows(json!([["2025-01-01", 1], ["2025-01-02", 2]])), options).expect("series");
    let info = a.enable_stack("s", &StackOptions::default()).clone();
    assert_eq!(info.stacked_dimension.as_deref(), Some("y"));
    assert!(info.is_stacked_by_index);
}

#[test]
fn stacking_a_bare_dimension_list() {
    let source = rows(json!([[1, 2]]));
    let mut dims = create_dimensions(&source, SchemaOptions::with_coords(["x", "y"]));
    let info = enable_data_stack_for_dimensions("s1", Some("total"), &mut dims, &on_y());
    assert!(info.is_stacked());
    assert_eq!(dims.len(), 4);
    assert_eq!(dims[2].name.as_deref(), Some("__ecstackresult_s1"));
    assert_eq!(dims[2].store_dim_index, 2);
    assert_eq!(dims[3].store_dim_index, 3);

    let mut untouched = create_dimensions(&source, SchemaOptions::with_coords(["x", "y"]));
    let info = enable_data_stack_for_dimensions("s1", None, &mut untouched, &on_y());
    assert_eq!(info.stacked_dimension, None);
    assert_eq!(untouched.len(), 2);
}

#[test]
fn add_safe_rounds_to_input_precision() {
    assert_eq!(add_safe(0.1, 0.2), 0.3);
    assert_eq!(add_safe(0.1, 0.7), 0.8);
    assert_eq!(add_safe(1.0, 2.0), 3.0);
    assert_eq!(add_safe(-1.25, 0.5), -0.75);
    assert!(add_safe(f64::NAN, 1.0).is_nan());
}

#[test]
fn strategy_names() {
    assert_eq!(StackStrategy::from_name("samesign"), Some(StackStrategy::SameSign));
    assert_eq!(StackStrategy::from_name("all"), Some(StackStrategy::All));
    assert_eq!(StackStrategy::from_name("positive"), Some(StackStrategy::Positive));
    assert_eq!(StackStrategy::from_name("negative"), Some(StackStrategy::Negative));
    assert_eq!(StackStrategy::from_name("sideways"), None);
    assert_eq!(StackStrategy::default(), StackStrategy::SameSign);
}

#[test]
fn series_with_equal_schemas_share_a_store() {
    let source = rows(json!([[1, 10], [2, 20]]));
    let mut cache = SharedStoreCache::new(source.clone());
    let schema = chart_data::prepare_series_data_schema(&source, SchemaOptions::with_coords(["x", "y"]));
    let first = cache.get_or_create(&schema).expect("store");
    let second = cache.get_or_create(&schema).expect("store");
    assert_eq!(cache.len(), 1);
    assert!(first.shares_column_with(&second, 0));
    assert!(first.shares_column_with(&second, 1));

    let typed = chart_data::prepare_series_data_schema(
        &source,
        SchemaOptions::with_coords([CoordDimension::new("x").with_type(DimensionType::Int), "y".into()]),
    );
    let third = cache.get_or_create(&typed).expect("store");
    assert_eq!(cache.len(), 2);
    assert!(!third.shares_column_with(&first, 0));

    // Calculated columns stay private to the series that stacks.
    let mut a = SeriesData::new("a", schema.clone(), first);
    a.enable_stack("s", &on_y());
    assert_eq!(a.store().dimension_count(), 4);
    assert_eq!(second.dimension_count(), 2);
    assert_eq!(cache.get_or_create(&schema).expect("store").dimension_count(), 2);
    assert!(a.store().shares_column_with(&second, 1));

    cache.clear();
    assert!(cache.is_empty());
}
