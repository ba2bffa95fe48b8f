// File: crates/chart-data/tests/source.rs
// Purpose: Source shapes, header detection, dimension/encode options, providers and getters.

use std::rc::Rc;

use chart_data::source::{dimensions_from_json, BeOrdinal};
use chart_data::{
    detect_source_format, CategoryIndexGetter, ColumnarStore, DataError, DataProvider, DefaultDataProvider,
    DimensionRef, DimensionType, EncodeDefine, SeriesLayoutBy, Source, SourceData, SourceDimension, SourceFormat,
    SourceHeaderOption, SourceOptions, SourceValueGetter, StoreDimension,
};
use serde_json::{json, Map, Value};

fn dataset(raw: Value, options: SourceOptions) -> Source {
    Source::from_dataset(raw, options).expect("dataset shape")
}

fn ingest(source: Source, dims: usize) -> ColumnarStore {
    let provider = DefaultDataProvider::new(source, Some(dims)).expect("provider").into_shared();
    let mut store = ColumnarStore::new();
    let dims = (0..dims).map(|_| StoreDimension::new(DimensionType::Float)).collect();
    store.init_data(provider, dims, None).expect("ingest");
    store
}

fn names(source: &Source) -> Vec<Option<String>> {
    source.header.dimensions_define.iter().flatten().map(|d| d.name.clone()).collect()
}

#[test]
fn detects_dataset_shapes() {
    assert_eq!(detect_source_format(&json!([])), SourceFormat::ArrayRows);
    assert_eq!(detect_source_format(&json!([[1, 2]])), SourceFormat::ArrayRows);
    assert_eq!(detect_source_format(&json!([null, {"a": 1}])), SourceFormat::ObjectRows);
    assert_eq!(detect_source_format(&json!({"a": [1, 2]})), SourceFormat::KeyedColumns);
    assert_eq!(detect_source_format(&json!([1, 2])), SourceFormat::Unknown);
    assert_eq!(detect_source_format(&json!({"a": 1})), SourceFormat::Unknown);
    assert_eq!(detect_source_format(&json!("rows")), SourceFormat::Unknown);
    assert!(Source::from_dataset(json!([1, 2]), SourceOptions::default()).is_none());
}

#[test]
fn header_row_is_detected() {
    let source = dataset(json!([["name", "score"], ["a", 1], ["b", 2]]), SourceOptions::default());
    assert_eq!(source.format(), SourceFormat::ArrayRows);
    assert_eq!(source.header.start_index, 1);
    assert_eq!(names(&source), vec![Some("name".to_string()), Some("score".to_string())]);
    assert_eq!(source.header.dimensions_detected_count, Some(2));
    assert_eq!(source.header.dimension_index_by_name("score"), Some(1));

    let store = ingest(source, 2);
    assert_eq!(store.count(), 2);
    assert_eq!(store.get(1, 1), 2.0);
}

#[test]
fn first_value_decides_header() {
    // A number after a string still rules the header out.
    let source = dataset(json!([["a", 1], ["b", 2]]), SourceOptions::default());
    assert_eq!(source.header.start_index, 0);
    assert_eq!(source.header.dimensions_define, None);

    let source = dataset(json!([["-", null, "x"], [1, 2, 3]]), SourceOptions::default());
    assert_eq!(source.header.start_index, 1);

    let forced = dataset(
        json!([[1, 2], [3, 4], [5, 6]]),
        SourceOptions { source_header: SourceHeaderOption::Rows(2), ..Default::default() },
    );
    assert_eq!(forced.header.start_index, 2);
    assert_eq!(ingest(forced, 2).count(), 1);
}

#[test]
fn duplicate_header_names_are_suffixed() {
    let source = dataset(json!([["a", "a", "b", "a"], [1, 2, 3, 4]]), SourceOptions::default());
    assert_eq!(names(&source), vec![
        Some("a".to_string()),
        Some("a-1".to_string()),
        Some("b".to_string()),
        Some("a-2".to_string()),
    ]);
    let displays: Vec<_> = source.header.dimensions_define.iter().flatten().map(|d| d.display_name.clone()).collect();
    assert_eq!(displays[1].as_deref(), Some("a"));
}

#[test]
fn row_layout_reads_columns_as_rows() {
    let source = dataset(
        json!([["x", 1, 2], ["y", 3, 4]]),
        SourceOptions { series_layout_by: SeriesLayoutBy::Row, ..Default::default() },
    );
    assert_eq!(source.header.start_index, 1);
    assert_eq!(names(&source), vec![Some("x".to_string()), Some("y".to_string())]);
    assert_eq!(source.header.dimensions_detected_count, Some(2));

    let store = ingest(source, 2);
    assert_eq!(store.count(), 2);
    assert_eq!(store.get_values(&[0, 1], 0), vec![1.0, 3.0]);
    assert_eq!(store.get_values(&[0, 1], 1), vec![2.0, 4.0]);
    assert_eq!(store.get_raw_data_item(1), Some(json!([2, 4])));
}

#[test]
fn row_layout_rejects_append() {
    let source = dataset(
        json!([[1, 2], [3, 4]]),
        SourceOptions { series_layout_by: SeriesLayoutBy::Row, ..Default::default() },
    );
    let mut store = ingest(source, 2);
    let err = store.append_data(SourceData::ArrayRows(vec![json!([5, 6])])).unwrap_err();
    assert!(matches!(err, DataError::AppendByRow));
}

#[test]
fn append_requires_the_same_shape() {
    let mut store = ingest(dataset(json!([[1, 2]]), SourceOptions::default()), 2);
    let err = store.append_data(SourceData::ObjectRows(vec![json!({"a": 1})])).unwrap_err();
    assert!(matches!(
        err,
        DataError::AppendFormatMismatch { expected: SourceFormat::ArrayRows, got: SourceFormat::ObjectRows }
    ));
}

#[test]
fn object_rows_take_names_from_keys() {
    let source = dataset(json!([{"x": "a", "y": 1}, {"x": "b", "y": 2}]), SourceOptions::default());
    assert_eq!(source.format(), SourceFormat::ObjectRows);
    assert!(source.retrieves_by_name());
    assert_eq!(names(&source), vec![Some("x".to_string()), Some("y".to_string())]);
    assert_eq!(source.guess_ordinal(0), BeOrdinal::Must);
    assert_eq!(source.guess_ordinal(1), BeOrdinal::Not);
}

#[test]
fn keyed_columns() {
    let source = dataset(json!({"a": [1, 2, 3], "b": [4, 5, 6]}), SourceOptions::default());
    assert_eq!(source.format(), SourceFormat::KeyedColumns);
    assert_eq!(names(&source), vec![Some("a".to_string()), Some("b".to_string())]);

    let mut store = ingest(source, 2);
    assert_eq!(store.count(), 3);
    assert_eq!(store.get(1, 2), 6.0);
    assert_eq!(store.get_raw_data_item(0), Some(json!([1, 4])));

    let mut more = Map::new();
    more.insert("a".into(), json!([7]));
    more.insert("b".into(), json!([8]));
    let range = store.append_data(SourceData::KeyedColumns(more)).expect("append");
    assert_eq!(range, 3..4);
    assert_eq!(store.get_values(&[0, 1], 3), vec![7.0, 8.0]);
}

#[test]
fn keyed_columns_need_names() {
    let mut cols = Map::new();
    cols.insert("a".into(), json!([1]));
    let source = Source::new(
        SourceData::KeyedColumns(cols),
        SourceOptions { dimensions: Some(vec![SourceDimension::named("a"), SourceDimension::default()]), ..Default::default() },
    );
    assert!(matches!(DefaultDataProvider::new(source, None), Err(DataError::KeyedColumnWithoutName(1))));
}

#[test]
fn series_items_in_every_form() {
    let source = Source::from_series_data(vec![json!(5), json!([1, 2]), json!({"value": [3, 4], "name": "c"}), json!(null)]);
    assert_eq!(source.format(), SourceFormat::Original);
    assert_eq!(source.header.dimensions_detected_count, Some(1));

    let store = ingest(source, 2);
    assert_eq!(store.get_values(&[0, 1], 0), vec![5.0, 5.0]);
    assert_eq!(store.get_values(&[0, 1], 1), vec![1.0, 2.0]);
    assert_eq!(store.get_values(&[0, 1], 2), vec![3.0, 4.0]);
    assert!(store.get(0, 3).is_nan());
    assert_eq!(store.get_raw_data_item(2), Some(json!({"value": [3, 4], "name": "c"})));
}

#[test]
fn category_index_getter_reads_data_index() {
    let provider = DefaultDataProvider::from_series_data(vec![json!(10), json!(20), json!(30)]);
    assert_eq!(provider.count(), 3);
    let getter = CategoryIndexGetter { category_dim: 0, inner: SourceValueGetter::Original };
    let mut store = ColumnarStore::new();
    store
        .init_data(
            provider.into_shared(),
            vec![StoreDimension::new(DimensionType::Ordinal), StoreDimension::new(DimensionType::Float)],
            Some(Rc::new(getter)),
        )
        .expect("ingest");
    assert_eq!(store.get_values(&[0, 1], 2), vec![2.0, 30.0]);
    assert_eq!(store.get_data_extent(0), [0.0, 2.0]);
}

#[test]
fn guesses_ordinal_columns() {
    let source = Source::from_series_data(vec![json!(["-", "12", "Mon"]), json!(["a", 3, "Tue"])]);
    assert_eq!(source.guess_ordinal(0), BeOrdinal::Must);
    assert_eq!(source.guess_ordinal(1), BeOrdinal::Might);
    assert_eq!(source.guess_ordinal(2), BeOrdinal::Must);
    assert_eq!(source.guess_ordinal(9), BeOrdinal::Not);

    // Scalar items carry no columns to inspect.
    assert_eq!(Source::from_series_data(vec![json!("a")]).guess_ordinal(0), BeOrdinal::Not);

    let declared = dataset(
        json!([["a", 1]]),
        SourceOptions {
            dimensions: Some(vec![SourceDimension::typed("k", DimensionType::Float), SourceDimension::typed("v", DimensionType::Ordinal)]),
            ..Default::default()
        },
    );
    assert_eq!(declared.guess_ordinal(0), BeOrdinal::Not);
    assert_eq!(declared.guess_ordinal(1), BeOrdinal::Must);
}

#[test]
fn dimension_options_from_json() {
    let dims = dimensions_from_json(&json!(["a", {"name": "b", "type": "int", "displayName": "B"}, null, 5]));
    assert_eq!(dims.len(), 4);
    assert_eq!(dims[0], SourceDimension::named("a"));
    assert_eq!(dims[1].name.as_deref(), Some("b"));
    assert_eq!(dims[1].display_name.as_deref(), Some("B"));
    assert_eq!(dims[1].dim_type, Some(DimensionType::Int));
    assert_eq!(dims[2], SourceDimension::default());
    assert_eq!(dims[3].name.as_deref(), Some("5"));
    assert_eq!(dims[2].dim_type, None);

    let loose = dimensions_from_json(&json!([{"name": "t", "type": "timestamp"}, {"type": "time"}]));
    assert_eq!(loose[0], SourceDimension::named("t"));
    assert_eq!(loose[1].name, None);
    assert_eq!(loose[1].dim_type, Some(DimensionType::Time));
    assert!(dimensions_from_json(&json!("a")).is_empty());
}

#[test]
fn encode_options_from_json() {
    let encode = EncodeDefine::from_json(&json!({"x": 0, "y": [1, "close"], "bad": [true]})).expect("object");
    assert_eq!(encode.get("x"), Some(&[DimensionRef::Index(0)][..]));
    assert_eq!(encode.get("y"), Some(&[DimensionRef::Index(1), DimensionRef::Name("close".into())][..]));
    assert_eq!(encode.get("bad"), Some(&[][..]));
    assert_eq!(encode.get("z"), None);
    assert!(EncodeDefine::from_json(&json!([0])).is_none());

    let replaced = EncodeDefine::new()
        .with("x", vec![DimensionRef::Index(0)])
        .with("x", vec![DimensionRef::Index(2)]);
    assert_eq!(replaced.entries.len(), 1);
    assert_eq!(replaced.get("x"), Some(&[DimensionRef::Index(2)][..]));
}

#[test]
fn dataset_options_from_json() {
    let options = SourceOptions::from_json(&json!({
        "seriesLayoutBy": "row",
        "sourceHeader": false,
        "dimensions": ["x", {"name": "y", "type": "ordinal"}],
        "encode": {"x": 1, "y": "x"}
    }));
    assert_eq!(options.series_layout_by, SeriesLayoutBy::Row);
    assert_eq!(options.source_header, SourceHeaderOption::No);
    let dims = options.dimensions.as_deref().expect("dimensions");
    assert_eq!(dims[1], SourceDimension::typed("y", DimensionType::Ordinal));
    let encode = options.encode.as_ref().expect("encode");
    assert_eq!(encode.get("y"), Some(&[DimensionRef::Name("x".into())][..]));

    let defaults = SourceOptions::from_json(&json!({"seriesLayoutBy": "diagonal", "sourceHeader": 2}));
    assert_eq!(defaults.series_layout_by, SeriesLayoutBy::Column);
    assert_eq!(defaults.source_header, SourceHeaderOption::Rows(2));
    assert!(defaults.dimensions.is_none());
    assert_eq!(SourceHeaderOption::from_json(&json!("auto")), SourceHeaderOption::Auto);
    assert_eq!(SourceHeaderOption::from_json(&json!(true)), SourceHeaderOption::Yes);
}
