// File: crates/chart-data/src/lib.rs
// Summary: Data layer entry point; exports sources, ordinals, the columnar store, schemas and stacking.

pub mod types;
pub mod error;
pub mod parse;
pub mod ordinal;
pub mod source;
pub mod column;
pub mod provider;
pub mod getter;
pub mod store;
pub mod downsample;
pub mod dimensions;
pub mod schema;
pub mod stack;
pub mod series;
pub mod share;

pub use types::{DimensionType, Extent, ParsedValue, RawValue, SeriesLayoutBy, SourceFormat, VisualDimension};
pub use error::{DataError, Result};
pub use parse::{parse_data_value, parse_date};
pub use ordinal::OrdinalRegistry;
pub use source::{
    detect_source_format, DimensionRef, EncodeDefine, Source, SourceData, SourceDimension, SourceHeaderOption,
    SourceOptions,
};
pub use provider::{DataItem, DataProvider, DefaultDataProvider, SharedProvider};
pub use getter::{CategoryIndexGetter, DimValueGetter, SourceValueGetter};
pub use store::{ColumnarStore, MapValue, StoreDimension};
pub use downsample::{sample_for_pixels, Sampler, SamplingMethod, SamplingOptions};
pub use dimensions::{create_dimensions, prepare_series_data_schema, CoordDimension, SchemaOptions, SeriesDimensionDefine};
pub use schema::{DimensionLayout, SeriesDataSchema, StoreSchema};
pub use stack::{calculate_stack, calculate_stacks, enable_data_stack, StackInfo, StackOptions, StackStrategy};
pub use series::SeriesData;
pub use share::SharedStoreCache;
