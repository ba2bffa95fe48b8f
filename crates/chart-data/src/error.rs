// File: crates/chart-data/src/error.rs
// Summary: Error type for structural misuse of the data layer (never raised for bad user values).

use crate::types::SourceFormat;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("append is only allowed on raw data; this store has already been filtered")]
    AppendAfterFilter,

    #[error("cannot append {got:?} data to a {expected:?} source")]
    AppendFormatMismatch { expected: SourceFormat, got: SourceFormat },

    #[error("append is not supported when the series layout is by row")]
    AppendByRow,

    #[error("typed array sources must declare a dimension count")]
    TypedArrayWithoutDimSize,

    #[error("dimension {0} has no property name; object rows are read by property")]
    MissingProperty(usize),

    #[error("keyed column sources need a name for every dimension (dimension {0} has none)")]
    KeyedColumnWithoutName(usize),

    #[error("store has no data provider; call init_data first")]
    NotInitialized,

    #[error("dimension {dim} is out of range (store has {count})")]
    DimensionOutOfRange { dim: usize, count: usize },
}

pub type Result<T, E = DataError> = std::result::Result<T, E>;
