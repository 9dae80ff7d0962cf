//! lowcard — dictionary-encoded column engine for columnar analytics.
//!
//! A low-cardinality column stores each distinct value at most once in a
//! dictionary and represents the row sequence as an array of small unsigned
//! positions into it. The position array adapts its integer width (8 through
//! 64 bits) as the dictionary grows, and a dictionary can be shared between
//! sibling columns until one of them needs to mutate it.

pub mod column;
pub mod data;

// Re-export main types
pub use column::{
    map_unique_index, DictionaryEncodedColumn, DictionaryHolder, LowCardinalityColumn,
    PlainColumn, PositionWidth, PositionsIndex, UniqueColumn,
};
pub use data::{DataType, Value};

/// Column engine error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An internal invariant was violated; indicates a bug in the engine or
    /// its caller.
    #[error("logic error: {0}")]
    LogicError(String),

    /// A caller supplied a column of the wrong shape or type.
    #[error("illegal column: {0}")]
    IllegalColumn(String),

    /// The operation is declared but not supported.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

pub type Result<T> = std::result::Result<T, Error>;
