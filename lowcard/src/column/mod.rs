//! Column representations: plain typed storage, the adaptive-width positions
//! index, the deduplicating dictionary, and the composed low-cardinality
//! column.

pub mod dictionary;
pub mod low_cardinality;
pub mod plain;
pub mod positions;
pub mod unique;

pub use dictionary::DictionaryHolder;
pub use low_cardinality::{DictionaryEncodedColumn, LowCardinalityColumn};
pub use plain::PlainColumn;
pub use positions::{map_unique_index, PositionWidth, PositionsIndex};
pub use unique::UniqueColumn;
