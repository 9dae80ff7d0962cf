//! Element data model: `DataType` and `Value`.
//!
//! Values carry the element types a dictionary can hold. Comparison honors a
//! NaN direction hint so sort order matches the surrounding query engine:
//! `nan_direction_hint > 0` sorts NaN (and NULL) after every regular value,
//! `nan_direction_hint < 0` sorts them first.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Element data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    UInt8 = 0,
    UInt16 = 1,
    UInt32 = 2,
    UInt64 = 3,
    Int64 = 4,
    Float64 = 5,
    String = 6,
}

impl DataType {
    pub fn is_unsigned_int(&self) -> bool {
        matches!(
            self,
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
        )
    }

    /// The default value of this type (zero / empty string).
    pub fn default_value(&self) -> Value {
        match self {
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
                Value::UInt64(0)
            }
            DataType::Int64 => Value::Int64(0),
            DataType::Float64 => Value::Float64(0.0),
            DataType::String => Value::String(String::new()),
        }
    }
}

/// A single element value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    UInt64(u64),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value can be stored in a column of `data_type`.
    /// `Null` is accepted by every type; it folds to the default slot.
    pub fn matches_type(&self, data_type: DataType) -> bool {
        match self {
            Value::Null => true,
            Value::UInt64(_) => data_type.is_unsigned_int(),
            Value::Int64(_) => data_type == DataType::Int64,
            Value::Float64(_) => data_type == DataType::Float64,
            Value::String(_) => data_type == DataType::String,
        }
    }

    /// Total order over values of the same type. NULL and NaN are placed
    /// according to `nan_direction_hint` (positive: greatest, negative: least).
    pub fn compare(&self, other: &Value, nan_direction_hint: i32) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => nulls_direction(nan_direction_hint),
            (_, Value::Null) => nulls_direction(nan_direction_hint).reverse(),
            (Value::UInt64(a), Value::UInt64(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => compare_f64(*a, *b, nan_direction_hint),
            (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            // Heterogeneous comparisons only arise from misuse; order by kind.
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::UInt64(_) => 1,
            Value::Int64(_) => 2,
            Value::Float64(_) => 3,
            Value::String(_) => 4,
        }
    }
}

fn nulls_direction(nan_direction_hint: i32) -> Ordering {
    if nan_direction_hint > 0 {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

pub(crate) fn compare_f64(a: f64, b: f64, nan_direction_hint: i32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => nulls_direction(nan_direction_hint),
        (false, true) => nulls_direction(nan_direction_hint).reverse(),
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Decode one serialized value of `data_type` from the front of `bytes`.
/// Returns the value and the number of bytes consumed.
///
/// The layout matches what the column writers emit: fixed-width types as
/// little-endian at their natural width, strings as a u64 length prefix
/// followed by the raw bytes.
pub fn deserialize_value(bytes: &[u8], data_type: DataType) -> Result<(Value, usize)> {
    match data_type {
        DataType::UInt8 => {
            let raw = read_exact(bytes, 0, 1)?;
            Ok((Value::UInt64(raw[0] as u64), 1))
        }
        DataType::UInt16 => {
            let raw = read_exact(bytes, 0, 2)?;
            Ok((Value::UInt64(u16::from_le_bytes([raw[0], raw[1]]) as u64), 2))
        }
        DataType::UInt32 => {
            let raw = read_exact(bytes, 0, 4)?;
            let mut buf = [0u8; 4];
            buf.copy_from_slice(raw);
            Ok((Value::UInt64(u32::from_le_bytes(buf) as u64), 4))
        }
        DataType::UInt64 => {
            let raw = read_exact(bytes, 0, 8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            Ok((Value::UInt64(u64::from_le_bytes(buf)), 8))
        }
        DataType::Int64 => {
            let raw = read_exact(bytes, 0, 8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            Ok((Value::Int64(i64::from_le_bytes(buf)), 8))
        }
        DataType::Float64 => {
            let raw = read_exact(bytes, 0, 8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            Ok((Value::Float64(f64::from_le_bytes(buf)), 8))
        }
        DataType::String => {
            let raw = read_exact(bytes, 0, 8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            let len = u64::from_le_bytes(buf) as usize;
            let data = read_exact(bytes, 8, len)?;
            let text = std::str::from_utf8(data)
                .map_err(|_| Error::IllegalColumn("string value is not valid UTF-8".into()))?;
            Ok((Value::String(text.to_string()), 8 + len))
        }
    }
}

fn read_exact(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    bytes
        .get(offset..offset + len)
        .ok_or_else(|| Error::IllegalColumn("serialized value truncated".into()))
}
