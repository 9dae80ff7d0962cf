//! Deduplicating container for dictionary values.
//!
//! Row 0 is reserved: it holds the element type's default value, or stands
//! for NULL when the dictionary is nullable. Deduplication is backed by a
//! hash map from the canonical byte encoding of a value to its position.

use crate::column::plain::PlainColumn;
use crate::data::{deserialize_value, DataType, Value};
use crate::{Error, Result};
use ahash::AHashMap;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct UniqueColumn {
    nested: PlainColumn,
    position_by_key: AHashMap<Vec<u8>, u64>,
    nullable: bool,
}

impl UniqueColumn {
    /// New dictionary containing only the reserved default entry.
    pub fn new(element_type: DataType, nullable: bool) -> Self {
        let mut nested = PlainColumn::new(element_type);
        nested.push_default();
        let mut position_by_key = AHashMap::new();
        if !nullable {
            // The default value deduplicates onto the reserved position.
            position_by_key.insert(dedup_key(&element_type.default_value()), 0);
        }
        UniqueColumn {
            nested,
            position_by_key,
            nullable,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nested.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nested.is_empty()
    }

    pub fn element_type(&self) -> DataType {
        self.nested.data_type()
    }

    /// Whether position 0 stands for NULL rather than the type default.
    pub fn nested_is_nullable(&self) -> bool {
        self.nullable
    }

    /// View of the underlying value storage.
    pub fn nested(&self) -> &PlainColumn {
        &self.nested
    }

    pub fn default_value_index(&self) -> u64 {
        0
    }

    pub fn clone_empty(&self) -> UniqueColumn {
        UniqueColumn::new(self.element_type(), self.nullable)
    }

    pub fn value_at(&self, row: usize) -> Value {
        if self.nullable && row == 0 {
            Value::Null
        } else {
            self.nested.value_at(row)
        }
    }

    /// Insert with deduplication; returns the value's stable position.
    /// NULL always lands on the reserved position 0.
    pub fn unique_insert(&mut self, value: &Value) -> Result<u64> {
        if value.is_null() {
            return Ok(0);
        }
        if !value.matches_type(self.element_type()) {
            return Err(Error::IllegalColumn(format!(
                "cannot insert {value:?} into {:?} dictionary",
                self.element_type()
            )));
        }
        let key = dedup_key(value);
        if let Some(&position) = self.position_by_key.get(&key) {
            return Ok(position);
        }
        let position = self.nested.len() as u64;
        self.nested.push_value(value)?;
        self.position_by_key.insert(key, position);
        Ok(position)
    }

    /// Dedup-insert row `n` of a plain column of the same element type.
    pub fn unique_insert_from(&mut self, src: &PlainColumn, n: usize) -> Result<u64> {
        if src.data_type() != self.element_type() {
            return Err(Error::IllegalColumn(format!(
                "cannot insert from {:?} column into {:?} dictionary",
                src.data_type(),
                self.element_type()
            )));
        }
        self.unique_insert(&src.value_at(n))
    }

    /// Dedup-insert rows `[start, start + length)` of a plain column and
    /// return the positions each row landed on, one per inserted row.
    pub fn unique_insert_range_from(
        &mut self,
        src: &PlainColumn,
        start: usize,
        length: usize,
    ) -> Result<PlainColumn> {
        if src.data_type() != self.element_type() {
            return Err(Error::IllegalColumn(format!(
                "cannot insert from {:?} column into {:?} dictionary",
                src.data_type(),
                self.element_type()
            )));
        }
        if start + length > src.len() {
            return Err(Error::LogicError(format!(
                "range [{start}, {}) out of bounds for column of {} rows",
                start + length,
                src.len()
            )));
        }
        let mut positions = Vec::with_capacity(length);
        for row in start..start + length {
            positions.push(self.unique_insert(&src.value_at(row))?);
        }
        Ok(PlainColumn::UInt64(positions))
    }

    /// Dedup-insert raw bytes as a string value. Only string dictionaries
    /// support byte-level insertion.
    pub fn unique_insert_data(&mut self, bytes: &[u8]) -> Result<u64> {
        if self.element_type() != DataType::String {
            return Err(Error::NotImplemented(format!(
                "raw byte insertion into a {:?} dictionary",
                self.element_type()
            )));
        }
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::IllegalColumn("inserted bytes are not valid UTF-8".into()))?;
        self.unique_insert(&Value::String(text.to_string()))
    }

    /// Serialize the value at `row` into `buf`. Nullable dictionaries write a
    /// leading flag byte; a NULL is the flag alone.
    pub fn serialize_value_into(&self, row: usize, buf: &mut Vec<u8>) {
        if self.nullable {
            if row == 0 {
                buf.push(1);
                return;
            }
            buf.push(0);
        }
        self.nested.serialize_value_into(row, buf);
    }

    /// Decode one serialized value from the front of `bytes`, dedup-insert it,
    /// and return `(position, bytes_consumed)`.
    pub fn unique_deserialize_and_insert(&mut self, bytes: &[u8]) -> Result<(u64, usize)> {
        let mut offset = 0;
        if self.nullable {
            let flag = *bytes
                .first()
                .ok_or_else(|| Error::IllegalColumn("serialized value truncated".into()))?;
            if flag != 0 {
                return Ok((0, 1));
            }
            offset = 1;
        }
        let (value, consumed) = deserialize_value(&bytes[offset..], self.element_type())?;
        let position = self.unique_insert(&value)?;
        Ok((position, offset + consumed))
    }

    /// Compare entry `n` with entry `m` of `other`, NULLs placed per the
    /// direction hint.
    pub fn compare_at(
        &self,
        n: usize,
        m: usize,
        other: &UniqueColumn,
        nan_direction_hint: i32,
    ) -> Result<Ordering> {
        let a_null = self.nullable && n == 0;
        let b_null = other.nullable && m == 0;
        if a_null || b_null {
            return Ok(self
                .value_at(n)
                .compare(&other.value_at(m), nan_direction_hint));
        }
        self.nested
            .compare_at(n, m, &other.nested, nan_direction_hint)
    }

    /// Stable permutation sorting the dictionary entries.
    pub fn get_permutation(&self, reverse: bool, nan_direction_hint: i32) -> Vec<usize> {
        if !self.nullable {
            return self.nested.get_permutation(reverse, 0, nan_direction_hint);
        }
        let mut perm: Vec<usize> = (0..self.len()).collect();
        perm.sort_by(|&a, &b| {
            let ord = self
                .value_at(a)
                .compare(&self.value_at(b), nan_direction_hint);
            if reverse {
                ord.reverse()
            } else {
                ord
            }
        });
        perm
    }
}

/// Canonical byte encoding used as the dedup key.
fn dedup_key(value: &Value) -> Vec<u8> {
    match value {
        Value::Null => Vec::new(),
        Value::UInt64(x) => x.to_le_bytes().to_vec(),
        Value::Int64(x) => x.to_le_bytes().to_vec(),
        Value::Float64(x) => x.to_bits().to_le_bytes().to_vec(),
        Value::String(s) => s.as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_default_entry() {
        let dict = UniqueColumn::new(DataType::String, false);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.default_value_index(), 0);
        assert_eq!(dict.value_at(0), Value::String("".into()));
    }

    #[test]
    fn test_unique_insert_deduplicates() {
        let mut dict = UniqueColumn::new(DataType::String, false);
        let a = dict.unique_insert(&Value::String("a".into())).unwrap();
        let b = dict.unique_insert(&Value::String("b".into())).unwrap();
        let a_again = dict.unique_insert(&Value::String("a".into())).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(a_again, 1);
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn test_default_value_maps_to_reserved_position() {
        let mut dict = UniqueColumn::new(DataType::Int64, false);
        assert_eq!(dict.unique_insert(&Value::Int64(0)).unwrap(), 0);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.unique_insert(&Value::Int64(9)).unwrap(), 1);
    }

    #[test]
    fn test_nullable_reserves_position_for_null() {
        let mut dict = UniqueColumn::new(DataType::String, true);
        assert!(dict.nested_is_nullable());
        assert_eq!(dict.unique_insert(&Value::Null).unwrap(), 0);
        assert_eq!(dict.value_at(0), Value::Null);
        // The empty string is a regular value, distinct from NULL.
        assert_eq!(dict.unique_insert(&Value::String("".into())).unwrap(), 1);
    }

    #[test]
    fn test_type_mismatch_is_illegal() {
        let mut dict = UniqueColumn::new(DataType::String, false);
        assert!(matches!(
            dict.unique_insert(&Value::Int64(1)),
            Err(Error::IllegalColumn(_))
        ));
    }

    #[test]
    fn test_unique_insert_range_from_returns_positions() {
        let mut dict = UniqueColumn::new(DataType::String, false);
        let mut src = PlainColumn::new(DataType::String);
        for s in ["x", "y", "x", "z"] {
            src.push_value(&Value::String(s.into())).unwrap();
        }
        let positions = dict.unique_insert_range_from(&src, 0, 4).unwrap();
        assert_eq!(positions, PlainColumn::UInt64(vec![1, 2, 1, 3]));
        assert_eq!(dict.len(), 4);
    }

    #[test]
    fn test_unique_insert_data() {
        let mut dict = UniqueColumn::new(DataType::String, false);
        let p = dict.unique_insert_data(b"raw").unwrap();
        assert_eq!(dict.value_at(p as usize), Value::String("raw".into()));

        let mut int_dict = UniqueColumn::new(DataType::Int64, false);
        assert!(matches!(
            int_dict.unique_insert_data(b"raw"),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn test_serialize_deserialize_round_trip() {
        let mut dict = UniqueColumn::new(DataType::String, false);
        let p = dict.unique_insert(&Value::String("payload".into())).unwrap();
        let mut buf = Vec::new();
        dict.serialize_value_into(p as usize, &mut buf);

        let mut other = UniqueColumn::new(DataType::String, false);
        let (position, consumed) = other.unique_deserialize_and_insert(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(other.value_at(position as usize), Value::String("payload".into()));
    }

    #[test]
    fn test_serialize_null_round_trip() {
        let dict = UniqueColumn::new(DataType::String, true);
        let mut buf = Vec::new();
        dict.serialize_value_into(0, &mut buf);
        assert_eq!(buf, vec![1]);

        let mut other = UniqueColumn::new(DataType::String, true);
        let (position, consumed) = other.unique_deserialize_and_insert(&buf).unwrap();
        assert_eq!((position, consumed), (0, 1));
    }

    #[test]
    fn test_compare_at_with_nulls() {
        let mut a = UniqueColumn::new(DataType::Int64, true);
        let p = a.unique_insert(&Value::Int64(5)).unwrap() as usize;
        assert_eq!(a.compare_at(0, 0, &a.clone(), 1).unwrap(), Ordering::Equal);
        assert_eq!(a.compare_at(0, p, &a.clone(), 1).unwrap(), Ordering::Greater);
        assert_eq!(a.compare_at(0, p, &a.clone(), -1).unwrap(), Ordering::Less);
    }

    #[test]
    fn test_get_permutation_nullable_orders_null_by_hint() {
        let mut dict = UniqueColumn::new(DataType::Int64, true);
        dict.unique_insert(&Value::Int64(3)).unwrap();
        dict.unique_insert(&Value::Int64(1)).unwrap();
        // Entries: [null, 3, 1]. Nulls last with a positive hint.
        assert_eq!(dict.get_permutation(false, 1), vec![2, 1, 0]);
        // Nulls first with a negative hint.
        assert_eq!(dict.get_permutation(false, -1), vec![0, 2, 1]);
    }
}
