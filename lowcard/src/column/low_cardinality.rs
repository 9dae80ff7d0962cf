//! Dictionary-encoded column: a dictionary of distinct values plus an
//! adaptive-width array of positions into it.
//!
//! Bulk insertion between columns keeps dictionary traffic minimal: when the
//! source shares this column's dictionary only positions move, otherwise only
//! the distinct referenced values cross the dictionary boundary. Mutations on
//! a column with a shared dictionary privatize it first via compaction.

use crate::column::dictionary::DictionaryHolder;
use crate::column::plain::PlainColumn;
use crate::column::positions::{map_unique_index, PositionsIndex};
use crate::column::unique::UniqueColumn;
use crate::data::{DataType, Value};
use crate::{Error, Result};
use std::cmp::Ordering;
use std::sync::Arc;

/// Minimal dictionary-encoded form of a column slice: `keys` holds the
/// distinct referenced values in order of first appearance, `positions`
/// indexes into `keys`.
#[derive(Debug, Clone)]
pub struct DictionaryEncodedColumn {
    pub keys: PlainColumn,
    /// Slot of `keys` standing for NULL, present when the source dictionary
    /// is nullable and the slice references it. The slot holds the type
    /// default in `keys` itself.
    pub null_key_slot: Option<usize>,
    pub positions: PlainColumn,
}

impl DictionaryEncodedColumn {
    /// Key at `slot`, reporting the NULL-bearing slot as `Value::Null`.
    pub fn key_at(&self, slot: usize) -> Value {
        if self.null_key_slot == Some(slot) {
            Value::Null
        } else {
            self.keys.value_at(slot)
        }
    }
}

#[derive(Debug, Clone)]
pub struct LowCardinalityColumn {
    dictionary: DictionaryHolder,
    positions: PositionsIndex,
}

impl LowCardinalityColumn {
    /// Empty column over `element_type`.
    pub fn new(element_type: DataType) -> Self {
        LowCardinalityColumn {
            dictionary: DictionaryHolder::new(UniqueColumn::new(element_type, false)),
            positions: PositionsIndex::new(),
        }
    }

    /// Empty column whose dictionary treats position 0 as NULL.
    pub fn new_nullable(element_type: DataType) -> Self {
        LowCardinalityColumn {
            dictionary: DictionaryHolder::new(UniqueColumn::new(element_type, true)),
            positions: PositionsIndex::new(),
        }
    }

    /// Assemble a column from an existing dictionary and positions buffer.
    pub fn from_parts(dictionary: DictionaryHolder, positions: PositionsIndex) -> Result<Self> {
        let column = LowCardinalityColumn {
            dictionary,
            positions,
        };
        column.check_positions()?;
        Ok(column)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn element_type(&self) -> DataType {
        self.dictionary.unique().element_type()
    }

    pub fn dictionary(&self) -> &UniqueColumn {
        self.dictionary.unique()
    }

    pub fn dictionary_is_shared(&self) -> bool {
        self.dictionary.is_shared()
    }

    pub fn positions(&self) -> &PositionsIndex {
        &self.positions
    }

    pub fn value_at(&self, row: usize) -> Value {
        self.dictionary
            .unique()
            .value_at(self.positions.position_at(row) as usize)
    }

    /// Debug-build invariant: every position addresses a dictionary entry.
    fn check_positions(&self) -> Result<()> {
        if cfg!(debug_assertions) {
            let dictionary_size = self.dictionary.unique().len() as u64;
            for row in 0..self.positions.len() {
                let position = self.positions.position_at(row);
                if position >= dictionary_size {
                    return Err(Error::LogicError(format!(
                        "position {position} at row {row} is not below dictionary size {dictionary_size}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Dedup-insert one value and append its position.
    pub fn insert(&mut self, value: &Value) -> Result<()> {
        self.compact_if_shared()?;
        let position = self.dictionary.unique_mut()?.unique_insert(value)?;
        self.positions.insert_position(position)?;
        self.check_positions()
    }

    /// Append the reserved default position. Never touches the dictionary.
    pub fn insert_default(&mut self) -> Result<()> {
        self.positions
            .insert_position(self.dictionary.unique().default_value_index())
    }

    /// Insert row `n` of another dictionary-encoded column. When the source
    /// shares this column's dictionary only the position is copied.
    pub fn insert_from(&mut self, src: &LowCardinalityColumn, n: usize) -> Result<()> {
        if src.element_type() != self.element_type() {
            return Err(Error::IllegalColumn(format!(
                "cannot insert {:?} rows into {:?} column",
                src.element_type(),
                self.element_type()
            )));
        }
        let position = src.positions.position_at(n);
        if Arc::ptr_eq(self.dictionary.unique_arc(), src.dictionary.unique_arc()) {
            self.positions.insert_position(position)?;
        } else {
            self.compact_if_shared()?;
            let value = src.dictionary.unique().value_at(position as usize);
            let position = self.dictionary.unique_mut()?.unique_insert(&value)?;
            self.positions.insert_position(position)?;
        }
        self.check_positions()
    }

    /// Insert row `n` of a plain (not dictionary-encoded) column.
    pub fn insert_from_full_column(&mut self, src: &PlainColumn, n: usize) -> Result<()> {
        self.compact_if_shared()?;
        let position = self.dictionary.unique_mut()?.unique_insert_from(src, n)?;
        self.positions.insert_position(position)?;
        self.check_positions()
    }

    /// Append rows `[start, start + length)` of another dictionary-encoded
    /// column. The shared-dictionary fast path copies positions directly;
    /// otherwise only the distinct referenced values are merged into this
    /// column's dictionary.
    pub fn insert_range_from(
        &mut self,
        src: &LowCardinalityColumn,
        start: usize,
        length: usize,
    ) -> Result<()> {
        if length == 0 {
            return Ok(());
        }
        if src.element_type() != self.element_type() {
            return Err(Error::IllegalColumn(format!(
                "cannot insert {:?} rows into {:?} column",
                src.element_type(),
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

        if Arc::ptr_eq(self.dictionary.unique_arc(), src.dictionary.unique_arc()) {
            self.positions
                .insert_positions_range(src.positions.positions(), start, length)?;
        } else {
            self.compact_if_shared()?;

            let mut sub_positions = src.positions.positions().cut(start, length);
            let keys_index = map_unique_index(&mut sub_positions)?;

            let key_count = keys_index.len();
            let mut inserted = Vec::with_capacity(key_count);
            {
                let src_unique = src.dictionary.unique();
                let dst_unique = self.dictionary.unique_mut()?;
                for i in 0..key_count {
                    let src_position = keys_index.get_u64(i)? as usize;
                    inserted.push(dst_unique.unique_insert(&src_unique.value_at(src_position))?);
                }
            }

            for row in 0..sub_positions.len() {
                let compact_position = sub_positions.get_u64(row)? as usize;
                self.positions.insert_position(inserted[compact_position])?;
            }
        }
        self.check_positions()
    }

    /// Dedup-insert a range of raw values and append the resulting positions.
    pub fn insert_range_from_full_column(
        &mut self,
        src: &PlainColumn,
        start: usize,
        length: usize,
    ) -> Result<()> {
        self.compact_if_shared()?;
        let inserted = self
            .dictionary
            .unique_mut()?
            .unique_insert_range_from(src, start, length)?;
        for row in 0..inserted.len() {
            self.positions.insert_position(inserted.get_u64(row)?)?;
        }
        self.check_positions()
    }

    /// Insert a foreign dictionary-encoded slice: dedup-insert `keys` and
    /// compose the resulting mapping with the supplied `positions`.
    pub fn insert_range_from_dictionary_encoded_column(
        &mut self,
        keys: &PlainColumn,
        positions: &PlainColumn,
    ) -> Result<()> {
        // Precondition: the supplied positions must form a valid index into
        // the supplied keys.
        let key_count = keys.len() as u64;
        for row in 0..positions.len() {
            let position = positions.get_u64(row)?;
            if position >= key_count {
                return Err(Error::LogicError(format!(
                    "supplied position {position} is not below key count {key_count}"
                )));
            }
        }

        self.compact_if_shared()?;
        let inserted = self
            .dictionary
            .unique_mut()?
            .unique_insert_range_from(keys, 0, keys.len())?;
        for row in 0..positions.len() {
            let key_slot = positions.get_u64(row)? as usize;
            self.positions.insert_position(inserted.get_u64(key_slot)?)?;
        }
        self.check_positions()
    }

    /// Dedup-insert raw bytes (string dictionaries only).
    pub fn insert_data(&mut self, bytes: &[u8]) -> Result<()> {
        self.compact_if_shared()?;
        let position = self.dictionary.unique_mut()?.unique_insert_data(bytes)?;
        self.positions.insert_position(position)?;
        self.check_positions()
    }

    /// Serialize the value at `row` through the dictionary.
    pub fn serialize_value_into(&self, row: usize, buf: &mut Vec<u8>) {
        self.dictionary
            .unique()
            .serialize_value_into(self.positions.position_at(row) as usize, buf);
    }

    /// Decode one serialized value, insert it, and return the bytes consumed.
    pub fn deserialize_and_insert(&mut self, bytes: &[u8]) -> Result<usize> {
        self.compact_if_shared()?;
        let (position, consumed) = self
            .dictionary
            .unique_mut()?
            .unique_deserialize_and_insert(bytes)?;
        self.positions.insert_position(position)?;
        self.check_positions()?;
        Ok(consumed)
    }

    /// Compare the value at row `n` with row `m` of `rhs` through the two
    /// dictionaries.
    pub fn compare_at(
        &self,
        n: usize,
        m: usize,
        rhs: &LowCardinalityColumn,
        nan_direction_hint: i32,
    ) -> Result<Ordering> {
        let n_position = self.positions.position_at(n) as usize;
        let m_position = rhs.positions.position_at(m) as usize;
        self.dictionary.unique().compare_at(
            n_position,
            m_position,
            rhs.dictionary.unique(),
            nan_direction_hint,
        )
    }

    /// Permutation sorting the column: sort the dictionary once, then emit
    /// row buckets in dictionary order. Ties keep the original row order.
    pub fn get_permutation(
        &self,
        reverse: bool,
        limit: usize,
        nan_direction_hint: i32,
    ) -> Vec<usize> {
        let limit = if limit == 0 { self.len() } else { limit };

        let dictionary = self.dictionary.unique();
        let dictionary_perm = dictionary.get_permutation(reverse, nan_direction_hint);

        let mut rows_per_entry: Vec<Vec<usize>> = vec![Vec::new(); dictionary.len()];
        for row in 0..self.len() {
            rows_per_entry[self.positions.position_at(row) as usize].push(row);
        }

        let perm_size = self.len().min(limit);
        let mut result = Vec::with_capacity(perm_size);
        'outer: for &entry in &dictionary_perm {
            for &row in &rows_per_entry[entry] {
                result.push(row);
                if result.len() == perm_size {
                    break 'outer;
                }
            }
        }
        result
    }

    /// Partition rows into `num_columns` children by `selector`. Every child
    /// shares this column's dictionary.
    pub fn scatter(
        &self,
        num_columns: usize,
        selector: &[usize],
    ) -> Result<Vec<LowCardinalityColumn>> {
        let parts = self.positions.positions().scatter(num_columns, selector)?;
        let mut children = Vec::with_capacity(parts.len());
        for part in parts {
            children.push(LowCardinalityColumn {
                dictionary: DictionaryHolder::from_shared(Arc::clone(self.dictionary.unique_arc())),
                positions: PositionsIndex::from_column(part)?,
            });
        }
        Ok(children)
    }

    /// Install a shared dictionary. Only legal on an empty column.
    pub fn set_shared_dictionary(&mut self, unique: Arc<UniqueColumn>) -> Result<()> {
        if !self.is_empty() {
            return Err(Error::LogicError(
                "cannot set a shared dictionary on a non-empty column".into(),
            ));
        }
        if unique.element_type() != self.element_type() {
            return Err(Error::IllegalColumn(format!(
                "shared dictionary holds {:?}, column holds {:?}",
                unique.element_type(),
                self.element_type()
            )));
        }
        self.dictionary.set_shared(unique);
        Ok(())
    }

    /// Slice rows `[start, start + length)` into a new column owning a
    /// minimal private dictionary.
    pub fn cut_and_compact(&self, start: usize, length: usize) -> Result<LowCardinalityColumn> {
        if start + length > self.len() {
            return Err(Error::LogicError(format!(
                "range [{start}, {}) out of bounds for column of {} rows",
                start + length,
                self.len()
            )));
        }
        let sub_positions = self.positions.positions().cut(start, length);
        // Share the dictionary for the moment; compaction replaces it.
        let mut column = LowCardinalityColumn {
            dictionary: DictionaryHolder::from_shared(Arc::clone(self.dictionary.unique_arc())),
            positions: PositionsIndex::from_column(sub_positions)?,
        };
        column.compact_inplace()?;
        Ok(column)
    }

    /// Rebuild the dictionary to contain only referenced values.
    pub fn compact_inplace(&mut self) -> Result<()> {
        let mut positions = self.positions.detach_positions();
        let compacted = self.dictionary.compact(&mut positions);
        // Reattach even when compaction failed so the column stays whole.
        self.positions.attach_positions(positions)?;
        compacted?;
        self.check_positions()
    }

    pub fn compact_if_shared(&mut self) -> Result<()> {
        if self.dictionary.is_shared() {
            self.compact_inplace()?;
        }
        Ok(())
    }

    /// Minimal dictionary-encoded form of rows `[offset, offset + limit)`:
    /// distinct referenced values in first-appearance order plus rewritten
    /// small-domain positions.
    pub fn get_minimal_dictionary_encoded_column(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<DictionaryEncodedColumn> {
        if offset + limit > self.len() {
            return Err(Error::LogicError(format!(
                "range [{offset}, {}) out of bounds for column of {} rows",
                offset + limit,
                self.len()
            )));
        }
        let mut sub_positions = self.positions.positions().cut(offset, limit);
        let keys_index = map_unique_index(&mut sub_positions)?;

        // Gather through value_at so a referenced NULL keeps its identity
        // instead of reading back as the raw default.
        let unique = self.dictionary.unique();
        let mut keys = unique.nested().clone_empty();
        let mut null_key_slot = None;
        for slot in 0..keys_index.len() {
            let old_position = keys_index.get_u64(slot)? as usize;
            if old_position >= unique.len() {
                return Err(Error::LogicError(format!(
                    "position {old_position} exceeds dictionary size {}",
                    unique.len()
                )));
            }
            let value = unique.value_at(old_position);
            if value.is_null() {
                null_key_slot = Some(slot);
            }
            // NULL lands on the slot as the type default; the slot is marked.
            keys.push_value(&value)?;
        }

        Ok(DictionaryEncodedColumn {
            keys,
            null_key_slot,
            positions: sub_positions,
        })
    }

    /// Per-dictionary-entry reference counts.
    pub fn count_keys(&self) -> Result<Vec<u64>> {
        let mut counts = vec![0u64; self.dictionary.unique().len()];
        self.positions.count_keys(&mut counts)?;
        Ok(counts)
    }

    /// True iff the dictionary admits NULL and some row references it.
    pub fn contains_null(&self) -> bool {
        self.dictionary.unique().nested_is_nullable() && self.positions.contains_default()
    }

    /// Cheap clone at a new length: the dictionary is shared, positions are
    /// truncated or zero-extended. Resizing to zero drops the dictionary.
    pub fn clone_resized(&self, new_len: usize) -> LowCardinalityColumn {
        if new_len == 0 {
            return LowCardinalityColumn {
                dictionary: DictionaryHolder::new(self.dictionary.unique().clone_empty()),
                positions: PositionsIndex::new(),
            };
        }
        LowCardinalityColumn {
            dictionary: DictionaryHolder::from_shared(Arc::clone(self.dictionary.unique_arc())),
            positions: self.positions.clone_resized(new_len),
        }
    }

    pub fn clone_empty(&self) -> LowCardinalityColumn {
        LowCardinalityColumn {
            dictionary: DictionaryHolder::new(self.dictionary.unique().clone_empty()),
            positions: PositionsIndex::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::positions::PositionWidth;

    fn string_value(s: &str) -> Value {
        Value::String(s.to_string())
    }

    fn column_of(values: &[&str]) -> LowCardinalityColumn {
        let mut column = LowCardinalityColumn::new(DataType::String);
        for v in values {
            column.insert(&string_value(v)).unwrap();
        }
        column
    }

    fn collect(column: &LowCardinalityColumn) -> Vec<Value> {
        (0..column.len()).map(|row| column.value_at(row)).collect()
    }

    #[test]
    fn test_basic_dedup() {
        let column = column_of(&["a", "b", "a", "c", "b", "a"]);
        // Default entry plus three distinct values.
        assert_eq!(column.dictionary().len(), 4);
        let positions: Vec<u64> = (0..column.len())
            .map(|r| column.positions().position_at(r))
            .collect();
        assert_eq!(positions, vec![1, 2, 1, 3, 2, 1]);
        assert_eq!(column.positions().width(), PositionWidth::W8);
        assert_eq!(
            collect(&column),
            ["a", "b", "a", "c", "b", "a"]
                .iter()
                .map(|s| string_value(s))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_width_growth_with_many_distinct_values() {
        let mut column = LowCardinalityColumn::new(DataType::Int64);
        for i in 0..300 {
            column.insert(&Value::Int64(i)).unwrap();
        }
        assert_eq!(column.len(), 300);
        // Value 0 dedups onto the reserved default entry, so 1..=299 are new.
        assert_eq!(column.dictionary().len(), 300);
        assert_eq!(column.positions().width(), PositionWidth::W16);
        assert_eq!(column.value_at(299), Value::Int64(299));
    }

    #[test]
    fn test_insert_default_never_compacts() {
        let shared = Arc::new({
            let mut dict = UniqueColumn::new(DataType::String, false);
            dict.unique_insert(&string_value("x")).unwrap();
            dict
        });
        let mut column = LowCardinalityColumn::new(DataType::String);
        column.set_shared_dictionary(Arc::clone(&shared)).unwrap();

        column.insert_default().unwrap();
        assert!(column.dictionary_is_shared());
        assert_eq!(column.value_at(0), string_value(""));
    }

    #[test]
    fn test_mutation_privatizes_shared_dictionary() {
        let shared = Arc::new({
            let mut dict = UniqueColumn::new(DataType::String, false);
            dict.unique_insert(&string_value("x")).unwrap();
            dict.unique_insert(&string_value("y")).unwrap();
            dict
        });
        let mut column = LowCardinalityColumn::new(DataType::String);
        column.set_shared_dictionary(Arc::clone(&shared)).unwrap();
        assert!(column.dictionary_is_shared());

        column.insert(&string_value("z")).unwrap();
        assert!(!column.dictionary_is_shared());
        assert_eq!(column.value_at(0), string_value("z"));
        // The shared dictionary never saw "z".
        assert_eq!(shared.len(), 3);
    }

    #[test]
    fn test_set_shared_dictionary_requires_empty_column() {
        let shared = Arc::new(UniqueColumn::new(DataType::String, false));
        let mut column = column_of(&["a"]);
        assert!(matches!(
            column.set_shared_dictionary(shared),
            Err(Error::LogicError(_))
        ));
    }

    #[test]
    fn test_set_shared_dictionary_type_mismatch() {
        let shared = Arc::new(UniqueColumn::new(DataType::Int64, false));
        let mut column = LowCardinalityColumn::new(DataType::String);
        assert!(matches!(
            column.set_shared_dictionary(shared),
            Err(Error::IllegalColumn(_))
        ));
    }

    #[test]
    fn test_insert_from_shared_dictionary_copies_position_only() {
        let source = column_of(&["x", "y", "z"]);
        let children = source.scatter(1, &[0, 0, 0]).unwrap();
        let mut sibling = children.into_iter().next().unwrap();

        // Same Arc on both sides: the fast path must not compact.
        sibling.insert_from(&source, 2).unwrap();
        assert!(sibling.dictionary_is_shared());
        assert_eq!(sibling.value_at(3), string_value("z"));
    }

    #[test]
    fn test_insert_from_foreign_dictionary_merges_value() {
        let source = column_of(&["p", "q"]);
        let mut column = column_of(&["a"]);
        column.insert_from(&source, 1).unwrap();
        assert_eq!(collect(&column), vec![string_value("a"), string_value("q")]);
        // "q" went through dedup-insert into the private dictionary.
        assert_eq!(column.dictionary().len(), 3);
    }

    #[test]
    fn test_insert_range_from_merges_only_referenced_values() {
        let source = column_of(&["k1", "k2", "k3", "k2", "k1"]);
        let mut column = column_of(&["a"]);

        column.insert_range_from(&source, 1, 3).unwrap();

        assert_eq!(
            collect(&column),
            vec![
                string_value("a"),
                string_value("k2"),
                string_value("k3"),
                string_value("k2"),
            ]
        );
        // Default + "a" + "k2" + "k3"; "k1" never crossed the boundary.
        assert_eq!(column.dictionary().len(), 4);
    }

    #[test]
    fn test_insert_range_from_zero_length_is_noop() {
        let source = column_of(&["x"]);
        let shared = Arc::new({
            let mut dict = UniqueColumn::new(DataType::String, false);
            dict.unique_insert(&string_value("x")).unwrap();
            dict
        });
        let mut column = LowCardinalityColumn::new(DataType::String);
        column.set_shared_dictionary(shared).unwrap();

        column.insert_range_from(&source, 0, 0).unwrap();
        // No rows, no compaction.
        assert!(column.dictionary_is_shared());
        assert!(column.is_empty());
    }

    #[test]
    fn test_insert_range_from_self_doubles_sequence() {
        let mut column = column_of(&["a", "b", "a", "c"]);
        let snapshot = column.clone();
        column.insert_range_from(&snapshot, 0, snapshot.len()).unwrap();

        let mut expected = collect(&snapshot);
        expected.extend(collect(&snapshot));
        assert_eq!(collect(&column), expected);
    }

    #[test]
    fn test_insert_range_from_full_column() {
        let mut src = PlainColumn::new(DataType::String);
        for s in ["m", "n", "m"] {
            src.push_value(&string_value(s)).unwrap();
        }
        let mut column = LowCardinalityColumn::new(DataType::String);
        column.insert_range_from_full_column(&src, 0, 3).unwrap();

        assert_eq!(
            collect(&column),
            vec![string_value("m"), string_value("n"), string_value("m")]
        );
        assert_eq!(column.dictionary().len(), 3);
    }

    #[test]
    fn test_insert_range_from_dictionary_encoded() {
        let mut keys = PlainColumn::new(DataType::String);
        for s in ["u", "v"] {
            keys.push_value(&string_value(s)).unwrap();
        }
        let positions = PlainColumn::UInt8(vec![1, 0, 1, 1]);

        let mut column = column_of(&["v"]);
        column
            .insert_range_from_dictionary_encoded_column(&keys, &positions)
            .unwrap();

        assert_eq!(
            collect(&column),
            vec![
                string_value("v"),
                string_value("v"),
                string_value("u"),
                string_value("v"),
                string_value("v"),
            ]
        );
    }

    #[test]
    fn test_insert_range_from_dictionary_encoded_validates_bounds() {
        let mut keys = PlainColumn::new(DataType::String);
        keys.push_value(&string_value("u")).unwrap();
        let positions = PlainColumn::UInt8(vec![0, 1]);

        let mut column = LowCardinalityColumn::new(DataType::String);
        let err = column.insert_range_from_dictionary_encoded_column(&keys, &positions);
        assert!(matches!(err, Err(Error::LogicError(_))));
        // Failed before any observable mutation.
        assert!(column.is_empty());
        assert_eq!(column.dictionary().len(), 1);
    }

    #[test]
    fn test_scatter_children_share_dictionary() {
        let column = column_of(&["x", "y", "z", "x"]);
        let children = column.scatter(2, &[0, 1, 0, 1]).unwrap();
        assert_eq!(children.len(), 2);

        assert!(children[0].dictionary_is_shared());
        assert!(children[1].dictionary_is_shared());
        assert!(Arc::ptr_eq(
            children[0].dictionary.unique_arc(),
            children[1].dictionary.unique_arc()
        ));
        assert_eq!(
            collect(&children[0]),
            vec![string_value("x"), string_value("z")]
        );
        assert_eq!(
            collect(&children[1]),
            vec![string_value("y"), string_value("x")]
        );
    }

    #[test]
    fn test_compact_inplace_shrinks_dictionary() {
        let source = column_of(&["a", "b", "c", "d"]);
        let children = source.scatter(2, &[0, 1, 1, 0]).unwrap();
        let mut child = children.into_iter().next().unwrap();
        // Child references "a" and "d" out of a five-entry dictionary.
        assert_eq!(child.dictionary().len(), 5);

        child.compact_inplace().unwrap();

        assert!(!child.dictionary_is_shared());
        // Default + "a" + "d".
        assert_eq!(child.dictionary().len(), 3);
        assert_eq!(collect(&child), vec![string_value("a"), string_value("d")]);

        let counts = child.count_keys().unwrap();
        // Every non-default entry is referenced.
        assert!(counts[1..].iter().all(|&c| c > 0));
    }

    #[test]
    fn test_cut_and_compact_owns_minimal_dictionary() {
        let column = column_of(&["a", "b", "c", "b"]);
        let cut = column.cut_and_compact(1, 2).unwrap();

        assert!(!cut.dictionary_is_shared());
        assert_eq!(collect(&cut), vec![string_value("b"), string_value("c")]);
        // Default + "b" + "c".
        assert_eq!(cut.dictionary().len(), 3);

        assert!(column.cut_and_compact(3, 2).is_err());
    }

    #[test]
    fn test_minimal_dictionary_encoded_round_trip() {
        let values = ["a", "b", "a", "c", "b", "a"];
        let column = column_of(&values);
        let encoded = column
            .get_minimal_dictionary_encoded_column(0, column.len())
            .unwrap();

        assert_eq!(encoded.keys.len(), 3);
        assert_eq!(encoded.null_key_slot, None);
        for (i, expected) in values.iter().enumerate() {
            let slot = encoded.positions.get_u64(i).unwrap() as usize;
            assert_eq!(encoded.key_at(slot), string_value(expected));
        }
    }

    #[test]
    fn test_minimal_dictionary_encoded_preserves_null() {
        let mut column = LowCardinalityColumn::new_nullable(DataType::String);
        column.insert(&string_value("v1")).unwrap();
        column.insert(&Value::Null).unwrap();
        column.insert(&string_value("v2")).unwrap();

        let encoded = column.get_minimal_dictionary_encoded_column(0, 3).unwrap();
        assert_eq!(encoded.keys.len(), 3);
        assert_eq!(encoded.null_key_slot, Some(1));

        let expected = [string_value("v1"), Value::Null, string_value("v2")];
        for (i, expected) in expected.iter().enumerate() {
            let slot = encoded.positions.get_u64(i).unwrap() as usize;
            assert_eq!(&encoded.key_at(slot), expected);
        }

        // A slice that skips the NULL row carries no NULL slot.
        let encoded = column.get_minimal_dictionary_encoded_column(2, 1).unwrap();
        assert_eq!(encoded.null_key_slot, None);
        assert_eq!(encoded.key_at(0), string_value("v2"));
    }

    #[test]
    fn test_minimal_dictionary_encoded_subrange() {
        let column = column_of(&["a", "b", "c", "d"]);
        let encoded = column.get_minimal_dictionary_encoded_column(1, 2).unwrap();
        assert_eq!(encoded.keys.len(), 2);
        assert_eq!(encoded.positions.len(), 2);
        assert_eq!(encoded.keys.value_at(0), string_value("b"));
        assert_eq!(encoded.keys.value_at(1), string_value("c"));
    }

    #[test]
    fn test_sparse_remap_through_shared_dictionary() {
        // A big shared dictionary referenced at two sparse positions forces
        // the hash-map remap inside the minimal encoding.
        let mut dict = UniqueColumn::new(DataType::Int64, false);
        for i in 0..1000 {
            dict.unique_insert(&Value::Int64(i)).unwrap();
        }
        // Zero dedups onto the reserved default, so position p holds value p.
        assert_eq!(dict.len(), 1000);
        let dict = Arc::new(dict);

        let mut positions = PositionsIndex::new();
        for p in [500u64, 999, 500] {
            positions.insert_position(p).unwrap();
        }
        let column =
            LowCardinalityColumn::from_parts(DictionaryHolder::from_shared(dict), positions)
                .unwrap();

        let encoded = column.get_minimal_dictionary_encoded_column(0, 3).unwrap();
        assert_eq!(encoded.keys.len(), 2);
        // First-seen order is pinned.
        assert_eq!(encoded.keys.value_at(0), Value::Int64(500));
        assert_eq!(encoded.keys.value_at(1), Value::Int64(999));
        assert_eq!(encoded.positions, PlainColumn::UInt16(vec![0, 1, 0]));
    }

    #[test]
    fn test_compare_at_across_columns() {
        let a = column_of(&["apple", "pear"]);
        let b = column_of(&["banana"]);
        assert_eq!(a.compare_at(0, 0, &b, 1).unwrap(), Ordering::Less);
        assert_eq!(a.compare_at(1, 0, &b, 1).unwrap(), Ordering::Greater);
        assert_eq!(a.compare_at(0, 0, &a.clone(), 1).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_get_permutation_sorts_with_stable_ties() {
        let column = column_of(&["b", "a", "c", "a", "b"]);
        assert_eq!(column.get_permutation(false, 0, 1), vec![1, 3, 0, 4, 2]);
        assert_eq!(column.get_permutation(true, 0, 1), vec![2, 0, 4, 1, 3]);
        assert_eq!(column.get_permutation(false, 3, 1), vec![1, 3, 0]);
    }

    #[test]
    fn test_clone_resized() {
        let column = column_of(&["a", "b", "c"]);

        let truncated = column.clone_resized(2);
        assert!(truncated.dictionary_is_shared());
        assert_eq!(collect(&truncated), vec![string_value("a"), string_value("b")]);

        let extended = column.clone_resized(5);
        assert_eq!(extended.len(), 5);
        // Zero-extended rows read the default value.
        assert_eq!(extended.value_at(4), string_value(""));

        let empty = column.clone_resized(0);
        assert!(empty.is_empty());
        assert!(!empty.dictionary_is_shared());
        assert_eq!(empty.dictionary().len(), 1);
    }

    #[test]
    fn test_count_keys() {
        let column = column_of(&["a", "b", "a"]);
        assert_eq!(column.count_keys().unwrap(), vec![0, 2, 1]);

        let empty = LowCardinalityColumn::new(DataType::String);
        assert_eq!(empty.count_keys().unwrap(), vec![0]);
    }

    #[test]
    fn test_contains_null() {
        let mut column = LowCardinalityColumn::new_nullable(DataType::String);
        column.insert(&string_value("v1")).unwrap();
        column.insert(&Value::Null).unwrap();
        column.insert(&string_value("v2")).unwrap();
        assert!(column.contains_null());
        assert_eq!(column.value_at(1), Value::Null);

        // Drop the null-referencing row; the null flag must clear.
        let without_null = column.cut_and_compact(2, 1).unwrap();
        assert!(!without_null.contains_null());

        // A non-nullable dictionary never reports nulls, even at position 0.
        let mut plain = LowCardinalityColumn::new(DataType::String);
        plain.insert_default().unwrap();
        assert!(!plain.contains_null());
    }

    #[test]
    fn test_serialize_deserialize_through_dictionary() {
        let column = column_of(&["alpha", "beta"]);
        let mut buf = Vec::new();
        column.serialize_value_into(1, &mut buf);

        let mut target = LowCardinalityColumn::new(DataType::String);
        let consumed = target.deserialize_and_insert(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(target.value_at(0), string_value("beta"));
    }

    #[test]
    fn test_insert_data() {
        let mut column = LowCardinalityColumn::new(DataType::String);
        column.insert_data(b"bytes").unwrap();
        column.insert_data(b"bytes").unwrap();
        assert_eq!(column.dictionary().len(), 2);
        assert_eq!(column.value_at(1), string_value("bytes"));
    }

    #[test]
    fn test_invariants_across_mixed_operations() {
        let mut column = LowCardinalityColumn::new(DataType::String);
        let mut widths = Vec::new();
        for i in 0..400 {
            if i % 7 == 0 {
                column.insert_default().unwrap();
            } else {
                column.insert(&string_value(&format!("value-{i}"))).unwrap();
            }
            widths.push(column.positions().width());
        }
        let other = column_of(&["value-1", "other"]);
        column.insert_range_from(&other, 0, 2).unwrap();

        // Positions always address the dictionary.
        let dictionary_size = column.dictionary().len() as u64;
        let mut max_position = 0;
        for row in 0..column.len() {
            let position = column.positions().position_at(row);
            assert!(position < dictionary_size);
            max_position = max_position.max(position);
        }
        // The width is minimal for the maximum position and grew monotonically.
        assert!(max_position > u8::MAX as u64);
        assert_eq!(column.positions().width(), PositionWidth::W16);
        assert!(widths.windows(2).all(|w| w[0] <= w[1]));
    }
}
