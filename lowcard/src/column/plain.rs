//! Plain (fully materialized) column storage.
//!
//! `PlainColumn` is a tagged enum over typed buffers, one variant per storage
//! layout. Strings use the offsets-into-bytes layout: `offsets` starts at `[0]`
//! and has one extra entry per row, `data` holds the concatenated UTF-8 bytes.

use crate::data::{compare_f64, DataType, Value};
use crate::{Error, Result};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum PlainColumn {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
    String { offsets: Vec<u32>, data: Vec<u8> },
}

impl PlainColumn {
    pub fn new(data_type: DataType) -> Self {
        match data_type {
            DataType::UInt8 => PlainColumn::UInt8(Vec::new()),
            DataType::UInt16 => PlainColumn::UInt16(Vec::new()),
            DataType::UInt32 => PlainColumn::UInt32(Vec::new()),
            DataType::UInt64 => PlainColumn::UInt64(Vec::new()),
            DataType::Int64 => PlainColumn::Int64(Vec::new()),
            DataType::Float64 => PlainColumn::Float64(Vec::new()),
            DataType::String => PlainColumn::String {
                offsets: vec![0],
                data: Vec::new(),
            },
        }
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        match self {
            PlainColumn::UInt8(_) => DataType::UInt8,
            PlainColumn::UInt16(_) => DataType::UInt16,
            PlainColumn::UInt32(_) => DataType::UInt32,
            PlainColumn::UInt64(_) => DataType::UInt64,
            PlainColumn::Int64(_) => DataType::Int64,
            PlainColumn::Float64(_) => DataType::Float64,
            PlainColumn::String { .. } => DataType::String,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            PlainColumn::UInt8(v) => v.len(),
            PlainColumn::UInt16(v) => v.len(),
            PlainColumn::UInt32(v) => v.len(),
            PlainColumn::UInt64(v) => v.len(),
            PlainColumn::Int64(v) => v.len(),
            PlainColumn::Float64(v) => v.len(),
            PlainColumn::String { offsets, .. } => offsets.len().saturating_sub(1),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte slice of the string at `row`. Only valid for the `String` variant.
    #[inline]
    pub(crate) fn str_bytes(&self, row: usize) -> &[u8] {
        match self {
            PlainColumn::String { offsets, data } => {
                let start = offsets[row] as usize;
                let end = offsets[row + 1] as usize;
                &data[start..end]
            }
            _ => &[],
        }
    }

    pub fn value_at(&self, row: usize) -> Value {
        match self {
            PlainColumn::UInt8(v) => Value::UInt64(v[row] as u64),
            PlainColumn::UInt16(v) => Value::UInt64(v[row] as u64),
            PlainColumn::UInt32(v) => Value::UInt64(v[row] as u64),
            PlainColumn::UInt64(v) => Value::UInt64(v[row]),
            PlainColumn::Int64(v) => Value::Int64(v[row]),
            PlainColumn::Float64(v) => Value::Float64(v[row]),
            PlainColumn::String { .. } => {
                Value::String(String::from_utf8_lossy(self.str_bytes(row)).into_owned())
            }
        }
    }

    /// Read row `row` as an unsigned integer. Only the unsigned variants
    /// qualify; everything else is an illegal positions column.
    #[inline]
    pub fn get_u64(&self, row: usize) -> Result<u64> {
        match self {
            PlainColumn::UInt8(v) => Ok(v[row] as u64),
            PlainColumn::UInt16(v) => Ok(v[row] as u64),
            PlainColumn::UInt32(v) => Ok(v[row] as u64),
            PlainColumn::UInt64(v) => Ok(v[row]),
            other => Err(Error::IllegalColumn(format!(
                "expected an unsigned integer column, got {:?}",
                other.data_type()
            ))),
        }
    }

    pub fn push_value(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            self.push_default();
            return Ok(());
        }
        match (self, value) {
            (PlainColumn::UInt8(v), Value::UInt64(x)) => {
                if *x > u8::MAX as u64 {
                    return Err(Error::LogicError(format!("value {x} does not fit in UInt8")));
                }
                v.push(*x as u8);
            }
            (PlainColumn::UInt16(v), Value::UInt64(x)) => {
                if *x > u16::MAX as u64 {
                    return Err(Error::LogicError(format!("value {x} does not fit in UInt16")));
                }
                v.push(*x as u16);
            }
            (PlainColumn::UInt32(v), Value::UInt64(x)) => {
                if *x > u32::MAX as u64 {
                    return Err(Error::LogicError(format!("value {x} does not fit in UInt32")));
                }
                v.push(*x as u32);
            }
            (PlainColumn::UInt64(v), Value::UInt64(x)) => v.push(*x),
            (PlainColumn::Int64(v), Value::Int64(x)) => v.push(*x),
            (PlainColumn::Float64(v), Value::Float64(x)) => v.push(*x),
            (PlainColumn::String { offsets, data }, Value::String(s)) => {
                data.extend_from_slice(s.as_bytes());
                offsets.push(data.len() as u32);
            }
            (col, value) => {
                return Err(Error::IllegalColumn(format!(
                    "cannot insert {value:?} into {:?} column",
                    col.data_type()
                )))
            }
        }
        Ok(())
    }

    pub fn push_default(&mut self) {
        match self {
            PlainColumn::UInt8(v) => v.push(0),
            PlainColumn::UInt16(v) => v.push(0),
            PlainColumn::UInt32(v) => v.push(0),
            PlainColumn::UInt64(v) => v.push(0),
            PlainColumn::Int64(v) => v.push(0),
            PlainColumn::Float64(v) => v.push(0.0),
            PlainColumn::String { offsets, data } => offsets.push(data.len() as u32),
        }
    }

    /// Create an empty column with the same type.
    pub fn clone_empty(&self) -> Self {
        PlainColumn::new(self.data_type())
    }

    /// Clone with the row count forced to `new_len`, truncating or
    /// default-extending at the tail.
    pub fn clone_resized(&self, new_len: usize) -> Self {
        let mut out = self.cut(0, new_len.min(self.len()));
        for _ in self.len()..new_len {
            out.push_default();
        }
        out
    }

    /// Extract a contiguous row range `[start, start + length)`, clamped to
    /// the column length.
    pub fn cut(&self, start: usize, length: usize) -> Self {
        let row_count = self.len();
        let s = start.min(row_count);
        let e = (start + length).min(row_count);
        match self {
            PlainColumn::UInt8(v) => PlainColumn::UInt8(v[s..e].to_vec()),
            PlainColumn::UInt16(v) => PlainColumn::UInt16(v[s..e].to_vec()),
            PlainColumn::UInt32(v) => PlainColumn::UInt32(v[s..e].to_vec()),
            PlainColumn::UInt64(v) => PlainColumn::UInt64(v[s..e].to_vec()),
            PlainColumn::Int64(v) => PlainColumn::Int64(v[s..e].to_vec()),
            PlainColumn::Float64(v) => PlainColumn::Float64(v[s..e].to_vec()),
            PlainColumn::String { offsets, data } => {
                if e <= s {
                    return PlainColumn::String {
                        offsets: vec![0],
                        data: Vec::new(),
                    };
                }
                let data_start = offsets[s] as usize;
                let data_end = offsets[e] as usize;
                let base = offsets[s];
                PlainColumn::String {
                    offsets: offsets[s..=e].iter().map(|&o| o - base).collect(),
                    data: data[data_start..data_end].to_vec(),
                }
            }
        }
    }

    /// Gather rows by a positions column: `result[i] = self[positions[i]]`.
    /// `limit == 0` means all of `positions`. Positions must be an unsigned
    /// integer column and in range.
    pub fn index(&self, positions: &PlainColumn, limit: usize) -> Result<PlainColumn> {
        let n = if limit == 0 {
            positions.len()
        } else {
            limit.min(positions.len())
        };
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            let pos = positions.get_u64(i)? as usize;
            if pos >= self.len() {
                return Err(Error::LogicError(format!(
                    "gather position {pos} out of range for column of {} rows",
                    self.len()
                )));
            }
            rows.push(pos);
        }
        Ok(self.gather(&rows))
    }

    /// Rows are assumed in range; callers validate first.
    fn gather(&self, rows: &[usize]) -> PlainColumn {
        match self {
            PlainColumn::UInt8(v) => PlainColumn::UInt8(rows.iter().map(|&r| v[r]).collect()),
            PlainColumn::UInt16(v) => PlainColumn::UInt16(rows.iter().map(|&r| v[r]).collect()),
            PlainColumn::UInt32(v) => PlainColumn::UInt32(rows.iter().map(|&r| v[r]).collect()),
            PlainColumn::UInt64(v) => PlainColumn::UInt64(rows.iter().map(|&r| v[r]).collect()),
            PlainColumn::Int64(v) => PlainColumn::Int64(rows.iter().map(|&r| v[r]).collect()),
            PlainColumn::Float64(v) => PlainColumn::Float64(rows.iter().map(|&r| v[r]).collect()),
            PlainColumn::String { .. } => {
                let mut new_offsets = Vec::with_capacity(rows.len() + 1);
                new_offsets.push(0u32);
                let mut new_data = Vec::new();
                for &row in rows {
                    new_data.extend_from_slice(self.str_bytes(row));
                    new_offsets.push(new_data.len() as u32);
                }
                PlainColumn::String {
                    offsets: new_offsets,
                    data: new_data,
                }
            }
        }
    }

    /// Append rows `[start, start + length)` of `src`, which must have the
    /// same data type.
    pub fn insert_range_from(&mut self, src: &PlainColumn, start: usize, length: usize) -> Result<()> {
        if start + length > src.len() {
            return Err(Error::LogicError(format!(
                "range [{start}, {}) out of bounds for column of {} rows",
                start + length,
                src.len()
            )));
        }
        match (self, src) {
            (PlainColumn::UInt8(dst), PlainColumn::UInt8(s)) => {
                dst.extend_from_slice(&s[start..start + length])
            }
            (PlainColumn::UInt16(dst), PlainColumn::UInt16(s)) => {
                dst.extend_from_slice(&s[start..start + length])
            }
            (PlainColumn::UInt32(dst), PlainColumn::UInt32(s)) => {
                dst.extend_from_slice(&s[start..start + length])
            }
            (PlainColumn::UInt64(dst), PlainColumn::UInt64(s)) => {
                dst.extend_from_slice(&s[start..start + length])
            }
            (PlainColumn::Int64(dst), PlainColumn::Int64(s)) => {
                dst.extend_from_slice(&s[start..start + length])
            }
            (PlainColumn::Float64(dst), PlainColumn::Float64(s)) => {
                dst.extend_from_slice(&s[start..start + length])
            }
            (
                PlainColumn::String { offsets, data },
                PlainColumn::String {
                    offsets: src_offsets,
                    data: src_data,
                },
            ) => {
                let byte_start = src_offsets[start] as usize;
                let byte_end = src_offsets[start + length] as usize;
                let base = *offsets.last().unwrap_or(&0);
                offsets.reserve(length);
                for i in start + 1..=start + length {
                    offsets.push(base + (src_offsets[i] - src_offsets[start]));
                }
                data.extend_from_slice(&src_data[byte_start..byte_end]);
            }
            (dst, src) => {
                return Err(Error::IllegalColumn(format!(
                    "cannot append {:?} rows to {:?} column",
                    src.data_type(),
                    dst.data_type()
                )))
            }
        }
        Ok(())
    }

    /// Partition rows into `num_columns` children: row `i` goes to child
    /// `selector[i]`.
    pub fn scatter(&self, num_columns: usize, selector: &[usize]) -> Result<Vec<PlainColumn>> {
        if selector.len() != self.len() {
            return Err(Error::LogicError(format!(
                "selector has {} entries for a column of {} rows",
                selector.len(),
                self.len()
            )));
        }
        let mut children: Vec<PlainColumn> = (0..num_columns).map(|_| self.clone_empty()).collect();
        let mut rows_per_child: Vec<Vec<usize>> = vec![Vec::new(); num_columns];
        for (row, &child) in selector.iter().enumerate() {
            if child >= num_columns {
                return Err(Error::LogicError(format!(
                    "selector value {child} out of range for {num_columns} children"
                )));
            }
            rows_per_child[child].push(row);
        }
        for (child, rows) in children.iter_mut().zip(&rows_per_child) {
            *child = self.gather(rows);
        }
        Ok(children)
    }

    /// Compare the value at row `n` with row `m` of `rhs`.
    pub fn compare_at(
        &self,
        n: usize,
        m: usize,
        rhs: &PlainColumn,
        nan_direction_hint: i32,
    ) -> Result<Ordering> {
        match (self, rhs) {
            (PlainColumn::UInt8(a), PlainColumn::UInt8(b)) => Ok(a[n].cmp(&b[m])),
            (PlainColumn::UInt16(a), PlainColumn::UInt16(b)) => Ok(a[n].cmp(&b[m])),
            (PlainColumn::UInt32(a), PlainColumn::UInt32(b)) => Ok(a[n].cmp(&b[m])),
            (PlainColumn::UInt64(a), PlainColumn::UInt64(b)) => Ok(a[n].cmp(&b[m])),
            (PlainColumn::Int64(a), PlainColumn::Int64(b)) => Ok(a[n].cmp(&b[m])),
            (PlainColumn::Float64(a), PlainColumn::Float64(b)) => {
                Ok(compare_f64(a[n], b[m], nan_direction_hint))
            }
            (PlainColumn::String { .. }, PlainColumn::String { .. }) => {
                Ok(self.str_bytes(n).cmp(rhs.str_bytes(m)))
            }
            (a, b) => Err(Error::IllegalColumn(format!(
                "cannot compare {:?} column with {:?} column",
                a.data_type(),
                b.data_type()
            ))),
        }
    }

    /// Stable permutation sorting this column ascending (or descending when
    /// `reverse`). `limit == 0` keeps all rows; otherwise the result is
    /// truncated to `limit` entries.
    pub fn get_permutation(&self, reverse: bool, limit: usize, nan_direction_hint: i32) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..self.len()).collect();
        match self {
            PlainColumn::UInt8(v) => perm.sort_by(|&a, &b| ordered(v[a].cmp(&v[b]), reverse)),
            PlainColumn::UInt16(v) => perm.sort_by(|&a, &b| ordered(v[a].cmp(&v[b]), reverse)),
            PlainColumn::UInt32(v) => perm.sort_by(|&a, &b| ordered(v[a].cmp(&v[b]), reverse)),
            PlainColumn::UInt64(v) => perm.sort_by(|&a, &b| ordered(v[a].cmp(&v[b]), reverse)),
            PlainColumn::Int64(v) => perm.sort_by(|&a, &b| ordered(v[a].cmp(&v[b]), reverse)),
            PlainColumn::Float64(v) => perm.sort_by(|&a, &b| {
                ordered(compare_f64(v[a], v[b], nan_direction_hint), reverse)
            }),
            PlainColumn::String { .. } => {
                perm.sort_by(|&a, &b| ordered(self.str_bytes(a).cmp(self.str_bytes(b)), reverse))
            }
        }
        if limit != 0 {
            perm.truncate(limit);
        }
        perm
    }

    /// Expand rows by cumulative run lengths: row `i` is repeated
    /// `offsets[i] - offsets[i - 1]` times. `offsets` must be monotonic with
    /// one entry per row.
    pub fn replicate(&self, offsets: &[usize]) -> Result<PlainColumn> {
        if offsets.len() != self.len() {
            return Err(Error::LogicError(format!(
                "replicate offsets have {} entries for a column of {} rows",
                offsets.len(),
                self.len()
            )));
        }
        let mut rows = Vec::with_capacity(offsets.last().copied().unwrap_or(0));
        let mut prev = 0;
        for (row, &bound) in offsets.iter().enumerate() {
            if bound < prev {
                return Err(Error::LogicError(
                    "replicate offsets must be non-decreasing".into(),
                ));
            }
            for _ in prev..bound {
                rows.push(row);
            }
            prev = bound;
        }
        Ok(self.gather(&rows))
    }

    /// Serialize the value at `row` into `buf`: fixed-width types at their
    /// natural little-endian width, strings as u64 length + bytes.
    pub fn serialize_value_into(&self, row: usize, buf: &mut Vec<u8>) {
        match self {
            PlainColumn::UInt8(v) => buf.push(v[row]),
            PlainColumn::UInt16(v) => buf.extend_from_slice(&v[row].to_le_bytes()),
            PlainColumn::UInt32(v) => buf.extend_from_slice(&v[row].to_le_bytes()),
            PlainColumn::UInt64(v) => buf.extend_from_slice(&v[row].to_le_bytes()),
            PlainColumn::Int64(v) => buf.extend_from_slice(&v[row].to_le_bytes()),
            PlainColumn::Float64(v) => buf.extend_from_slice(&v[row].to_le_bytes()),
            PlainColumn::String { .. } => {
                let bytes = self.str_bytes(row);
                buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
                buf.extend_from_slice(bytes);
            }
        }
    }
}

#[inline]
fn ordered(ord: Ordering, reverse: bool) -> Ordering {
    if reverse {
        ord.reverse()
    } else {
        ord
    }
}
