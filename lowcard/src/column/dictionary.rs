//! Dictionary ownership: exclusively owned or shared between sibling columns.
//!
//! A shared dictionary is immutable; a column must privatize it through
//! `compact` before any mutation. Compaction never touches the shared
//! dictionary itself, it builds a fresh one restricted to the positions the
//! column actually references.

use crate::column::plain::PlainColumn;
use crate::column::positions::{map_unique_index, remap_positions};
use crate::column::unique::UniqueColumn;
use crate::{Error, Result};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DictionaryHolder {
    unique: Arc<UniqueColumn>,
    shared: bool,
}

impl DictionaryHolder {
    /// Exclusively-owned dictionary.
    pub fn new(unique: UniqueColumn) -> Self {
        DictionaryHolder {
            unique: Arc::new(unique),
            shared: false,
        }
    }

    /// Adopt an existing dictionary handle as shared.
    pub fn from_shared(unique: Arc<UniqueColumn>) -> Self {
        DictionaryHolder {
            unique,
            shared: true,
        }
    }

    #[inline]
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn unique(&self) -> &UniqueColumn {
        &self.unique
    }

    /// Handle identity; used to detect columns sharing one dictionary.
    pub fn unique_arc(&self) -> &Arc<UniqueColumn> {
        &self.unique
    }

    /// Mutable access to the dictionary. Illegal while shared: callers must
    /// compact first. An aliased-but-unshared handle (a scatter parent whose
    /// children still hold the Arc) is privatized by copy-on-write.
    pub fn unique_mut(&mut self) -> Result<&mut UniqueColumn> {
        if self.shared {
            return Err(Error::LogicError(
                "cannot mutate a shared dictionary; compact the column first".into(),
            ));
        }
        Ok(Arc::make_mut(&mut self.unique))
    }

    /// Replace the dictionary with `unique` and mark it shared. The owning
    /// column checks emptiness before calling.
    pub fn set_shared(&mut self, unique: Arc<UniqueColumn>) {
        self.unique = unique;
        self.shared = true;
    }

    /// Rebuild a private dictionary containing only the values `positions`
    /// references and rewrite `positions` against it. Always leaves the
    /// holder exclusively owned.
    pub fn compact(&mut self, positions: &mut PlainColumn) -> Result<()> {
        let mut new_unique = self.unique.clone_empty();

        // Distinct old positions in first-seen order, positions rewritten
        // into the compact domain [0, k).
        let keys_index = map_unique_index(positions)?;

        // Carry the referenced values over; NULL identity survives because
        // the gather goes through value_at rather than the raw storage.
        let key_count = keys_index.len();
        let mut inserted = Vec::with_capacity(key_count);
        for i in 0..key_count {
            let old_position = keys_index.get_u64(i)? as usize;
            if old_position >= self.unique.len() {
                return Err(Error::LogicError(format!(
                    "position {old_position} exceeds dictionary size {}",
                    self.unique.len()
                )));
            }
            inserted.push(new_unique.unique_insert(&self.unique.value_at(old_position))?);
        }

        remap_positions(positions, &inserted)?;

        log::debug!(
            "compacted dictionary from {} to {} entries",
            self.unique.len(),
            new_unique.len()
        );
        self.unique = Arc::new(new_unique);
        self.shared = false;
        Ok(())
    }
}
