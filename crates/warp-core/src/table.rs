// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Table: a named set of equal-length rows, at most one of which is a
//! stable-id row whose elements are handles into a [`StableIdPool`].

use std::any::{Any, TypeId};

use rustc_hash::FxHashMap;

use crate::plain_row::PlainRow;
use crate::row::{MigrateArgs, Row};
use crate::stable_id::{
    DatabaseIndex, ElementIndex, ElementLocation, StableIdError, StableIdPool, StableKey, TableIndex,
};

/// The distinguished row flavor holding each element's stable handle. A
/// table may have at most one of these; [`Table::resize`] and
/// [`Table::swap_remove`] use it to keep the owning [`StableIdPool`] in sync
/// with each element's physical slot.
#[derive(Debug, Clone, Default)]
pub struct StableIdRow(PlainRow<StableKey>);

impl StableIdRow {
    /// An empty stable-id row.
    pub fn new() -> Self {
        Self(PlainRow::new())
    }

    /// The stable key stored at `index`.
    pub fn at(&self, index: usize) -> StableKey {
        *self.0.at(index)
    }

    /// Mutable access to the stable key stored at `index`.
    pub fn at_mut(&mut self, index: usize) -> &mut StableKey {
        self.0.at_mut(index)
    }

    /// Moves the key at `last` into `idx`, leaving `last`'s slot default.
    /// Returns the key now stored at `idx`. Used when compacting a table
    /// one slot at a time (each physical move needs its own pool fix-up).
    pub(crate) fn swap_one(&mut self, idx: usize, last: usize) -> StableKey {
        let moved = *self.0.at(last);
        *self.0.at_mut(idx) = moved;
        *self.0.at_mut(last) = StableKey::default();
        moved
    }
}

impl Row for StableIdRow {
    fn resize(&mut self, old_size: usize, new_size: usize) {
        self.0.resize(old_size, new_size);
    }

    fn swap_remove(&mut self, begin: usize, end: usize, table_size: usize) {
        self.0.swap_remove(begin, end, table_size);
    }

    fn migrate_elements(&mut self, args: MigrateArgs<'_>) {
        let from = args
            .from_row
            .and_then(|r| r.as_any().downcast_ref::<StableIdRow>());
        for k in 0..args.count {
            let value = from.map_or_else(StableKey::default, |f| f.at(args.from_index + k));
            *self.0.at_mut(args.to_index + k) = value;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A named collection of equal-length rows plus an optional stable-id row.
#[derive(Debug)]
pub struct Table {
    index: TableIndex,
    db_index: DatabaseIndex,
    size: usize,
    rows: FxHashMap<TypeId, Box<dyn Row>>,
    stable_row_type: Option<TypeId>,
}

impl Table {
    pub(crate) fn new(index: TableIndex, db_index: DatabaseIndex) -> Self {
        Self {
            index,
            db_index,
            size: 0,
            rows: FxHashMap::default(),
            stable_row_type: None,
        }
    }

    /// Number of elements currently stored.
    pub fn size(&self) -> usize {
        self.size
    }

    /// This table's index within its owning database.
    pub fn index(&self) -> TableIndex {
        self.index
    }

    pub(crate) fn rows(&self) -> &FxHashMap<TypeId, Box<dyn Row>> {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = (&TypeId, &mut Box<dyn Row>)> {
        self.rows.iter_mut()
    }

    pub(crate) fn set_size(&mut self, new_size: usize) {
        self.size = new_size;
    }

    pub(crate) fn stable_row_type(&self) -> Option<TypeId> {
        self.stable_row_type
    }

    #[allow(clippy::expect_used)] // caller guarantees add_stable_id_row was called first
    pub(crate) fn stable_id_row_mut(&mut self) -> &mut StableIdRow {
        let ty = self.stable_row_type.expect("table has no stable-id row");
        self.rows
            .get_mut(&ty)
            .and_then(|r| r.as_any_mut().downcast_mut())
            .expect("stable-id row type mismatch")
    }

    /// Registers a row of concrete type `R`, growing it to the table's
    /// current size. Panics if a row of that type is already present.
    #[allow(clippy::unwrap_used)] // just inserted under the same key
    pub fn add_row<R: Row + Default + 'static>(&mut self) {
        let ty = TypeId::of::<R>();
        assert!(
            self.rows.insert(ty, Box::<R>::default()).is_none(),
            "row type already registered on this table"
        );
        self.rows.get_mut(&ty).unwrap().resize(0, self.size);
    }

    /// Registers this table's stable-id row. Panics if one is already
    /// present.
    pub fn add_stable_id_row(&mut self) {
        assert!(self.stable_row_type.is_none(), "stable-id row already registered");
        self.add_row::<StableIdRow>();
        self.stable_row_type = Some(TypeId::of::<StableIdRow>());
    }

    /// Read access to a row of concrete type `R`.
    pub fn get_row<R: Row + 'static>(&self) -> Option<&R> {
        self.rows
            .get(&TypeId::of::<R>())
            .and_then(|r| r.as_any().downcast_ref::<R>())
    }

    /// Mutable access to a row of concrete type `R`.
    pub fn get_row_mut<R: Row + 'static>(&mut self) -> Option<&mut R> {
        self.rows
            .get_mut(&TypeId::of::<R>())
            .and_then(|r| r.as_any_mut().downcast_mut::<R>())
    }

    /// The stable key of the element at `index`, if this table has a
    /// stable-id row.
    pub fn stable_key_at(&self, index: usize) -> Option<StableKey> {
        let ty = self.stable_row_type?;
        self.rows
            .get(&ty)
            .and_then(|r| r.as_any().downcast_ref::<StableIdRow>())
            .map(|row| row.at(index))
    }

    fn stable_row(&self) -> Option<&StableIdRow> {
        let ty = self.stable_row_type?;
        self.rows.get(&ty).and_then(|r| r.as_any().downcast_ref())
    }

    fn stable_row_mut(&mut self) -> Option<&mut StableIdRow> {
        let ty = self.stable_row_type?;
        self.rows.get_mut(&ty).and_then(|r| r.as_any_mut().downcast_mut())
    }

    fn location(&self, element_index: usize) -> ElementLocation {
        ElementLocation {
            table_index: self.index,
            element_index: element_index as ElementIndex,
            db_index: self.db_index,
        }
    }

    /// Grows or shrinks the table to `new_size`. Shrinking erases the pool
    /// mapping for every vacated stable-id slot; growing mints (or consumes
    /// from `reserved_keys`, in order) a fresh key per new slot and points
    /// the pool at it.
    #[allow(clippy::unwrap_used)] // stable_row_type.is_some() was just checked
    pub fn resize(
        &mut self,
        new_size: usize,
        pool: &mut StableIdPool,
        reserved_keys: Option<&[StableKey]>,
    ) -> Result<(), StableIdError> {
        let old_size = self.size;
        if new_size < old_size {
            if let Some(stable_row) = self.stable_row() {
                for idx in new_size..old_size {
                    pool.erase_key(stable_row.at(idx));
                }
            }
        }
        for row in self.rows.values_mut() {
            row.resize(old_size, new_size);
        }
        if new_size > old_size {
            if self.stable_row_type.is_some() {
                for idx in old_size..new_size {
                    let key = match reserved_keys.and_then(|r| r.get(idx - old_size)) {
                        Some(&k) => k,
                        None => pool.create_key()?,
                    };
                    let location = self.location(idx);
                    pool.insert_key(key, location);
                    *self.stable_row_mut().unwrap().at_mut(idx) = key;
                }
            }
        }
        self.size = new_size;
        Ok(())
    }

    /// Appends `count` new elements, returning the index of the first one.
    pub fn add_elements(
        &mut self,
        count: usize,
        pool: &mut StableIdPool,
        reserved_keys: Option<&[StableKey]>,
    ) -> Result<usize, StableIdError> {
        let first = self.size;
        self.resize(first + count, pool, reserved_keys)?;
        Ok(first)
    }

    /// Removes element `i`, swapping the table's last element into its
    /// place. Erases the pool mapping for the removed element and repoints
    /// the mapping of whichever element was swapped in.
    pub fn swap_remove(&mut self, i: usize, pool: &mut StableIdPool) {
        let old_size = self.size;
        if let Some(stable_row) = self.stable_row() {
            pool.erase_key(stable_row.at(i));
        }
        for row in self.rows.values_mut() {
            row.swap_remove(i, i + 1, old_size);
        }
        self.size -= 1;
        if i < self.size {
            if let Some(stable_row) = self.stable_row() {
                let moved_key = stable_row.at(i);
                let location = self.location(i);
                pool.insert_key(moved_key, location);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plain_row::PlainRow;

    fn new_table(reserve: usize) -> (Table, StableIdPool) {
        let mut table = Table::new(0, 0);
        table.add_stable_id_row();
        table.add_row::<PlainRow<u32>>();
        (table, StableIdPool::new(reserve))
    }

    #[test]
    fn add_elements_mints_stable_keys() {
        let (mut table, mut pool) = new_table(16);
        let first = table.add_elements(3, &mut pool, None).unwrap();
        assert_eq!(first, 0);
        assert_eq!(table.size(), 3);
        for i in 0..3 {
            let key = table.stable_key_at(i).unwrap();
            let loc = pool.try_get(key).unwrap();
            assert_eq!(loc.element_index, i as ElementIndex);
            assert_eq!(loc.table_index, 0);
        }
    }

    #[test]
    fn swap_remove_fixes_up_moved_mapping() {
        let (mut table, mut pool) = new_table(16);
        table.add_elements(3, &mut pool, None).unwrap();
        let last_key = table.stable_key_at(2).unwrap();
        table.swap_remove(0, &mut pool);
        assert_eq!(table.size(), 2);
        assert_eq!(table.stable_key_at(0).unwrap(), last_key);
        let loc = pool.try_get(last_key).unwrap();
        assert_eq!(loc.element_index, 0);
    }

    #[test]
    fn shrink_erases_vacated_keys() {
        let (mut table, mut pool) = new_table(16);
        table.add_elements(3, &mut pool, None).unwrap();
        let doomed = table.stable_key_at(2).unwrap();
        table.resize(2, &mut pool, None).unwrap();
        assert!(pool.try_get(doomed).is_none());
    }
}
