// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Runtime database: a vector of [`Table`]s sharing one [`StableIdPool`],
//! plus the migrate operation that moves a contiguous element range between
//! two of its tables while preserving identity.

use crate::row::MigrateArgs;
use crate::stable_id::{
    DatabaseIndex, ElementIndex, ElementLocation, Ref, StableIdError, StableIdPool, StableKey, TableIndex,
};
use crate::table::Table;

/// A database: a shared stable-id pool plus the tables that reference it.
#[derive(Debug)]
pub struct Database {
    db_index: DatabaseIndex,
    pool: StableIdPool,
    tables: Vec<Table>,
}

impl Database {
    /// Creates an empty database whose stable-id pool reserves `pool_reserve`
    /// mapping slots up front.
    pub fn new(db_index: DatabaseIndex, pool_reserve: usize) -> Self {
        Self {
            db_index,
            pool: StableIdPool::new(pool_reserve),
            tables: Vec::new(),
        }
    }

    /// Appends a new, empty table and returns its index.
    pub fn add_table(&mut self) -> TableIndex {
        let index = self.tables.len() as TableIndex;
        self.tables.push(Table::new(index, self.db_index));
        index
    }

    /// Read access to a table by index.
    pub fn table(&self, index: TableIndex) -> &Table {
        &self.tables[index as usize]
    }

    /// Mutable access to a table by index.
    pub fn table_mut(&mut self, index: TableIndex) -> &mut Table {
        &mut self.tables[index as usize]
    }

    /// Read access to the shared stable-id pool.
    pub fn pool(&self) -> &StableIdPool {
        &self.pool
    }

    /// Resolves a versioned reference to its current table/element
    /// location, or `None` if the reference is stale.
    pub fn resolve(&self, r: Ref) -> Option<ElementLocation> {
        self.pool.try_deref(r)
    }

    /// Appends `count` elements to `table`, returning the index of the
    /// first one.
    pub fn add_elements(
        &mut self,
        table: TableIndex,
        count: usize,
        reserved_keys: Option<&[StableKey]>,
    ) -> Result<usize, StableIdError> {
        self.tables[table as usize].add_elements(count, &mut self.pool, reserved_keys)
    }

    /// Grows or shrinks `table` to `new_size`.
    pub fn resize_table(
        &mut self,
        table: TableIndex,
        new_size: usize,
        reserved_keys: Option<&[StableKey]>,
    ) -> Result<(), StableIdError> {
        self.tables[table as usize].resize(new_size, &mut self.pool, reserved_keys)
    }

    /// Removes element `i` of `table`, swapping its last element into place.
    pub fn swap_remove(&mut self, table: TableIndex, i: usize) {
        self.tables[table as usize].swap_remove(i, &mut self.pool);
    }

    /// Moves `count` contiguous elements starting at `from_index` in table
    /// `from` into table `to`, appending them to `to`'s end. Returns the
    /// index of the first migrated element in `to`.
    ///
    /// Destination rows absent from `from` are left default-valued; source
    /// rows absent from `to` are discarded. Stable keys are preserved and
    /// repointed at their new location; this is what lets existing
    /// references keep working across the move.
    #[allow(clippy::unwrap_used)] // indices come from this table's own just-grown stable row
    pub fn migrate(&mut self, from: TableIndex, to: TableIndex, from_index: usize, count: usize) -> usize {
        assert_ne!(from, to, "cannot migrate a table's elements into itself");
        if count == 0 {
            return self.tables[to as usize].size();
        }

        let (from_i, to_i) = (from as usize, to as usize);
        let from_size = self.tables[from_i].size();
        let dst_begin = self.tables[to_i].size();

        let hi = from_i.max(to_i);
        let (left, right) = self.tables.split_at_mut(hi);
        let (from_table, to_table): (&Table, &mut Table) = if from_i < to_i {
            (&left[from_i], &mut right[0])
        } else {
            (&right[0], &mut left[to_i])
        };

        for (ty, row) in to_table.rows_mut() {
            row.resize(dst_begin, dst_begin + count);
            let from_row = from_table.rows().get(ty).map(|b| b.as_ref());
            row.migrate_elements(MigrateArgs {
                from_row,
                from_index,
                count,
                to_index: dst_begin,
            });
        }
        to_table.set_size(dst_begin + count);

        let from_table = &mut self.tables[from_i];
        let stable_ty = from_table.stable_row_type();
        for (ty, row) in from_table.rows_mut() {
            if Some(*ty) == stable_ty {
                continue;
            }
            row.swap_remove(from_index, from_index + count, from_size);
        }

        if stable_ty.is_some() {
            let mut current_size = from_size;
            for idx in from_index..from_index + count {
                let last = current_size - 1;
                if idx != last {
                    let moved = from_table.stable_id_row_mut().swap_one(idx, last);
                    let location = ElementLocation {
                        table_index: from,
                        element_index: idx as ElementIndex,
                        db_index: self.db_index,
                    };
                    self.pool.insert_key(moved, location);
                }
                current_size -= 1;
            }
        }
        self.tables[from_i].set_size(from_size - count);

        let to_table = &self.tables[to_i];
        if to_table.stable_row_type().is_some() {
            let keys: Vec<_> = (0..count)
                .map(|r| to_table.stable_key_at(dst_begin + r).unwrap())
                .collect();
            for (r, key) in keys.into_iter().enumerate() {
                let location = ElementLocation {
                    table_index: to,
                    element_index: (dst_begin + r) as ElementIndex,
                    db_index: self.db_index,
                };
                self.pool.insert_key(key, location);
            }
        }

        dst_begin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plain_row::PlainRow;

    fn setup() -> (Database, TableIndex, TableIndex) {
        let mut db = Database::new(0, 64);
        let a = db.add_table();
        let b = db.add_table();
        db.table_mut(a).add_stable_id_row();
        db.table_mut(a).add_row::<PlainRow<u32>>();
        db.table_mut(b).add_stable_id_row();
        db.table_mut(b).add_row::<PlainRow<u32>>();
        (db, a, b)
    }

    #[test]
    fn migrate_preserves_identity_and_payload() {
        let (mut db, a, b) = setup();
        let first = db.add_elements(a, 4, None).unwrap();
        for i in 0..4 {
            *db.table_mut(a).get_row_mut::<PlainRow<u32>>().unwrap().at_mut(first + i) = (i as u32) * 10;
        }
        let keys: Vec<_> = (0..4).map(|i| db.table(a).stable_key_at(i).unwrap()).collect();

        let dst_begin = db.migrate(a, b, 1, 2);
        assert_eq!(dst_begin, 0);
        assert_eq!(db.table(a).size(), 2);
        assert_eq!(db.table(b).size(), 2);

        // migrated elements (originally indices 1,2) keep their identity and payload.
        for (r, &key) in keys[1..3].iter().enumerate() {
            let loc = db.pool().try_get(key).unwrap();
            assert_eq!(loc.table_index, b);
            assert_eq!(loc.element_index, r as ElementIndex);
            assert_eq!(*db.table(b).get_row::<PlainRow<u32>>().unwrap().at(r), (r as u32 + 1) * 10);
        }

        // remaining elements of `a` (originally 0 and 3) are still resolvable.
        let remaining_loc0 = db.pool().try_get(keys[0]).unwrap();
        assert_eq!(remaining_loc0.table_index, a);
        let remaining_loc3 = db.pool().try_get(keys[3]).unwrap();
        assert_eq!(remaining_loc3.table_index, a);
    }

    #[test]
    fn swap_remove_through_database() {
        let (mut db, a, _b) = setup();
        db.add_elements(a, 3, None).unwrap();
        let last_key = db.table(a).stable_key_at(2).unwrap();
        db.swap_remove(a, 0);
        assert_eq!(db.table(a).size(), 2);
        assert_eq!(db.table(a).stable_key_at(0).unwrap(), last_key);
    }
}
