// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The uniform operations every row flavor implements, plus the argument
//! bundle passed to [`Row::migrate_elements`].

use std::any::Any;
use std::fmt::Debug;

/// Arguments for moving a contiguous run of elements from another row of
/// the same concrete type into `self`.
pub struct MigrateArgs<'a> {
    /// The row elements are migrating from, or `None` if the destination
    /// table has no matching row (the destination range is default-filled
    /// instead).
    pub from_row: Option<&'a dyn Row>,
    /// Index of the first element to migrate in `from_row`.
    pub from_index: usize,
    /// Number of contiguous elements to migrate.
    pub count: usize,
    /// Index of the first destination slot in `self`.
    pub to_index: usize,
}

/// A column of uniformly-typed elements inside a table.
///
/// Rows are heterogeneous but the operations a table needs from them are
/// uniform: resize, swap-remove a range, and migrate elements in from
/// another row. Concrete row types are recovered through [`Row::as_any`]
/// when a caller needs the typed payload.
pub trait Row: Debug {
    /// Grows or shrinks the row from `old_size` to `new_size` elements.
    fn resize(&mut self, old_size: usize, new_size: usize);

    /// Moves the trailing elements of a table sized `table_size` into the
    /// vacated range `[begin, end)`, as part of removing that range.
    fn swap_remove(&mut self, begin: usize, end: usize, table_size: usize);

    /// Moves `args.count` elements starting at `args.from_index` in
    /// `args.from_row` to `[args.to_index, args.to_index + args.count)` in
    /// `self`. If `args.from_row` is `None` or not the same concrete row
    /// type, the destination range is left at its default/unset state.
    fn migrate_elements(&mut self, args: MigrateArgs<'_>);

    /// Type-erased access for downcasting to a concrete row type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable type-erased access for downcasting to a concrete row type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
