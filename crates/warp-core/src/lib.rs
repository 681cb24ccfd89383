// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! warp-core: stable-identity table store, sparse/plain rows, and intrusive
//! island graph.
//!
//! A table is a named set of equal-length rows addressed by dense index; at
//! most one row may be a stable-id row, whose elements hold handles into a
//! process-wide [`StableIdPool`]. A [`Database`] owns the pool and the
//! tables that share it, and is the only place that moves elements between
//! tables while keeping those handles valid.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod database;
mod free_list;
mod island;
mod packed_index;
mod pair;
mod plain_row;
mod row;
mod sparse_row;
mod stable_id;
mod table;

/// Runtime database: a stable-id pool shared by a set of tables, plus the
/// migrate operation that moves elements between them.
pub use database::Database;
/// Free-list container: a `Vec<T>` plus a free-index stack.
pub use free_list::{FreeList, FreeOps};
/// Intrusive island graph and its rebuild pass.
pub use island::{Graph, IslandIndex, IslandView, PROPAGATE_ALL, PROPAGATE_NONE};
/// Width-adaptive dense integer array backing the sparse row types.
pub use packed_index::PackedIndexArray;
/// Canonical unordered pair, shared between island edges and broadphase
/// output.
pub use pair::Pair;
/// Dense, default-valued column type.
pub use plain_row::PlainRow;
/// The uniform row interface a table operates on, and its migration
/// argument bundle.
pub use row::{MigrateArgs, Row};
/// Sparse row types: presence-tracked value storage and presence-only flags.
pub use sparse_row::{SparseFlagRow, SparseRow};
/// Stable identity registry: paged mapping pool, handles, and errors.
pub use stable_id::{
    DatabaseIndex, ElementIndex, ElementLocation, Ref, StableIdError, StableIdPool, StableKey, StableVersion,
    TableIndex,
};
/// Table type and its distinguished stable-id row.
pub use table::{StableIdRow, Table};
