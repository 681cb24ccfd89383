// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! warp-geom: two-dimensional sweep-and-prune broadphase over opaque keys.
//!
//! A [`Broadphase2D`] tracks axis-aligned boxes on two independent sorted
//! axes and reports, per mutation, which unordered pairs of keys started or
//! stopped overlapping on both axes at once.
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

mod axis;
mod broadphase;

/// Two-axis sweep-and-prune broadphase and its gained/lost pair output.
pub use broadphase::Broadphase2D;
