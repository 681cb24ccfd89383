// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! warp-input: a guarded state machine for turning platform input events
//! into logical input events.
//!
//! An [`InputMapper`] binds platform-specific input identifiers (a key
//! code, a thumbstick axis) to logical keys and produces [`EdgeTraverser`]s.
//! A [`StateMachine`] consumes those traversers against a graph of
//! [`StateMachineBuilder`]-authored nodes and edges, activating/deactivating
//! nodes and publishing [`Event`]s as it goes.
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

mod mapper;
mod state_machine;
mod types;

pub use mapper::InputMapper;
pub use state_machine::{
    EdgeGuard, EdgeTraverser, Event, EventDescription, EventPayload, StateMachine, StateMachineBuilder, TraverserPayload, UNSET,
};
pub use types::{Axis2, EdgeIndex, EventId, LogicalKey, NodeIndex, PlatformId, SourceRange, Timespan, ROOT_NODE};
