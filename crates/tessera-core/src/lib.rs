// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! tessera-core: a pattern-rewrite engine over 3-D symbol grids.
//!
//! A program is a tree of nodes. Each leaf repeatedly locates matches of
//! local input patterns inside the current grid, selects a subset per its
//! scheduling mode (ONE / ALL / PRL), and commits their output patterns as
//! changes. Distance fields, observation goals, and a best-first trajectory
//! search may bias or constrain the choice. Execution continues until no
//! node can fire.
//!
//! # Determinism
//!
//! Runs are reproducible given a fixed seed and a fixed rule ordering:
//! every leaf owns one seeded generator, collections with observable
//! iteration order are ordered, and changes are committed in selection
//! order within a tick.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]

mod bfs;
mod controls;
mod field;
mod geom;
mod grid;
mod matcher;
mod node;
mod observe;
mod rule;
mod runner;
/// Best-first trajectory search over grid states.
pub mod search;
mod snapshot;

pub use controls::Controls;
pub use field::{Field, Fields, Potential, Potentials};
pub use geom::{Area3, Offset, Size};
pub use grid::{Change, Grid, PatternError, TracedGrid};
pub use matcher::Match;
pub use node::{Inference, Mode, RuleNode};
pub use observe::{Future, Observe, Observes};
pub use rule::{RewriteRule, Symbol, SymbolSet, Unions, IGNORED};
pub use runner::{NodeRunner, RuleRunner, TreeMode, TreeRunner};
pub use snapshot::Snapshot;
