// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! tessera-model: program and palette documents for the rewrite engine.
//!
//! A program document is an XML tree of `sequence`/`markov` composites and
//! `one`/`all`/`prl` leaves carrying rules, fields, and observations; it
//! compiles into a [`Model`] holding a runnable `TreeRunner`. A palette
//! document maps symbols to display colors. Malformed documents fail fast
//! with messages naming the attribute, the element, and the byte offset.
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

mod document;
mod error;
mod model;
mod palette;

pub use error::ModelError;
pub use model::Model;
pub use palette::{parse_palette, Color, Palette};
