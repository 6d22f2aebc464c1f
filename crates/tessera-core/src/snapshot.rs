// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Render snapshots published at tick boundaries.
//!
//! The execution thread owns the grid exclusively; the renderer reads a
//! cheap clone published under a mutex once per tick — single writer,
//! single reader, no fine-grained locking.

use crate::grid::Grid;
use crate::rule::Symbol;

/// One published frame of execution state.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The grid as of the last completed tick.
    pub grid: Grid<Symbol>,
    /// Ticks completed since the last reset.
    pub tick: u64,
    /// `true` once the program tree is exhausted.
    pub halted: bool,
}

impl Snapshot {
    /// Captures the current state.
    #[must_use]
    pub fn capture(grid: &Grid<Symbol>, tick: u64, halted: bool) -> Self {
        Self {
            grid: grid.clone(),
            tick,
            halted,
        }
    }
}
