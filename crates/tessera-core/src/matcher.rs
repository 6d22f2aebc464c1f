// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Candidate rule placements and the match scanner.
//!
//! A [`Match`] names a rule and a grid origin. Matches carry no borrow of
//! their rule table; every operation takes the owning node's `&[RewriteRule]`
//! so the pool can live beside the rules without a self-reference.

use std::collections::BTreeSet;

use crate::field::Potentials;
use crate::geom::{Area3, Offset};
use crate::grid::{Change, Grid};
use crate::rule::{RewriteRule, Symbol};

/// A candidate application of rule `r` with its input origin at `u`.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Grid position of the placement's lower corner.
    pub u: Offset,
    /// Index into the owning node's rule table.
    pub r: usize,
    /// Selection weight, assigned by the infer stage.
    pub w: f64,
}

impl Match {
    /// Constructs a placement with a neutral weight.
    #[must_use]
    pub const fn new(u: Offset, r: usize) -> Self {
        Self { u, r, w: 1.0 }
    }

    /// The grid region this placement covers.
    #[must_use]
    pub fn area(&self, rules: &[RewriteRule]) -> Area3 {
        rules[self.r].input.area() + self.u
    }

    /// Exact test: every input cell is a wildcard or admits the grid value.
    #[must_use]
    pub fn matches(&self, grid: &Grid<Symbol>, rules: &[RewriteRule]) -> bool {
        rules[self.r].input.cells().all(|(o, cell)| match cell {
            None => true,
            Some(set) => set.contains(&grid[self.u + o]),
        })
    }

    /// Output-overlap test: `true` when both placements write some shared cell.
    #[must_use]
    pub fn conflict(&self, other: &Self, rules: &[RewriteRule]) -> bool {
        self.area(rules)
            .meet(&other.area(rules))
            .cells()
            .any(|u| {
                rules[self.r].output[u - self.u].is_some()
                    && rules[other.r].output[u - other.u].is_some()
            })
    }

    /// The cells this placement would actually alter.
    #[must_use]
    pub fn changes(&self, grid: &Grid<Symbol>, rules: &[RewriteRule]) -> Vec<Change<Symbol>> {
        rules[self.r]
            .output
            .cells()
            .filter_map(|(o, cell)| {
                let u = self.u + o;
                cell.filter(|&c| c != grid[u]).map(|c| Change::new(u, c))
            })
            .collect()
    }

    /// Potential-weighted cost of firing this placement.
    ///
    /// Sums `potential[new][u] − potential[old][u]` over altered cells; a
    /// symbol without a potential contributes `0`, a non-finite old-side
    /// lookup counts as `-1`.
    #[must_use]
    pub fn delta(&self, grid: &Grid<Symbol>, potentials: &Potentials, rules: &[RewriteRule]) -> f64 {
        rules[self.r]
            .output
            .cells()
            .filter_map(|(o, cell)| {
                let u = self.u + o;
                let new = (*cell)?;
                let old = grid[u];
                (new != old).then(|| {
                    let new_p = potentials.get(&new).map_or(0.0, |pot| pot[u]);
                    let mut old_p = potentials.get(&old).map_or(0.0, |pot| pot[u]);
                    if !old_p.is_finite() {
                        old_p = -1.0;
                    }
                    new_p - old_p
                })
            })
            .sum()
    }

    /// Forward admissibility at level `p`: every constrained input cell can
    /// be reached — all admitted symbols carry a finite potential no greater
    /// than `p`.
    #[must_use]
    pub fn forward_match(&self, potentials: &Potentials, p: f64, rules: &[RewriteRule]) -> bool {
        rules[self.r].input.cells().all(|(o, cell)| {
            let Some(set) = cell else { return true };
            let u = self.u + o;
            set.iter().all(|c| {
                let v = potentials.get(c).map_or(f64::NAN, |pot| pot[u]);
                v.is_finite() && v <= p
            })
        })
    }

    /// Backward admissibility at level `p`: every written output cell
    /// carries a finite potential no greater than `p`.
    #[must_use]
    pub fn backward_match(&self, potentials: &Potentials, p: f64, rules: &[RewriteRule]) -> bool {
        rules[self.r].output.cells().all(|(o, cell)| {
            let Some(c) = cell else { return true };
            let u = self.u + o;
            let v = potentials.get(c).map_or(f64::NAN, |pot| pot[u]);
            v.is_finite() && v <= p
        })
    }

    /// Frontier of backward propagation: the `(cell, symbol)` pairs this
    /// rule's input admits that carry no finite potential yet.
    #[must_use]
    pub fn backward_changes(
        &self,
        potentials: &Potentials,
        rules: &[RewriteRule],
    ) -> Vec<Change<Symbol>> {
        rules[self.r]
            .input
            .cells()
            .flat_map(|(o, cell)| {
                let u = self.u + o;
                cell.iter()
                    .flat_map(move |set| set.iter().copied())
                    .filter(move |c| {
                        potentials
                            .get(c)
                            .map_or(true, |pot| !pot[u].is_finite())
                    })
                    .map(move |c| Change::new(u, c))
            })
            .collect()
    }

    /// Frontier of forward propagation: the `(cell, symbol)` pairs this
    /// rule's output writes that carry no finite potential yet.
    #[must_use]
    pub fn forward_changes(
        &self,
        potentials: &Potentials,
        rules: &[RewriteRule],
    ) -> Vec<Change<Symbol>> {
        rules[self.r]
            .output
            .cells()
            .filter_map(|(o, cell)| {
                let u = self.u + o;
                let c = (*cell)?;
                potentials
                    .get(&c)
                    .map_or(true, |pot| !pot[u].is_finite())
                    .then(|| Change::new(u, c))
            })
            .collect()
    }

    /// Scans `grid` for placements of `rules`.
    ///
    /// With an empty `history` this is the full scan: a stride-aligned
    /// coarse pass proposes probe cells, `get_ishifts` derives candidate
    /// origins from the symbol found there, and the exact test filters.
    /// With recent changes, only origins derived from the changed cells are
    /// probed — the incremental hot path.
    #[must_use]
    pub fn scan(
        grid: &Grid<Symbol>,
        rules: &[RewriteRule],
        history: &[Change<Symbol>],
    ) -> Vec<Match> {
        let g_area = grid.area();
        let mut found = Vec::new();

        for (r, rule) in rules.iter().enumerate() {
            let r_area = rule.input.area();
            let mut origins: BTreeSet<Offset> = BTreeSet::new();

            let probe = |u: Offset, origins: &mut BTreeSet<Offset>| {
                for shift in rule.get_ishifts(grid[u]) {
                    let origin = u - shift;
                    if g_area.meet(&(r_area + origin)) == r_area + origin {
                        origins.insert(origin);
                    }
                }
            };

            if history.is_empty() {
                let stride = rule.output.area().shiftmax();
                let gmax = g_area.shiftmax();
                let size = rule.output.extents;
                for u in g_area.cells() {
                    let aligned = (u.z == gmax.z || u.z % size.d as i32 == stride.z)
                        && (u.y == gmax.y || u.y % size.h as i32 == stride.y)
                        && (u.x == gmax.x || u.x % size.w as i32 == stride.x);
                    if aligned {
                        probe(u, &mut origins);
                    }
                }
            } else {
                for change in history {
                    probe(change.u, &mut origins);
                }
            }

            found.extend(
                origins
                    .into_iter()
                    .map(|u| Match::new(u, r))
                    .filter(|m| m.matches(grid, rules)),
            );
        }

        found
    }
}
