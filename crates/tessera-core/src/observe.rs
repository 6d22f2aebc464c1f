// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Observation goals: per-symbol goal statements, the future they induce,
//! and backward potential propagation from that future.

use crate::bfs::propagate;
use crate::field::{Potential, Potentials};
use crate::geom::Area3;
use crate::grid::{Change, Grid};
use crate::matcher::Match;
use crate::rule::{RewriteRule, Symbol, SymbolSet};

use std::collections::BTreeMap;

/// Goal statement for one observed symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observe {
    /// Rewrite observed cells to this symbol before goal processing.
    pub from: Option<Symbol>,
    /// The symbols that satisfy the goal at observed cells.
    pub to: SymbolSet,
}

/// Observations keyed by the symbol they watch.
pub type Observes = BTreeMap<Symbol, Observe>;

/// Per-cell goal sets; a cell is satisfied when its symbol lies in its set.
pub type Future = Grid<SymbolSet>;

impl Observe {
    /// Builds the future induced by `observes` over the current grid.
    ///
    /// Observed cells carry their goal sets, unobserved cells carry the
    /// singleton of their current symbol. `from`-rewrites are appended to
    /// `changes` for immediate application. When some observed symbol does
    /// not occur in the grid at all, the goal is unmeetable as stated:
    /// nothing is appended and `None` is returned.
    #[must_use]
    pub fn future(
        changes: &mut Vec<Change<Symbol>>,
        grid: &Grid<Symbol>,
        observes: &Observes,
    ) -> Option<Future> {
        let mut seen = SymbolSet::new();
        let mut rewrites = Vec::new();

        let cells = grid
            .cells()
            .map(|(u, &value)| match observes.get(&value) {
                Some(obs) => {
                    seen.insert(value);
                    if let Some(from) = obs.from {
                        rewrites.push(Change::new(u, from));
                    }
                    obs.to.clone()
                }
                None => SymbolSet::from([value]),
            })
            .collect();

        if !observes.keys().all(|c| seen.contains(c)) {
            return None;
        }

        changes.append(&mut rewrites);
        Some(Future::from_values(grid.extents, cells))
    }

    /// `true` when every cell's current symbol satisfies its goal set.
    #[must_use]
    pub fn goal_reached(grid: &Grid<Symbol>, future: &Future) -> bool {
        grid.cells().all(|(u, c)| future[u].contains(c))
    }

    /// Recomputes backward potentials: distance-to-goal per `(cell, symbol)`.
    ///
    /// Every pair the future admits seeds at potential 0; the wave steps
    /// backward through rules — a placement whose written outputs are all
    /// admissible at level `p` (see [`Match::backward_match`]) assigns
    /// `p + 1` to the input symbols it induces. Existing potentials are
    /// reset first.
    pub fn backward_potentials(
        potentials: &mut Potentials,
        future: &Future,
        rules: &[RewriteRule],
    ) {
        for pot in potentials.values_mut() {
            pot.values.fill(f64::NAN);
        }

        let extents = future.extents;
        let mut seeds = Vec::new();
        for (u, set) in future.cells() {
            for &c in set {
                potentials
                    .entry(c)
                    .or_insert_with(|| Potential::filled(extents, f64::NAN))[u] = 0.0;
                seeds.push((u, c));
            }
        }

        let area = Area3::from_size(extents);
        propagate(seeds, |(u, c), front| {
            let p = potentials[&c][u];
            for (r, rule) in rules.iter().enumerate() {
                for shift in rule.get_oshifts(c) {
                    let origin = u - shift;
                    let placement = rule.input.area() + origin;
                    if area.meet(&placement) != placement {
                        continue;
                    }
                    let m = Match::new(origin, r);
                    if !m.backward_match(potentials, p, rules) {
                        continue;
                    }
                    for ch in m.backward_changes(potentials, rules) {
                        potentials
                            .entry(ch.value)
                            .or_insert_with(|| Potential::filled(extents, f64::NAN))[ch.u] =
                            p + 1.0;
                        front.push_back((ch.u, ch.value));
                    }
                }
            }
        });
    }
}
