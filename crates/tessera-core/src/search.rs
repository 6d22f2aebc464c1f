// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Best-first discovery of a grid trajectory satisfying a future.
//!
//! Candidates live in an arena indexed by discovery order; a hash map over
//! grid states dedupes revisits. Scoring combines the backward estimate
//! (how far the state is from the goal) and the forward estimate (how hard
//! the goal is to reach from it), plus a depth penalty.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::bfs::propagate;
use crate::field::{Potential, Potentials};
use crate::geom::Area3;
use crate::grid::Grid;
use crate::matcher::Match;
use crate::observe::{Future, Observe};
use crate::rule::{RewriteRule, Symbol};

/// One node of the search graph over grid states.
#[derive(Debug, Clone)]
struct Candidate {
    state: Grid<Symbol>,
    parent: Option<usize>,
    depth: u32,
    backward: f64,
    forward: f64,
}

impl Candidate {
    /// Queue priority; lower is better.
    ///
    /// `depth_coefficient < 0` switches to depth-first order.
    fn weight(&self, depth_coefficient: f64) -> f64 {
        if depth_coefficient < 0.0 {
            1000.0 - f64::from(self.depth)
        } else {
            self.forward + self.backward + 2.0 * depth_coefficient * f64::from(self.depth)
        }
    }

    /// Successor states reachable by one tick.
    ///
    /// ONE mode yields one child per match; ALL mode yields a single child
    /// carrying the union of a greedy non-conflicting subset of matches.
    fn children(&self, rules: &[RewriteRule], all: bool) -> Vec<Grid<Symbol>> {
        let matches = Match::scan(&self.state, rules, &[]);

        if all {
            let mut taken: Vec<Match> = Vec::new();
            let mut union = self.state.clone();
            for m in matches {
                if taken.iter().any(|t| t.conflict(&m, rules)) {
                    continue;
                }
                for c in m.changes(&self.state, rules) {
                    union[c.u] = c.value;
                }
                taken.push(m);
            }
            if taken.is_empty() {
                Vec::new()
            } else {
                vec![union]
            }
        } else {
            matches
                .iter()
                .map(|m| {
                    let mut child = self.state.clone();
                    for c in m.changes(&self.state, rules) {
                        child[c.u] = c.value;
                    }
                    child
                })
                .collect()
        }
    }
}

/// Min-heap entry ordered by weight, index-tied for determinism.
struct Queued {
    weight: f64,
    index: usize,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap, we want the smallest weight
        other
            .weight
            .total_cmp(&self.weight)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Searches for a trajectory from `grid` to any state satisfying `future`.
///
/// Returns `None` when the search exhausts its candidates (or the `limit`
/// cap) without reaching the goal; returns an empty trajectory when the
/// grid already satisfies it. `limit <= 0` leaves the candidate count
/// unbounded.
#[must_use]
pub fn trajectory(
    future: &Future,
    grid: &Grid<Symbol>,
    rules: &[RewriteRule],
    all: bool,
    limit: i32,
    depth_coefficient: f64,
) -> Option<Vec<Grid<Symbol>>> {
    let mut backward = Potentials::new();
    Observe::backward_potentials(&mut backward, future, rules);
    let mut forward = Potentials::new();
    forward_potentials(&mut forward, grid, rules);

    let root = Candidate {
        state: grid.clone(),
        parent: None,
        depth: 0,
        backward: backward_delta(&backward, grid),
        forward: forward_delta(&forward, future),
    };
    if !(root.backward >= 0.0) || !(root.forward >= 0.0) {
        return None;
    }
    if root.backward == 0.0 {
        return Some(Vec::new());
    }

    let mut candidates = vec![root];
    let mut visited: FxHashMap<Grid<Symbol>, usize> = FxHashMap::default();
    visited.insert(grid.clone(), 0);

    let mut queue = BinaryHeap::new();
    queue.push(Queued {
        weight: candidates[0].weight(depth_coefficient),
        index: 0,
    });

    let mut goal = None;
    'searching: while let Some(Queued { index: parent, .. }) = queue.pop() {
        if limit > 0 && candidates.len() >= limit as usize {
            break;
        }

        let children = candidates[parent].children(rules, all);
        let child_depth = candidates[parent].depth + 1;

        for state in children {
            if let Some(&known) = visited.get(&state) {
                // relax: adopt the shorter path to an already-seen state
                if candidates[known].depth <= child_depth {
                    continue;
                }
                candidates[known].depth = child_depth;
                candidates[known].parent = Some(parent);
                queue.push(Queued {
                    weight: candidates[known].weight(depth_coefficient),
                    index: known,
                });
                continue;
            }

            let backward_estimate = backward_delta(&backward, &state);
            forward_potentials(&mut forward, &state, rules);
            let forward_estimate = forward_delta(&forward, future);
            if !(backward_estimate >= 0.0) || !(forward_estimate >= 0.0) {
                continue;
            }

            let index = candidates.len();
            visited.insert(state.clone(), index);
            candidates.push(Candidate {
                state,
                parent: Some(parent),
                depth: child_depth,
                backward: backward_estimate,
                forward: forward_estimate,
            });

            if forward_estimate == 0.0 {
                goal = Some(index);
                break 'searching;
            }

            queue.push(Queued {
                weight: candidates[index].weight(depth_coefficient),
                index,
            });
        }
    }

    let goal = goal?;
    let mut traj = Vec::with_capacity(candidates[goal].depth as usize);
    let mut index = goal;
    while let Some(parent) = candidates[index].parent {
        traj.push(candidates[index].state.clone());
        index = parent;
    }
    traj.reverse();
    Some(traj)
}

/// Recomputes forward potentials: earliest tick each `(cell, symbol)` pair
/// can appear starting from `grid`.
///
/// Current symbols seed at 0; a placement whose constrained inputs are all
/// reachable at level `p` (see [`Match::forward_match`]) assigns `p + 1` to
/// the outputs it writes. Existing potentials are reset first.
pub fn forward_potentials(potentials: &mut Potentials, grid: &Grid<Symbol>, rules: &[RewriteRule]) {
    for pot in potentials.values_mut() {
        pot.values.fill(f64::NAN);
    }

    let extents = grid.extents;
    let mut seeds = Vec::new();
    for (u, &c) in grid.cells() {
        potentials
            .entry(c)
            .or_insert_with(|| Potential::filled(extents, f64::NAN))[u] = 0.0;
        seeds.push((u, c));
    }

    let area = Area3::from_size(extents);
    propagate(seeds, |(u, c), front| {
        let p = potentials[&c][u];
        for (r, rule) in rules.iter().enumerate() {
            for shift in rule.get_ishifts(c) {
                let origin = u - shift;
                let placement = rule.input.area() + origin;
                if area.meet(&placement) != placement {
                    continue;
                }
                let m = Match::new(origin, r);
                if !m.forward_match(potentials, p, rules) {
                    continue;
                }
                for ch in m.forward_changes(potentials, rules) {
                    potentials
                        .entry(ch.value)
                        .or_insert_with(|| Potential::filled(extents, f64::NAN))[ch.u] = p + 1.0;
                    front.push_back((ch.u, ch.value));
                }
            }
        }
    });
}

/// How far `grid` still is from the goal: the sum of each cell's current
/// symbol's backward potential, 0 where unassigned.
#[must_use]
pub fn backward_delta(potentials: &Potentials, grid: &Grid<Symbol>) -> f64 {
    grid.cells()
        .map(|(u, c)| {
            potentials
                .get(c)
                .map_or(0.0, |pot| if pot[u].is_finite() { pot[u] } else { 0.0 })
        })
        .sum()
}

/// How hard the goal is to reach: for every cell with a non-empty future
/// set, the smallest finite forward potential among the admitted symbols.
///
/// A cell none of whose admitted symbols is reachable poisons the sum with
/// `NaN`, which callers treat as a pruned candidate.
#[must_use]
pub fn forward_delta(potentials: &Potentials, future: &Future) -> f64 {
    future
        .cells()
        .filter(|(_, set)| !set.is_empty())
        .map(|(u, set)| {
            set.iter()
                .filter_map(|c| {
                    potentials
                        .get(c)
                        .map(|pot| pot[u])
                        .filter(|v| v.is_finite())
                })
                .fold(f64::NAN, f64::min)
        })
        .sum()
}
