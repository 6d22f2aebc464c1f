// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The program leaf: a rule set, an inference strategy, and the per-tick
//! predict → scan → infer → select → apply pipeline.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use tracing::warn;

use crate::field::{Field, Fields, Potentials};
use crate::geom::Offset;
use crate::grid::{Change, Grid, TracedGrid};
use crate::matcher::Match;
use crate::observe::{Future, Observe, Observes};
use crate::rule::{RewriteRule, Symbol};
use crate::search;

/// Match-selection mode of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Fire at most one match per tick.
    One,
    /// Fire a maximal non-conflicting subset per tick.
    All,
    /// Fire each match independently with its rule's probability.
    Prl,
}

/// Inference strategy of a leaf, carrying its strategy-specific substate.
#[derive(Debug, Clone)]
pub enum Inference {
    /// Unweighted selection.
    Random,
    /// Distance fields reshape match weights.
    Distance {
        /// The fields to maintain.
        fields: Fields,
        /// Boltzmann softening temperature; `<= 0` means 1.
        temperature: f64,
    },
    /// An observation goal reshapes match weights through backward potentials.
    Observe {
        /// Goal statements per symbol.
        observes: Observes,
        /// Boltzmann softening temperature; `<= 0` means 1.
        temperature: f64,
    },
    /// An observation goal drives a best-first trajectory search.
    Search {
        /// Goal statements per symbol.
        observes: Observes,
        /// Candidate cap; `0` unbounded, `< 0` caps search to one attempt.
        limit: i32,
        /// Depth penalty coefficient; `< 0` selects depth-first scoring.
        depth_coefficient: f64,
    },
}

/// A program leaf: rules plus everything needed to pick which matches fire.
#[derive(Debug)]
pub struct RuleNode {
    /// Match-selection mode.
    pub mode: Mode,
    /// The rule table, symmetry variants included.
    pub rules: Vec<RewriteRule>,
    /// Inference strategy and its substate.
    pub inference: Inference,
    /// Potentials maintained by DISTANCE and OBSERVE inference.
    pub potentials: Potentials,
    /// The goal, once constructed by OBSERVE or SEARCH inference.
    pub future: Option<Future>,
    /// The discovered trajectory, consumed step-by-step by SEARCH inference.
    pub trajectory: Vec<Grid<Symbol>>,
    matches: Vec<Match>,
    active: usize,
    traj_index: usize,
    prev: Option<usize>,
    rng: SmallRng,
}

impl RuleNode {
    /// Builds a leaf with its own seeded generator.
    #[must_use]
    pub fn new(mode: Mode, rules: Vec<RewriteRule>, inference: Inference, seed: u64) -> Self {
        Self {
            mode,
            rules,
            inference,
            potentials: Potentials::new(),
            future: None,
            trajectory: Vec::new(),
            matches: Vec::new(),
            active: 0,
            traj_index: 0,
            prev: None,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Clears every piece of derived state; the next tick starts fresh.
    pub fn reset(&mut self) {
        self.potentials.clear();
        self.future = None;
        self.trajectory.clear();
        self.matches.clear();
        self.active = 0;
        self.traj_index = 0;
        self.prev = None;
    }

    /// Runs one tick against the traced grid and returns the changes to
    /// commit, in firing order. An empty vector means the leaf produced no
    /// work this tick.
    pub fn tick(&mut self, grid: &TracedGrid<Symbol>) -> Vec<Change<Symbol>> {
        let mut changes = Vec::new();
        if !self.predict(grid, &mut changes) {
            return changes;
        }

        if matches!(self.inference, Inference::Search { .. }) {
            // a trajectory replaces the generic pipeline: walk it one state
            // per tick, the from-rewrite tick excepted
            if changes.is_empty() {
                self.emit_trajectory_step(grid, &mut changes);
            }
            return changes;
        }

        self.scan(grid);
        self.infer(grid);
        self.select();
        self.apply(grid, &mut changes);
        changes
    }

    /// Strategy-specific preparation. Returns `false` to abort the tick.
    fn predict(&mut self, grid: &TracedGrid<Symbol>, changes: &mut Vec<Change<Symbol>>) -> bool {
        match &mut self.inference {
            Inference::Random => true,

            Inference::Distance { fields, .. } => {
                Field::potentials(fields, grid, &mut self.potentials);
                !Field::essential_missing(fields, &self.potentials)
            }

            Inference::Observe { observes, .. } => {
                if self.future.is_some() {
                    return true;
                }
                let Some(future) = Observe::future(changes, grid, observes) else {
                    return false;
                };
                Observe::backward_potentials(&mut self.potentials, &future, &self.rules);
                self.future = Some(future);
                true
            }

            Inference::Search {
                observes,
                limit,
                depth_coefficient,
            } => {
                if self.future.is_some() {
                    return true;
                }
                let Some(future) = Observe::future(changes, grid, observes) else {
                    return false;
                };

                // search from the state the from-rewrites will produce
                let mut present: Grid<Symbol> = (**grid).clone();
                for c in changes.iter() {
                    present[c.u] = c.value;
                }

                let tries = if *limit < 0 { 1 } else { 20 };
                let all = matches!(self.mode, Mode::All);
                let mut found = None;
                for _ in 0..tries {
                    found = search::trajectory(
                        &future,
                        &present,
                        &self.rules,
                        all,
                        *limit,
                        *depth_coefficient,
                    );
                    if found.is_some() {
                        break;
                    }
                }
                match found {
                    Some(traj) => self.trajectory = traj,
                    None => warn!("search found no trajectory to the goal"),
                }
                self.traj_index = 0;
                self.future = Some(future);
                true
            }
        }
    }

    /// Appends the diff from the current grid to the next trajectory state.
    fn emit_trajectory_step(
        &mut self,
        grid: &TracedGrid<Symbol>,
        changes: &mut Vec<Change<Symbol>>,
    ) {
        while changes.is_empty() {
            let Some(target) = self.trajectory.get(self.traj_index) else {
                return;
            };
            changes.extend(
                grid.cells()
                    .filter(|&(u, &c)| target[u] != c)
                    .map(|(u, _)| Change::new(u, target[u])),
            );
            self.traj_index += 1;
        }
    }

    /// Revalidates the pool against the journal and appends fresh matches.
    fn scan(&mut self, grid: &TracedGrid<Symbol>) {
        let now = grid.history.len();
        let since = self.prev.unwrap_or(now);

        let rules = &self.rules;
        self.matches.retain(|m| m.matches(grid, rules));

        let fresh = Match::scan(grid, rules, &grid.history[since..now]);
        let known: FxHashSet<(usize, Offset)> =
            self.matches.iter().map(|m| (m.r, m.u)).collect();
        self.matches
            .extend(fresh.into_iter().filter(|m| !known.contains(&(m.r, m.u))));

        self.active = 0;
    }

    /// Weighs the pool: potential delta per match, non-finite weights
    /// swapped out of the active range, the rest Boltzmann-softened and
    /// scaled by the rule's draw probability.
    fn infer(&mut self, grid: &TracedGrid<Symbol>) {
        for i in self.active..self.matches.len() {
            let w = self.matches[i].delta(grid, &self.potentials, &self.rules);
            self.matches[i].w = w;
        }

        let mut a = self.active;
        for i in self.active..self.matches.len() {
            if !self.matches[i].w.is_finite() {
                self.matches.swap(i, a);
                a += 1;
            }
        }
        self.active = a;

        let t = self.temperature();
        for m in &mut self.matches[self.active..] {
            m.w = self.rules[m.r].p * (-m.w / t).exp();
        }
    }

    fn temperature(&self) -> f64 {
        match &self.inference {
            Inference::Distance { temperature, .. } | Inference::Observe { temperature, .. }
                if *temperature > 0.0 =>
            {
                *temperature
            }
            _ => 1.0,
        }
    }

    /// Moves the matches that fire this tick into the tail range
    /// `[active..]` according to the selection mode.
    fn select(&mut self) {
        match self.mode {
            Mode::One => {
                if let Some(picked) = self.pick(self.active, self.matches.len()) {
                    let last = self.matches.len() - 1;
                    self.matches.swap(picked, last);
                    self.active = last;
                } else {
                    self.active = self.matches.len();
                }
            }

            Mode::All => {
                let mut selection = self.matches.len();
                while selection != self.active {
                    let Some(picked) = self.pick(self.active, selection) else {
                        self.active = selection;
                        break;
                    };
                    let conflicted = (selection..self.matches.len()).any(|j| {
                        self.matches[picked].conflict(&self.matches[j], &self.rules)
                    });
                    if conflicted {
                        self.matches.swap(picked, self.active);
                        self.active += 1;
                    } else {
                        selection -= 1;
                        self.matches.swap(picked, selection);
                    }
                }
            }

            Mode::Prl => {
                let mut a = self.active;
                for i in self.active..self.matches.len() {
                    let p = self.rules[self.matches[i].r].p;
                    if !self.rng.gen_bool(p) {
                        self.matches.swap(i, a);
                        a += 1;
                    }
                }
                self.active = a;
            }
        }
    }

    /// Weighted draw over `[begin..end)`; `None` when the total weight is 0.
    fn pick(&mut self, begin: usize, end: usize) -> Option<usize> {
        let weights: Vec<f64> = self.matches[begin..end].iter().map(|m| m.w).collect();
        if weights.iter().sum::<f64>() == 0.0 {
            return None;
        }
        let picker = WeightedIndex::new(&weights).ok()?;
        Some(begin + picker.sample(&mut self.rng))
    }

    /// Emits the selected matches' changes and drops them from the pool.
    fn apply(&mut self, grid: &TracedGrid<Symbol>, changes: &mut Vec<Change<Symbol>>) {
        if self.active != self.matches.len() {
            self.prev = Some(grid.history.len());
        }
        for m in &self.matches[self.active..] {
            changes.extend(m.changes(grid, &self.rules));
        }
        self.matches.truncate(self.active);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Offset, Size};
    use crate::rule::{SymbolSet, Unions};

    fn traced(src: &str) -> TracedGrid<Symbol> {
        TracedGrid::new(Grid::parse(src, |c| c).unwrap())
    }

    fn rules(specs: &[(&str, &str, f64)]) -> Vec<RewriteRule> {
        specs
            .iter()
            .map(|(i, o, p)| RewriteRule::parse(&Unions::new(), i, o, *p).unwrap())
            .collect()
    }

    fn run_tick(node: &mut RuleNode, grid: &mut TracedGrid<Symbol>) -> usize {
        let changes = node.tick(grid);
        let n = changes.len();
        for c in changes {
            grid.apply(c);
        }
        n
    }

    #[test]
    fn prl_at_probability_one_fires_every_match() {
        let mut grid = traced("BBB BBB BBB");
        let mut node = RuleNode::new(Mode::Prl, rules(&[("B", "W", 1.0)]), Inference::Random, 0);
        assert_eq!(run_tick(&mut node, &mut grid), 9);
        assert!(grid.values.iter().all(|&c| c == 'W'));
    }

    #[test]
    fn prl_at_probability_zero_fires_nothing() {
        let mut grid = traced("BBB");
        let mut node = RuleNode::new(Mode::Prl, rules(&[("B", "W", 0.0)]), Inference::Random, 0);
        assert_eq!(run_tick(&mut node, &mut grid), 0);
    }

    #[test]
    fn one_mode_rewrites_a_single_cell_per_tick() {
        let mut grid = traced("BBB");
        let mut node = RuleNode::new(Mode::One, rules(&[("B", "R", 1.0)]), Inference::Random, 7);
        for expected_r in 1..=3 {
            assert_eq!(run_tick(&mut node, &mut grid), 1);
            let count = grid.values.iter().filter(|&&c| c == 'R').count();
            assert_eq!(count, expected_r);
        }
        // pool exhausted: no further work
        assert_eq!(run_tick(&mut node, &mut grid), 0);
    }

    #[test]
    fn one_mode_with_zero_probability_rules_emits_nothing() {
        let mut grid = traced("BBB");
        let mut node = RuleNode::new(Mode::One, rules(&[("B", "R", 0.0)]), Inference::Random, 7);
        assert_eq!(run_tick(&mut node, &mut grid), 0);
    }

    #[test]
    fn all_mode_commits_one_of_two_overlapping_matches() {
        // both rules write the whole 1×1×2 grid from the same origin
        let mut grid = traced("BB");
        let mut node = RuleNode::new(
            Mode::All,
            rules(&[("BB", "WW", 1.0), ("BB", "RR", 1.0)]),
            Inference::Random,
            3,
        );
        assert_eq!(run_tick(&mut node, &mut grid), 2);
        let s: String = grid.values.iter().collect();
        assert!(s == "WW" || s == "RR");
    }

    #[test]
    fn all_mode_fires_every_disjoint_match_in_one_tick() {
        let mut grid = traced("BBBB");
        let mut node = RuleNode::new(Mode::All, rules(&[("B", "W", 1.0)]), Inference::Random, 5);
        assert_eq!(run_tick(&mut node, &mut grid), 4);
        assert!(grid.values.iter().all(|&c| c == 'W'));
    }

    #[test]
    fn a_node_without_matches_stays_silent() {
        let mut grid = traced("WWW");
        let mut node = RuleNode::new(Mode::One, rules(&[("B", "R", 1.0)]), Inference::Random, 0);
        assert_eq!(run_tick(&mut node, &mut grid), 0);
        assert!(grid.history.is_empty());
    }

    #[test]
    fn fixed_seeds_reproduce_the_run() {
        let run = |seed: u64| {
            let mut grid = traced("BBBB BBBB");
            let mut node =
                RuleNode::new(Mode::One, rules(&[("B", "W", 1.0)]), Inference::Random, seed);
            while run_tick(&mut node, &mut grid) > 0 {}
            grid.history.clone()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn distance_inference_aborts_without_its_essential_field() {
        let fields = Fields::from([(
            'G',
            crate::field::Field {
                recompute: false,
                essential: true,
                inversed: false,
                substrate: SymbolSet::from(['B']),
                // no R in the grid: the field stays unpopulated
                zero: SymbolSet::from(['R']),
            },
        )]);
        let mut grid = traced("BBB");
        let mut node = RuleNode::new(
            Mode::One,
            rules(&[("B", "W", 1.0)]),
            Inference::Distance {
                fields,
                temperature: 0.0,
            },
            0,
        );
        assert_eq!(run_tick(&mut node, &mut grid), 0);
    }

    #[test]
    fn distance_inference_walks_toward_the_zero_set() {
        // W walker on a line, R target at the right edge; the W->. move
        // with the smaller distance-to-R delta must win every tick.
        let unions = Unions::new();
        let rule_rules = vec![RewriteRule::parse(&unions, "WB", "BW", 1.0).unwrap()];
        let fields = Fields::from([(
            'W',
            crate::field::Field {
                recompute: true,
                essential: true,
                inversed: false,
                substrate: SymbolSet::from(['B', 'W']),
                zero: SymbolSet::from(['R']),
            },
        )]);
        let mut grid = traced("WBBBR");
        let mut node = RuleNode::new(
            Mode::One,
            rule_rules,
            Inference::Distance {
                fields,
                temperature: 0.0,
            },
            11,
        );
        for _ in 0..3 {
            assert_eq!(run_tick(&mut node, &mut grid), 2);
        }
        let s: String = grid.values.iter().collect();
        assert_eq!(s, "BBBWR");
    }

    #[test]
    fn observe_goal_is_reached_through_backward_weights() {
        let observes = Observes::from([(
            'B',
            crate::observe::Observe {
                from: None,
                to: SymbolSet::from(['W']),
            },
        )]);
        let mut grid = traced("BBB");
        let mut node = RuleNode::new(
            Mode::One,
            rules(&[("B", "W", 1.0)]),
            Inference::Observe {
                observes,
                temperature: 0.0,
            },
            2,
        );
        while run_tick(&mut node, &mut grid) > 0 {}
        assert!(grid.values.iter().all(|&c| c == 'W'));
        let future = node.future.as_ref().unwrap();
        assert!(Observe::goal_reached(&grid, future));
    }

    #[test]
    fn search_inference_applies_its_trajectory_step_by_step() {
        let observes = Observes::from([(
            'B',
            crate::observe::Observe {
                from: None,
                to: SymbolSet::from(['W']),
            },
        )]);
        let mut grid = traced("BBB");
        let mut node = RuleNode::new(
            Mode::One,
            rules(&[("B", "W", 1.0)]),
            Inference::Search {
                observes,
                limit: 0,
                depth_coefficient: 0.5,
            },
            2,
        );
        let mut ticks = 0;
        while run_tick(&mut node, &mut grid) > 0 {
            ticks += 1;
        }
        assert_eq!(ticks, 3);
        assert!(grid.values.iter().all(|&c| c == 'W'));
    }

    #[test]
    fn unmeetable_observation_aborts_every_tick() {
        let observes = Observes::from([(
            'R',
            crate::observe::Observe {
                from: None,
                to: SymbolSet::from(['W']),
            },
        )]);
        let mut grid = traced("BBB");
        let mut node = RuleNode::new(
            Mode::One,
            rules(&[("B", "W", 1.0)]),
            Inference::Observe {
                observes,
                temperature: 0.0,
            },
            0,
        );
        assert_eq!(run_tick(&mut node, &mut grid), 0);
        assert!(node.future.is_none());
    }

    #[test]
    fn reset_clears_derived_state() {
        let mut grid = traced("BB");
        let mut node = RuleNode::new(Mode::One, rules(&[("B", "W", 1.0)]), Inference::Random, 0);
        run_tick(&mut node, &mut grid);
        node.reset();
        assert!(node.future.is_none());
        assert!(node.trajectory.is_empty());
        assert!(node.potentials.is_empty());
        // a fresh full scan finds the remaining match
        assert_eq!(run_tick(&mut node, &mut grid), 1);
    }

    #[test]
    fn incremental_scan_tracks_grid_changes() {
        // rule chain: W spreads right one cell per tick
        let mut grid = traced("WBBB");
        let mut node = RuleNode::new(Mode::One, rules(&[("WB", "WW", 1.0)]), Inference::Random, 0);
        let mut ticks = 0;
        while run_tick(&mut node, &mut grid) > 0 {
            ticks += 1;
        }
        assert_eq!(ticks, 3);
        assert!(grid.values.iter().all(|&c| c == 'W'));
    }

    #[test]
    fn grid_extents_survive_every_mode() {
        for mode in [Mode::One, Mode::All, Mode::Prl] {
            let mut grid = traced("BB BB");
            let mut node = RuleNode::new(mode, rules(&[("B", "W", 1.0)]), Inference::Random, 1);
            while run_tick(&mut node, &mut grid) > 0 {}
            assert_eq!(grid.extents, Size::new(1, 2, 2));
            assert_eq!(grid[Offset::new(0, 1, 1)], 'W');
        }
    }
}
