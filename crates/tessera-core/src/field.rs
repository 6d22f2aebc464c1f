// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Distance-field potentials inferred by breadth-first propagation.
//!
//! A [`Field`] describes one symbol's distance field: a wavefront starts at
//! distance 0 on every cell whose symbol lies in `zero` and spreads through
//! cells whose symbol lies in `substrate`, one face-adjacent step at a time.
//! Cells the wave never reaches keep the `NaN` sentinel; consumers test
//! reachability with `is_finite`, never equality.

use std::collections::BTreeMap;

use crate::bfs::propagate;
use crate::geom::Offset;
use crate::grid::Grid;
use crate::rule::{Symbol, SymbolSet};

/// A scalar distance field over grid cells; `NaN` means unreached.
pub type Potential = Grid<f64>;

/// Distance fields keyed by symbol.
pub type Potentials = BTreeMap<Symbol, Potential>;

/// Named fields keyed by the symbol whose matches they weight.
pub type Fields = BTreeMap<Symbol, Field>;

/// Face-adjacent neighborhood steps.
const NEIGHBORS: [Offset; 6] = [
    Offset::new(-1, 0, 0),
    Offset::new(1, 0, 0),
    Offset::new(0, -1, 0),
    Offset::new(0, 1, 0),
    Offset::new(0, 0, -1),
    Offset::new(0, 0, 1),
];

/// Declarative description of one distance field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Recompute the potential on every tick instead of reusing it.
    pub recompute: bool,
    /// The owning node must not fire while this field has no potential.
    pub essential: bool,
    /// Propagate decreasing values instead of increasing ones.
    pub inversed: bool,
    /// Symbols the wave may travel through.
    pub substrate: SymbolSet,
    /// Symbols seeding the wave at distance 0.
    pub zero: SymbolSet,
}

impl Field {
    /// Writes this field's distances into `potential`.
    ///
    /// `potential` must share extents with `grid` and arrive filled with
    /// `NaN`; zero-set cells get 0 and the wave spreads from there.
    pub fn potential(&self, grid: &Grid<Symbol>, potential: &mut Potential) {
        debug_assert_eq!(grid.extents, potential.extents);

        let seeds: Vec<(Offset, f64)> = grid
            .cells()
            .filter(|(_, &c)| self.zero.contains(&c))
            .map(|(u, _)| (u, 0.0))
            .collect();
        for &(u, p) in &seeds {
            potential[u] = p;
        }

        let area = grid.area();
        propagate(seeds, |(u, p), front| {
            let next = if self.inversed { p - 1.0 } else { p + 1.0 };
            for step in NEIGHBORS {
                let n = u + step;
                if area.contains(n) && !potential[n].is_finite() && self.substrate.contains(&grid[n])
                {
                    potential[n] = next;
                    front.push_back((n, next));
                }
            }
        });
    }

    /// Refreshes `potentials` from `fields` against the current grid.
    ///
    /// A field whose potential is already present is skipped unless it asks
    /// for recomputation; a field whose wave reaches nothing is dropped from
    /// the map entirely.
    pub fn potentials(fields: &Fields, grid: &Grid<Symbol>, potentials: &mut Potentials) {
        for (&c, field) in fields {
            if potentials.contains_key(&c) && !field.recompute {
                continue;
            }

            let pot = potentials
                .entry(c)
                .or_insert_with(|| Potential::filled(grid.extents, f64::NAN));
            pot.values.fill(f64::NAN);
            field.potential(grid, pot);

            if !pot.values.iter().any(|v| v.is_finite()) {
                potentials.remove(&c);
            }
        }
    }

    /// `true` when some essential field has no recorded potential.
    #[must_use]
    pub fn essential_missing(fields: &Fields, potentials: &Potentials) -> bool {
        fields
            .iter()
            .any(|(c, f)| f.essential && !potentials.contains_key(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Size;
    use crate::grid::Grid;

    fn field(substrate: &str, zero: &str) -> Field {
        Field {
            recompute: false,
            essential: false,
            inversed: false,
            substrate: substrate.chars().collect(),
            zero: zero.chars().collect(),
        }
    }

    #[test]
    fn corner_seed_reaches_the_far_corner_at_distance_four() {
        let grid = Grid::parse("RBB BBB BBW", |c| c).unwrap();
        let mut pot = Potential::filled(grid.extents, f64::NAN);
        field("BW", "R").potential(&grid, &mut pot);

        assert_eq!(pot[Offset::new(0, 0, 0)], 0.0);
        assert_eq!(pot[Offset::new(0, 0, 1)], 1.0);
        assert_eq!(pot[Offset::new(0, 1, 1)], 2.0);
        assert_eq!(pot[Offset::new(0, 2, 2)], 4.0);
        let max = pot.values.iter().copied().fold(f64::MIN, f64::max);
        assert_eq!(max, 4.0);
    }

    #[test]
    fn non_substrate_cells_stay_unreached() {
        let grid = Grid::parse("RXB", |c| c).unwrap();
        let mut pot = Potential::filled(grid.extents, f64::NAN);
        field("B", "R").potential(&grid, &mut pot);

        assert!(!pot[Offset::new(0, 0, 1)].is_finite());
        // the wall blocks the wave entirely
        assert!(!pot[Offset::new(0, 0, 2)].is_finite());
    }

    #[test]
    fn inversed_fields_count_downward() {
        let grid = Grid::parse("RBB", |c| c).unwrap();
        let mut pot = Potential::filled(grid.extents, f64::NAN);
        let mut f = field("B", "R");
        f.inversed = true;
        f.potential(&grid, &mut pot);
        assert_eq!(pot[Offset::new(0, 0, 2)], -2.0);
    }

    #[test]
    fn cached_potentials_are_not_recomputed() {
        let grid = Grid::parse("RB", |c| c).unwrap();
        let fields = Fields::from([('G', field("B", "R"))]);
        let mut potentials = Potentials::new();
        Field::potentials(&fields, &grid, &mut potentials);
        let first = potentials.clone();

        // mutate the recorded potential, refresh again: the stale value
        // survives because the field does not ask for recomputation
        potentials.get_mut(&'G').unwrap()[Offset::new(0, 0, 1)] = 99.0;
        Field::potentials(&fields, &grid, &mut potentials);
        assert_ne!(potentials, first);

        let mut recomputing = fields;
        recomputing.get_mut(&'G').unwrap().recompute = true;
        Field::potentials(&recomputing, &grid, &mut potentials);
        assert_eq!(potentials, first);
    }

    #[test]
    fn unreachable_fields_are_dropped() {
        let grid = Grid::filled(Size::new(1, 1, 3), 'B');
        let fields = Fields::from([('G', field("B", "R"))]);
        let mut potentials = Potentials::new();
        Field::potentials(&fields, &grid, &mut potentials);
        assert!(potentials.is_empty());
    }

    #[test]
    fn essential_missing_flags_unpopulated_fields() {
        let mut f = field("B", "R");
        f.essential = true;
        let fields = Fields::from([('G', f)]);
        assert!(Field::essential_missing(&fields, &Potentials::new()));

        let mut potentials = Potentials::new();
        potentials.insert('G', Potential::filled(Size::new(1, 1, 1), 0.0));
        assert!(!Field::essential_missing(&fields, &potentials));
    }
}
