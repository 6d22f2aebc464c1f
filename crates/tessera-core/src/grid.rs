// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dense 3-D cell storage and its traced variant.
//!
//! [`Grid`] is a row-major `(z, y, x)` array indexed by [`Offset`].
//! [`TracedGrid`] extends it with an append-only journal of [`Change`]s;
//! `apply` is the only mutator, so replaying the journal from the initial
//! state always reproduces the current state.

use core::hash::{Hash, Hasher};
use core::ops::{Deref, Index, IndexMut};

use thiserror::Error;

use crate::geom::{Area3, Offset, Size};

/// Malformed pattern source handed to [`Grid::parse`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern contains no cells.
    #[error("empty pattern")]
    Empty,
    /// Rows within a layer (or layers within the pattern) disagree in size.
    #[error("ragged pattern: expected {expected} cells per row, found {found}")]
    Ragged {
        /// Cells per row implied by the first row.
        expected: usize,
        /// Cells found in the offending row.
        found: usize,
    },
}

/// Dense row-major 3-D array with extents `(d, h, w)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    /// Extents along `(z, y, x)`.
    pub extents: Size,
    /// Cell values in canonical order.
    pub values: Vec<T>,
}

impl<T> Grid<T> {
    /// Builds a grid from extents and a canonical-order value vector.
    ///
    /// The vector length must equal `extents.len()`.
    #[must_use]
    pub fn from_values(extents: Size, values: Vec<T>) -> Self {
        debug_assert_eq!(extents.len(), values.len());
        Self { extents, values }
    }

    /// The grid's region, anchored at the origin.
    #[must_use]
    pub fn area(&self) -> Area3 {
        Area3::from_size(self.extents)
    }

    fn linear(&self, u: Offset) -> usize {
        debug_assert!(self.area().contains(u));
        (u.z as usize * self.extents.h as usize + u.y as usize) * self.extents.w as usize
            + u.x as usize
    }

    /// Iterates `(cell, value)` pairs in canonical order.
    pub fn cells(&self) -> impl Iterator<Item = (Offset, &T)> {
        self.area().cells().zip(self.values.iter())
    }

    /// Parses a pattern string into a grid.
    ///
    /// `/` separates z-layers, a space separates y-rows, every other
    /// character is one cell fed through `f`.
    pub fn parse(src: &str, mut f: impl FnMut(char) -> T) -> Result<Self, PatternError> {
        if src.is_empty() {
            return Err(PatternError::Empty);
        }

        let layers: Vec<Vec<&str>> = src
            .split('/')
            .map(|layer| layer.split(' ').collect())
            .collect();

        let h = layers[0].len();
        let w = layers[0][0].chars().count();

        let mut values = Vec::with_capacity(layers.len() * h * w);
        for layer in &layers {
            if layer.len() != h {
                return Err(PatternError::Ragged {
                    expected: h,
                    found: layer.len(),
                });
            }
            for row in layer {
                let count = row.chars().count();
                if count != w {
                    return Err(PatternError::Ragged {
                        expected: w,
                        found: count,
                    });
                }
                values.extend(row.chars().map(&mut f));
            }
        }

        Ok(Self::from_values(
            Size::new(layers.len() as u32, h as u32, w as u32),
            values,
        ))
    }
}

impl<T: Clone> Grid<T> {
    /// A grid of the given extents with every cell set to `value`.
    #[must_use]
    pub fn filled(extents: Size, value: T) -> Self {
        Self {
            extents,
            values: vec![value; extents.len()],
        }
    }

    /// Mirror along the x axis; extents are preserved.
    #[must_use]
    pub fn xreflected(&self) -> Self {
        let Size { d: _, h: _, w } = self.extents;
        self.remapped(self.extents, |u| Offset::new(u.z, u.y, w as i32 - 1 - u.x))
    }

    /// Quarter turn in the xy plane; height and width swap.
    #[must_use]
    pub fn xyrotated(&self) -> Self {
        let Size { d, h, w } = self.extents;
        self.remapped(Size::new(d, w, h), |u| {
            Offset::new(u.z, h as i32 - 1 - u.x, u.y)
        })
    }

    /// Quarter turn in the zy plane; depth and height swap.
    #[must_use]
    pub fn zyrotated(&self) -> Self {
        let Size { d, h, w } = self.extents;
        self.remapped(Size::new(h, d, w), |u| {
            Offset::new(d as i32 - 1 - u.y, u.z, u.x)
        })
    }

    /// Builds the transformed grid cell-by-cell: `new[u] = old[back(u)]`.
    fn remapped(&self, extents: Size, back: impl Fn(Offset) -> Offset) -> Self {
        let values = Area3::from_size(extents)
            .cells()
            .map(|u| self[back(u)].clone())
            .collect();
        Self::from_values(extents, values)
    }
}

impl<T> Index<Offset> for Grid<T> {
    type Output = T;

    fn index(&self, u: Offset) -> &T {
        &self.values[self.linear(u)]
    }
}

impl<T> IndexMut<Offset> for Grid<T> {
    fn index_mut(&mut self, u: Offset) -> &mut T {
        let i = self.linear(u);
        &mut self.values[i]
    }
}

impl<T: Hash> Hash for Grid<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.extents.hash(state);
        self.values.hash(state);
    }
}

/// A single cell mutation: `position` becomes `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change<T> {
    /// The affected cell.
    pub u: Offset,
    /// The value written there.
    pub value: T,
}

impl<T> Change<T> {
    /// Constructs a change record.
    #[must_use]
    pub const fn new(u: Offset, value: T) -> Self {
        Self { u, value }
    }
}

/// A grid plus the ordered journal of every mutation applied to it.
///
/// The journal is append-only until the grid is rebuilt; reads go through
/// `Deref` to the underlying [`Grid`].
#[derive(Debug, Clone)]
pub struct TracedGrid<T> {
    grid: Grid<T>,
    /// Applied changes, oldest first.
    pub history: Vec<Change<T>>,
}

impl<T: Clone> TracedGrid<T> {
    /// Wraps an initial grid state with an empty journal.
    #[must_use]
    pub fn new(grid: Grid<T>) -> Self {
        Self {
            grid,
            history: Vec::new(),
        }
    }

    /// Applies one change and records it in the journal.
    pub fn apply(&mut self, change: Change<T>) {
        self.grid[change.u] = change.value.clone();
        self.history.push(change);
    }
}

impl<T> Deref for TracedGrid<T> {
    type Target = Grid<T>;

    fn deref(&self) -> &Grid<T> {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Grid<char> {
        // 1 layer, 2 rows, 3 cols:
        //   abc
        //   def
        Grid::parse("abc def", |c| c).unwrap()
    }

    #[test]
    fn parse_extents_and_order() {
        let g = sample();
        assert_eq!(g.extents, Size::new(1, 2, 3));
        assert_eq!(g.values, vec!['a', 'b', 'c', 'd', 'e', 'f']);
        assert_eq!(g[Offset::new(0, 1, 2)], 'f');
    }

    #[test]
    fn parse_layers_split_on_slash() {
        let g = Grid::parse("ab/cd", |c| c).unwrap();
        assert_eq!(g.extents, Size::new(2, 1, 2));
        assert_eq!(g[Offset::new(1, 0, 0)], 'c');
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        assert_eq!(
            Grid::parse("abc de", |c| c),
            Err(PatternError::Ragged {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn xreflect_twice_is_identity() {
        let g = sample();
        assert_eq!(g.xreflected().xreflected(), g);
    }

    #[test]
    fn xyrotate_four_times_is_identity() {
        let g = sample();
        let once = g.xyrotated();
        assert_eq!(once.extents, Size::new(1, 3, 2));
        assert_eq!(once.xyrotated().xyrotated().xyrotated(), g);
    }

    #[test]
    fn zyrotate_four_times_is_identity() {
        let g = Grid::parse("ab/cd/ef", |c| c).unwrap();
        let once = g.zyrotated();
        assert_eq!(once.extents, Size::new(1, 3, 2));
        assert_eq!(once.zyrotated().zyrotated().zyrotated(), g);
    }

    #[test]
    fn xyrotation_turns_a_row_into_a_column() {
        let g = Grid::parse("ab", |c| c).unwrap();
        let r = g.xyrotated();
        assert_eq!(r.extents, Size::new(1, 2, 1));
        assert_eq!(r[Offset::new(0, 0, 0)], 'a');
        assert_eq!(r[Offset::new(0, 1, 0)], 'b');
    }

    #[test]
    fn replaying_history_reproduces_the_grid() {
        let initial = Grid::filled(Size::new(1, 2, 2), 'B');
        let mut traced = TracedGrid::new(initial.clone());
        traced.apply(Change::new(Offset::new(0, 0, 1), 'W'));
        traced.apply(Change::new(Offset::new(0, 1, 0), 'R'));
        traced.apply(Change::new(Offset::new(0, 0, 1), 'R'));

        let mut replayed = initial;
        for c in &traced.history {
            replayed[c.u] = c.value;
        }
        assert_eq!(replayed, *traced);
    }
}
