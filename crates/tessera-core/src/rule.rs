// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rewrite rule definitions and symmetry enumeration.

use std::collections::{BTreeMap, BTreeSet};

use crate::geom::Offset;
use crate::grid::{Grid, PatternError};

/// A single-character grid cell value.
pub type Symbol = char;

/// The wildcard symbol: matches anything on input, preserves on output.
pub const IGNORED: Symbol = '*';

/// A set of acceptable symbols.
///
/// Ordered so that iteration (and therefore everything derived from it) is
/// deterministic.
pub type SymbolSet = BTreeSet<Symbol>;

/// Named symbol sets, expanded into rule inputs at parse time.
pub type Unions = BTreeMap<Symbol, SymbolSet>;

/// One pattern-rewrite rule: an input pattern, an output pattern, and a
/// draw probability.
///
/// Input cells are `None` for "don't care", otherwise the set of acceptable
/// symbols. Output cells are `None` for "leave unchanged", otherwise the
/// symbol to write. Both grids share extents.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    /// The local pattern a placement must agree with.
    pub input: Grid<Option<SymbolSet>>,
    /// The local pattern a firing placement writes.
    pub output: Grid<Option<Symbol>>,
    /// Bernoulli draw probability used by PRL selection, clamped to `[0, 1]`.
    pub p: f64,
    /// Marks symmetry variants so renderers can collapse duplicates.
    pub is_copy: bool,
    ishifts: BTreeMap<Symbol, Vec<Offset>>,
    oshifts: BTreeMap<Symbol, Vec<Offset>>,
}

impl RewriteRule {
    /// Builds a rule and its symbol→offset indexes.
    ///
    /// `input` and `output` must share extents.
    #[must_use]
    pub fn new(
        input: Grid<Option<SymbolSet>>,
        output: Grid<Option<Symbol>>,
        p: f64,
        is_copy: bool,
    ) -> Self {
        debug_assert_eq!(input.extents, output.extents);

        let mut ishifts: BTreeMap<Symbol, Vec<Offset>> = BTreeMap::new();
        for (u, cell) in input.cells() {
            match cell {
                None => ishifts.entry(IGNORED).or_default().push(u),
                Some(set) => {
                    for &c in set {
                        ishifts.entry(c).or_default().push(u);
                    }
                }
            }
        }

        let mut oshifts: BTreeMap<Symbol, Vec<Offset>> = BTreeMap::new();
        for (u, cell) in output.cells() {
            oshifts.entry(cell.unwrap_or(IGNORED)).or_default().push(u);
        }

        Self {
            input,
            output,
            p: if p.is_nan() { 1.0 } else { p.clamp(0.0, 1.0) },
            is_copy,
            ishifts,
            oshifts,
        }
    }

    /// Parses a rule from `in`/`out` pattern strings.
    ///
    /// `*` maps to a wildcard; any other character maps to its union when
    /// one is named, otherwise to itself.
    pub fn parse(
        unions: &Unions,
        input: &str,
        output: &str,
        p: f64,
    ) -> Result<Self, PatternError> {
        let input = Grid::parse(input, |raw| {
            if raw == IGNORED {
                None
            } else {
                Some(
                    unions
                        .get(&raw)
                        .cloned()
                        .unwrap_or_else(|| SymbolSet::from([raw])),
                )
            }
        })?;
        let output = Grid::parse(output, |raw| if raw == IGNORED { None } else { Some(raw) })?;
        Ok(Self::new(input, output, p, false))
    }

    /// Offsets at which the input admits `c`, wildcard cells included.
    pub fn get_ishifts(&self, c: Symbol) -> impl Iterator<Item = Offset> + '_ {
        self.bucket(&self.ishifts, c)
    }

    /// Offsets at which the output writes `c`, wildcard cells included.
    pub fn get_oshifts(&self, c: Symbol) -> impl Iterator<Item = Offset> + '_ {
        self.bucket(&self.oshifts, c)
    }

    fn bucket<'a>(
        &'a self,
        shifts: &'a BTreeMap<Symbol, Vec<Offset>>,
        c: Symbol,
    ) -> impl Iterator<Item = Offset> + 'a {
        shifts
            .get(&IGNORED)
            .into_iter()
            .flatten()
            .chain(shifts.get(&c).into_iter().flatten())
            .copied()
    }

    /// The rule itself, unmarked.
    #[must_use]
    pub fn identity(&self) -> Self {
        Self {
            is_copy: false,
            ..self.clone()
        }
    }

    /// The rule mirrored along the x axis.
    #[must_use]
    pub fn xreflected(&self) -> Self {
        Self::new(
            self.input.xreflected(),
            self.output.xreflected(),
            self.p,
            true,
        )
    }

    /// The rule turned a quarter in the xy plane.
    #[must_use]
    pub fn xyrotated(&self) -> Self {
        Self::new(
            self.input.xyrotated(),
            self.output.xyrotated(),
            self.p,
            true,
        )
    }

    /// The rule turned a quarter in the zy plane.
    #[must_use]
    pub fn zyrotated(&self) -> Self {
        Self::new(
            self.input.zyrotated(),
            self.output.zyrotated(),
            self.p,
            true,
        )
    }

    /// Enumerates the symmetry variants selected by `tag`, the seed rule
    /// first, duplicates removed.
    ///
    /// Recognised tags: `""` (identity only), `"(x)"`, `"(y)"`, `"(x)(y)"`,
    /// and `"(xy)"` (the full 8-element square dihedral group). Returns
    /// `None` for an unknown tag.
    #[must_use]
    pub fn symmetries(&self, tag: &str) -> Option<Vec<Self>> {
        let variants = match tag {
            "" => vec![self.identity()],
            "(x)" => vec![self.identity(), self.xreflected()],
            "(y)" => vec![self.identity(), self.yreflected()],
            "(x)(y)" => vec![
                self.identity(),
                self.xreflected(),
                self.yreflected(),
                self.xyrotated().xyrotated(),
            ],
            "(xy)" => {
                let mut variants = Vec::with_capacity(8);
                let mut turned = self.identity();
                for _ in 0..4 {
                    variants.push(turned.clone());
                    variants.push(turned.xreflected());
                    turned = turned.xyrotated();
                }
                variants
            }
            _ => return None,
        };

        let mut unique: Vec<Self> = Vec::with_capacity(variants.len());
        for v in variants {
            if !unique.contains(&v) {
                unique.push(v);
            }
        }
        Some(unique)
    }

    fn yreflected(&self) -> Self {
        self.xyrotated().xyrotated().xreflected()
    }
}

/// Equality over input, output, and probability; `is_copy` is ignored.
impl PartialEq for RewriteRule {
    fn eq(&self, other: &Self) -> bool {
        self.input == other.input && self.output == other.output && self.p == other.p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Size;

    fn rule(input: &str, output: &str) -> RewriteRule {
        RewriteRule::parse(&Unions::new(), input, output, 1.0).unwrap()
    }

    #[test]
    fn wildcard_maps_to_dont_care() {
        let r = rule("B*", "*W");
        assert_eq!(r.input[Offset::new(0, 0, 1)], None);
        assert_eq!(r.output[Offset::new(0, 0, 0)], None);
        assert_eq!(r.output[Offset::new(0, 0, 1)], Some('W'));
    }

    #[test]
    fn unions_expand_into_input_sets() {
        let unions = Unions::from([('?', SymbolSet::from(['B', 'W']))]);
        let r = RewriteRule::parse(&unions, "?", "R", 1.0).unwrap();
        assert_eq!(r.input[Offset::new(0, 0, 0)], Some(SymbolSet::from(['B', 'W'])));
    }

    #[test]
    fn ishifts_combine_wildcard_and_symbol_buckets() {
        let r = rule("B*", "WW");
        let shifts: Vec<_> = r.get_ishifts('B').collect();
        // the wildcard cell admits B too
        assert_eq!(shifts, vec![Offset::new(0, 0, 1), Offset::new(0, 0, 0)]);
        let shifts: Vec<_> = r.get_ishifts('W').collect();
        assert_eq!(shifts, vec![Offset::new(0, 0, 1)]);
    }

    #[test]
    fn identity_tag_yields_the_seed_alone() {
        let variants = rule("BW", "WB").symmetries("").unwrap();
        assert_eq!(variants.len(), 1);
        assert!(!variants[0].is_copy);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(rule("B", "W").symmetries("(q)").is_none());
    }

    #[test]
    fn square_dihedral_of_an_asymmetric_rule_has_eight_members() {
        let variants = rule("BW WB", "WW WW").symmetries("(xy)").unwrap();
        assert_eq!(variants.len(), 8);
        assert!(variants.iter().skip(1).all(|v| v.is_copy));
    }

    #[test]
    fn symmetric_rules_collapse_their_duplicates() {
        // A 1×1 rule is fixed by every element of the group.
        let variants = rule("B", "W").symmetries("(xy)").unwrap();
        assert_eq!(variants.len(), 1);
    }

    #[test]
    fn variants_invert_back_to_the_seed() {
        let seed = rule("BW WB", "W* *W");
        let reflected = seed.xreflected();
        assert_eq!(reflected.xreflected(), seed);
        let turned = seed.xyrotated();
        assert_eq!(turned.xyrotated().xyrotated().xyrotated(), seed);
        assert_eq!(turned.input.extents, Size::new(1, 2, 2));
    }

    #[test]
    fn probability_is_clamped() {
        let r = RewriteRule::parse(&Unions::new(), "B", "W", 3.0).unwrap();
        assert_eq!(r.p, 1.0);
    }
}
