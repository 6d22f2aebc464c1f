// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The program document: an XML tree of sequence/markov composites and
//! one/all/prl leaves, compiled into a ready-to-run [`TreeRunner`].
//!
//! Unions accumulate down the tree (outer definitions win), the symmetry
//! attribute is inherited from ancestors, and a leaf without `<rule>`
//! children treats its own `in`/`out` attributes as its single rule.

use roxmltree::{Document, Node};

use tessera_core::{
    Field, Fields, Grid, Inference, Mode, NodeRunner, Observe, Observes, RewriteRule, RuleNode,
    RuleRunner, Symbol, SymbolSet, TreeMode, TreeRunner, Unions, IGNORED,
};

use crate::document::{
    get_bool, get_char, get_charset, get_f64, get_i32, get_optchar, get_string, get_u32, offset,
    tag,
};
use crate::error::ModelError;

/// A compiled program document.
#[derive(Debug)]
pub struct Model {
    /// The alphabet, in declaration order; the first symbol fills fresh
    /// grids, the second seeds the center cell when `origin` is set.
    pub symbols: Vec<Symbol>,
    /// Every named union in scope at the root, the wildcard included.
    pub unions: Unions,
    /// Start with the center cell at the second symbol.
    pub origin: bool,
    /// The runnable program tree.
    pub program: TreeRunner,
}

impl Model {
    /// Compiles a program document.
    ///
    /// `seed` roots the per-leaf generator seeds, so a fixed seed
    /// reproduces a run exactly.
    pub fn from_document(src: &str, seed: u64) -> Result<Self, ModelError> {
        let doc = Document::parse(src)?;
        let root = doc.root_element();

        let symbols_str = get_string(&root, "values")?;
        let symbols: Vec<Symbol> = symbols_str.chars().collect();
        let mut distinct = SymbolSet::new();
        for &c in &symbols {
            if !distinct.insert(c) {
                return Err(ModelError::DuplicateSymbol {
                    attribute: "values",
                    element: tag(&root),
                    offset: offset(&root),
                });
            }
        }

        let mut unions = Unions::new();
        unions.insert(IGNORED, distinct);
        for &c in &symbols {
            unions.entry(c).or_insert_with(|| SymbolSet::from([c]));
        }

        let origin = get_bool(&root, "origin", false)?;

        let mut seeds = SeedSequence::new(seed);
        let program = match node_runner(&root, unions.clone(), "", &mut seeds)? {
            NodeRunner::Tree(tree) => tree,
            leaf @ NodeRunner::Rule(_) => TreeRunner::new(TreeMode::Markov, vec![leaf]),
        };

        Ok(Self {
            symbols,
            unions,
            origin,
            program,
        })
    }
}

/// Deterministic per-leaf seed stream (SplitMix64).
struct SeedSequence {
    state: u64,
}

impl SeedSequence {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

fn node_runner(
    node: &Node<'_, '_>,
    mut unions: Unions,
    symmetry: &str,
    seeds: &mut SeedSequence,
) -> Result<NodeRunner, ModelError> {
    let symmetry = node.attribute("symmetry").unwrap_or(symmetry);

    for child in node.children().filter(|n| n.has_tag_name("union")) {
        let symbol = get_char(&child, "symbol")?;
        let values = get_charset(&child, "values")?;
        unions.entry(symbol).or_insert(values);
    }

    match node.tag_name().name() {
        name @ ("sequence" | "markov") => {
            let mode = if name == "sequence" {
                TreeMode::Sequence
            } else {
                TreeMode::Markov
            };
            let mut children = Vec::new();
            for child in node
                .children()
                .filter(Node::is_element)
                .filter(|n| !n.has_tag_name("union"))
            {
                children.push(node_runner(&child, unions.clone(), symmetry, seeds)?);
            }
            Ok(NodeRunner::Tree(TreeRunner::new(mode, children)))
        }

        "one" | "all" | "prl" => {
            let steps = get_u32(node, "steps", 0)?;
            Ok(NodeRunner::Rule(RuleRunner::new(
                rule_node(node, &unions, symmetry, seeds)?,
                steps,
            )))
        }

        other => Err(ModelError::UnknownTag {
            tag: other.to_owned(),
            offset: offset(node),
        }),
    }
}

fn rule_node(
    node: &Node<'_, '_>,
    unions: &Unions,
    symmetry: &str,
    seeds: &mut SeedSequence,
) -> Result<RuleNode, ModelError> {
    let mode = match node.tag_name().name() {
        "one" => Mode::One,
        "all" => Mode::All,
        _ => Mode::Prl,
    };

    let rules = rules(node, unions, symmetry)?;

    let inference = if get_bool(node, "search", false)? {
        Inference::Search {
            observes: observes(node)?,
            limit: get_i32(node, "limit", 0)?,
            depth_coefficient: get_f64(node, "depthCoefficient", 0.5)?,
        }
    } else if node.children().any(|n| n.has_tag_name("observe")) {
        Inference::Observe {
            observes: observes(node)?,
            temperature: get_f64(node, "temperature", 0.0)?,
        }
    } else if node.children().any(|n| n.has_tag_name("field")) {
        Inference::Distance {
            fields: fields(node)?,
            temperature: get_f64(node, "temperature", 0.0)?,
        }
    } else {
        Inference::Random
    };

    Ok(RuleNode::new(mode, rules, inference, seeds.next()))
}

fn rule(node: &Node<'_, '_>, unions: &Unions) -> Result<RewriteRule, ModelError> {
    let input = get_string(node, "in")?;
    let output = get_string(node, "out")?;
    let p = get_f64(node, "p", 1.0)?;

    let pattern_err = |attribute| {
        move |source| ModelError::Pattern {
            attribute,
            element: tag(node),
            offset: offset(node),
            source,
        }
    };
    // validate both shapes before binding unions, so a mismatch is
    // reported as such rather than as a constructor failure
    let in_shape = Grid::parse(input, |c| c).map_err(pattern_err("in"))?;
    let out_shape = Grid::parse(output, |c| c).map_err(pattern_err("out"))?;
    if in_shape.extents != out_shape.extents {
        return Err(ModelError::ShapeMismatch {
            element: tag(node),
            offset: offset(node),
        });
    }

    RewriteRule::parse(unions, input, output, p).map_err(pattern_err("in"))
}

fn rules(
    node: &Node<'_, '_>,
    unions: &Unions,
    symmetry: &str,
) -> Result<Vec<RewriteRule>, ModelError> {
    let mut seeds = Vec::new();
    for child in node.children().filter(|n| n.has_tag_name("rule")) {
        seeds.push((rule(&child, unions)?, offset(&child)));
    }
    if seeds.is_empty() {
        seeds.push((rule(node, unions)?, offset(node)));
    }

    let mut expanded = Vec::new();
    for (seed, at) in seeds {
        let variants = seed
            .symmetries(symmetry)
            .ok_or_else(|| ModelError::UnknownSymmetry {
                tag: symmetry.to_owned(),
                offset: at,
            })?;
        expanded.extend(variants);
    }
    Ok(expanded)
}

fn fields(node: &Node<'_, '_>) -> Result<Fields, ModelError> {
    let mut fields = Fields::new();
    for child in node.children().filter(|n| n.has_tag_name("field")) {
        let target = get_char(&child, "for")?;
        let substrate = get_charset(&child, "on")?;

        let inversed = match (child.attribute("from"), child.attribute("to")) {
            (Some(_), None) => true,
            (None, Some(_)) => false,
            _ => {
                return Err(ModelError::FieldDirection {
                    offset: offset(&child),
                })
            }
        };
        let zero = get_charset(&child, if inversed { "from" } else { "to" })?;

        fields.insert(
            target,
            Field {
                recompute: get_bool(&child, "recompute", false)?,
                essential: get_bool(&child, "essential", false)?,
                inversed,
                substrate,
                zero,
            },
        );
    }
    Ok(fields)
}

fn observes(node: &Node<'_, '_>) -> Result<Observes, ModelError> {
    let mut observes = Observes::new();
    for child in node.children().filter(|n| n.has_tag_name("observe")) {
        let value = get_char(&child, "value")?;
        observes.insert(
            value,
            Observe {
                from: get_optchar(&child, "from")?,
                to: get_charset(&child, "to")?,
            },
        );
    }
    Ok(observes)
}
