// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The program tree: leaves wrap a [`RuleNode`], composites dispatch their
//! children by SEQUENCE or MARKOV policy.
//!
//! Execution is a cooperative routine: `step` runs at most one tick and
//! reports whether it produced work. The variants form a closed sum — the
//! node set is small and fixed, so no open polymorphism.

use crate::grid::TracedGrid;
use crate::node::RuleNode;
use crate::rule::Symbol;

/// Dispatch policy of a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMode {
    /// Advance to the next child when the current one is exhausted.
    Sequence,
    /// Restart from the first child every time any child succeeds.
    Markov,
}

/// A leaf runner: a rule node plus its step bound.
#[derive(Debug)]
pub struct RuleRunner {
    /// The wrapped leaf.
    pub node: RuleNode,
    /// Ticks completed since the last reset.
    pub step: u32,
    /// Tick bound; 0 means unbounded.
    pub steps: u32,
}

impl RuleRunner {
    /// Wraps a leaf with a step bound (`steps == 0` for unbounded).
    #[must_use]
    pub fn new(node: RuleNode, steps: u32) -> Self {
        Self {
            node,
            step: 0,
            steps,
        }
    }

    /// Runs one tick; `true` when changes were produced and applied.
    pub fn step(&mut self, grid: &mut TracedGrid<Symbol>) -> bool {
        if self.steps > 0 && self.step >= self.steps {
            return false;
        }

        let changes = self.node.tick(grid);
        if changes.is_empty() {
            return false;
        }

        for change in changes {
            grid.apply(change);
        }
        self.step += 1;
        true
    }

    /// Returns the leaf to its initial state.
    pub fn reset(&mut self) {
        self.step = 0;
        self.node.reset();
    }
}

/// A composite runner driving child runners under a dispatch policy.
#[derive(Debug)]
pub struct TreeRunner {
    /// Dispatch policy.
    pub mode: TreeMode,
    /// Child runners in program order.
    pub nodes: Vec<NodeRunner>,
    current: usize,
}

impl TreeRunner {
    /// Builds a composite over `nodes`.
    #[must_use]
    pub fn new(mode: TreeMode, nodes: Vec<NodeRunner>) -> Self {
        Self {
            mode,
            nodes,
            current: 0,
        }
    }

    /// Runs one tick of the first child that still has work.
    ///
    /// Exhausted children are skipped without consuming the tick. When every
    /// child is exhausted the whole subtree resets and `false` is returned —
    /// the program under this node is complete.
    pub fn step(&mut self, grid: &mut TracedGrid<Symbol>) -> bool {
        while let Some(child) = self.nodes.get_mut(self.current) {
            if child.step(grid) {
                if self.mode == TreeMode::Markov {
                    self.current = 0;
                }
                return true;
            }
            self.current += 1;
        }

        self.reset();
        false
    }

    /// Recursively returns the subtree to its initial state.
    pub fn reset(&mut self) {
        self.current = 0;
        for node in &mut self.nodes {
            node.reset();
        }
    }

    /// The leaf that would run next, if any.
    #[must_use]
    pub fn current(&self) -> Option<&RuleNode> {
        self.nodes.get(self.current).and_then(NodeRunner::current)
    }
}

/// Either kind of program node.
#[derive(Debug)]
pub enum NodeRunner {
    /// A leaf.
    Rule(RuleRunner),
    /// A composite.
    Tree(TreeRunner),
}

impl NodeRunner {
    /// Runs one tick; `true` when the subtree produced work.
    pub fn step(&mut self, grid: &mut TracedGrid<Symbol>) -> bool {
        match self {
            Self::Rule(r) => r.step(grid),
            Self::Tree(t) => t.step(grid),
        }
    }

    /// Recursively returns the subtree to its initial state.
    pub fn reset(&mut self) {
        match self {
            Self::Rule(r) => r.reset(),
            Self::Tree(t) => t.reset(),
        }
    }

    /// The leaf that would run next, if any.
    #[must_use]
    pub fn current(&self) -> Option<&RuleNode> {
        match self {
            Self::Rule(r) => Some(&r.node),
            Self::Tree(t) => t.current(),
        }
    }
}
