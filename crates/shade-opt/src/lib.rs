//! Graph rewriting and optimization passes for Shade.
//!
//! Provides [`replace_if`], a [`Pass`] trait, a [`PassManager`] with
//! fixed-point iteration, and the built-in passes (constant folding,
//! per-component folding, common subexpression elimination).

mod component_fold;
mod const_fold;
mod cse;
pub mod rewrite;

pub use component_fold::ComponentFolding;
pub use const_fold::ConstantFolding;
pub use cse::CommonSubexprElimination;
pub use rewrite::replace_if;

use std::fmt::Debug;

use shade_ir::{Graph, NodeHandle, Result};

/// A graph transformation rooted at one expression.
pub trait Pass: Debug {
    /// Human-readable name of the pass.
    fn name(&self) -> &str;

    /// Runs the pass over the sub-graph of `root` and returns the new root.
    /// Returning `root` itself means nothing changed.
    fn run(&self, g: &mut Graph, root: NodeHandle) -> Result<NodeHandle>;
}

/// Optimization level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OptLevel {
    /// No optimizations.
    O0,
    /// Constant folding and CSE.
    #[default]
    O1,
    /// O1 plus per-component folding of partially constant vectors.
    O2,
}

/// Maximum number of fixed-point iterations before giving up.
const MAX_ITERATIONS: usize = 10;

/// Runs passes in sequence with fixed-point iteration.
#[derive(Debug, Default)]
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pass manager with passes appropriate for the given level.
    pub fn for_level(level: OptLevel) -> Self {
        let mut pm = Self::new();
        match level {
            OptLevel::O0 => {}
            OptLevel::O1 => {
                pm.add_pass(Box::new(ConstantFolding));
                pm.add_pass(Box::new(CommonSubexprElimination));
            }
            OptLevel::O2 => {
                pm.add_pass(Box::new(ComponentFolding));
                pm.add_pass(Box::new(ConstantFolding));
                pm.add_pass(Box::new(CommonSubexprElimination));
            }
        }
        pm
    }

    pub fn add_pass(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs all passes until the root stops changing or the iteration
    /// limit is hit.
    pub fn run(&self, g: &mut Graph, mut root: NodeHandle) -> Result<NodeHandle> {
        for iteration in 0..MAX_ITERATIONS {
            let start = root;
            for pass in &self.passes {
                let next = pass.run(g, root)?;
                if next != root {
                    log::debug!("pass {} changed the graph (iteration {iteration})", pass.name());
                }
                root = next;
            }
            if root == start {
                break;
            }
        }
        Ok(root)
    }
}

/// Runs the O1 pipeline on `root`.
pub fn optimize(g: &mut Graph, root: NodeHandle) -> Result<NodeHandle> {
    PassManager::for_level(OptLevel::O1).run(g, root)
}
