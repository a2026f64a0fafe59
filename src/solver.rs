//! Solver interface (§4.6): the SMT solver is an external collaborator. This
//! crate ships only the trait boundary and the value types it exchanges,
//! plus a `NullSolver` test double.

use std::collections::HashMap;

use crate::ast::NodeId;
use crate::error::{Error, Result};
use crate::symbolic::VariableId;

/// A concrete value assigned to a variable by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverValue {
    /// The assigned bits, widened to `u128` regardless of the variable's
    /// declared bit-size.
    pub value: u128,
    /// The variable's declared bit-size, for callers rendering the value.
    pub size: u32,
}

/// One satisfying assignment: variable id -> value.
#[derive(Debug, Clone, Default)]
pub struct Model {
    assignments: HashMap<VariableId, SolverValue>,
}

impl Model {
    /// An empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an assignment.
    pub fn insert(&mut self, variable: VariableId, value: SolverValue) {
        self.assignments.insert(variable, value);
    }

    /// Look up a variable's assigned value.
    pub fn get(&self, variable: VariableId) -> Option<SolverValue> {
        self.assignments.get(&variable).copied()
    }

    /// Every assignment in this model.
    pub fn assignments(&self) -> &HashMap<VariableId, SolverValue> {
        &self.assignments
    }
}

/// The external SMT solver contract (spec §4.6: `getModel`, `getModels`,
/// `evaluate`). No implementation ships in this crate; an embedding
/// application supplies one backed by a real solver process or library.
pub trait Solver {
    /// A single satisfying assignment for `predicate`, if one exists.
    fn get_model(&self, predicate: NodeId) -> Result<Option<Model>>;

    /// Up to `limit` distinct satisfying assignments for `predicate`.
    fn get_models(&self, predicate: NodeId, limit: usize) -> Result<Vec<Model>>;

    /// Evaluate `node` under a concrete model, returning its resulting
    /// value.
    fn evaluate(&self, node: NodeId, model: &Model) -> Result<SolverValue>;
}

/// A `Solver` that always reports unsatisfiable. Used by this crate's own
/// tests where a predicate must be constructed but never actually solved —
/// grounded in the teacher's `MemoryStorage` pattern of a trait-bounded test
/// double standing in for a real backing collaborator.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSolver;

impl Solver for NullSolver {
    fn get_model(&self, _predicate: NodeId) -> Result<Option<Model>> {
        Ok(None)
    }

    fn get_models(&self, _predicate: NodeId, _limit: usize) -> Result<Vec<Model>> {
        Ok(Vec::new())
    }

    fn evaluate(&self, _node: NodeId, _model: &Model) -> Result<SolverValue> {
        Err(Error::SolverFailure("NullSolver cannot evaluate anything".into()))
    }
}
