//! Snapshot/restore (spec §4.4: "one-deep backup of engine state").

use std::collections::HashMap;

use crate::arch::RegisterId;
use crate::ast::{AbstractNode, AstDictionary, NodeId};
use crate::error::{Error, Result};

use super::expression::{ExpressionId, SymbolicExpression, SymbolicVariable, VariableId};
use super::{EngineState, PathConstraint, SymbolicEngine};

/// A single captured copy of everything [`SymbolicEngine::restore`] needs to
/// undo since the matching [`SymbolicEngine::backup`] call. Only one
/// snapshot is kept at a time — a second `backup()` call overwrites the
/// first, matching spec §4.4's "one-deep" backup.
#[derive(Debug, Clone)]
pub struct Snapshot {
    nodes: HashMap<NodeId, AbstractNode>,
    next_node_id: u64,
    dictionary: AstDictionary,
    reg_map: HashMap<RegisterId, ExpressionId>,
    mem_map: HashMap<u64, ExpressionId>,
    expressions: HashMap<ExpressionId, SymbolicExpression>,
    next_expression_id: u64,
    variables: HashMap<VariableId, SymbolicVariable>,
    next_variable_id: u64,
    path_constraints: Vec<PathConstraint>,
    aligned_cache: HashMap<(u64, u32), NodeId>,
}

impl SymbolicEngine {
    /// Captures a snapshot of every mutable table and moves the engine to
    /// [`EngineState::BackedUp`]. Overwrites any previously captured
    /// snapshot.
    pub fn backup(&mut self) -> Result<()> {
        self.check_symbolic()?;
        let (nodes, next_node_id) = self.ctx.snapshot_nodes();
        let dictionary = self.ctx.snapshot_dictionary();
        self.backup = Some(Snapshot {
            nodes,
            next_node_id,
            dictionary,
            reg_map: self.reg_map.clone(),
            mem_map: self.mem_map.clone(),
            expressions: self.expressions.clone(),
            next_expression_id: self.next_expression_id,
            variables: self.variables.clone(),
            next_variable_id: self.next_variable_id,
            path_constraints: self.path_constraints.clone(),
            aligned_cache: self.aligned_cache.clone(),
        });
        self.state = EngineState::BackedUp;
        Ok(())
    }

    /// Restores the last captured snapshot and moves the engine back to
    /// [`EngineState::Running`]. The snapshot slot is cleared afterwards.
    /// Restoring without a prior [`SymbolicEngine::backup`] call is a no-op
    /// (spec §4.4), not an error.
    pub fn restore(&mut self) -> Result<()> {
        self.check_symbolic()?;
        let Some(snap) = self.backup.take() else {
            return Ok(());
        };
        self.ctx.set_allocated_ast_nodes(snap.nodes, snap.next_node_id);
        self.ctx.set_dictionary(snap.dictionary);
        self.reg_map = snap.reg_map;
        self.mem_map = snap.mem_map;
        self.expressions = snap.expressions;
        self.next_expression_id = snap.next_expression_id;
        self.variables = snap.variables;
        self.next_variable_id = snap.next_variable_id;
        self.path_constraints = snap.path_constraints;
        self.aligned_cache = snap.aligned_cache;
        self.state = EngineState::Running;
        Ok(())
    }

    /// `true` while a snapshot is held.
    pub const fn has_backup(&self) -> bool {
        self.backup.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::super::Origin;
    use super::*;
    use crate::ast::{Children, NodeKind};
    use crate::callbacks::Callbacks;

    #[test]
    fn restore_undoes_mutations_since_backup() {
        let mut engine = SymbolicEngine::new();
        let mut callbacks = Callbacks::new();
        engine.init(&mut callbacks).unwrap();

        let a = engine.ast_context_mut().record_ast_node(NodeKind::Const(1), 8, Children::new()).unwrap();
        let expr_a = engine.new_symbolic_expression(a, Origin::Volatile, "a").unwrap();

        engine.backup().unwrap();

        let b = engine.ast_context_mut().record_ast_node(NodeKind::Const(2), 8, Children::new()).unwrap();
        let _expr_b = engine.new_symbolic_expression(b, Origin::Volatile, "b").unwrap();
        assert_eq!(engine.symbolic_expressions().len(), 2);

        engine.restore().unwrap();
        assert_eq!(engine.symbolic_expressions().len(), 1);
        assert!(engine.get_symbolic_expression(expr_a).is_ok());
        assert!(!engine.has_backup());
    }

    #[test]
    fn restore_evicts_dictionary_entries_allocated_after_backup() {
        let mut engine = SymbolicEngine::new();
        let mut callbacks = Callbacks::new();
        engine.init(&mut callbacks).unwrap();

        engine.backup().unwrap();

        let five = engine.ast_context_mut().record_ast_node(NodeKind::Const(5), 64, Children::new()).unwrap();
        let _sum = engine
            .ast_context_mut()
            .record_ast_node(NodeKind::Bvadd, 64, Children::from_slice(&[five, five]))
            .unwrap();

        engine.restore().unwrap();

        // The dictionary must not hand back a stale id for a node the
        // rewound pool no longer holds.
        let five_again = engine.ast_context_mut().record_ast_node(NodeKind::Const(5), 64, Children::new()).unwrap();
        assert!(engine.ast_context().get(five_again).is_ok());
        assert_eq!(engine.ast_context().get(five_again).unwrap().kind(), &NodeKind::Const(5));
    }

    #[test]
    fn restore_without_backup_is_a_no_op() {
        let mut engine = SymbolicEngine::new();
        let mut callbacks = Callbacks::new();
        engine.init(&mut callbacks).unwrap();

        let a = engine.ast_context_mut().record_ast_node(NodeKind::Const(1), 8, Children::new()).unwrap();
        let _expr_a = engine.new_symbolic_expression(a, Origin::Volatile, "a").unwrap();

        assert!(engine.restore().is_ok());
        assert_eq!(engine.symbolic_expressions().len(), 1);
    }
}
