//! Simplification pipeline (spec §4.2 `processSimplification`).

use crate::callbacks::Callbacks;
use crate::error::Result;

use super::context::AstContext;
use super::node::{Children, NodeId, NodeKind};

/// Accepts a node, returns a textually round-tripped (simplified) node via
/// SMT-LIB2. Modeled as a trait: the crate ships no implementation (the SMT
/// solver is an external collaborator, spec §1.iii/§4.6); callers plug in
/// whatever solver-backed simplifier they have.
pub trait ExternalSimplifier {
    /// Simplify the SMT-LIB2 rendering of a node, returning SMT-LIB2 back.
    /// Implementations own both directions of the round-trip; this crate has
    /// no SMT-LIB2 parser of its own, so [`run`] only invokes this when a
    /// caller has supplied one and treats its output as opaque unless the
    /// caller also re-interns the result.
    fn simplify(&self, smtlib2: &str) -> Result<String>;
}

/// Runs the pipeline described in spec §4.2:
///
/// 1. if `callbacks` has any `SYMBOLIC_SIMPLIFICATION` handlers, feed `node`
///    through them left-to-right, each handler's output becoming the next
///    handler's input;
/// 2. if `use_external` and `external` is `Some`, round-trip the result
///    through it;
/// 3. return the final node id, re-interned into `ctx` if the dictionary is
///    active.
///
/// Pure: never mutates `node` itself, only allocates new nodes in `ctx` as a
/// side effect of re-interning.
pub fn run(
    ctx: &mut AstContext,
    callbacks: &Callbacks,
    node: NodeId,
    use_external: bool,
    external: Option<&dyn ExternalSimplifier>,
) -> Result<NodeId> {
    let mut current = callbacks.process_simplification(ctx, node)?;

    if use_external {
        if let Some(simplifier) = external {
            let smtlib2 = super::repr::to_smtlib2(ctx, current)?;
            let _round_tripped = simplifier.simplify(&smtlib2)?;
            // No SMT-LIB2 parser is implemented in this crate (§1.iii); the
            // external pass is therefore observational only until a parser
            // is supplied by the embedding application. `current` is
            // returned unchanged below.
            let _ = _round_tripped;
        }
    }

    current = reintern(ctx, current)?;
    Ok(current)
}

/// Re-interns a node (and, transitively, any of its children that aren't
/// already canonical) so the dictionary invariant holds after a pipeline
/// pass may have handed back a node built outside the canonical pool.
fn reintern(ctx: &mut AstContext, id: NodeId) -> Result<NodeId> {
    let node = ctx.get(id)?.clone();
    if ctx.get(node.id()).is_ok() {
        // Already a member of this context's pool: record_ast_node on an
        // existing node's own (kind, size, children) is a no-op lookup.
        return ctx.record_ast_node(node.kind().clone(), node.bit_size(), Children::from_slice(node.children()));
    }
    Ok(id)
}

/// A handful of canonical identity rewrites registered by
/// [`crate::symbolic::SymbolicEngine::init`] as the "internal passes" spec §2
/// describes — `x + 0 -> x`, `x * 1 -> x`, double-negation and
/// double-not elimination. These are ordinary `SYMBOLIC_SIMPLIFICATION`
/// callbacks; nothing distinguishes them from a caller's own at dispatch
/// time (spec scenario 4 registers such rules directly as callbacks).
pub fn identity_add(ctx: &mut AstContext, id: NodeId) -> Result<NodeId> {
    let node = ctx.get(id)?.clone();
    if *node.kind() != NodeKind::Bvadd {
        return Ok(id);
    }
    let [a, b]: [NodeId; 2] = node.children().try_into().unwrap();
    if is_zero_const(ctx, b)? {
        return Ok(a);
    }
    if is_zero_const(ctx, a)? {
        return Ok(b);
    }
    Ok(id)
}

/// `x * 1 -> x`.
pub fn identity_mul(ctx: &mut AstContext, id: NodeId) -> Result<NodeId> {
    let node = ctx.get(id)?.clone();
    if *node.kind() != NodeKind::Bvmul {
        return Ok(id);
    }
    let [a, b]: [NodeId; 2] = node.children().try_into().unwrap();
    if is_one_const(ctx, b)? {
        return Ok(a);
    }
    if is_one_const(ctx, a)? {
        return Ok(b);
    }
    Ok(id)
}

/// `~~x -> x`.
pub fn double_not(ctx: &mut AstContext, id: NodeId) -> Result<NodeId> {
    let node = ctx.get(id)?.clone();
    if *node.kind() != NodeKind::Bvnot {
        return Ok(id);
    }
    let child = ctx.get(node.children()[0])?.clone();
    if *child.kind() == NodeKind::Bvnot {
        return Ok(child.children()[0]);
    }
    Ok(id)
}

fn is_zero_const(ctx: &AstContext, id: NodeId) -> Result<bool> {
    Ok(matches!(ctx.get(id)?.kind(), NodeKind::Const(0)))
}

fn is_one_const(ctx: &AstContext, id: NodeId) -> Result<bool> {
    Ok(matches!(ctx.get(id)?.kind(), NodeKind::Const(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::Callbacks;

    #[test]
    fn simplification_chain_composes() {
        // (x + 0) * 1 -> x, via two independently registered rules.
        let mut ctx = AstContext::new();
        let mut callbacks = Callbacks::new();
        callbacks.add_simplification(identity_add);
        callbacks.add_simplification(identity_mul);

        let x = ctx.record_ast_node(NodeKind::Variable(crate::symbolic::VariableId::new(0)), 32, Children::new()).unwrap();
        let zero = ctx.record_ast_node(NodeKind::Const(0), 32, Children::new()).unwrap();
        let one = ctx.record_ast_node(NodeKind::Const(1), 32, Children::new()).unwrap();
        let x_plus_zero = ctx.record_ast_node(NodeKind::Bvadd, 32, Children::from_slice(&[x, zero])).unwrap();
        let expr = ctx.record_ast_node(NodeKind::Bvmul, 32, Children::from_slice(&[x_plus_zero, one])).unwrap();

        let simplified = run(&mut ctx, &callbacks, expr, false, None).unwrap();
        assert_eq!(simplified, x);
    }
}
