//! [`AstContext`]: the node allocation pool, its hash-consing dictionary and
//! the named-variable registry (spec §4.2).

use std::collections::HashMap;

use crate::error::{Error, Result};

use super::dictionary::AstDictionary;
use super::node::{AbstractNode, Children, NodeId, NodeKind};

/// Owns every live [`AbstractNode`] in a session, the dictionary that interns
/// them, and the name -> node bindings recorded via
/// [`AstContext::record_variable_ast_node`].
#[derive(Debug, Default)]
pub struct AstContext {
    nodes: HashMap<NodeId, AbstractNode>,
    next_id: u64,
    dictionary: AstDictionary,
    variables: HashMap<String, NodeId>,
}

impl AstContext {
    /// An empty context with hash-consing enabled.
    pub fn new() -> Self {
        Self { dictionary: AstDictionary::new(true), ..Self::default() }
    }

    /// Enable or disable the `AST_DICTIONARIES` optimisation.
    pub fn set_dictionary_enabled(&mut self, enabled: bool) {
        self.dictionary.set_enabled(enabled);
    }

    fn alloc_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Construct-and-intern: type-checks `(kind, size, children)` against the
    /// operator's typing rule, then either returns the existing canonical
    /// node (if hash-consing is on and a structural match exists) or
    /// allocates and stores a fresh one.
    ///
    /// This collapses the spec's separate "construct with type-checking" and
    /// "`recordAstNode` interns a pre-built node" steps into one entry point,
    /// since Rust has no uninitialized-but-constructed node to hand in
    /// independently of its owning pool.
    pub fn record_ast_node(&mut self, kind: NodeKind, size: u32, children: Children) -> Result<NodeId> {
        typecheck(self, &kind, size, &children)?;

        if let Some(existing) = self.dictionary.lookup(&kind, size, &children) {
            return Ok(existing);
        }

        let id = self.alloc_id();
        self.dictionary.insert(kind.clone(), size, children.clone(), id);
        self.nodes.insert(id, AbstractNode { id, kind, bit_size: size, children });
        Ok(id)
    }

    /// `getFullAstFromId`: a pure lookup (spec §8 invariant — same input,
    /// structurally identical output, since nodes are immutable).
    pub fn get(&self, id: NodeId) -> Result<&AbstractNode> {
        self.nodes.get(&id).ok_or(Error::AstNotFound(id))
    }

    /// Bit-size of a node, looked up by id.
    pub(crate) fn bit_size_of(&self, id: NodeId) -> Result<u32> {
        self.get(id).map(AbstractNode::bit_size)
    }

    /// Post-order DFS collecting each node reachable from `root` exactly
    /// once.
    pub fn extract_unique_ast_nodes(&self, root: NodeId) -> Result<Vec<NodeId>> {
        let mut visited = std::collections::HashSet::new();
        let mut out = Vec::new();
        self.visit_post_order(root, &mut visited, &mut out)?;
        Ok(out)
    }

    fn visit_post_order(&self, id: NodeId, visited: &mut std::collections::HashSet<NodeId>, out: &mut Vec<NodeId>) -> Result<()> {
        if visited.contains(&id) {
            return Ok(());
        }
        visited.insert(id);
        let node = self.get(id)?;
        let children = node.children.clone();
        for child in children {
            self.visit_post_order(child, visited, out)?;
        }
        out.push(id);
        Ok(())
    }

    /// Releases the given nodes and severs their dictionary entries. Callers
    /// are responsible for not freeing a node still referenced as a child of
    /// a live node or as an expression root.
    pub fn free_ast_nodes(&mut self, ids: &[NodeId]) {
        for id in ids {
            if let Some(node) = self.nodes.remove(id) {
                self.dictionary.remove(&node.kind, node.bit_size, &node.children);
            }
        }
    }

    /// Tears down the entire pool, including the dictionary.
    pub fn free_all_ast_nodes(&mut self) {
        self.nodes.clear();
        self.dictionary.clear();
    }

    /// Every node id currently allocated. Order is unspecified.
    pub fn allocated_ast_nodes(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Replaces the allocation pool wholesale (used by backup/restore).
    pub(crate) fn set_allocated_ast_nodes(&mut self, nodes: HashMap<NodeId, AbstractNode>, next_id: u64) {
        self.nodes = nodes;
        self.next_id = next_id;
    }

    pub(crate) fn snapshot_nodes(&self) -> (HashMap<NodeId, AbstractNode>, u64) {
        (self.nodes.clone(), self.next_id)
    }

    /// Snapshot of the hash-consing dictionary, so a backup/restore round
    /// trip can undo dictionary entries for nodes allocated after the
    /// backup, not just the node pool itself.
    pub(crate) fn snapshot_dictionary(&self) -> AstDictionary {
        self.dictionary.clone()
    }

    /// Replaces the dictionary wholesale (used by backup/restore, paired
    /// with [`Self::set_allocated_ast_nodes`]).
    pub(crate) fn set_dictionary(&mut self, dictionary: AstDictionary) {
        self.dictionary = dictionary;
    }

    /// `recordVariableAstNode(name, node)`: rebinding a name overwrites the
    /// previous binding.
    pub fn record_variable_ast_node(&mut self, name: impl Into<String>, node: NodeId) {
        self.variables.insert(name.into(), node);
    }

    /// `getAstVariableNode(name)`.
    pub fn get_ast_variable_node(&self, name: &str) -> Option<NodeId> {
        self.variables.get(name).copied()
    }

    /// `getAstVariableNodes`.
    pub fn ast_variable_nodes(&self) -> &HashMap<String, NodeId> {
        &self.variables
    }

    /// `setAstVariableNodes`.
    pub fn set_ast_variable_nodes(&mut self, variables: HashMap<String, NodeId>) {
        self.variables = variables;
    }

    /// Number of currently interned dictionary entries.
    pub fn dictionary_len(&self) -> usize {
        self.dictionary.len()
    }
}

/// Operator-specific typing rules (spec §4.2: "construct nodes with
/// operator-specific type-checking"). Never mutates `ctx` — only reads child
/// bit-sizes.
fn typecheck(ctx: &AstContext, kind: &NodeKind, size: u32, children: &Children) -> Result<()> {
    use NodeKind::*;

    let err = |msg: String| Error::AstTypingError(msg);
    let child_size = |ctx: &AstContext, idx: usize| -> Result<u32> {
        let id = children.get(idx).ok_or_else(|| err(format!("{kind:?}: missing child {idx}")))?;
        ctx.bit_size_of(*id)
    };

    if size < crate::consts::MIN_BIT_SIZE || size > crate::consts::MAX_BIT_SIZE {
        return Err(err(format!("bit size {size} out of range")));
    }

    if !kind.is_variadic() {
        let expected_arity = match kind {
            Const(_) | Variable(_) => 0,
            Extract { .. } | Zext(_) | Sext(_) | Bvnot | Bvneg | Lnot => 1,
            Bvadd | Bvsub | Bvmul | Bvudiv | Bvsdiv | Bvurem | Bvsrem | Bvand | Bvor | Bvxor | Bvshl | Bvlshr
            | Bvashr | Bvrol | Bvror | Equal | Distinct | Bvult | Bvule | Bvslt | Bvsle => 2,
            Ite => 3,
            Concat | Land | Lor => unreachable!("variadic handled above"),
        };
        if children.len() != expected_arity {
            return Err(err(format!("{kind:?}: expected {expected_arity} children, got {}", children.len())));
        }
    } else if children.len() < 2 {
        return Err(err(format!("{kind:?}: variadic operator needs at least 2 children")));
    }

    match kind {
        Const(_) | Variable(_) => {}

        Extract { high, low } => {
            let child = child_size(ctx, 0)?;
            if low > high || *high >= child {
                return Err(err(format!("extract({high}, {low}) out of bounds for {child}-bit child")));
            }
            if size != high - low + 1 {
                return Err(err("extract size mismatch".into()));
            }
        }

        Concat => {
            let mut total = 0u32;
            for &c in children.iter() {
                total += ctx.bit_size_of(c)?;
            }
            if total != size {
                return Err(err(format!("concat size mismatch: children sum to {total}, node declares {size}")));
            }
        }

        Zext(extra) | Sext(extra) => {
            let child = child_size(ctx, 0)?;
            if size != child + extra {
                return Err(err("extend size mismatch".into()));
            }
        }

        Bvadd | Bvsub | Bvmul | Bvudiv | Bvsdiv | Bvurem | Bvsrem | Bvand | Bvor | Bvxor | Bvshl | Bvlshr | Bvashr
        | Bvrol | Bvror => {
            let a = child_size(ctx, 0)?;
            let b = child_size(ctx, 1)?;
            if a != b || a != size {
                return Err(err(format!("{kind:?}: operand size mismatch ({a} vs {b}, node {size})")));
            }
        }

        Bvnot | Bvneg => {
            let a = child_size(ctx, 0)?;
            if a != size {
                return Err(err(format!("{kind:?}: size mismatch")));
            }
        }

        Ite => {
            let cond = child_size(ctx, 0)?;
            let then_size = child_size(ctx, 1)?;
            let else_size = child_size(ctx, 2)?;
            if cond != 1 {
                return Err(err("ite condition must be 1 bit".into()));
            }
            if then_size != else_size || then_size != size {
                return Err(err("ite branch size mismatch".into()));
            }
        }

        Equal | Distinct | Bvult | Bvule | Bvslt | Bvsle => {
            let a = child_size(ctx, 0)?;
            let b = child_size(ctx, 1)?;
            if a != b {
                return Err(err(format!("{kind:?}: operand size mismatch ({a} vs {b})")));
            }
            if size != 1 {
                return Err(err(format!("{kind:?}: result must be 1 bit")));
            }
        }

        Land | Lor => {
            for &c in children.iter() {
                if ctx.bit_size_of(c)? != 1 {
                    return Err(err(format!("{kind:?}: operands must be 1 bit")));
                }
            }
            if size != 1 {
                return Err(err(format!("{kind:?}: result must be 1 bit")));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn konst(ctx: &mut AstContext, value: u128, size: u32) -> NodeId {
        ctx.record_ast_node(NodeKind::Const(value), size, Children::new()).unwrap()
    }

    #[test]
    fn record_ast_node_is_idempotent_under_dictionary() {
        let mut ctx = AstContext::new();
        let a = konst(&mut ctx, 5, 32);
        let b = konst(&mut ctx, 5, 32);
        assert_eq!(a, b, "structurally equal nodes must share a representative");
    }

    #[test]
    fn disabling_dictionary_allocates_distinct_nodes() {
        let mut ctx = AstContext::new();
        ctx.set_dictionary_enabled(false);
        let a = konst(&mut ctx, 5, 32);
        let b = konst(&mut ctx, 5, 32);
        assert_ne!(a, b);
    }

    #[test]
    fn extract_typing_rejects_out_of_bounds() {
        let mut ctx = AstContext::new();
        let c = konst(&mut ctx, 0xff, 8);
        let bad = ctx.record_ast_node(NodeKind::Extract { high: 15, low: 0 }, 16, Children::from_slice(&[c]));
        assert!(matches!(bad, Err(Error::AstTypingError(_))));
    }

    #[test]
    fn concat_size_must_match_children_sum() {
        let mut ctx = AstContext::new();
        let a = konst(&mut ctx, 1, 8);
        let b = konst(&mut ctx, 2, 8);
        let ok = ctx.record_ast_node(NodeKind::Concat, 16, Children::from_slice(&[a, b]));
        assert!(ok.is_ok());
        let bad = ctx.record_ast_node(NodeKind::Concat, 8, Children::from_slice(&[a, b]));
        assert!(bad.is_err());
    }

    #[test]
    fn extract_unique_ast_nodes_visits_each_node_once() {
        let mut ctx = AstContext::new();
        let a = konst(&mut ctx, 1, 8);
        let sum = ctx.record_ast_node(NodeKind::Bvadd, 8, Children::from_slice(&[a, a])).unwrap();
        let unique = ctx.extract_unique_ast_nodes(sum).unwrap();
        assert_eq!(unique.len(), 2, "shared child `a` must appear once, not twice");
    }

    #[test]
    fn free_ast_nodes_evicts_dictionary_entry() {
        let mut ctx = AstContext::new();
        let a = konst(&mut ctx, 7, 8);
        ctx.free_ast_nodes(&[a]);
        assert!(ctx.get(a).is_err());
        let b = konst(&mut ctx, 7, 8);
        assert_ne!(a, b, "a fresh id must be allocated after the old one was freed");
    }
}
