//! Symbolic engine (§4.4): owns the AST context, the register/memory symbolic
//! bindings, the expression and variable tables, path constraints and the
//! optimisation flag set.

pub mod backup;
pub mod expression;
pub mod operand;

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::arch::RegisterId;
use crate::ast::{AstContext, AstRepresentationMode, Children, NodeId, NodeKind};
use crate::callbacks::Callbacks;
use crate::error::{Error, Result};

pub use backup::Snapshot;
pub use expression::{ExpressionId, Origin, SymbolicExpression, SymbolicVariable, VariableId, VariableOrigin};

use crate::ast::simplify::ExternalSimplifier;

/// Lifecycle states (spec §4.4): `UNINITIALISED -> INITIALISED -> RUNNING <->
/// BACKED_UP -> ... -> TORN_DOWN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EngineState {
    /// No architecture-independent setup has run yet.
    Uninitialised,
    /// [`SymbolicEngine::init`] has run; no instruction has been processed.
    Initialised,
    /// At least one mutating operation has run since the last init/restore.
    Running,
    /// [`SymbolicEngine::backup`] has captured a snapshot; mutations are
    /// still permitted and move the engine back to `Running` only via
    /// [`SymbolicEngine::restore`].
    BackedUp,
    /// [`SymbolicEngine::remove`] has run; the engine must be re-initialised
    /// before further use.
    TornDown,
}

/// The optimisation flags named in spec §4.4, toggled individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
pub enum Optimization {
    /// Hash-cons structurally-equal AST nodes (forwarded to
    /// [`AstContext::set_dictionary_enabled`]).
    AstDictionaries,
    /// Cache the last concat built for a given `(address, size)` memory read
    /// and reuse it until any byte in the range is rewritten.
    AlignedMemory,
    /// Skip symbolic expression creation for instructions whose operands
    /// carry no taint (consulted by [`crate::facade::Facade::processing`]).
    OnlyOnTainted,
    /// Skip symbolic expression creation for instructions whose operands are
    /// all concrete (no `Variable` node reachable from any operand).
    OnlyOnSymbolized,
}

/// One accumulated branch condition (spec §3: "conjunction = path
/// condition").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathConstraint {
    /// Address of the branch instruction that recorded this constraint.
    pub instruction_address: u64,
    /// The condition node for the branch actually taken.
    pub taken: NodeId,
    /// The condition node for the branch not taken, when known.
    pub not_taken: Option<NodeId>,
}

/// Symbolic Engine (spec §4.4): the AST context plus everything layered on
/// top of it — register/memory symbolic bindings, expression/variable
/// tables, path constraints and the optimisation flag set.
#[derive(Debug)]
pub struct SymbolicEngine {
    state: EngineState,
    ctx: AstContext,
    reg_map: HashMap<RegisterId, ExpressionId>,
    mem_map: HashMap<u64, ExpressionId>,
    expressions: HashMap<ExpressionId, SymbolicExpression>,
    next_expression_id: u64,
    variables: HashMap<VariableId, SymbolicVariable>,
    next_variable_id: u64,
    path_constraints: Vec<PathConstraint>,
    optimizations: HashSet<Optimization>,
    representation_mode: AstRepresentationMode,
    aligned_cache: HashMap<(u64, u32), NodeId>,
    use_external_simplification: bool,
    backup: Option<Snapshot>,
}

impl Default for SymbolicEngine {
    fn default() -> Self {
        let mut optimizations = HashSet::new();
        optimizations.insert(Optimization::AstDictionaries);
        Self {
            state: EngineState::Uninitialised,
            ctx: AstContext::new(),
            reg_map: HashMap::new(),
            mem_map: HashMap::new(),
            expressions: HashMap::new(),
            next_expression_id: 0,
            variables: HashMap::new(),
            next_variable_id: 0,
            path_constraints: Vec::new(),
            optimizations,
            representation_mode: AstRepresentationMode::default(),
            aligned_cache: HashMap::new(),
            use_external_simplification: false,
            backup: None,
        }
    }
}

impl SymbolicEngine {
    /// An uninitialised engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `Uninitialised`/`TornDown` to `Initialised` and registers the
    /// internal identity-rewrite simplification passes (spec §2: "a handful
    /// of internal passes ship pre-registered") on `callbacks`.
    pub fn init(&mut self, callbacks: &mut Callbacks) -> Result<()> {
        callbacks.add_simplification(crate::ast::simplify::identity_add);
        callbacks.add_simplification(crate::ast::simplify::identity_mul);
        callbacks.add_simplification(crate::ast::simplify::double_not);
        self.state = EngineState::Initialised;
        debug!("symbolic engine initialised");
        Ok(())
    }

    /// Surfaces [`Error::SymbolicEngineNotInitialised`] unless `init` has run
    /// and `remove` has not torn the engine back down.
    pub fn check_symbolic(&self) -> Result<()> {
        match self.state {
            EngineState::Uninitialised | EngineState::TornDown => Err(Error::SymbolicEngineNotInitialised),
            _ => Ok(()),
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> EngineState {
        self.state
    }

    fn enter_running(&mut self) {
        if matches!(self.state, EngineState::Initialised) {
            self.state = EngineState::Running;
        }
    }

    /// Drops all symbolic state but keeps the engine `Initialised`.
    pub fn reset(&mut self) {
        self.ctx.free_all_ast_nodes();
        self.reg_map.clear();
        self.mem_map.clear();
        self.expressions.clear();
        self.next_expression_id = 0;
        self.variables.clear();
        self.next_variable_id = 0;
        self.path_constraints.clear();
        self.aligned_cache.clear();
        self.backup = None;
        if !matches!(self.state, EngineState::Uninitialised | EngineState::TornDown) {
            self.state = EngineState::Initialised;
        }
    }

    /// Tears the engine down; every further query fails until `init` runs
    /// again.
    pub fn remove(&mut self) {
        self.reset();
        self.state = EngineState::TornDown;
    }

    /// Enable an optimisation flag.
    pub fn enable_optimization(&mut self, opt: Optimization) {
        if opt == Optimization::AstDictionaries {
            self.ctx.set_dictionary_enabled(true);
        }
        self.optimizations.insert(opt);
    }

    /// Disable an optimisation flag.
    pub fn disable_optimization(&mut self, opt: Optimization) {
        if opt == Optimization::AstDictionaries {
            self.ctx.set_dictionary_enabled(false);
        }
        self.optimizations.remove(&opt);
    }

    /// Whether `opt` is currently enabled.
    pub fn is_optimization_enabled(&self, opt: Optimization) -> bool {
        self.optimizations.contains(&opt)
    }

    /// Shared access to the underlying AST context.
    pub fn ast_context(&self) -> &AstContext {
        &self.ctx
    }

    /// Mutable access to the underlying AST context (e.g. to build operand
    /// nodes before recording an expression).
    pub fn ast_context_mut(&mut self) -> &mut AstContext {
        &mut self.ctx
    }

    /// Current AST pretty-printing mode.
    pub const fn representation_mode(&self) -> AstRepresentationMode {
        self.representation_mode
    }

    /// Set the AST pretty-printing mode.
    pub fn set_representation_mode(&mut self, mode: AstRepresentationMode) {
        self.representation_mode = mode;
    }

    /// Render `node` under the current representation mode.
    pub fn print_ast(&self, node: NodeId) -> Result<String> {
        crate::ast::repr::print_ast_representation(&self.ctx, node, self.representation_mode)
    }

    /// Gate whether `SymbolicEngine::simplify` also round-trips through an
    /// external collaborator.
    pub fn set_external_simplification_enabled(&mut self, enabled: bool) {
        self.use_external_simplification = enabled;
    }

    /// Run the simplification pipeline (spec §4.2) on `node`.
    pub fn simplify(&mut self, callbacks: &Callbacks, node: NodeId, external: Option<&dyn ExternalSimplifier>) -> Result<NodeId> {
        crate::ast::simplify::run(&mut self.ctx, callbacks, node, self.use_external_simplification, external)
    }

    /// `true` if `node` (or any of its descendants) is a `Variable` node —
    /// used to implement [`Optimization::OnlyOnSymbolized`].
    pub fn contains_variable(&self, node: NodeId) -> Result<bool> {
        for id in self.ctx.extract_unique_ast_nodes(node)? {
            if matches!(self.ctx.get(id)?.kind(), NodeKind::Variable(_)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn alloc_expression_id(&mut self) -> ExpressionId {
        let id = ExpressionId(self.next_expression_id);
        self.next_expression_id += 1;
        id
    }

    /// `newSymbolicExpression`: allocates a (not necessarily bound) entry in
    /// the expression table.
    pub fn new_symbolic_expression(&mut self, node: NodeId, origin: Origin, comment: impl Into<String>) -> Result<ExpressionId> {
        self.check_symbolic()?;
        self.enter_running();
        let id = self.alloc_expression_id();
        trace!(?id, ?origin, "new symbolic expression");
        self.expressions.insert(id, SymbolicExpression::new(id, node, origin, comment.into()));
        Ok(id)
    }

    /// `createSymbolicRegisterExpression`: binds the expression to `reg`'s
    /// parent register (spec §3: `regMap` is parent-register granularity).
    pub fn create_symbolic_register_expression(
        &mut self,
        arch: &crate::arch::Architecture,
        reg: RegisterId,
        node: NodeId,
        comment: impl Into<String>,
    ) -> Result<ExpressionId> {
        let parent = arch.geometry(reg)?.parent;
        let id = self.new_symbolic_expression(node, Origin::Register(parent), comment)?;
        self.reg_map.insert(parent, id);
        Ok(id)
    }

    /// Currently bound expression for `reg`'s parent register, if any.
    pub fn symbolic_register_expression(&self, arch: &crate::arch::Architecture, reg: RegisterId) -> Result<Option<ExpressionId>> {
        let parent = arch.geometry(reg)?.parent;
        Ok(self.reg_map.get(&parent).copied())
    }

    /// `createSymbolicMemoryExpression`: splits `node` (which must be
    /// `dst.size * 8` bits wide) byte-by-byte and binds one fresh expression
    /// per byte into `memMap` (spec §3: "one byte per entry"). Returns the
    /// ids in address order.
    pub fn create_symbolic_memory_expression(
        &mut self,
        node: NodeId,
        dst: crate::instruction::MemoryAccess,
        comment: impl Into<String>,
    ) -> Result<Vec<ExpressionId>> {
        self.check_symbolic()?;
        let comment = comment.into();
        let mut ids = Vec::with_capacity(dst.size as usize);
        for i in 0..dst.size {
            let low = i * 8;
            let high = low + 7;
            let byte_node = self.ctx.record_ast_node(NodeKind::Extract { high, low }, 8, Children::from_slice(&[node]))?;
            let addr = dst.address + i as u64;
            let id = self.new_symbolic_expression(byte_node, Origin::Memory(addr), comment.clone())?;
            self.mem_map.insert(addr, id);
            ids.push(id);
        }
        self.invalidate_aligned_cache(dst.address, dst.size);
        Ok(ids)
    }

    /// Currently bound expression for a single memory byte, if any.
    pub fn symbolic_memory_expression(&self, addr: u64) -> Option<ExpressionId> {
        self.mem_map.get(&addr).copied()
    }

    /// `concretizeRegister`: severs `reg`'s parent's `regMap` binding,
    /// leaving the concrete register value untouched. A subsequent
    /// `build_symbolic_register` on this register re-reads the concrete
    /// state through `GET_CONCRETE_REGISTER_VALUE` (spec §4.4).
    pub fn concretize_register(&mut self, arch: &crate::arch::Architecture, reg: RegisterId) -> Result<()> {
        self.check_symbolic()?;
        let parent = arch.geometry(reg)?.parent;
        self.reg_map.remove(&parent);
        Ok(())
    }

    /// `concretizeAllRegister`: severs every register binding.
    pub fn concretize_all_registers(&mut self) -> Result<()> {
        self.check_symbolic()?;
        self.reg_map.clear();
        Ok(())
    }

    /// `concretizeMemory`: severs the `memMap` binding for a single byte.
    pub fn concretize_memory(&mut self, addr: u64) -> Result<()> {
        self.check_symbolic()?;
        self.mem_map.remove(&addr);
        self.invalidate_aligned_cache(addr, 1);
        Ok(())
    }

    /// `concretizeMemory` bulk variant: severs the binding for every byte in
    /// `[base, base+size)`.
    pub fn concretize_memory_range(&mut self, base: u64, size: u64) -> Result<()> {
        self.check_symbolic()?;
        for addr in base..base.saturating_add(size) {
            self.mem_map.remove(&addr);
        }
        self.invalidate_aligned_cache(base, size as u32);
        Ok(())
    }

    /// `concretizeAllMemory`: severs every memory binding.
    pub fn concretize_all_memory(&mut self) -> Result<()> {
        self.check_symbolic()?;
        self.mem_map.clear();
        self.aligned_cache.clear();
        Ok(())
    }

    fn invalidate_aligned_cache(&mut self, base: u64, size: u32) {
        self.aligned_cache.retain(|&(addr, len), _| addr + u64::from(len) <= base || addr >= base + u64::from(size));
    }

    pub(super) fn aligned_cache_get(&self, addr: u64, size: u32) -> Option<NodeId> {
        self.aligned_cache.get(&(addr, size)).copied()
    }

    pub(super) fn aligned_cache_put(&mut self, addr: u64, size: u32, node: NodeId) {
        self.aligned_cache.insert((addr, size), node);
    }

    /// Looks up an expression by id.
    pub fn get_symbolic_expression(&self, id: ExpressionId) -> Result<&SymbolicExpression> {
        self.expressions.get(&id).ok_or(Error::UnknownSymbolicExpressionId(id))
    }

    /// Every currently-allocated expression.
    pub fn symbolic_expressions(&self) -> &HashMap<ExpressionId, SymbolicExpression> {
        &self.expressions
    }

    /// Refreshes an expression's taint flag (the façade calls this once
    /// taint propagation for the owning instruction has run).
    pub fn set_expression_tainted(&mut self, id: ExpressionId, tainted: bool) -> Result<()> {
        self.expressions.get_mut(&id).ok_or(Error::UnknownSymbolicExpressionId(id))?.set_tainted(tainted);
        Ok(())
    }

    /// `removeSymbolicExpression`: deletes the table entry and any
    /// `regMap`/`memMap` binding pointing at it. The id is never reused.
    pub fn remove_symbolic_expression(&mut self, id: ExpressionId) {
        self.expressions.remove(&id);
        self.reg_map.retain(|_, bound| *bound != id);
        self.mem_map.retain(|_, bound| *bound != id);
    }

    fn alloc_variable_id(&mut self) -> VariableId {
        let id = VariableId::new(self.next_variable_id);
        self.next_variable_id += 1;
        id
    }

    /// `createSymbolicVariable`: allocates a free variable and its
    /// `Variable` AST node, returning both.
    pub fn create_symbolic_variable(&mut self, size: u32, origin: Option<VariableOrigin>) -> Result<(VariableId, NodeId)> {
        self.check_symbolic()?;
        self.enter_running();
        let id = self.alloc_variable_id();
        let node = self.ctx.record_ast_node(NodeKind::Variable(id), size, Children::new())?;
        self.variables.insert(id, SymbolicVariable::new(id, size, origin));
        Ok((id, node))
    }

    /// Looks up a variable by id.
    pub fn get_symbolic_variable(&self, id: VariableId) -> Result<&SymbolicVariable> {
        self.variables.get(&id).ok_or(Error::UnknownSymbolicVariable(id))
    }

    /// Looks up a variable by its current name.
    pub fn get_symbolic_variable_by_name(&self, name: &str) -> Option<&SymbolicVariable> {
        self.variables.values().find(|v| v.name() == name)
    }

    /// `convertExpressionToSymbolicVariable`: replaces the node an existing
    /// expression names with a fresh free variable of the same width,
    /// concretising it away from whatever AST it previously held.
    pub fn convert_expression_to_symbolic_variable(&mut self, id: ExpressionId, comment: impl Into<String>) -> Result<VariableId> {
        self.check_symbolic()?;
        let expr = self.get_symbolic_expression(id)?;
        let size = self.ctx.bit_size_of(expr.node())?;
        let origin = match expr.origin() {
            Origin::Memory(addr) => Some(VariableOrigin::Memory(addr)),
            Origin::Register(reg) => Some(VariableOrigin::Register(reg)),
            Origin::Volatile | Origin::Undef => None,
        };
        let (var_id, node) = self.create_symbolic_variable(size, origin)?;
        let mut var = SymbolicVariable::new(var_id, size, origin);
        var.set_comment(comment);
        self.variables.insert(var_id, var);
        self.expressions.get_mut(&id).expect("id checked above").rebind(node);
        Ok(var_id)
    }

    /// `pushPathConstraint` (internal name; matches spec §3 "path
    /// constraints accumulated per conditional branch").
    pub fn add_path_constraint(&mut self, instruction_address: u64, taken: NodeId, not_taken: Option<NodeId>) {
        self.path_constraints.push(PathConstraint { instruction_address, taken, not_taken });
    }

    /// Every accumulated path constraint, in program order.
    pub fn path_constraints(&self) -> &[PathConstraint] {
        &self.path_constraints
    }

    /// Drops all accumulated path constraints.
    pub fn clear_path_constraints(&mut self) {
        self.path_constraints.clear();
    }

    /// The conjunction of every accumulated path constraint's `taken`
    /// condition (spec §3: "conjunction = path condition"), or `None` if no
    /// branch has been recorded yet.
    pub fn path_predicate(&mut self) -> Result<Option<NodeId>> {
        if self.path_constraints.is_empty() {
            return Ok(None);
        }
        let nodes: Children = self.path_constraints.iter().map(|pc| pc.taken).collect();
        if nodes.len() == 1 {
            return Ok(Some(nodes[0]));
        }
        let size = nodes.len() as u32;
        let _ = size;
        Ok(Some(self.ctx.record_ast_node(NodeKind::Land, 1, nodes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Architecture, ArchitectureKind};
    use crate::ast::Children;
    use crate::callbacks::Callbacks;

    fn x64() -> Architecture {
        let mut arch = Architecture::new();
        arch.set_architecture(ArchitectureKind::X8664 as u32).unwrap();
        arch
    }

    #[test]
    fn concretize_register_severs_binding_but_keeps_concrete_value() {
        let mut engine = SymbolicEngine::new();
        let mut callbacks = Callbacks::new();
        engine.init(&mut callbacks).unwrap();
        let mut arch = x64();
        let rax = RegisterId::new(0);
        arch.set_register_value(rax, 7).unwrap();

        let node = engine.ast_context_mut().record_ast_node(NodeKind::Const(7), 64, Children::new()).unwrap();
        engine.create_symbolic_register_expression(&arch, rax, node, "seed").unwrap();
        assert!(engine.symbolic_register_expression(&arch, rax).unwrap().is_some());

        engine.concretize_register(&arch, rax).unwrap();
        assert!(engine.symbolic_register_expression(&arch, rax).unwrap().is_none());
        assert_eq!(arch.register_value(rax).unwrap(), 7, "concretising must not touch concrete state");
    }

    #[test]
    fn concretize_memory_range_severs_every_byte() {
        let mut engine = SymbolicEngine::new();
        let mut callbacks = Callbacks::new();
        engine.init(&mut callbacks).unwrap();
        let node = engine.ast_context_mut().record_ast_node(NodeKind::Const(0x11223344), 32, Children::new()).unwrap();
        let dst = crate::instruction::MemoryAccess::new(0x1000, 4);
        let ids = engine.create_symbolic_memory_expression(node, dst, "seed").unwrap();
        assert_eq!(ids.len(), 4);
        for i in 0..4 {
            assert!(engine.symbolic_memory_expression(0x1000 + i).is_some());
        }

        engine.concretize_memory_range(0x1000, 4).unwrap();
        for i in 0..4 {
            assert!(engine.symbolic_memory_expression(0x1000 + i).is_none());
        }
    }
}
