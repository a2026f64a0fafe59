//! Symbolic-operand builders (spec §4.4): lift a concrete [`Operand`] into an
//! AST node, consulting the existing symbolic binding when one exists and
//! falling back to the concrete state (firing a read callback on a miss).

use tracing::trace;

use crate::arch::{Architecture, RegisterId};
use crate::ast::{Children, NodeId, NodeKind};
use crate::callbacks::Callbacks;
use crate::error::Result;
use crate::instruction::{Immediate, Instruction, MemoryAccess};

use super::{Optimization, SymbolicEngine};

impl SymbolicEngine {
    /// `buildSymbolicImmediate`: an immediate is always a fresh `Const` node,
    /// never bound to any location.
    pub fn build_symbolic_immediate(&mut self, imm: Immediate) -> Result<NodeId> {
        self.ast_context_mut().record_ast_node(NodeKind::Const(u128::from(imm.value)), imm.size, Children::new())
    }

    /// `buildSymbolicRegister`: reuses the bound expression's node if `reg`'s
    /// parent register is symbolic, extracting `reg`'s bit range out of it;
    /// otherwise fires `GET_CONCRETE_REGISTER_VALUE` and builds a `Const`
    /// from the (now up to date) concrete value.
    pub fn build_symbolic_register(&mut self, arch: &mut Architecture, callbacks: &Callbacks, reg: RegisterId) -> Result<NodeId> {
        let geo = arch.geometry(reg)?;
        let width = geo.high - geo.low + 1;

        if let Some(expr_id) = self.symbolic_register_expression(arch, reg)? {
            let parent_node = self.get_symbolic_expression(expr_id)?.node();
            if geo.low == 0 && width == self.ast_context().bit_size_of(parent_node)? {
                return Ok(parent_node);
            }
            return self.ast_context_mut().record_ast_node(
                NodeKind::Extract { high: geo.high, low: geo.low },
                width,
                Children::from_slice(&[parent_node]),
            );
        }

        trace!(?reg, "register has no symbolic binding, reading concrete value");
        callbacks.process_register_read(arch, reg)?;
        let value = arch.register_value(reg)?;
        self.ast_context_mut().record_ast_node(NodeKind::Const(u128::from(value)), width, Children::new())
    }

    /// Two-argument form of [`Self::build_symbolic_register`]: additionally
    /// records the reused expression (when one existed) as an input of
    /// `inst` (spec §4.4).
    pub fn build_symbolic_register_operand(
        &mut self,
        arch: &mut Architecture,
        callbacks: &Callbacks,
        reg: RegisterId,
        inst: &mut Instruction,
    ) -> Result<NodeId> {
        if let Some(expr_id) = self.symbolic_register_expression(arch, reg)? {
            inst.add_symbolic_input(expr_id);
        }
        self.build_symbolic_register(arch, callbacks, reg)
    }

    /// `buildSymbolicMemory`: concatenates one node per byte, each either the
    /// bound expression's node or a freshly read `Const` (firing
    /// `GET_CONCRETE_MEMORY_VALUE` on a miss). When
    /// [`Optimization::AlignedMemory`] is enabled and the same `(address,
    /// size)` pair was built since the last overlapping write, the cached
    /// concat is returned directly.
    pub fn build_symbolic_memory(&mut self, arch: &mut Architecture, callbacks: &Callbacks, mem: MemoryAccess) -> Result<NodeId> {
        if self.is_optimization_enabled(Optimization::AlignedMemory) {
            if let Some(cached) = self.aligned_cache_get(mem.address, mem.size) {
                return Ok(cached);
            }
        }

        let mut byte_nodes = Vec::with_capacity(mem.size as usize);
        for i in (0..mem.size).rev() {
            let addr = mem.address + u64::from(i);
            let byte_node = if let Some(expr_id) = self.symbolic_memory_expression(addr) {
                self.get_symbolic_expression(expr_id)?.node()
            } else {
                trace!(addr, "memory byte has no symbolic binding, reading concrete value");
                callbacks.process_memory_read(arch, MemoryAccess::new(addr, 1))?;
                let value = arch.get_memory_byte(addr).unwrap_or(0);
                self.ast_context_mut().record_ast_node(NodeKind::Const(u128::from(value)), 8, Children::new())?
            };
            byte_nodes.push(byte_node);
        }

        let node = if byte_nodes.len() == 1 {
            byte_nodes[0]
        } else {
            self.ast_context_mut().record_ast_node(NodeKind::Concat, mem.size * 8, byte_nodes.into_iter().collect())?
        };

        if self.is_optimization_enabled(Optimization::AlignedMemory) {
            self.aligned_cache_put(mem.address, mem.size, node);
        }
        Ok(node)
    }

    /// Two-argument form of [`Self::build_symbolic_memory`]: records every
    /// byte's bound expression (when one existed) as an input of `inst`.
    pub fn build_symbolic_memory_operand(
        &mut self,
        arch: &mut Architecture,
        callbacks: &Callbacks,
        mem: MemoryAccess,
        inst: &mut Instruction,
    ) -> Result<NodeId> {
        for i in 0..mem.size {
            if let Some(expr_id) = self.symbolic_memory_expression(mem.address + u64::from(i)) {
                inst.add_symbolic_input(expr_id);
            }
        }
        self.build_symbolic_memory(arch, callbacks, mem)
    }
}
