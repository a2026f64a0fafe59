//! Illustrative per-opcode lifters (spec §4 supplement): `mov`, `add`,
//! `test` and `jcc`. Per-opcode semantics are otherwise out of scope (spec
//! §1.ii) — these four exist so `Facade::processing` has at least one real,
//! runnable path exercising the operand-builder / expression-creation /
//! taint-propagation contract end to end, and so conditional branches
//! exercise path-constraint accumulation. Any other mnemonic makes
//! `processing` return `Ok(false)`.

use crate::arch::{registers, Architecture};
use crate::ast::{Children, NodeId, NodeKind};
use crate::callbacks::Callbacks;
use crate::error::{Error, Result};
use crate::facade::Facade;
use crate::instruction::{Instruction, Operand};
use crate::symbolic::SymbolicEngine;

/// A single opcode's lifting rule: build the symbolic effect, apply the
/// concrete effect, and propagate taint — in that order, matching
/// `Facade::processing`'s documented data flow (spec §2).
pub trait Lifter {
    /// The mnemonic this lifter handles.
    fn mnemonic(&self) -> &'static str;

    /// Lift `inst` against `facade`'s current state.
    fn lift(&self, facade: &mut Facade, inst: &mut Instruction) -> Result<()>;
}

/// Looks up the lifter registered for `mnemonic`, if any.
pub fn find(mnemonic: &str) -> Option<&'static dyn Lifter> {
    match mnemonic {
        "mov" => Some(&MovLifter),
        "add" => Some(&AddLifter),
        "test" => Some(&TestLifter),
        "jcc" => Some(&JccLifter),
        _ => None,
    }
}

fn operand_node(
    symbolic: &mut SymbolicEngine,
    arch: &mut Architecture,
    callbacks: &Callbacks,
    inst: &mut Instruction,
    operand: Operand,
) -> Result<NodeId> {
    match operand {
        Operand::Immediate(imm) => symbolic.build_symbolic_immediate(imm),
        Operand::Register(reg) => symbolic.build_symbolic_register_operand(arch, callbacks, reg, inst),
        Operand::Memory(mem) => symbolic.build_symbolic_memory_operand(arch, callbacks, mem, inst),
    }
}

fn bind_destination(symbolic: &mut SymbolicEngine, arch: &Architecture, dst: Operand, node: NodeId, comment: &str) -> Result<Vec<crate::symbolic::ExpressionId>> {
    match dst {
        Operand::Register(reg) => Ok(vec![symbolic.create_symbolic_register_expression(arch, reg, node, comment)?]),
        Operand::Memory(mem) => symbolic.create_symbolic_memory_expression(node, mem, comment),
        Operand::Immediate(_) => Err(Error::ImmediateOperandNotWritable),
    }
}

fn mask_for(size: u32) -> u64 {
    if size >= 64 {
        u64::MAX
    } else {
        (1u64 << size) - 1
    }
}

/// `mov dst, src`: `dst <- src`, an assignment both concretely and for
/// taint.
struct MovLifter;

impl Lifter for MovLifter {
    fn mnemonic(&self) -> &'static str {
        "mov"
    }

    fn lift(&self, facade: &mut Facade, inst: &mut Instruction) -> Result<()> {
        let dst = inst.operands()[0];
        let src = inst.operands()[1];
        let (arch, callbacks, symbolic, taint) = facade.parts_mut();

        let node = operand_node(symbolic, arch, callbacks, inst, src)?;
        let node = symbolic.simplify(callbacks, node, None)?;

        let value = src.read_concrete(arch)?;
        dst.write_concrete(arch, value)?;

        let expr_ids = bind_destination(symbolic, arch, dst, node, "mov")?;
        for id in &expr_ids {
            inst.add_symbolic_output(*id);
        }

        let tainted = taint.taint_assignment(arch, &dst, &src)?;
        for id in &expr_ids {
            symbolic.set_expression_tainted(*id, tainted)?;
        }
        Ok(())
    }
}

/// `add dst, src`: `dst <- dst + src`, taint unions the two operands.
struct AddLifter;

impl Lifter for AddLifter {
    fn mnemonic(&self) -> &'static str {
        "add"
    }

    fn lift(&self, facade: &mut Facade, inst: &mut Instruction) -> Result<()> {
        let dst = inst.operands()[0];
        let src = inst.operands()[1];
        let (arch, callbacks, symbolic, taint) = facade.parts_mut();
        let size = dst.bit_size(arch)?;

        let dst_node = operand_node(symbolic, arch, callbacks, inst, dst)?;
        let src_node = operand_node(symbolic, arch, callbacks, inst, src)?;
        let sum_node = symbolic.ast_context_mut().record_ast_node(NodeKind::Bvadd, size, Children::from_slice(&[dst_node, src_node]))?;
        let sum_node = symbolic.simplify(callbacks, sum_node, None)?;

        let dst_value = dst.read_concrete(arch)?;
        let src_value = src.read_concrete(arch)?;
        let result = dst_value.wrapping_add(src_value) & mask_for(size);
        dst.write_concrete(arch, result)?;

        let expr_ids = bind_destination(symbolic, arch, dst, sum_node, "add")?;
        for id in &expr_ids {
            inst.add_symbolic_output(*id);
        }

        let tainted = taint.taint_union(arch, &dst, &src)?;
        for id in &expr_ids {
            symbolic.set_expression_tainted(*id, tainted)?;
        }
        Ok(())
    }
}

/// `test dst, src`: computes `dst & src`, writes no destination, only
/// updates `zf` (both concretely and symbolically). Taint on `zf` unions
/// `dst` and `src`.
struct TestLifter;

impl Lifter for TestLifter {
    fn mnemonic(&self) -> &'static str {
        "test"
    }

    fn lift(&self, facade: &mut Facade, inst: &mut Instruction) -> Result<()> {
        let dst = inst.operands()[0];
        let src = inst.operands()[1];
        let (arch, callbacks, symbolic, taint) = facade.parts_mut();
        let size = dst.bit_size(arch)?;

        let dst_node = operand_node(symbolic, arch, callbacks, inst, dst)?;
        let src_node = operand_node(symbolic, arch, callbacks, inst, src)?;
        let and_node = symbolic.ast_context_mut().record_ast_node(NodeKind::Bvand, size, Children::from_slice(&[dst_node, src_node]))?;
        let zero = symbolic.ast_context_mut().record_ast_node(NodeKind::Const(0), size, Children::new())?;
        let zf_node = symbolic.ast_context_mut().record_ast_node(NodeKind::Equal, 1, Children::from_slice(&[and_node, zero]))?;
        let zf_node = symbolic.simplify(callbacks, zf_node, None)?;

        let kind = arch.check_architecture()?;
        let zf = registers::find_by_name(kind, "zf").ok_or(Error::InvalidRegister(u32::MAX))?;

        let dst_value = dst.read_concrete(arch)?;
        let src_value = src.read_concrete(arch)?;
        let zf_value = u64::from(dst_value & src_value == 0);
        arch.set_register_value(zf, zf_value)?;

        let expr_id = symbolic.create_symbolic_register_expression(arch, zf, zf_node, "test")?;
        inst.add_symbolic_output(expr_id);

        let tainted = taint.is_tainted(arch, &dst)? || taint.is_tainted(arch, &src)?;
        taint.set_register_taint(arch, zf, tainted)?;
        symbolic.set_expression_tainted(expr_id, tainted)?;
        Ok(())
    }
}

/// `jcc flag`: a conditional branch gated on a single flag register.
/// Records a path constraint — `flag == 1` when the concrete flag is set,
/// `flag == 0` otherwise — exercising path-constraint accumulation (spec
/// §3). Does not model instruction-pointer update; that belongs to a real
/// disassembler/dispatcher, out of scope here (spec §1).
struct JccLifter;

impl Lifter for JccLifter {
    fn mnemonic(&self) -> &'static str {
        "jcc"
    }

    fn lift(&self, facade: &mut Facade, inst: &mut Instruction) -> Result<()> {
        let flag = inst.operands()[0];
        let reg = match flag {
            Operand::Register(reg) => reg,
            _ => return Err(Error::InvalidRegister(u32::MAX)),
        };
        let (arch, callbacks, symbolic, _taint) = facade.parts_mut();

        let flag_node = symbolic.build_symbolic_register_operand(arch, callbacks, reg, inst)?;
        let concrete_set = flag.read_concrete(arch)? != 0;

        let one = symbolic.ast_context_mut().record_ast_node(NodeKind::Const(1), 1, Children::new())?;
        let zero = symbolic.ast_context_mut().record_ast_node(NodeKind::Const(0), 1, Children::new())?;
        let is_set = symbolic.ast_context_mut().record_ast_node(NodeKind::Equal, 1, Children::from_slice(&[flag_node, one]))?;
        let is_clear = symbolic.ast_context_mut().record_ast_node(NodeKind::Equal, 1, Children::from_slice(&[flag_node, zero]))?;

        let (taken, not_taken) = if concrete_set { (is_set, is_clear) } else { (is_clear, is_set) };
        symbolic.add_path_constraint(inst.address(), taken, Some(not_taken));
        Ok(())
    }
}
