//! Taint engine (§4.5): bit-level taint over registers (parent-register
//! granularity) and memory (byte granularity), propagated across
//! instruction operands under union or assignment semantics.

use std::collections::HashSet;

use tracing::trace;

use crate::arch::{Architecture, RegisterId};
use crate::error::{Error, Result};
use crate::instruction::Operand;

/// Lifecycle flag mirroring the symbolic engine's init/teardown contract
/// (spec §7: `TaintEngineNotInitialised`), kept minimal since the taint
/// engine has no backup/restore requirement of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialised,
    Initialised,
    TornDown,
}

/// Taint Engine (spec §4.5): tracks which registers and memory bytes are
/// currently tainted and propagates taint across operand pairs.
#[derive(Debug)]
pub struct TaintEngine {
    state: State,
    tainted_registers: HashSet<RegisterId>,
    tainted_memory: HashSet<u64>,
}

impl Default for TaintEngine {
    fn default() -> Self {
        Self { state: State::Uninitialised, tainted_registers: HashSet::new(), tainted_memory: HashSet::new() }
    }
}

impl TaintEngine {
    /// An uninitialised engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `Uninitialised`/`TornDown` to `Initialised`.
    pub fn init(&mut self) {
        self.state = State::Initialised;
    }

    /// Surfaces [`Error::TaintEngineNotInitialised`] unless `init` has run.
    pub fn check_taint(&self) -> Result<()> {
        match self.state {
            State::Uninitialised | State::TornDown => Err(Error::TaintEngineNotInitialised),
            State::Initialised => Ok(()),
        }
    }

    /// Drops all taint but keeps the engine initialised.
    pub fn reset(&mut self) {
        self.tainted_registers.clear();
        self.tainted_memory.clear();
    }

    /// Tears the engine down.
    pub fn remove(&mut self) {
        self.reset();
        self.state = State::TornDown;
    }

    /// `isRegisterTainted`: queries at parent-register granularity.
    pub fn is_register_tainted(&self, arch: &Architecture, reg: RegisterId) -> Result<bool> {
        self.check_taint()?;
        let parent = arch.geometry(reg)?.parent;
        Ok(self.tainted_registers.contains(&parent))
    }

    /// `isMemoryTainted`: a single byte.
    pub fn is_memory_tainted(&self, addr: u64) -> Result<bool> {
        self.check_taint()?;
        Ok(self.tainted_memory.contains(&addr))
    }

    /// `true` if any byte in `[base, base+size)` is tainted.
    pub fn is_memory_range_tainted(&self, base: u64, size: u64) -> Result<bool> {
        self.check_taint()?;
        Ok((base..base.saturating_add(size)).any(|a| self.tainted_memory.contains(&a)))
    }

    /// `isTainted`: dispatches on operand kind. An immediate is never
    /// tainted.
    pub fn is_tainted(&self, arch: &Architecture, operand: &Operand) -> Result<bool> {
        match operand {
            Operand::Immediate(_) => Ok(false),
            Operand::Register(reg) => self.is_register_tainted(arch, *reg),
            Operand::Memory(mem) => self.is_memory_range_tainted(mem.address, u64::from(mem.size)),
        }
    }

    /// `setTaintRegister`.
    pub fn set_register_taint(&mut self, arch: &Architecture, reg: RegisterId, tainted: bool) -> Result<()> {
        self.check_taint()?;
        let parent = arch.geometry(reg)?.parent;
        trace!(?parent, tainted, "register taint updated");
        if tainted {
            self.tainted_registers.insert(parent);
        } else {
            self.tainted_registers.remove(&parent);
        }
        Ok(())
    }

    /// `taintRegister`.
    pub fn taint_register(&mut self, arch: &Architecture, reg: RegisterId) -> Result<()> {
        self.set_register_taint(arch, reg, true)
    }

    /// `untaintRegister`.
    pub fn untaint_register(&mut self, arch: &Architecture, reg: RegisterId) -> Result<()> {
        self.set_register_taint(arch, reg, false)
    }

    /// `setTaintMemory` for a single byte.
    pub fn set_memory_taint(&mut self, addr: u64, tainted: bool) -> Result<()> {
        self.check_taint()?;
        trace!(addr, tainted, "memory byte taint updated");
        if tainted {
            self.tainted_memory.insert(addr);
        } else {
            self.tainted_memory.remove(&addr);
        }
        Ok(())
    }

    /// `setTaintMemory` over a byte range.
    pub fn set_memory_range_taint(&mut self, base: u64, size: u64, tainted: bool) -> Result<()> {
        for addr in base..base.saturating_add(size) {
            self.set_memory_taint(addr, tainted)?;
        }
        Ok(())
    }

    /// `taintMemory` over a byte range.
    pub fn taint_memory(&mut self, base: u64, size: u64) -> Result<()> {
        self.set_memory_range_taint(base, size, true)
    }

    /// `untaintMemory` over a byte range.
    pub fn untaint_memory(&mut self, base: u64, size: u64) -> Result<()> {
        self.set_memory_range_taint(base, size, false)
    }

    fn set_operand_taint(&mut self, arch: &Architecture, operand: &Operand, tainted: bool) -> Result<()> {
        match operand {
            Operand::Immediate(_) => Ok(()),
            Operand::Register(reg) => self.set_register_taint(arch, *reg, tainted),
            Operand::Memory(mem) => self.set_memory_range_taint(mem.address, u64::from(mem.size), tainted),
        }
    }

    /// `taintUnion(dst, src)`: `dst`'s new taint is `dst || src`. Generic
    /// over the full `{Immediate, Register, Memory} x {Immediate, Register,
    /// Memory}` cross-product (spec §4.5) via [`Operand`] dispatch, rather
    /// than nine hand-written pair functions. Returns the resulting taint of
    /// `dst`.
    pub fn taint_union(&mut self, arch: &Architecture, dst: &Operand, src: &Operand) -> Result<bool> {
        self.check_taint()?;
        let new_taint = self.is_tainted(arch, dst)? || self.is_tainted(arch, src)?;
        self.set_operand_taint(arch, dst, new_taint)?;
        Ok(new_taint)
    }

    /// `taintAssignment(dst, src)`: `dst`'s new taint is exactly `src`'s,
    /// discarding whatever `dst` held before. Returns the resulting taint.
    pub fn taint_assignment(&mut self, arch: &Architecture, dst: &Operand, src: &Operand) -> Result<bool> {
        self.check_taint()?;
        let src_tainted = self.is_tainted(arch, src)?;
        self.set_operand_taint(arch, dst, src_tainted)?;
        Ok(src_tainted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchitectureKind;
    use crate::instruction::{Immediate, MemoryAccess};

    fn x64() -> Architecture {
        let mut arch = Architecture::new();
        arch.set_architecture(ArchitectureKind::X8664 as u32).unwrap();
        arch
    }

    #[test]
    fn union_or_s_existing_and_incoming_taint() {
        let arch = x64();
        let mut taint = TaintEngine::new();
        taint.init();
        let rax = RegisterId::new(0);
        let rbx = RegisterId::new(5);
        taint.taint_register(&arch, rbx).unwrap();

        let dst = Operand::Register(rax);
        let src = Operand::Register(rbx);
        let result = taint.taint_union(&arch, &dst, &src).unwrap();
        assert!(result);
        assert!(taint.is_register_tainted(&arch, rax).unwrap());
    }

    #[test]
    fn assignment_overwrites_existing_taint() {
        let arch = x64();
        let mut taint = TaintEngine::new();
        taint.init();
        let rax = RegisterId::new(0);
        taint.taint_register(&arch, rax).unwrap();

        let dst = Operand::Register(rax);
        let src = Operand::Immediate(Immediate::new(0, 64));
        let result = taint.taint_assignment(&arch, &dst, &src).unwrap();
        assert!(!result, "assigning from an untainted immediate clears dst's taint");
        assert!(!taint.is_register_tainted(&arch, rax).unwrap());
    }

    #[test]
    fn memory_taint_is_byte_granular() {
        let mut taint = TaintEngine::new();
        taint.init();
        taint.taint_memory(0x1000, 1).unwrap();
        assert!(taint.is_memory_tainted(0x1000).unwrap());
        assert!(!taint.is_memory_tainted(0x1001).unwrap());
        assert!(taint.is_memory_range_tainted(0x1000, 4).unwrap());
    }

    #[test]
    fn query_before_init_fails() {
        let taint = TaintEngine::new();
        assert!(matches!(taint.is_memory_tainted(0), Err(Error::TaintEngineNotInitialised)));
    }

    #[test]
    fn memory_to_register_union() {
        let arch = x64();
        let mut taint = TaintEngine::new();
        taint.init();
        taint.taint_memory(0x2000, 4).unwrap();

        let dst = Operand::Register(RegisterId::new(0));
        let src = Operand::Memory(MemoryAccess::new(0x2000, 4));
        assert!(taint.taint_union(&arch, &dst, &src).unwrap());
        assert!(taint.is_register_tainted(&arch, RegisterId::new(0)).unwrap());
    }
}
