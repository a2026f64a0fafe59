//! The disassembler contract (spec §1.i: "treated as an opaque disassembler
//! returning an `Instruction` with operands"). Decoding machine bytes into
//! these types is out of scope; the façade only consumes them.

use crate::arch::RegisterId;
use crate::symbolic::ExpressionId;

/// A single memory operand: `size` bytes starting at `address`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryAccess {
    /// Base address.
    pub address: u64,
    /// Access size in bytes.
    pub size: u32,
}

impl MemoryAccess {
    /// Construct a memory operand.
    pub const fn new(address: u64, size: u32) -> Self {
        Self { address, size }
    }
}

/// An immediate operand.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Immediate {
    /// The literal value, truncated to `size` bits.
    pub value: u64,
    /// Bit-width of the immediate.
    pub size: u32,
}

impl Immediate {
    /// Construct an immediate operand.
    pub const fn new(value: u64, size: u32) -> Self {
        Self { value, size }
    }
}

/// A decoded operand: exactly one of the three kinds the taint engine's
/// cross-product dispatches over (spec §4.5).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A literal value.
    Immediate(Immediate),
    /// A register reference.
    Register(RegisterId),
    /// A memory reference.
    Memory(MemoryAccess),
}

/// `read_concrete`/`write_concrete` carry a memory operand's concrete value
/// in a `u64`; anything wider doesn't fit, even though the AST layer itself
/// models memory operands up to `consts::MAX_BIT_SIZE` bits via
/// `build_symbolic_memory`'s byte-by-byte `concat`.
fn check_concrete_memory_width(mem: MemoryAccess) -> crate::error::Result<()> {
    if mem.size > 8 {
        return Err(crate::error::Error::InvalidMemoryRange { base: mem.address, size: u64::from(mem.size) });
    }
    Ok(())
}

impl Operand {
    /// Bit-width of the value this operand reads or writes.
    pub fn bit_size(&self, arch: &crate::arch::Architecture) -> crate::error::Result<u32> {
        match self {
            Self::Immediate(imm) => Ok(imm.size),
            Self::Register(reg) => arch.geometry(*reg).map(|g| g.high - g.low + 1),
            Self::Memory(mem) => Ok(mem.size * 8),
        }
    }

    /// Reads this operand's concrete value. Unmapped memory bytes read as 0.
    ///
    /// The concrete value is carried as a `u64`, so a memory operand wider
    /// than 8 bytes (e.g. a 16-byte XMM-width load, within the AST layer's
    /// 512-bit ceiling) can't be represented here and is rejected with
    /// [`crate::error::Error::InvalidMemoryRange`] rather than overflowing.
    pub fn read_concrete(&self, arch: &crate::arch::Architecture) -> crate::error::Result<u64> {
        match self {
            Self::Immediate(imm) => Ok(imm.value),
            Self::Register(reg) => arch.register_value(*reg),
            Self::Memory(mem) => {
                check_concrete_memory_width(*mem)?;
                let bytes = arch.get_memory_range(mem.address, u64::from(mem.size));
                let mut value = 0u64;
                for (i, byte) in bytes.into_iter().enumerate() {
                    value |= u64::from(byte.unwrap_or(0)) << (i * 8);
                }
                Ok(value)
            }
        }
    }

    /// Writes `value` into this operand's concrete location. See
    /// [`Self::read_concrete`] for the same width restriction on memory
    /// operands.
    pub fn write_concrete(&self, arch: &mut crate::arch::Architecture, value: u64) -> crate::error::Result<()> {
        match self {
            Self::Immediate(_) => Err(crate::error::Error::ImmediateOperandNotWritable),
            Self::Register(reg) => arch.set_register_value(*reg, value),
            Self::Memory(mem) => {
                check_concrete_memory_width(*mem)?;
                let bytes = value.to_le_bytes();
                arch.set_memory_range(mem.address, &bytes[..mem.size as usize]);
                Ok(())
            }
        }
    }
}

/// A decoded instruction. Disassembly itself (bytes -> mnemonic/operands) is
/// an external collaborator's job; this type is only the data the façade's
/// lifters and engines consume and annotate.
#[derive(Debug, Clone)]
pub struct Instruction {
    /// Address the instruction was fetched from.
    address: u64,
    /// Opaque mnemonic used to select a lifter (e.g. `"mov"`, `"jz"`).
    mnemonic: String,
    /// Decoded operands, in disassembler-defined order (destination first,
    /// by convention, matching the illustrative lifters in `lifters/`).
    operands: Vec<Operand>,
    /// Symbolic expressions consumed while lifting this instruction,
    /// recorded by the two-argument operand builders (spec §4.4).
    symbolic_inputs: Vec<ExpressionId>,
    /// Symbolic expressions produced while lifting this instruction.
    symbolic_outputs: Vec<ExpressionId>,
}

impl Instruction {
    /// Construct a decoded instruction, as a disassembler collaborator
    /// would hand to the façade.
    pub fn new(address: u64, mnemonic: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self { address, mnemonic: mnemonic.into(), operands, symbolic_inputs: Vec::new(), symbolic_outputs: Vec::new() }
    }

    /// Instruction address.
    pub const fn address(&self) -> u64 {
        self.address
    }

    /// Mnemonic used to select a lifter.
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Decoded operands.
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Records an expression as an input of this instruction (from the
    /// two-argument symbolic operand builders).
    pub fn add_symbolic_input(&mut self, id: ExpressionId) {
        self.symbolic_inputs.push(id);
    }

    /// Records an expression as an output of this instruction (from
    /// `createSymbolic*Expression`).
    pub fn add_symbolic_output(&mut self, id: ExpressionId) {
        self.symbolic_outputs.push(id);
    }

    /// Expressions consumed while lifting this instruction.
    pub fn symbolic_inputs(&self) -> &[ExpressionId] {
        &self.symbolic_inputs
    }

    /// Expressions produced while lifting this instruction.
    pub fn symbolic_outputs(&self) -> &[ExpressionId] {
        &self.symbolic_outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Architecture, ArchitectureKind};
    use crate::error::Error;

    fn x64() -> Architecture {
        let mut arch = Architecture::new();
        arch.set_architecture(ArchitectureKind::X8664 as u32).unwrap();
        arch
    }

    #[test]
    fn read_concrete_rejects_memory_operands_wider_than_eight_bytes() {
        let arch = x64();
        let xmm_width = Operand::Memory(MemoryAccess::new(0x1000, 16));
        assert!(matches!(xmm_width.read_concrete(&arch), Err(Error::InvalidMemoryRange { base: 0x1000, size: 16 })));
    }

    #[test]
    fn write_concrete_rejects_memory_operands_wider_than_eight_bytes() {
        let mut arch = x64();
        let xmm_width = Operand::Memory(MemoryAccess::new(0x1000, 16));
        assert!(matches!(xmm_width.write_concrete(&mut arch, 0), Err(Error::InvalidMemoryRange { base: 0x1000, size: 16 })));
    }

    #[test]
    fn read_concrete_accepts_an_eight_byte_memory_operand() {
        let mut arch = x64();
        arch.set_memory_range(0x2000, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let op = Operand::Memory(MemoryAccess::new(0x2000, 8));
        assert_eq!(op.read_concrete(&arch).unwrap(), 0x0807_0605_0403_0201);
    }
}
