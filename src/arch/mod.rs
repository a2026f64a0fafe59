//! Architecture/CPU model (§4.1): register file, register geometry and the
//! sparse byte-addressed memory map the rest of the façade reads and writes
//! through.

pub mod memory;
pub mod registers;

use tracing::debug;

use crate::error::{Error, Result};

pub use memory::Memory;
pub use registers::{RegisterGeometry, RegisterId};

/// Architectures the façade can be configured for. Adding one means adding a
/// geometry table in [`registers`] and a match arm here — the engines never
/// special-case a kind outside this module.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum ArchitectureKind {
    /// 64-bit x86 (AMD64 / Intel 64).
    X8664,
    /// 32-bit x86.
    X86,
}

impl ArchitectureKind {
    /// Decode a caller-supplied architecture id, per spec's "accepted ids
    /// enumerated; rejects unknown with an architecture error".
    pub fn from_id(id: u32) -> Result<Self> {
        match id {
            0 => Ok(Self::X8664),
            1 => Ok(Self::X86),
            other => Err(Error::UnsupportedArchitecture(other)),
        }
    }

    /// The width in bytes of the widest register container this
    /// architecture needs (always a whole number of 64-bit words).
    const fn register_storage_bytes(self) -> usize {
        64
    }
}

/// Concrete CPU state: register file plus byte-addressable memory.
///
/// Reads never allocate in the memory map; writes allocate implicitly
/// (matches spec §4.1).
#[derive(Debug, Default)]
pub struct Architecture {
    kind: Option<ArchitectureKind>,
    registers: Vec<[u8; 64]>,
    memory: Memory,
}

impl Architecture {
    /// A façade with no architecture configured yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// `setArchitecture(id)`.
    pub fn set_architecture(&mut self, id: u32) -> Result<()> {
        let kind = ArchitectureKind::from_id(id)?;
        let parents = registers::parent_count(kind);
        self.kind = Some(kind);
        self.registers = vec![[0u8; 64]; parents];
        self.memory.clear();
        debug!(?kind, "architecture configured");
        Ok(())
    }

    /// `getArchitecture`.
    pub const fn architecture(&self) -> Option<ArchitectureKind> {
        self.kind
    }

    /// `isArchitectureValid`.
    pub const fn is_architecture_valid(&self) -> bool {
        self.kind.is_some()
    }

    /// `clearArchitecture` / `clear`: drops register and memory state but
    /// keeps the configured architecture kind.
    pub fn clear(&mut self) {
        if let Some(kind) = self.kind {
            self.registers = vec![[0u8; 64]; registers::parent_count(kind)];
        }
        self.memory.clear();
    }

    /// Surfaces [`Error::ArchitectureNotInitialised`] unless an architecture
    /// has been set.
    pub fn check_architecture(&self) -> Result<ArchitectureKind> {
        self.kind.ok_or(Error::ArchitectureNotInitialised)
    }

    /// Register geometry query: `(name, high, low, parent)`.
    pub fn geometry(&self, reg: RegisterId) -> Result<RegisterGeometry> {
        let kind = self.check_architecture()?;
        registers::geometry(kind, reg).ok_or(Error::InvalidRegister(reg.0))
    }

    /// `isValid`.
    pub fn is_valid(&self, reg: RegisterId) -> bool {
        self.kind.map(|k| registers::geometry(k, reg).is_some()).unwrap_or(false)
    }

    /// `isRegister`: valid and not a flag bit.
    pub fn is_register(&self, reg: RegisterId) -> bool {
        self.geometry(reg).map(|g| !g.is_flag).unwrap_or(false)
    }

    /// `isFlag`.
    pub fn is_flag(&self, reg: RegisterId) -> bool {
        self.geometry(reg).map(|g| g.is_flag).unwrap_or(false)
    }

    /// Read a register, widened/narrowed across the parent boundary: reads
    /// the parent's bytes and extracts `[low, high]`.
    pub fn register_value(&self, reg: RegisterId) -> Result<u64> {
        let geo = self.geometry(reg)?;
        let parent_bytes = &self.registers[geo.parent.0 as usize];
        let parent_word = u64::from_le_bytes(parent_bytes[..8].try_into().unwrap());
        let width = geo.high - geo.low + 1;
        let mask = if width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
        Ok((parent_word >> geo.low) & mask)
    }

    /// Write a register. Sibling bits of the parent are left untouched
    /// ("Register writes to a sub-register leave sibling bits of the parent
    /// intact", §4.1) unless the write covers the architecture's
    /// zero-extension boundary (full 32-bit write into a 64-bit GPR), which
    /// zeroes the upper half — mirrors native x86-64 semantics and is the
    /// policy decision recorded in DESIGN.md for the Open Question in §9.
    pub fn set_register_value(&mut self, reg: RegisterId, value: u64) -> Result<()> {
        let geo = self.geometry(reg)?;
        let width = geo.high - geo.low + 1;
        let mask = if width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
        let value = value & mask;

        let parent_bytes = &mut self.registers[geo.parent.0 as usize];
        let mut parent_word = u64::from_le_bytes(parent_bytes[..8].try_into().unwrap());

        let zero_extends = geo.low == 0 && width == 32 && geo.parent_bit_size(self.kind.unwrap()) == 64;
        if zero_extends {
            parent_word = value;
        } else {
            let shifted_mask = mask << geo.low;
            parent_word = (parent_word & !shifted_mask) | (value << geo.low);
        }

        parent_bytes[..8].copy_from_slice(&parent_word.to_le_bytes());
        Ok(())
    }

    /// `isMemoryMapped`.
    pub fn is_memory_mapped(&self, addr: u64) -> bool {
        self.memory.is_mapped(addr)
    }

    /// `unmap(range)`.
    pub fn unmap_memory(&mut self, base: u64, size: u64) {
        self.memory.unmap(base, size);
    }

    /// Concrete byte read. Never allocates.
    pub fn get_memory_byte(&self, addr: u64) -> Option<u8> {
        self.memory.read_byte(addr)
    }

    /// Concrete byte write. Allocates implicitly.
    pub fn set_memory_byte(&mut self, addr: u64, value: u8) {
        self.memory.write_byte(addr, value);
    }

    /// Concrete multi-byte little-endian read.
    pub fn get_memory_range(&self, addr: u64, size: u64) -> Vec<Option<u8>> {
        (0..size).map(|i| self.memory.read_byte(addr + i)).collect()
    }

    /// Concrete multi-byte write.
    pub fn set_memory_range(&mut self, addr: u64, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.memory.write_byte(addr + i as u64, *b);
        }
    }
}

impl RegisterGeometry {
    fn parent_bit_size(&self, kind: ArchitectureKind) -> u32 {
        registers::geometry(kind, self.parent).map(|g| g.high - g.low + 1).unwrap_or(0)
    }
}
