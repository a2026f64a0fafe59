//! Register geometry tables.
//!
//! Every register known to an architecture has an entry `(name, high, low,
//! parent)`. GPR entries are their own parent (`parent == self`); everything
//! else is a sub-register or flag bit of some parent, forming the forest
//! described in spec §3 ("Parent registers form a forest rooted at GPRs").

use super::ArchitectureKind;

/// Opaque handle into a register geometry table. Ids are architecture-scoped:
/// the same numeric id means different registers under `X8664` vs `X86`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterId(pub u32);

impl RegisterId {
    /// Construct from a raw id, as supplied by the disassembler collaborator.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// `(name, high, low, parent, is_flag)`.
///
/// `Deserialize` is deliberately not derived here: `name` is `&'static str`,
/// borrowed from the architecture's geometry table, and serde can only
/// deserialize a borrowed `&str` tied to the input's own lifetime, not to
/// `'static`. Serialising a snapshot (e.g. for logging or a debugger
/// front-end) is still useful, so `Serialize` alone is kept.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterGeometry {
    /// Canonical name, e.g. `"eax"`.
    pub name: &'static str,
    /// Highest bit (inclusive) this register occupies within its parent.
    pub high: u32,
    /// Lowest bit (inclusive) this register occupies within its parent.
    pub low: u32,
    /// The GPR (or flags register) this register is carved out of. Equal to
    /// the register's own id for a root GPR.
    pub parent: RegisterId,
    /// Whether this entry is a single-bit flag rather than a GPR/sub-GPR.
    pub is_flag: bool,
}

type Entry = (&'static str, u32, u32, u32, bool);

macro_rules! entries {
    ($($name:literal, $high:literal, $low:literal, $parent:literal, $flag:literal;)*) => {
        &[$(($name, $high, $low, $parent, $flag)),*]
    };
}

#[rustfmt::skip]
const X8664: &[Entry] = entries! {
    "rax", 63, 0, 0, false;
    "eax", 31, 0, 0, false;
    "ax",  15, 0, 0, false;
    "al",   7, 0, 0, false;
    "ah",  15, 8, 0, false;

    "rbx", 63, 0, 5, false;
    "ebx", 31, 0, 5, false;
    "bx",  15, 0, 5, false;
    "bl",   7, 0, 5, false;
    "bh",  15, 8, 5, false;

    "rcx", 63, 0, 10, false;
    "ecx", 31, 0, 10, false;
    "cx",  15, 0, 10, false;
    "cl",   7, 0, 10, false;
    "ch",  15, 8, 10, false;

    "rdx", 63, 0, 15, false;
    "edx", 31, 0, 15, false;
    "dx",  15, 0, 15, false;
    "dl",   7, 0, 15, false;
    "dh",  15, 8, 15, false;

    "rsi",  63, 0, 20, false;
    "esi",  31, 0, 20, false;
    "si",   15, 0, 20, false;
    "sil",   7, 0, 20, false;

    "rdi",  63, 0, 24, false;
    "edi",  31, 0, 24, false;
    "di",   15, 0, 24, false;
    "dil",   7, 0, 24, false;

    "rbp",  63, 0, 28, false;
    "ebp",  31, 0, 28, false;
    "bp",   15, 0, 28, false;
    "bpl",   7, 0, 28, false;

    "rsp",  63, 0, 32, false;
    "esp",  31, 0, 32, false;
    "sp",   15, 0, 32, false;
    "spl",   7, 0, 32, false;

    "rip",  63, 0, 36, false;
    "eip",  31, 0, 36, false;

    "rflags", 63, 0, 38, false;
    "cf",  0,  0, 38, true;
    "pf",  2,  2, 38, true;
    "zf",  6,  6, 38, true;
    "sf",  7,  7, 38, true;
    "of", 11, 11, 38, true;
};

#[rustfmt::skip]
const X86: &[Entry] = entries! {
    "eax", 31, 0, 0, false;
    "ax",  15, 0, 0, false;
    "al",   7, 0, 0, false;
    "ah",  15, 8, 0, false;

    "ebx", 31, 0, 4, false;
    "bx",  15, 0, 4, false;
    "bl",   7, 0, 4, false;
    "bh",  15, 8, 4, false;

    "ecx", 31, 0, 8, false;
    "cx",  15, 0, 8, false;
    "cl",   7, 0, 8, false;
    "ch",  15, 8, 8, false;

    "edx", 31, 0, 12, false;
    "dx",  15, 0, 12, false;
    "dl",   7, 0, 12, false;
    "dh",  15, 8, 12, false;

    "esi", 31, 0, 16, false;
    "si",  15, 0, 16, false;

    "edi", 31, 0, 18, false;
    "di",  15, 0, 18, false;

    "ebp", 31, 0, 20, false;
    "bp",  15, 0, 20, false;

    "esp", 31, 0, 22, false;
    "sp",  15, 0, 22, false;

    "eip", 31, 0, 24, false;

    "eflags", 31, 0, 25, false;
    "cf",  0,  0, 25, true;
    "pf",  2,  2, 25, true;
    "zf",  6,  6, 25, true;
    "sf",  7,  7, 25, true;
    "of", 11, 11, 25, true;
};

fn table(kind: ArchitectureKind) -> &'static [Entry] {
    match kind {
        ArchitectureKind::X8664 => X8664,
        ArchitectureKind::X86 => X86,
    }
}

/// Number of register storage slots to allocate for `kind` — sized to the
/// full id space of its geometry table rather than just the distinct
/// parents, trading a little unused storage for a trivial indexing scheme.
pub(super) fn parent_count(kind: ArchitectureKind) -> usize {
    table(kind).len()
}

/// Look up `(name, high, low, parent)` for `reg` under `kind`.
pub fn geometry(kind: ArchitectureKind, reg: RegisterId) -> Option<RegisterGeometry> {
    table(kind).get(reg.0 as usize).map(|&(name, high, low, parent, is_flag)| RegisterGeometry {
        name,
        high,
        low,
        parent: RegisterId(parent),
        is_flag,
    })
}

/// Find a register by its canonical name. Used by tests and by callbacks
/// that want to address a register symbolically.
pub fn find_by_name(kind: ArchitectureKind, name: &str) -> Option<RegisterId> {
    table(kind).iter().position(|&(n, ..)| n == name).map(|i| RegisterId(i as u32))
}
