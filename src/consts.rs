//! Engine-wide limits and bit-width constants.

/// Maximum bit-size of a single [`crate::ast::AbstractNode`]. Registers never
/// exceed this (it covers the widest vector register geometry modeled).
pub const MAX_BIT_SIZE: u32 = 512;

/// Minimum bit-size of a bit-vector node: a single flag bit.
pub const MIN_BIT_SIZE: u32 = 1;

/// Bit width of one addressable memory byte.
pub const BYTE_BIT_SIZE: u32 = 8;

/// Number of distinct callback kinds, see [`crate::callbacks::CallbackKind`].
pub const CALLBACK_KIND_COUNT: usize = 3;
