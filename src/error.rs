//! Crate-wide error kinds.

use thiserror::Error;

use crate::{
    ast::NodeId,
    callbacks::CallbackKind,
    symbolic::{ExpressionId, VariableId},
};

/// All failure modes surfaced by the façade and its engines.
///
/// Every check-style API (`check_architecture`, `check_symbolic`, ...)
/// returns the matching `*NotInitialised` variant immediately; construction
/// failures in the AST layer never mutate state before returning
/// [`Error::AstTypingError`].
#[derive(Debug, Error)]
pub enum Error {
    /// An architecture-dependent operation was attempted before
    /// [`crate::arch::Architecture::set_architecture`] was called.
    #[error("no architecture has been set")]
    ArchitectureNotInitialised,

    /// `set_architecture` was called with an id the façade doesn't model.
    #[error("unsupported architecture: {0:?}")]
    UnsupportedArchitecture(u32),

    /// A register id doesn't resolve to a known register for the current
    /// architecture.
    #[error("invalid register id: {0}")]
    InvalidRegister(u32),

    /// A memory access's address/size doesn't fit a valid range (e.g.
    /// overflowed the address space).
    #[error("invalid memory range: base={base:#x} size={size}")]
    InvalidMemoryRange {
        /// Base address of the rejected range.
        base: u64,
        /// Requested size in bytes.
        size: u64,
    },

    /// An AST node was constructed with children whose bit-sizes violate the
    /// operator's typing rule.
    #[error("AST typing error: {0}")]
    AstTypingError(String),

    /// `getFullAstFromId`/`extractUniqueAstNodes` referenced a node id that
    /// isn't (or is no longer) in the allocation pool.
    #[error("AST node not found: {0:?}")]
    AstNotFound(NodeId),

    /// A symbolic-engine query ran before [`crate::symbolic::SymbolicEngine::init`].
    #[error("symbolic engine is not initialised")]
    SymbolicEngineNotInitialised,

    /// A query referenced an expression id that was never allocated, or was
    /// removed by [`crate::symbolic::SymbolicEngine::remove_symbolic_expression`].
    #[error("unknown symbolic expression id: {0:?}")]
    UnknownSymbolicExpressionId(ExpressionId),

    /// A query referenced a variable id/name that was never bound.
    #[error("unknown symbolic variable: {0:?}")]
    UnknownSymbolicVariable(VariableId),

    /// The internal simplification pipeline produced an inconsistent result
    /// (e.g. a callback returned a node of the wrong bit-size).
    #[error("simplification failed: {0}")]
    SimplificationFailure(String),

    /// The external SMT solver collaborator reported a failure.
    #[error("solver failure: {0}")]
    SolverFailure(String),

    /// A registered callback raised during `process_callbacks`.
    #[error("callback of kind {kind:?} failed: {message}")]
    CallbackFailure {
        /// The callback kind being dispatched when the failure occurred.
        kind: CallbackKind,
        /// Human-readable description forwarded from the handler.
        message: String,
    },

    /// A taint-engine query or propagation ran before
    /// [`crate::taint::TaintEngine::init`].
    #[error("taint engine is not initialised")]
    TaintEngineNotInitialised,

    /// A lifter attempted to write a concrete value into an immediate
    /// operand (only register and memory destinations are writable).
    #[error("cannot write a concrete value into an immediate operand")]
    ImmediateOperandNotWritable,
}

impl Error {
    /// `true` for the three `*NotInitialised` variants, which every
    /// `check_*` guard returns verbatim rather than wrapping.
    pub const fn is_not_initialised(&self) -> bool {
        matches!(
            self,
            Self::ArchitectureNotInitialised
                | Self::SymbolicEngineNotInitialised
                | Self::TaintEngineNotInitialised
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
