//! Concrete/symbolic/taint execution core for a dynamic binary analysis
//! façade: an architecture/CPU model, a hash-consed bit-vector AST, a
//! callbacks dispatcher, a symbolic engine and a byte/register-granular
//! taint engine, composed behind [`facade::Facade`].
//!
//! Disassembly, per-opcode semantics beyond the illustrative [`lifters`],
//! and the SMT solver itself are external collaborators: this crate models
//! their contracts ([`instruction::Instruction`], [`lifters::Lifter`],
//! [`solver::Solver`]) without shipping full implementations.

pub mod arch;
pub mod ast;
pub mod callbacks;
pub mod consts;
pub mod error;
pub mod facade;
pub mod instruction;
pub mod lifters;
pub mod solver;
pub mod symbolic;
pub mod taint;

pub mod prelude {
    //! Common imports for embedding applications.

    pub use crate::arch::{Architecture, ArchitectureKind, RegisterId};
    pub use crate::ast::{AbstractNode, AstContext, NodeId, NodeKind};
    pub use crate::callbacks::{CallbackId, CallbackKind, Callbacks};
    pub use crate::error::{Error, Result};
    pub use crate::facade::Facade;
    pub use crate::instruction::{Immediate, Instruction, MemoryAccess, Operand};
    pub use crate::solver::{Model, NullSolver, Solver, SolverValue};
    pub use crate::symbolic::{ExpressionId, Optimization, SymbolicEngine, SymbolicExpression, SymbolicVariable, VariableId};
    pub use crate::taint::TaintEngine;
}
