//! [`SymbolicExpression`] and [`SymbolicVariable`] (spec §3).

use crate::arch::RegisterId;
use crate::ast::NodeId;

/// Id of a [`SymbolicExpression`]. Monotonically increasing, never recycled
/// within a session; removal by id is allowed and irreversible (spec §3).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpressionId(pub(super) u64);

/// Id of a [`SymbolicVariable`]. Monotonically increasing, never recycled.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(u64);

impl VariableId {
    /// Construct from a raw id. Exposed for tests and for embedding
    /// applications that persist ids across sessions.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The underlying numeric id.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Where a [`SymbolicVariable`] came from, when it was introduced by
/// concretising a location rather than as a bare free input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableOrigin {
    /// Concretised from a memory byte at this address.
    Memory(u64),
    /// Concretised from this register.
    Register(RegisterId),
}

/// A free bit-vector variable (spec §3).
#[derive(Debug, Clone)]
pub struct SymbolicVariable {
    id: VariableId,
    name: String,
    size: u32,
    comment: String,
    origin: Option<VariableOrigin>,
}

impl SymbolicVariable {
    pub(super) fn new(id: VariableId, size: u32, origin: Option<VariableOrigin>) -> Self {
        Self { id, name: format!("var_{}", id.raw()), size, comment: String::new(), origin }
    }

    /// This variable's id.
    pub const fn id(&self) -> VariableId {
        self.id
    }

    /// Current name. Derived from the id at creation but reassignable via
    /// [`Self::set_name`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reassign this variable's display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Bit-width.
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Free-form comment.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Attach a free-form comment.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Concrete origin, if this variable was created via concretisation.
    pub const fn origin(&self) -> Option<VariableOrigin> {
        self.origin
    }
}

/// Tags a [`SymbolicExpression`]'s provenance and, when not volatile, the
/// location it is bound to (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Bound to a single memory byte at this address (`memMap` is one byte
    /// per entry, spec §3).
    Memory(u64),
    /// Bound to a parent register.
    Register(RegisterId),
    /// Not bound to any location (e.g. an intermediate sub-expression).
    Volatile,
    /// Created before any binding was established.
    Undef,
}

/// A named, stored AST root with provenance (spec §3). Append-only:
/// `SymbolicEngine::remove_symbolic_expression` deletes an entry but never
/// reuses its id.
#[derive(Debug, Clone)]
pub struct SymbolicExpression {
    id: ExpressionId,
    node: NodeId,
    origin: Origin,
    comment: String,
    tainted: bool,
}

impl SymbolicExpression {
    pub(super) fn new(id: ExpressionId, node: NodeId, origin: Origin, comment: String) -> Self {
        Self { id, node, origin, comment, tainted: false }
    }

    /// This expression's id.
    pub const fn id(&self) -> ExpressionId {
        self.id
    }

    /// The AST root this expression names.
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Provenance / destination.
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// Free-form comment.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Taint flag, derived from inputs at creation time and refreshed by the
    /// façade once taint propagation for the owning instruction has run.
    pub const fn is_tainted(&self) -> bool {
        self.tainted
    }

    pub(super) fn set_tainted(&mut self, tainted: bool) {
        self.tainted = tainted;
    }

    pub(super) fn rebind(&mut self, node: NodeId) {
        self.node = node;
    }
}
