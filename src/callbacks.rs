//! Callbacks dispatcher (§4.3): three ordered handler chains mediating
//! concrete reads and AST simplification.

use tracing::trace;

use crate::arch::{Architecture, RegisterId};
use crate::ast::{AstContext, NodeId};
use crate::error::{Error, Result};
use crate::instruction::MemoryAccess;

/// The three callback kinds, matching the table in spec §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum CallbackKind {
    /// `GET_CONCRETE_MEMORY_VALUE`: payload `MemoryAccess`, no return value
    /// (the handler may populate memory as a side effect).
    GetConcreteMemoryValue,
    /// `GET_CONCRETE_REGISTER_VALUE`: payload `Register`, no return value.
    GetConcreteRegisterValue,
    /// `SYMBOLIC_SIMPLIFICATION`: payload and return value are both
    /// `AbstractNode` — a left-to-right rewrite chain.
    SymbolicSimplification,
}

/// Opaque handle returned by `addCallback`, used by `removeCallback` to
/// identify a specific handler. Rust closures have no stable identity to
/// match on (unlike the teacher ecosystem's function-pointer-keyed C++
/// callback tables), so the dispatcher hands out a monotonically
/// increasing token instead — the Rust-idiomatic adaptation of "matches by
/// handler identity" recorded as an Open Question decision in DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

type MemoryReadHandler = Box<dyn Fn(&mut Architecture, MemoryAccess) -> Result<()>>;
type RegisterReadHandler = Box<dyn Fn(&mut Architecture, RegisterId) -> Result<()>>;
type SimplificationHandler = Box<dyn Fn(&mut AstContext, NodeId) -> Result<NodeId>>;

/// The dispatcher: three ordered lists keyed by kind. Handlers within a kind
/// run in insertion order; for `SYMBOLIC_SIMPLIFICATION` later handlers see
/// earlier handlers' output (it's a rewrite chain), for the read kinds it is
/// a plain notify-all.
#[derive(Default)]
pub struct Callbacks {
    next_id: u64,
    memory_read: Vec<(CallbackId, MemoryReadHandler)>,
    register_read: Vec<(CallbackId, RegisterReadHandler)>,
    simplification: Vec<(CallbackId, SimplificationHandler)>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("memory_read", &self.memory_read.len())
            .field("register_read", &self.register_read.len())
            .field("simplification", &self.simplification.len())
            .finish()
    }
}

impl Callbacks {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> CallbackId {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Registers a `GET_CONCRETE_MEMORY_VALUE` handler.
    pub fn add_memory_read(&mut self, handler: impl Fn(&mut Architecture, MemoryAccess) -> Result<()> + 'static) -> CallbackId {
        let id = self.alloc_id();
        self.memory_read.push((id, Box::new(handler)));
        id
    }

    /// Registers a `GET_CONCRETE_REGISTER_VALUE` handler.
    pub fn add_register_read(&mut self, handler: impl Fn(&mut Architecture, RegisterId) -> Result<()> + 'static) -> CallbackId {
        let id = self.alloc_id();
        self.register_read.push((id, Box::new(handler)));
        id
    }

    /// Registers a `SYMBOLIC_SIMPLIFICATION` handler.
    pub fn add_simplification(&mut self, handler: impl Fn(&mut AstContext, NodeId) -> Result<NodeId> + 'static) -> CallbackId {
        let id = self.alloc_id();
        self.simplification.push((id, Box::new(handler)));
        id
    }

    /// `removeCallback(kind, handler)`: matches by the token returned from
    /// the corresponding `add_*` call.
    pub fn remove(&mut self, kind: CallbackKind, id: CallbackId) {
        match kind {
            CallbackKind::GetConcreteMemoryValue => self.memory_read.retain(|(i, _)| *i != id),
            CallbackKind::GetConcreteRegisterValue => self.register_read.retain(|(i, _)| *i != id),
            CallbackKind::SymbolicSimplification => self.simplification.retain(|(i, _)| *i != id),
        }
    }

    /// `removeAllCallbacks`.
    pub fn remove_all(&mut self) {
        self.memory_read.clear();
        self.register_read.clear();
        self.simplification.clear();
    }

    /// `true` if at least one handler is registered for `kind`.
    pub fn has_callbacks(&self, kind: CallbackKind) -> bool {
        match kind {
            CallbackKind::GetConcreteMemoryValue => !self.memory_read.is_empty(),
            CallbackKind::GetConcreteRegisterValue => !self.register_read.is_empty(),
            CallbackKind::SymbolicSimplification => !self.simplification.is_empty(),
        }
    }

    /// `processCallbacks(GET_CONCRETE_MEMORY_VALUE, access)`: notify-all in
    /// insertion order. A handler raising aborts the remaining chain and is
    /// surfaced as [`Error::CallbackFailure`].
    pub fn process_memory_read(&self, arch: &mut Architecture, access: MemoryAccess) -> Result<()> {
        for (_, handler) in &self.memory_read {
            trace!(?access, "dispatching GET_CONCRETE_MEMORY_VALUE callback");
            handler(arch, access).map_err(|e| wrap(CallbackKind::GetConcreteMemoryValue, e))?;
        }
        Ok(())
    }

    /// `processCallbacks(GET_CONCRETE_REGISTER_VALUE, reg)`.
    pub fn process_register_read(&self, arch: &mut Architecture, reg: RegisterId) -> Result<()> {
        for (_, handler) in &self.register_read {
            trace!(?reg, "dispatching GET_CONCRETE_REGISTER_VALUE callback");
            handler(arch, reg).map_err(|e| wrap(CallbackKind::GetConcreteRegisterValue, e))?;
        }
        Ok(())
    }

    /// `processCallbacks(SYMBOLIC_SIMPLIFICATION, node)`: left-to-right
    /// rewrite, each handler's output feeding the next.
    pub fn process_simplification(&self, ctx: &mut AstContext, node: NodeId) -> Result<NodeId> {
        let mut current = node;
        for (_, handler) in &self.simplification {
            current = handler(ctx, current).map_err(|e| wrap(CallbackKind::SymbolicSimplification, e))?;
        }
        Ok(current)
    }
}

fn wrap(kind: CallbackKind, error: Error) -> Error {
    if let Error::CallbackFailure { .. } = error {
        return error;
    }
    Error::CallbackFailure { kind, message: error.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchitectureKind;
    use crate::ast::NodeKind;

    #[test]
    fn read_callback_populates_on_miss() {
        let mut callbacks = Callbacks::new();
        callbacks.add_memory_read(|arch, access| {
            arch.set_memory_byte(access.address, 0xde);
            Ok(())
        });

        let mut arch = Architecture::new();
        arch.set_architecture(ArchitectureKind::X8664 as u32).unwrap();
        assert_eq!(arch.get_memory_byte(0x200), None);

        callbacks.process_memory_read(&mut arch, MemoryAccess::new(0x200, 1)).unwrap();
        assert_eq!(arch.get_memory_byte(0x200), Some(0xde));
    }

    #[test]
    fn simplification_chain_runs_in_order() {
        let mut callbacks = Callbacks::new();
        callbacks.add_simplification(|ctx, id| {
            let node = ctx.get(id)?.clone();
            if let NodeKind::Bvadd = node.kind() {
                Ok(node.children()[0])
            } else {
                Ok(id)
            }
        });

        let mut ctx = AstContext::new();
        let a = ctx.record_ast_node(NodeKind::Const(1), 8, Default::default()).unwrap();
        let b = ctx.record_ast_node(NodeKind::Const(0), 8, Default::default()).unwrap();
        let sum = ctx.record_ast_node(NodeKind::Bvadd, 8, [a, b].into_iter().collect()).unwrap();

        let simplified = callbacks.process_simplification(&mut ctx, sum).unwrap();
        assert_eq!(simplified, a);
    }

    #[test]
    fn callback_failure_aborts_remaining_chain() {
        let mut callbacks = Callbacks::new();
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let calls2 = calls.clone();
        callbacks.add_register_read(move |_arch, _reg| {
            calls2.set(calls2.get() + 1);
            Err(Error::CallbackFailure { kind: CallbackKind::GetConcreteRegisterValue, message: "boom".into() })
        });
        let calls3 = calls.clone();
        callbacks.add_register_read(move |_arch, _reg| {
            calls3.set(calls3.get() + 1);
            Ok(())
        });

        let mut arch = Architecture::new();
        arch.set_architecture(ArchitectureKind::X8664 as u32).unwrap();
        let result = callbacks.process_register_read(&mut arch, RegisterId::new(0));
        assert!(result.is_err());
        assert_eq!(calls.get(), 1, "second handler must not run after the first fails");
    }
}
