//! The façade (spec §2/§9): one session object composing the architecture
//! model, the callbacks dispatcher, the symbolic engine and the taint
//! engine behind a single `processing(inst)` entry point. No global state —
//! every analysis session is its own `Facade`.

use tracing::debug;

use crate::arch::Architecture;
use crate::callbacks::Callbacks;
use crate::error::Result;
use crate::instruction::Instruction;
use crate::symbolic::SymbolicEngine;
use crate::taint::TaintEngine;

/// A dynamic binary analysis session: concrete state, the callbacks
/// dispatcher, the symbolic engine and the taint engine, composed behind one
/// API.
#[derive(Debug, Default)]
pub struct Facade {
    arch: Architecture,
    callbacks: Callbacks,
    symbolic: SymbolicEngine,
    taint: TaintEngine,
}

impl Facade {
    /// An unconfigured façade. Call [`Self::init`] before processing
    /// instructions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the architecture and brings the symbolic and taint
    /// engines up (spec §4.1/§4.4/§4.5 init contracts).
    pub fn init(&mut self, architecture_id: u32) -> Result<()> {
        self.arch.set_architecture(architecture_id)?;
        self.symbolic.init(&mut self.callbacks)?;
        self.taint.init();
        debug!(architecture_id, "facade initialised");
        Ok(())
    }

    /// Drops all concrete/symbolic/taint state but keeps the architecture
    /// and callback registrations.
    pub fn reset(&mut self) {
        self.arch.clear();
        self.symbolic.reset();
        self.taint.reset();
    }

    /// Tears the façade down; [`Self::init`] must run again before further
    /// use.
    pub fn remove(&mut self) {
        self.symbolic.remove();
        self.taint.remove();
    }

    /// Concrete architecture/CPU state.
    pub fn architecture(&self) -> &Architecture {
        &self.arch
    }

    /// Mutable access to concrete architecture/CPU state.
    pub fn architecture_mut(&mut self) -> &mut Architecture {
        &mut self.arch
    }

    /// The callbacks dispatcher.
    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// Mutable access to the callbacks dispatcher.
    pub fn callbacks_mut(&mut self) -> &mut Callbacks {
        &mut self.callbacks
    }

    /// The symbolic engine.
    pub fn symbolic(&self) -> &SymbolicEngine {
        &self.symbolic
    }

    /// Mutable access to the symbolic engine.
    pub fn symbolic_mut(&mut self) -> &mut SymbolicEngine {
        &mut self.symbolic
    }

    /// The taint engine.
    pub fn taint(&self) -> &TaintEngine {
        &self.taint
    }

    /// Mutable access to the taint engine.
    pub fn taint_mut(&mut self) -> &mut TaintEngine {
        &mut self.taint
    }

    /// Disjoint mutable/shared borrows of every subsystem, so lifters can
    /// thread the architecture and symbolic/taint engines through the same
    /// operand builders without the borrow checker seeing one `&mut Facade`
    /// used twice.
    pub(crate) fn parts_mut(&mut self) -> (&mut Architecture, &Callbacks, &mut SymbolicEngine, &mut TaintEngine) {
        (&mut self.arch, &self.callbacks, &mut self.symbolic, &mut self.taint)
    }

    /// `processing(inst)` (spec §2/§7): dispatches `inst` to the lifter
    /// matching its mnemonic. Returns `Ok(false)` ("instruction not
    /// supported") rather than an error when no lifter is registered for
    /// the mnemonic; every other failure mode is `Err`.
    pub fn processing(&mut self, inst: &mut Instruction) -> Result<bool> {
        match crate::lifters::find(inst.mnemonic()) {
            Some(lifter) => {
                lifter.lift(self, inst)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
