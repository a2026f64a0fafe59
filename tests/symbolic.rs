use dba_core::prelude::*;

fn x64_facade() -> Facade {
    let mut facade = Facade::new();
    facade.init(ArchitectureKind::X8664 as u32).unwrap();
    facade
}

#[test]
fn sub_register_write_preserves_parent_sibling_bits() {
    let mut facade = x64_facade();
    let rax = RegisterId::new(0);
    let ah = RegisterId::new(4);

    facade.architecture_mut().set_register_value(rax, 0x1122_3344_5566_7788).unwrap();
    facade.architecture_mut().set_register_value(ah, 0xab).unwrap();

    let rax_after = facade.architecture().register_value(rax).unwrap();
    assert_eq!(rax_after, 0x1122_3344_5566_ab88, "ah write must leave every other byte of rax untouched");
}

#[test]
fn full_32bit_write_zero_extends_64bit_parent() {
    let mut facade = x64_facade();
    let rax = RegisterId::new(0);
    let eax = RegisterId::new(1);

    facade.architecture_mut().set_register_value(rax, 0xffff_ffff_ffff_ffff).unwrap();
    facade.architecture_mut().set_register_value(eax, 0x1).unwrap();

    assert_eq!(facade.architecture().register_value(rax).unwrap(), 0x1, "a full 32-bit write zero-extends into the 64-bit parent");
}

#[test]
fn multi_byte_memory_read_builds_concat_over_byte_expressions() {
    let mut facade = x64_facade();
    facade.architecture_mut().set_memory_range(0x2000, &[0x11, 0x22, 0x33, 0x44]);

    let eax = RegisterId::new(1);
    let mut inst = Instruction::new(0x1000, "mov", vec![Operand::Register(eax), Operand::Memory(MemoryAccess::new(0x2000, 4))]);
    facade.processing(&mut inst).unwrap();

    assert_eq!(facade.architecture().register_value(eax).unwrap(), 0x4433_2211, "little-endian 4-byte concat must match memory order");
    assert_eq!(inst.symbolic_inputs().len(), 0, "no prior binding existed on the memory bytes, so nothing is recorded as an input");
    assert_eq!(inst.symbolic_outputs().len(), 1, "eax is a 32-bit register, so one register-granularity expression is bound");
}

#[test]
fn jcc_accumulates_a_path_constraint_per_branch() {
    let mut facade = x64_facade();
    let zf = dba_core::arch::registers::find_by_name(ArchitectureKind::X8664, "zf").unwrap();
    facade.architecture_mut().set_register_value(zf, 1).unwrap();

    let mut inst = Instruction::new(0x1000, "jcc", vec![Operand::Register(zf)]);
    facade.processing(&mut inst).unwrap();

    assert_eq!(facade.symbolic().path_constraints().len(), 1);
    assert_eq!(facade.symbolic().path_constraints()[0].instruction_address, 0x1000);
}

#[test]
fn backup_then_restore_undoes_an_add() {
    let mut facade = x64_facade();
    let rax = RegisterId::new(0);
    facade.architecture_mut().set_register_value(rax, 5).unwrap();
    facade.symbolic_mut().backup().unwrap();

    let mut inst = Instruction::new(0x1000, "add", vec![Operand::Register(rax), Operand::Register(rax)]);
    facade.processing(&mut inst).unwrap();
    assert_eq!(facade.architecture().register_value(rax).unwrap(), 10);

    facade.symbolic_mut().restore().unwrap();
    assert!(facade.symbolic().symbolic_register_expression(facade.architecture(), rax).unwrap().is_none());
}

#[test]
fn concretize_register_forces_a_fresh_read_callback_on_next_build() {
    use std::cell::Cell;
    use std::rc::Rc;

    let mut facade = x64_facade();
    let rax = RegisterId::new(0);

    let reads = Rc::new(Cell::new(0));
    let reads_handle = reads.clone();
    facade.callbacks_mut().add_register_read(move |_arch, _reg| {
        reads_handle.set(reads_handle.get() + 1);
        Ok(())
    });

    // `mov rax, 5` binds rax symbolically from an immediate — no register
    // read is needed to build that operand.
    let mut seed = Instruction::new(0x1000, "mov", vec![Operand::Register(rax), Operand::Immediate(Immediate::new(5, 64))]);
    facade.processing(&mut seed).unwrap();
    assert!(facade.symbolic().symbolic_register_expression(facade.architecture(), rax).unwrap().is_some());

    // `add rax, rax` while rax is still bound: both operand builds reuse the
    // existing binding, firing no read callback.
    let mut still_bound = Instruction::new(0x1004, "add", vec![Operand::Register(rax), Operand::Register(rax)]);
    facade.processing(&mut still_bound).unwrap();
    assert_eq!(reads.get(), 0, "a bound register must not trigger a concrete read");

    facade.symbolic_mut().concretize_register(facade.architecture(), rax).unwrap();
    assert!(facade.symbolic().symbolic_register_expression(facade.architecture(), rax).unwrap().is_none());
    assert_eq!(facade.architecture().register_value(rax).unwrap(), 10, "concretising leaves the concrete value untouched");

    // Now unbound: both operand builds for `add rax, rax` must each read
    // the concrete value through a callback.
    let mut after_concretize = Instruction::new(0x1008, "add", vec![Operand::Register(rax), Operand::Register(rax)]);
    facade.processing(&mut after_concretize).unwrap();
    assert_eq!(reads.get(), 2, "both operand builds must re-read the concrete register after concretising");
}
