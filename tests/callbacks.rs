use dba_core::prelude::*;

fn x64_facade() -> Facade {
    let mut facade = Facade::new();
    facade.init(ArchitectureKind::X8664 as u32).unwrap();
    facade
}

#[test]
fn mov_from_unbound_register_fires_read_callback() {
    let mut facade = x64_facade();
    facade.callbacks_mut().add_register_read(|arch, reg| {
        arch.geometry(reg).map(|_| ())?;
        // Seed rbx with a known concrete value on first read.
        arch.set_register_value(reg, 0x41).map(|_| ())
    });

    let rax = RegisterId::new(0);
    let rbx = RegisterId::new(5);
    let mut inst = Instruction::new(0x1000, "mov", vec![Operand::Register(rax), Operand::Register(rbx)]);

    assert!(facade.processing(&mut inst).unwrap());
    assert_eq!(facade.architecture().register_value(rax).unwrap(), 0x41);
}

#[test]
fn unsupported_mnemonic_reports_not_supported() {
    let mut facade = x64_facade();
    let mut inst = Instruction::new(0x1000, "nop", vec![]);
    assert!(!facade.processing(&mut inst).unwrap());
}
