use dba_core::prelude::*;

fn x64_facade() -> Facade {
    let mut facade = Facade::new();
    facade.init(ArchitectureKind::X8664 as u32).unwrap();
    facade
}

#[test]
fn add_unions_taint_from_source_into_destination() {
    let mut facade = x64_facade();
    let rax = RegisterId::new(0);
    let rbx = RegisterId::new(5);

    facade.architecture_mut().set_register_value(rax, 10).unwrap();
    facade.architecture_mut().set_register_value(rbx, 20).unwrap();
    facade.taint_mut().taint_register(facade.architecture(), rbx).unwrap();

    let mut inst = Instruction::new(0x1000, "add", vec![Operand::Register(rax), Operand::Register(rbx)]);
    assert!(facade.processing(&mut inst).unwrap());

    assert_eq!(facade.architecture().register_value(rax).unwrap(), 30);
    assert!(facade.taint().is_register_tainted(facade.architecture(), rax).unwrap());
}

#[test]
fn mov_assignment_clears_destination_taint_from_untainted_source() {
    let mut facade = x64_facade();
    let rax = RegisterId::new(0);
    let rbx = RegisterId::new(5);

    facade.taint_mut().taint_register(facade.architecture(), rax).unwrap();
    facade.architecture_mut().set_register_value(rbx, 7).unwrap();

    let mut inst = Instruction::new(0x1000, "mov", vec![Operand::Register(rax), Operand::Register(rbx)]);
    facade.processing(&mut inst).unwrap();

    assert!(!facade.taint().is_register_tainted(facade.architecture(), rax).unwrap());
}

#[test]
fn test_instruction_taints_zero_flag_from_either_operand() {
    let mut facade = x64_facade();
    let rax = RegisterId::new(0);
    let rbx = RegisterId::new(5);
    let zf = dba_core::arch::registers::find_by_name(ArchitectureKind::X8664, "zf").unwrap();

    facade.architecture_mut().set_register_value(rax, 0xff).unwrap();
    facade.architecture_mut().set_register_value(rbx, 0x00).unwrap();
    facade.taint_mut().taint_register(facade.architecture(), rbx).unwrap();

    let mut inst = Instruction::new(0x1000, "test", vec![Operand::Register(rax), Operand::Register(rbx)]);
    facade.processing(&mut inst).unwrap();

    assert_eq!(facade.architecture().register_value(zf).unwrap(), 1);
    assert!(facade.taint().is_register_tainted(facade.architecture(), zf).unwrap());
}
