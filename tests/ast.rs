use dba_core::prelude::*;

#[test]
fn simplification_runs_through_facade_during_add() {
    let mut facade = Facade::new();
    facade.init(ArchitectureKind::X8664 as u32).unwrap();

    let rax = RegisterId::new(0);
    facade.architecture_mut().set_register_value(rax, 41).unwrap();

    // add rax, 1 twice: the second add's `x + 0`-shaped identity never
    // arises here, but this exercises the identity passes wired in by
    // `SymbolicEngine::init` without asserting on their output directly —
    // the assertion is on the concrete result, which must be unaffected by
    // whatever the simplification pipeline does to the AST.
    let mut inst = Instruction::new(0x1000, "add", vec![Operand::Register(rax), Operand::Immediate(Immediate::new(1, 64))]);
    facade.processing(&mut inst).unwrap();
    assert_eq!(facade.architecture().register_value(rax).unwrap(), 42);
}

#[test]
fn ast_representation_mode_selects_printer() {
    let mut ctx = AstContext::new();
    let a = ctx.record_ast_node(NodeKind::Const(1), 8, Default::default()).unwrap();
    let b = ctx.record_ast_node(NodeKind::Const(2), 8, Default::default()).unwrap();
    let sum = ctx.record_ast_node(NodeKind::Bvadd, 8, [a, b].into_iter().collect()).unwrap();

    let smt = dba_core::ast::repr::print_ast_representation(&ctx, sum, dba_core::ast::AstRepresentationMode::Smt).unwrap();
    assert!(smt.starts_with("(bvadd"));

    let python = dba_core::ast::repr::print_ast_representation(&ctx, sum, dba_core::ast::AstRepresentationMode::Python).unwrap();
    assert!(python.contains('+'));
}
