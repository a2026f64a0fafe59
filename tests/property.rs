use dba_core::ast::{AstContext, NodeKind};
use dba_core::prelude::*;
use quickcheck_macros::quickcheck;

/// AST dictionary idempotence: recording the same `(kind, size)` constant
/// twice must hand back the same node id once hash-consing is on.
#[quickcheck]
fn recording_the_same_constant_twice_is_idempotent(value: u64, size_seed: u8) -> bool {
    let mut ctx = AstContext::new();
    let size = (size_seed as u32 % 64) + 1;
    let truncated = if size >= 64 { value } else { value & ((1u64 << size) - 1) };

    let first = ctx.record_ast_node(NodeKind::Const(truncated as u128), size, Default::default());
    let second = ctx.record_ast_node(NodeKind::Const(truncated as u128), size, Default::default());

    match (first, second) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Two distinct constant values at the same width must never collide on one
/// node id.
#[quickcheck]
fn distinct_constants_never_share_a_node(a: u32, b: u32) -> bool {
    if a == b {
        return true;
    }
    let mut ctx = AstContext::new();
    let na = ctx.record_ast_node(NodeKind::Const(a as u128), 32, Default::default()).unwrap();
    let nb = ctx.record_ast_node(NodeKind::Const(b as u128), 32, Default::default()).unwrap();
    na != nb
}

fn x64_facade() -> Facade {
    let mut facade = Facade::new();
    facade.init(ArchitectureKind::X8664 as u32).unwrap();
    facade
}

/// Taint union is monotonic: once a register is tainted, unioning any
/// further source taint (tainted or not) can never untaint it.
#[quickcheck]
fn taint_union_is_monotonic(source_tainted: bool) -> bool {
    let mut facade = x64_facade();
    let rax = RegisterId::new(0);
    let rbx = RegisterId::new(5);

    facade.architecture_mut().set_register_value(rax, 1).unwrap();
    facade.architecture_mut().set_register_value(rbx, 2).unwrap();
    facade.taint_mut().taint_register(facade.architecture(), rax).unwrap();
    if source_tainted {
        facade.taint_mut().taint_register(facade.architecture(), rbx).unwrap();
    }

    let mut inst = Instruction::new(0x1000, "add", vec![Operand::Register(rax), Operand::Register(rbx)]);
    facade.processing(&mut inst).unwrap();

    facade.taint().is_register_tainted(facade.architecture(), rax).unwrap()
}

/// Taint assignment (`mov`) always adopts exactly the source's taint state,
/// regardless of what the destination carried beforehand.
#[quickcheck]
fn taint_assignment_tracks_only_the_source(dest_was_tainted: bool, source_tainted: bool) -> bool {
    let mut facade = x64_facade();
    let rax = RegisterId::new(0);
    let rbx = RegisterId::new(5);

    facade.architecture_mut().set_register_value(rbx, 9).unwrap();
    if dest_was_tainted {
        facade.taint_mut().taint_register(facade.architecture(), rax).unwrap();
    }
    if source_tainted {
        facade.taint_mut().taint_register(facade.architecture(), rbx).unwrap();
    }

    let mut inst = Instruction::new(0x1000, "mov", vec![Operand::Register(rax), Operand::Register(rbx)]);
    facade.processing(&mut inst).unwrap();

    facade.taint().is_register_tainted(facade.architecture(), rax).unwrap() == source_tainted
}
