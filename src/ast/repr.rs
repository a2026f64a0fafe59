//! AST representation mode and pretty-printers (spec §4.2).

use std::fmt::Write as _;

use crate::error::Result;

use super::context::AstContext;
use super::node::{NodeId, NodeKind};

/// Selects which pretty-printer [`print_ast_representation`] dispatches to.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum AstRepresentationMode {
    /// SMT-LIB2 syntax, e.g. `(bvadd x #x00000001)`.
    #[default]
    Smt,
    /// Python-expression syntax, e.g. `(x + 1)`.
    Python,
}

/// `printAstRepresentation(stream, node)`: dispatches to the mode-specific
/// formatter.
pub fn print_ast_representation(ctx: &AstContext, node: NodeId, mode: AstRepresentationMode) -> Result<String> {
    match mode {
        AstRepresentationMode::Smt => to_smtlib2(ctx, node),
        AstRepresentationMode::Python => to_python(ctx, node),
    }
}

/// Renders `node` as an SMT-LIB2 term.
pub fn to_smtlib2(ctx: &AstContext, node: NodeId) -> Result<String> {
    let mut out = String::new();
    write_smtlib2(ctx, node, &mut out)?;
    Ok(out)
}

fn write_smtlib2(ctx: &AstContext, id: NodeId, out: &mut String) -> Result<()> {
    let node = ctx.get(id)?;
    let kids = node.children().to_vec();
    match node.kind() {
        NodeKind::Const(v) => {
            let _ = write!(out, "(_ bv{v} {})", node.bit_size());
        }
        NodeKind::Variable(v) => {
            let _ = write!(out, "var_{}", v.raw());
        }
        NodeKind::Extract { high, low } => {
            let _ = write!(out, "((_ extract {high} {low}) ");
            write_smtlib2(ctx, kids[0], out)?;
            out.push(')');
        }
        NodeKind::Concat => {
            out.push_str("(concat");
            for k in kids {
                out.push(' ');
                write_smtlib2(ctx, k, out)?;
            }
            out.push(')');
        }
        NodeKind::Zext(extra) => {
            let _ = write!(out, "((_ zero_extend {extra}) ");
            write_smtlib2(ctx, kids[0], out)?;
            out.push(')');
        }
        NodeKind::Sext(extra) => {
            let _ = write!(out, "((_ sign_extend {extra}) ");
            write_smtlib2(ctx, kids[0], out)?;
            out.push(')');
        }
        NodeKind::Ite => {
            out.push_str("(ite ");
            write_smtlib2(ctx, kids[0], out)?;
            out.push(' ');
            write_smtlib2(ctx, kids[1], out)?;
            out.push(' ');
            write_smtlib2(ctx, kids[2], out)?;
            out.push(')');
        }
        unary @ (NodeKind::Bvnot | NodeKind::Bvneg | NodeKind::Lnot) => {
            let op = match unary {
                NodeKind::Bvnot => "bvnot",
                NodeKind::Bvneg => "bvneg",
                NodeKind::Lnot => "not",
                _ => unreachable!(),
            };
            let _ = write!(out, "({op} ");
            write_smtlib2(ctx, kids[0], out)?;
            out.push(')');
        }
        binary => {
            let op = binary_smt_op(binary);
            let _ = write!(out, "({op}");
            for k in kids {
                out.push(' ');
                write_smtlib2(ctx, k, out)?;
            }
            out.push(')');
        }
    }
    Ok(())
}

fn binary_smt_op(kind: &NodeKind) -> &'static str {
    use NodeKind::*;
    match kind {
        Bvadd => "bvadd",
        Bvsub => "bvsub",
        Bvmul => "bvmul",
        Bvudiv => "bvudiv",
        Bvsdiv => "bvsdiv",
        Bvurem => "bvurem",
        Bvsrem => "bvsrem",
        Bvand => "bvand",
        Bvor => "bvor",
        Bvxor => "bvxor",
        Bvshl => "bvshl",
        Bvlshr => "bvlshr",
        Bvashr => "bvashr",
        Bvrol => "bvrol",
        Bvror => "bvror",
        Equal => "=",
        Distinct => "distinct",
        Bvult => "bvult",
        Bvule => "bvule",
        Bvslt => "bvslt",
        Bvsle => "bvsle",
        Land => "and",
        Lor => "or",
        other => unreachable!("{other:?} is not a binary/variadic SMT operator"),
    }
}

/// Renders `node` as a Python-ish infix expression. Only covers the small
/// set of operators the façade's illustrative lifters emit; anything else
/// falls back to a function-call rendering.
fn to_python(ctx: &AstContext, node: NodeId) -> Result<String> {
    let mut out = String::new();
    write_python(ctx, node, &mut out)?;
    Ok(out)
}

fn write_python(ctx: &AstContext, id: NodeId, out: &mut String) -> Result<()> {
    let node = ctx.get(id)?;
    let kids = node.children().to_vec();
    match node.kind() {
        NodeKind::Const(v) => {
            let _ = write!(out, "{v}");
        }
        NodeKind::Variable(v) => {
            let _ = write!(out, "var_{}", v.raw());
        }
        NodeKind::Bvadd | NodeKind::Bvsub | NodeKind::Bvmul | NodeKind::Bvand | NodeKind::Bvor | NodeKind::Bvxor => {
            let op = match node.kind() {
                NodeKind::Bvadd => "+",
                NodeKind::Bvsub => "-",
                NodeKind::Bvmul => "*",
                NodeKind::Bvand => "&",
                NodeKind::Bvor => "|",
                NodeKind::Bvxor => "^",
                _ => unreachable!(),
            };
            out.push('(');
            write_python(ctx, kids[0], out)?;
            let _ = write!(out, " {op} ");
            write_python(ctx, kids[1], out)?;
            out.push(')');
        }
        _ => {
            let _ = write!(out, "{:?}(", node.kind());
            for (i, k) in kids.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_python(ctx, *k, out)?;
            }
            out.push(')');
        }
    }
    Ok(())
}
