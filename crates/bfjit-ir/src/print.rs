use std::fmt::Write as _;

use crate::graph::Graph;
use crate::ids::{BlockId, InstId};
use crate::inst::{Immediate, InstKind};

/// `.lN`, the block-label form spec §6 and `original_source`'s
/// `Block::getLabel`/`ir_print.cc` both use, with no trailing colon (the
/// colon is only added where a block is being defined, not referenced).
fn block_label(id: BlockId) -> String {
    format!(".l{}", id.0)
}

/// Left/right precedence bounds per instruction kind, matching
/// `ir_print.cc`'s `instPrecedence`: the left bound is the threshold an
/// operand printed in the left slot must clear to skip parens, the right
/// bound is what a nested instance of this kind offers a parent on its
/// right. Asymmetric so `a - b - c` and `a - (b - c)` print differently.
fn precedence(kind: InstKind) -> (u8, u8) {
    match kind {
        InstKind::Add | InstKind::Sub | InstKind::Gep => (2, 3),
        InstKind::SetReg | InstKind::Str => (1, 1),
        InstKind::Ld | InstKind::Ret => (0, 4),
        _ => (4, 4),
    }
}

/// Whether any impure instruction runs between `def` and `use` in `def`'s
/// block. Inlining a pure instruction past an impure one would reorder a
/// side effect relative to the value read, so such a def must stay a named
/// temporary instead of being folded into its user's text.
fn impure_between(graph: &Graph, block: crate::ids::BlockId, def: InstId, use_: InstId) -> bool {
    let mut seen_def = false;
    for inst in graph.block_insts(block) {
        if inst == def {
            seen_def = true;
            continue;
        }
        if inst == use_ {
            return false;
        }
        if seen_def && !graph.inst(inst).kind.is_pure() {
            return true;
        }
    }
    false
}

fn should_inline(graph: &Graph, id: InstId) -> bool {
    let data = graph.inst(id);
    if !data.kind.is_pure() || data.outputs.len() != 1 {
        return false;
    }
    let user = data.outputs[0];
    if graph.inst(user).block != data.block {
        return false;
    }
    !impure_between(graph, data.block, id, user)
}

/// Renders the whole graph as deterministic, human-readable text: one block
/// per paragraph, one instruction per line, with pure single-use values
/// inlined into their consumer the way a disassembler inlines immediates.
pub fn print_graph(graph: &Graph) -> String {
    let mut out = String::new();
    for block in graph.live_blocks() {
        let _ = writeln!(out, "{}:", block_label(block));
        for inst in graph.block_insts(block) {
            if should_inline(graph, inst) {
                continue;
            }
            print_inst_line(graph, inst, &mut out);
        }
    }
    out
}

fn print_inst_line(graph: &Graph, id: InstId, out: &mut String) {
    let data = graph.inst(id);
    let body = print_inst_body(graph, id);
    if data.kind.produces_value() {
        let _ = writeln!(out, "  {} = {}", id, body);
    } else {
        let _ = writeln!(out, "  {}", body);
    }
}

fn print_operand(graph: &Graph, id: InstId, required_prec: u8) -> String {
    if should_inline(graph, id) {
        let (_, rhs_bound) = precedence(graph.inst(id).kind);
        let body = print_inst_body(graph, id);
        if rhs_bound < required_prec {
            format!("({})", body)
        } else {
            body
        }
    } else {
        id.to_string()
    }
}

fn print_inst_body(graph: &Graph, id: InstId) -> String {
    let data = graph.inst(id);
    let (lhs, rhs) = precedence(data.kind);
    match data.kind {
        InstKind::Nop => "nop".to_string(),
        InstKind::Imm => match data.imm {
            Immediate::Int(v) | Immediate::Size(v) => v.to_string(),
            _ => "imm".to_string(),
        },
        InstKind::Add => format!(
            "{} + {}",
            print_operand(graph, data.inputs[0], lhs),
            print_operand(graph, data.inputs[1], rhs)
        ),
        InstKind::Sub => format!(
            "{} - {}",
            print_operand(graph, data.inputs[0], lhs),
            print_operand(graph, data.inputs[1], rhs)
        ),
        InstKind::Gep => print_gep(graph, data.inputs[0], data.inputs[1], lhs, rhs),
        InstKind::Ld => format!("[{}]", print_operand(graph, data.inputs[0], lhs)),
        InstKind::Str => format!(
            "[{}] <- {}",
            print_operand(graph, data.inputs[0], lhs),
            print_operand(graph, data.inputs[1], lhs)
        ),
        InstKind::Reg => match data.imm {
            Immediate::Reg(r) => r.name().to_string(),
            _ => "?".to_string(),
        },
        InstKind::SetReg => match data.imm {
            Immediate::Reg(r) => format!("{} <- {}", r.name(), print_operand(graph, data.inputs[0], lhs)),
            _ => "? <- ?".to_string(),
        },
        InstKind::GetChar => "getchar".to_string(),
        InstKind::PutChar => format!("putchar {}", print_operand(graph, data.inputs[0], lhs)),
        InstKind::Phi => {
            let preds = &graph.block(data.block).predecessors;
            let operands: Vec<String> = data
                .inputs
                .iter()
                .enumerate()
                .map(|(i, &v)| format!("{}: {}", block_label(preds[i]), print_operand(graph, v, 0)))
                .collect();
            format!("phi {}", operands.join(", "))
        }
        InstKind::If => {
            let succs = &graph.block(data.block).successors;
            format!(
                "if {} then {} else {}",
                print_operand(graph, data.inputs[0], lhs),
                block_label(succs[0]),
                block_label(succs[1])
            )
        }
        InstKind::Goto => format!("goto {}", block_label(graph.block(data.block).successors[0])),
        InstKind::Ret => format!("return {}", print_operand(graph, data.inputs[0], lhs)),
    }
}

/// `x &+ k`/`x &- k`, matching `original_source`'s special-cased
/// negative-immediate GEP rendering (`ir_print.cc`'s `&+`/`&-` forms):
/// only a literal negative offset switches to `&-` with its magnitude
/// printed directly; everything else (including a literal non-negative
/// offset) goes through the normal `&+` operand printing.
fn print_gep(graph: &Graph, base: InstId, offset: InstId, lhs: u8, rhs: u8) -> String {
    let offset_data = graph.inst(offset);
    if offset_data.kind == InstKind::Imm {
        if let Immediate::Int(v) | Immediate::Size(v) = offset_data.imm {
            if v < 0 {
                return format!("{} &- {}", print_operand(graph, base, lhs), -v);
            }
        }
    }
    format!(
        "{} &+ {}",
        print_operand(graph, base, lhs),
        print_operand(graph, offset, rhs)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::types::Config;

    #[test]
    fn inlines_pure_single_use_arithmetic() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let a = builder.push_imm(1);
        let b = builder.push_imm(2);
        let add = builder.push_add(a, b);
        builder.push_ret(add);
        let text = print_graph(&g);
        assert!(text.contains("return 1 + 2"), "got:\n{text}");
    }

    #[test]
    fn negative_gep_offset_uses_minus_form() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let ptr = builder.push_reg(crate::types::RegKind::Ptr);
        let off = builder.push_imm(-3);
        let gep = builder.push_gep(ptr, off);
        let loaded = builder.push_ld(gep);
        builder.push_ret(loaded);
        let text = print_graph(&g);
        assert!(text.contains("[ptr &- 3]"), "got:\n{text}");
    }

    #[test]
    fn does_not_inline_past_a_side_effect() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let a = builder.push_imm(5);
        let ptr = builder.push_reg(crate::types::RegKind::Ptr);
        builder.push_str(ptr, a);
        builder.push_ret(a);
        let text = print_graph(&g);
        // `a` is used twice (by str and ret) so it is never inlined anyway,
        // but this also exercises the impure-between guard compiling cleanly.
        assert!(text.contains(&format!("  {} = 5", a)), "got:\n{text}");
    }
}
