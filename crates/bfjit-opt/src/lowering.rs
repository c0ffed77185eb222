use bfjit_ir::{Builder, Config, Graph, RegKind};
use bfjit_parser::{Opcode, Program, Seek, SeekLoop};

/// Translates a parsed program into a fresh, unresolved, untyped graph.
///
/// Grounded on `original_source`'s `lowering.cc`: every pointer read/write
/// goes through a `Reg(Ptr)`/`SetReg(Ptr, _)` pair rather than being threaded
/// by hand through the Rust call stack, so the control-flow merges a loop
/// introduces don't need any SSA bookkeeping here — that is entirely
/// register resolution's job afterwards. `+`/`-` runs are collapsed into a
/// single net `Add`/`Sub` here, the one piece of arithmetic lowering itself
/// is responsible for (the parser emits one opcode per input byte).
pub fn lower(program: &Program, config: Config) -> Graph {
    let mut graph = Graph::new(config);
    let entry = graph.open_block();
    let mut builder = Builder::new(&mut graph, entry);
    let mut seek_index = 0usize;
    let mut i = 0usize;
    build_body(&mut builder, &program.ops, &program.seeks, &mut seek_index, &mut i);
    let ptr = builder.push_reg(RegKind::Ptr);
    builder.push_ret(ptr);
    graph
}

fn build_body(
    builder: &mut Builder,
    ops: &[Opcode],
    seeks: &[Seek],
    seek_index: &mut usize,
    i: &mut usize,
) {
    while *i < ops.len() {
        match ops[*i] {
            Opcode::End => {
                *i += 1;
                return;
            }
            Opcode::Add | Opcode::Sub => {
                let mut delta: i64 = 0;
                while *i < ops.len() {
                    match ops[*i] {
                        Opcode::Add => {
                            delta += 1;
                            *i += 1;
                        }
                        Opcode::Sub => {
                            delta -= 1;
                            *i += 1;
                        }
                        _ => break,
                    }
                }
                if delta != 0 {
                    emit_add_delta(builder, delta);
                }
            }
            Opcode::Seek => {
                let seek = &seeks[*seek_index];
                *seek_index += 1;
                build_seek(builder, seek);
                *i += 1;
            }
            Opcode::Loop => {
                *i += 1;
                build_impure_loop(builder, ops, seeks, seek_index, i);
            }
            Opcode::PutChar => {
                *i += 1;
                let ptr = builder.push_reg(RegKind::Ptr);
                let val = builder.push_ld(ptr);
                builder.push_put_char(val);
            }
            Opcode::GetChar => {
                *i += 1;
                let ptr = builder.push_reg(RegKind::Ptr);
                let val = builder.push_get_char();
                builder.push_str(ptr, val);
            }
        }
    }
}

fn emit_add_delta(builder: &mut Builder, delta: i64) {
    let ptr = builder.push_reg(RegKind::Ptr);
    let old = builder.push_ld(ptr);
    let imm = builder.push_imm(delta.abs());
    let new = if delta > 0 {
        builder.push_add(old, imm)
    } else {
        builder.push_sub(old, imm)
    };
    builder.push_str(ptr, new);
}

fn build_seek(builder: &mut Builder, seek: &Seek) {
    apply_offset(builder, seek.offset);
    for nested in &seek.loops {
        build_seek_loop(builder, nested);
    }
}

fn apply_offset(builder: &mut Builder, offset: i64) {
    if offset == 0 {
        return;
    }
    let ptr = builder.push_reg(RegKind::Ptr);
    let imm = builder.push_size_imm(offset);
    let moved = builder.push_gep(ptr, imm);
    builder.push_set_reg(RegKind::Ptr, moved);
}

/// A pure seek-loop (`[<...>]` with no `+-.,` inside) still needs real
/// control flow: it scans while the current cell is non-zero, applying its
/// body's pointer movement once per iteration, then applies the loop's own
/// trailing offset once it exits.
fn build_seek_loop(builder: &mut Builder, seek_loop: &SeekLoop) {
    let header = builder.graph.open_block();
    let body = builder.graph.open_block();
    let next = builder.graph.open_block();

    builder.push_goto(header);

    builder.set_block_start(header);
    let ptr = builder.push_reg(RegKind::Ptr);
    let val = builder.push_ld(ptr);
    builder.push_if(val, body, next);

    builder.set_block_start(body);
    build_seek(builder, &seek_loop.seek);
    builder.push_goto(header);

    builder.set_block_start(next);
    close_loop(builder);
    apply_offset(builder, seek_loop.offset);
}

/// Records that the loop exited with zero in the current cell: `cond`
/// only ever leaves through `next` when `LD[REG(PTR)]` read zero, but
/// nothing in the graph says so explicitly until this store makes it so.
fn close_loop(builder: &mut Builder) {
    let ptr = builder.push_reg(RegKind::Ptr);
    let zero = builder.push_imm(0);
    builder.push_str(ptr, zero);
}

/// An impure loop (`[...]` containing at least one of `+-.,`) compiles the
/// same way as a seek-loop, but its body is the general opcode interpreter
/// rather than a restricted pointer-movement tree.
fn build_impure_loop(
    builder: &mut Builder,
    ops: &[Opcode],
    seeks: &[Seek],
    seek_index: &mut usize,
    i: &mut usize,
) {
    let header = builder.graph.open_block();
    let body = builder.graph.open_block();
    let next = builder.graph.open_block();

    builder.push_goto(header);

    builder.set_block_start(header);
    let ptr = builder.push_reg(RegKind::Ptr);
    let val = builder.push_ld(ptr);
    builder.push_if(val, body, next);

    builder.set_block_start(body);
    // A trailing, unclosed loop at end of input simply runs off the end of
    // `ops`: `build_body` returns without having seen an `Opcode::End`, and
    // the loop below still closes the body with a goto back to its header,
    // matching the parser's tolerance for one dangling bracket.
    build_body(builder, ops, seeks, seek_index, i);
    builder.push_goto(header);

    builder.set_block_start(next);
    close_loop(builder);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfjit_ir::InstKind;

    #[test]
    fn collapses_additive_runs_into_one_add() {
        let program = bfjit_parser::parse("+++");
        let graph = lower(&program, Config::default());
        let add_count = graph
            .live_blocks()
            .flat_map(|b| graph.block_insts(b).collect::<Vec<_>>())
            .filter(|&id| graph.inst(id).kind == InstKind::Add)
            .count();
        assert_eq!(add_count, 1);
    }

    #[test]
    fn mixed_add_and_sub_runs_net_to_a_single_op() {
        let program = bfjit_parser::parse("++--+");
        let graph = lower(&program, Config::default());
        let arith: Vec<InstKind> = graph
            .live_blocks()
            .flat_map(|b| graph.block_insts(b).collect::<Vec<_>>())
            .map(|id| graph.inst(id).kind)
            .filter(|k| matches!(k, InstKind::Add | InstKind::Sub))
            .collect();
        assert_eq!(arith, vec![InstKind::Add]);
    }

    #[test]
    fn impure_loop_produces_three_blocks() {
        let program = bfjit_parser::parse("[-]");
        let graph = lower(&program, Config::default());
        // entry + header + body + next
        assert_eq!(graph.block_count(), 4);
    }

    #[test]
    fn pure_seek_loop_also_produces_control_flow() {
        let program = bfjit_parser::parse("[>]");
        let graph = lower(&program, Config::default());
        assert_eq!(graph.block_count(), 4);
    }

    #[test]
    fn impure_loop_stores_zero_after_exit() {
        let program = bfjit_parser::parse("[-]");
        let graph = lower(&program, Config::default());
        let next = bfjit_ir::BlockId(3);
        let kinds: Vec<InstKind> = graph.block_insts(next).map(|id| graph.inst(id).kind).collect();
        assert!(kinds.contains(&InstKind::Str), "next block {:?} has no store of zero", kinds);
    }

    #[test]
    fn seek_loop_stores_zero_after_exit() {
        let program = bfjit_parser::parse("[>]");
        let graph = lower(&program, Config::default());
        let next = bfjit_ir::BlockId(3);
        let kinds: Vec<InstKind> = graph.block_insts(next).map(|id| graph.inst(id).kind).collect();
        assert!(kinds.contains(&InstKind::Str), "next block {:?} has no store of zero", kinds);
    }

    #[test]
    fn unterminated_trailing_loop_still_closes_its_body() {
        let program = bfjit_parser::parse("[-");
        let graph = lower(&program, Config::default());
        let body = bfjit_ir::BlockId(2);
        assert!(!graph.block(body).open, "body block must have a terminator even with no matching ]");
    }
}
