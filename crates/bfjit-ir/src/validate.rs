use crate::graph::Graph;
use crate::ids::{BlockId, InstId};
use crate::inst::InstKind;
use crate::types::TypeId;

/// Walks every invariant `original_source`'s `Opt::validateGraph` checks and
/// panics with a descriptive message at the first violation found. This is
/// strictly a debugging aid: every condition here can only be false because
/// of a bug in a pass upstream, never because of anything in the input
/// program, so unlike `bfjit_parser`/the CLI's configuration layer this
/// never returns a `Result` — a caller who wants it skipped in release
/// builds should gate the call with `#[cfg(debug_assertions)]` themselves.
pub fn validate(graph: &Graph) {
    check_block_list_integrity(graph);
    check_edge_mirroring(graph);
    check_forward_edge_ids(graph);
    check_terminators(graph);
    check_arities(graph);
    check_use_def_duality(graph);
    check_gep_operand_types(graph);
    if graph.dominators_built {
        check_use_def_dominance(graph);
        check_dominator_always_reaches(graph);
    }
    check_types_resolved(graph);
}

fn check_block_list_integrity(graph: &Graph) {
    for block in graph.live_blocks() {
        let b = graph.block(block);
        let mut forward = Vec::new();
        let mut cur = b.first;
        while let Some(id) = cur {
            assert!(graph.inst(id).mounted, "{} listed in {} but not mounted", id, block);
            assert_eq!(graph.inst(id).block, block, "{} claims block {} but lives in list of {}", id, graph.inst(id).block, block);
            forward.push(id);
            cur = graph.inst(id).next;
        }
        assert_eq!(b.last, forward.last().copied(), "block {} last pointer disagrees with forward walk", block);

        let mut backward = Vec::new();
        let mut cur = b.last;
        while let Some(id) = cur {
            backward.push(id);
            cur = graph.inst(id).prev;
        }
        backward.reverse();
        assert_eq!(forward, backward, "block {} instruction list is not symmetric", block);
    }
}

fn check_edge_mirroring(graph: &Graph) {
    for block in graph.live_blocks() {
        for &succ in &graph.block(block).successors {
            let count_in_succ = graph.block(succ).predecessors.iter().filter(|&&p| p == block).count();
            let count_in_self = graph.block(block).successors.iter().filter(|&&s| s == succ).count();
            assert_eq!(count_in_succ, count_in_self, "edge {} -> {} is not mirrored", block, succ);
        }
    }
}

/// Block ids must increase along every forward edge (`build_dominators`
/// relies on this to tell a back-edge from a genuine predecessor with the
/// `<` filter). An edge whose id does not increase is only legal as a loop
/// back-edge, which reachability can confirm: the target must be able to
/// reach back to the source.
fn check_forward_edge_ids(graph: &Graph) {
    for block in graph.live_blocks() {
        for &succ in &graph.block(block).successors {
            if succ.0 > block.0 {
                continue;
            }
            assert!(
                graph.reaches(succ, block),
                "edge {} -> {} does not increase in id and is not a loop back-edge",
                block,
                succ
            );
        }
    }
}

fn check_gep_operand_types(graph: &Graph) {
    for block in graph.live_blocks() {
        for inst in graph.block_insts(block) {
            let data = graph.inst(inst);
            if data.kind != InstKind::Gep {
                continue;
            }
            let base_ty = graph.inst(data.inputs[0]).ty;
            let offset_ty = graph.inst(data.inputs[1]).ty;
            assert_eq!(base_ty, TypeId::Ptr, "{} gep base has type {:?}, expected Ptr", inst, base_ty);
            assert_eq!(offset_ty, TypeId::Size, "{} gep offset has type {:?}, expected Size", inst, offset_ty);
        }
    }
}

fn check_terminators(graph: &Graph) {
    for block in graph.live_blocks() {
        let b = graph.block(block);
        if b.open {
            continue;
        }
        let last = b.last.unwrap_or_else(|| panic!("closed block {} has no instructions", block));
        assert!(
            graph.inst(last).kind.is_terminator(),
            "closed block {} does not end in a terminator",
            block
        );
        assert_eq!(
            b.successors.len(),
            successor_arity(graph.inst(last).kind),
            "block {} terminator has the wrong successor count",
            block
        );
    }
}

fn successor_arity(kind: InstKind) -> usize {
    match kind {
        InstKind::If => 2,
        InstKind::Goto => 1,
        InstKind::Ret => 0,
        _ => unreachable!("not a terminator"),
    }
}

fn check_arities(graph: &Graph) {
    for block in graph.live_blocks() {
        for inst in graph.block_insts(block) {
            let data = graph.inst(inst);
            match data.kind.fixed_arity() {
                Some(n) => assert_eq!(
                    data.inputs.len(),
                    n,
                    "{} ({:?}) has {} inputs, expected {}",
                    inst,
                    data.kind,
                    data.inputs.len(),
                    n
                ),
                None => {
                    debug_assert_eq!(data.kind, InstKind::Phi);
                    assert_eq!(
                        data.inputs.len(),
                        graph.block(block).predecessors.len(),
                        "{} phi has {} inputs, block {} has {} predecessors",
                        inst,
                        data.inputs.len(),
                        block,
                        graph.block(block).predecessors.len()
                    );
                }
            }
        }
    }
}

fn check_use_def_duality(graph: &Graph) {
    for block in graph.live_blocks() {
        for inst in graph.block_insts(block) {
            let data = graph.inst(inst);
            for &input in &data.inputs {
                let uses = graph.inst(input).outputs.iter().filter(|&&u| u == inst).count();
                assert!(uses > 0, "{} uses {} but {} has no matching output edge", inst, input, input);
            }
            for &output in &data.outputs {
                let refs = graph.inst(output).inputs.iter().filter(|&&i| i == inst).count();
                assert!(refs > 0, "{} lists {} as a user but {} does not reference it", inst, output, output);
            }
        }
    }
}

fn check_use_def_dominance(graph: &Graph) {
    for block in graph.live_blocks() {
        for inst in graph.block_insts(block) {
            let data = graph.inst(inst);
            if data.kind == InstKind::Phi {
                let preds: Vec<BlockId> = graph.block(block).predecessors.to_vec();
                for (i, &input) in data.inputs.iter().enumerate() {
                    let producer_block = graph.inst(input).block;
                    let pred = preds[i];
                    assert!(
                        graph.dominates(producer_block, pred),
                        "phi {} input {} from predecessor {} is not dominated by its producer's block {}",
                        inst,
                        input,
                        pred,
                        producer_block
                    );
                }
            } else {
                for &input in &data.inputs {
                    assert!(
                        dominates_use(graph, input, inst),
                        "{} uses {} without it being dominated",
                        inst,
                        input
                    );
                }
            }
        }
    }
}

fn dominates_use(graph: &Graph, def: InstId, use_: InstId) -> bool {
    let def_block = graph.inst(def).block;
    let use_block = graph.inst(use_).block;
    if def_block == use_block {
        return precedes_in_block(graph, def_block, def, use_);
    }
    graph.dominates(def_block, use_block)
}

fn precedes_in_block(graph: &Graph, block: BlockId, a: InstId, b: InstId) -> bool {
    for inst in graph.block_insts(block) {
        if inst == a {
            return true;
        }
        if inst == b {
            return false;
        }
    }
    false
}

/// The `dominator` field recorded by `build_dominators` is only meaningful
/// if the block it names actually always-reaches the block that points to
/// it; this checks that property directly rather than trusting the
/// algorithm that produced it.
fn check_dominator_always_reaches(graph: &Graph) {
    for block in graph.live_blocks() {
        if let Some(dom) = graph.block(block).dominator {
            if dom == block {
                continue;
            }
            assert!(
                graph.always_reaches(dom, block),
                "block {} dominator {} does not always-reach it",
                block,
                dom
            );
        }
    }
}

fn check_types_resolved(graph: &Graph) {
    for block in graph.live_blocks() {
        for inst in graph.block_insts(block) {
            assert_ne!(
                graph.inst(inst).ty,
                TypeId::Invalid,
                "{} left with an unresolved type",
                inst
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::typeresolve::resolve_types;
    use crate::types::Config;

    #[test]
    fn accepts_a_well_formed_straight_line_function() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let a = builder.push_imm(1);
        let b = builder.push_imm(2);
        let add = builder.push_add(a, b);
        builder.push_ret(add);
        resolve_types(&mut g);
        validate(&g);
    }

    #[test]
    fn accepts_a_gep_with_ptr_base_and_size_offset() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let ptr = builder.push_reg(crate::types::RegKind::Ptr);
        let offset = builder.push_size_imm(3);
        let gep = builder.push_gep(ptr, offset);
        builder.push_ret(gep);
        resolve_types(&mut g);
        validate(&g);
    }

    #[test]
    #[should_panic]
    fn rejects_a_gep_offset_typed_as_a_cell_width_int() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let ptr = builder.push_reg(crate::types::RegKind::Ptr);
        let offset = builder.push_imm(3);
        let gep = builder.push_gep(ptr, offset);
        builder.push_ret(gep);
        resolve_types(&mut g);
        validate(&g);
    }

    #[test]
    fn dominator_always_reaches_check_passes_through_a_loop_header() {
        let mut g = Graph::new(Config::default());
        let entry = g.open_block();
        let header = g.open_block();
        let body = g.open_block();
        let exit = g.open_block();
        g.close_block(entry, InstKind::Goto, &[], &[header]).unwrap();
        let cond = g.push(header, None, InstKind::Imm, crate::inst::Immediate::Int(0), &[]);
        g.close_block(header, InstKind::If, &[cond], &[body, exit]).unwrap();
        g.close_block(body, InstKind::Goto, &[], &[header]).unwrap();
        let result = g.push(exit, None, InstKind::Imm, crate::inst::Immediate::Int(0), &[]);
        g.close_block(exit, InstKind::Ret, &[result], &[]).unwrap();
        resolve_types(&mut g);
        g.build_dominators();
        validate(&g);
    }

    #[test]
    #[should_panic]
    fn rejects_a_dangling_use_without_a_matching_output_edge() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let a = g.push(b0, None, InstKind::Imm, crate::inst::Immediate::Int(1), &[]);
        let b = g.push(b0, Some(a), InstKind::Imm, crate::inst::Immediate::Int(2), &[]);
        let add = g.push(b0, Some(b), InstKind::Add, crate::inst::Immediate::None, &[a, b]);
        g.inst_mut(a).outputs.clear();
        g.push(b0, Some(add), InstKind::Ret, crate::inst::Immediate::None, &[add]);
        resolve_types(&mut g);
        validate(&g);
    }
}
