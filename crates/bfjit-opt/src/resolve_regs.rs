use std::collections::HashMap;

use bfjit_ir::{BlockId, Builder, Graph, Immediate, InstId, InstKind, RegKind, NUM_REGS};
use smallvec::SmallVec;

/// Per-block record of which instruction currently holds each register's
/// value at the end of the block, replacing `original_source`'s
/// `BlockState` stashed behind a `void *passData` pointer (Design Notes:
/// pass-local side tables instead of an untyped scratch pointer).
#[derive(Default, Clone, Copy)]
struct BlockState {
    states: [Option<InstId>; NUM_REGS],
}

/// Eliminates every `Reg`/`SetReg` pair, replacing register reads with
/// either the last `SetReg`'d value in the same block, a value found by
/// walking up a chain of single-predecessor blocks, or — at a real control
/// merge — a freshly built phi whose inputs are resolved the same way per
/// predecessor. Mirrors `opt_resolve_regs.cc`'s `Opt::resolveRegs`.
pub fn resolve_regs(graph: &mut Graph) {
    let block_ids: Vec<BlockId> = graph.live_blocks().collect();
    let mut states: HashMap<BlockId, BlockState> = block_ids
        .iter()
        .map(|&b| (b, BlockState::default()))
        .collect();
    // Maps a value to every (block, reg) state slot that currently points
    // to it, so that when it is later rewritten to a phi those slots can be
    // retargeted in O(1) instead of rescanning every block's state table
    // (the quadratic step `original_source` flags as a TODO).
    let mut retarget: HashMap<InstId, SmallVec<[(BlockId, usize); 4]>> = HashMap::new();
    let mut unresolved: Vec<InstId> = Vec::new();

    for &block in &block_ids {
        let mut cur = graph.block(block).first;
        while let Some(id) = cur {
            let next = graph.inst(id).next;
            match graph.inst(id).kind {
                InstKind::Reg => {
                    let reg = reg_of(graph, id);
                    if let Some(val) = states[&block].states[reg.index()] {
                        graph.rewrite_with(id, val).unwrap();
                    } else {
                        let (dominator, found) = find_state(graph, &states, block, reg);
                        if let Some(val) = found {
                            graph.rewrite_with(id, val).unwrap();
                        } else {
                            if dominator != block {
                                graph.move_after(id, dominator, None);
                                graph.set_comment(id, "shifted");
                            }
                            set_state(&mut states, &mut retarget, dominator, reg, id);
                            unresolved.push(id);
                        }
                    }
                }
                InstKind::SetReg => {
                    let reg = reg_of(graph, id);
                    let value = graph.inst(id).inputs[0];
                    set_state(&mut states, &mut retarget, block, reg, value);
                    graph.destroy(id).unwrap();
                }
                _ => {}
            }
            cur = next;
        }
    }

    while let Some(cur) = unresolved.pop() {
        let reg = reg_of(graph, cur);
        let block = graph.inst(cur).block;
        let predecessors: Vec<BlockId> = graph.block(block).predecessors.to_vec();
        if predecessors.is_empty() {
            // Entry block: nothing dominates it, so a remaining unresolved
            // register read is a legitimate read of the function's incoming
            // parameter and is left for codegen to materialize.
            continue;
        }

        let mut builder = Builder::new(graph, block);
        builder.set_after(cur);
        let phi = builder.push_phi();

        for predecessor in predecessors {
            let mut dominator = predecessor;
            let existing = states.get(&dominator).and_then(|s| s.states[reg.index()]);
            let input = match existing {
                Some(v) => v,
                None => {
                    let (found_dominator, found_val) = find_state(graph, &states, dominator, reg);
                    dominator = found_dominator;
                    match found_val {
                        Some(v) => v,
                        None => {
                            let mut b = Builder::new(graph, dominator);
                            b.set_block_start(dominator);
                            let pushed = b.push_reg(reg);
                            graph.set_comment(pushed, "pushed");
                            set_state(&mut states, &mut retarget, dominator, reg, pushed);
                            unresolved.push(pushed);
                            pushed
                        }
                    }
                }
            };
            graph.add_input(phi, input);
        }

        set_state(&mut states, &mut retarget, block, reg, phi);
        graph.rewrite_with(cur, phi).unwrap();
        retarget_all(&mut states, &mut retarget, cur, phi);
    }
}

fn reg_of(graph: &Graph, id: InstId) -> RegKind {
    match graph.inst(id).imm {
        Immediate::Reg(r) => r,
        _ => unreachable!("Reg/SetReg instruction without a RegKind immediate"),
    }
}

fn set_state(
    states: &mut HashMap<BlockId, BlockState>,
    retarget: &mut HashMap<InstId, SmallVec<[(BlockId, usize); 4]>>,
    block: BlockId,
    reg: RegKind,
    value: InstId,
) {
    states.get_mut(&block).unwrap().states[reg.index()] = Some(value);
    retarget.entry(value).or_default().push((block, reg.index()));
}

/// Redirects every state-table slot recorded as pointing at `old` to point
/// at `new` instead, then carries that bookkeeping forward so a later
/// rewrite of `new` can find them the same way.
fn retarget_all(
    states: &mut HashMap<BlockId, BlockState>,
    retarget: &mut HashMap<InstId, SmallVec<[(BlockId, usize); 4]>>,
    old: InstId,
    new: InstId,
) {
    if let Some(locs) = retarget.remove(&old) {
        let mut kept = SmallVec::new();
        for (block, reg_index) in locs {
            if let Some(state) = states.get_mut(&block) {
                if state.states[reg_index] == Some(old) {
                    state.states[reg_index] = Some(new);
                    kept.push((block, reg_index));
                }
            }
        }
        retarget.entry(new).or_default().extend(kept);
    }
}

/// Walks up a chain of single-predecessor blocks looking for a register
/// state, stopping at the first block with more than one predecessor (a
/// real merge point, where the caller must build a phi instead).
fn find_state(
    graph: &Graph,
    states: &HashMap<BlockId, BlockState>,
    mut dominator: BlockId,
    reg: RegKind,
) -> (BlockId, Option<InstId>) {
    let mut found = None;
    while graph.block(dominator).predecessors.len() == 1 {
        dominator = graph.block(dominator).predecessors[0];
        if let Some(state) = states.get(&dominator) {
            if let Some(value) = state.states[reg.index()] {
                found = Some(value);
                break;
            }
        }
    }
    (dominator, found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfjit_ir::Config;

    #[test]
    fn straight_line_reg_setreg_collapses_without_a_phi() {
        let program = bfjit_parser::parse("+");
        let mut graph = crate::lowering::lower(&program, Config::default());
        resolve_regs(&mut graph);
        let kinds: Vec<InstKind> = graph
            .live_blocks()
            .flat_map(|b| graph.block_insts(b).collect::<Vec<_>>())
            .map(|id| graph.inst(id).kind)
            .collect();
        assert!(!kinds.contains(&InstKind::SetReg));
        // every remaining Reg must be the single unresolved entry read
        assert!(kinds.iter().filter(|k| **k == InstKind::Reg).count() <= 1);
    }

    #[test]
    fn loop_header_gets_a_pointer_phi() {
        let program = bfjit_parser::parse("[>]");
        let mut graph = crate::lowering::lower(&program, Config::default());
        resolve_regs(&mut graph);
        let has_phi = graph
            .live_blocks()
            .flat_map(|b| graph.block_insts(b).collect::<Vec<_>>())
            .any(|id| graph.inst(id).kind == InstKind::Phi);
        assert!(has_phi, "a loop header merging two reaching definitions needs a phi");
    }
}
