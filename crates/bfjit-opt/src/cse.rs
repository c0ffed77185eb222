use std::collections::HashMap;

use bfjit_ir::{BlockId, Graph, Immediate, InstId, InstKind};

/// Structural equality restricted to pure, value-producing instructions,
/// grounded on `original_source`'s `Opt::equal` (`opt_fold.cc`): same kind,
/// same immediate payload, same inputs in the same order. Two instructions
/// that only differ in id but would compute the same value are considered
/// equal; anything with a side effect, or that produces no value (`Str`,
/// `SetReg`, `PutChar`, the terminators), is never compared, since reusing
/// one occurrence in place of another could reorder an effect.
fn equal(graph: &Graph, a: InstId, b: InstId) -> bool {
    if a == b {
        return true;
    }
    let da = graph.inst(a);
    let db = graph.inst(b);
    if !da.kind.is_pure() || !da.produces_value() {
        return false;
    }
    da.kind == db.kind && da.imm == db.imm && da.inputs == db.inputs
}

fn key(graph: &Graph, id: InstId) -> Option<(InstKind, Immediate, Vec<InstId>)> {
    let data = graph.inst(id);
    if !data.kind.is_pure() || !data.produces_value() {
        return None;
    }
    Some((data.kind, data.imm, data.inputs.to_vec()))
}

/// Block-local common-subexpression elimination: reuses the first
/// occurrence of a pure value-producing instruction instead of recomputing
/// it later in the same block.
///
/// An `Ld`/`Reg` is pure in the sense that evaluating it has no side effect
/// of its own, but it is *ordered*: it reads mutable state (the tape, or a
/// not-yet-resolved register) that an intervening `Str`/`SetReg` can change.
/// Two occurrences of the same `Ld`/`Reg` are only folded together when no
/// impure instruction runs between them; a running generation counter,
/// bumped on every impure instruction, records this without needing a
/// full alias analysis.
pub fn cse(graph: &mut Graph) {
    for block in graph.live_blocks().collect::<Vec<BlockId>>() {
        let mut seen: HashMap<(InstKind, Immediate, Vec<InstId>), (InstId, u64)> = HashMap::new();
        let mut generation: u64 = 0;
        let mut cur = graph.block(block).first;
        while let Some(id) = cur {
            let next = graph.inst(id).next;
            if let Some(k) = key(graph, id) {
                let ordered = graph.inst(id).kind.is_ordered();
                match seen.get(&k).copied() {
                    Some((existing, seen_gen))
                        if equal(graph, existing, id) && (!ordered || seen_gen == generation) =>
                    {
                        graph.rewrite_with(id, existing).unwrap();
                    }
                    _ => {
                        seen.insert(k, (id, generation));
                    }
                }
            } else if !graph.inst(id).kind.is_pure() {
                generation += 1;
            }
            cur = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bfjit_ir::{Builder, Config, RegKind};

    #[test]
    fn reuses_an_identical_earlier_load() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let ptr = builder.push_reg(RegKind::Ptr);
        let first_load = builder.push_ld(ptr);
        let ptr2 = builder.push_reg(RegKind::Ptr);
        let second_load = builder.push_ld(ptr2);
        let sum = builder.push_add(first_load, second_load);
        builder.push_ret(sum);
        cse(&mut g);
        assert_eq!(g.inst(sum).inputs[1], first_load);
    }

    #[test]
    fn never_merges_a_load_across_an_intervening_store() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let ptr = builder.push_reg(RegKind::Ptr);
        let first_load = builder.push_ld(ptr);
        let one = builder.push_imm(1);
        builder.push_str(ptr, one);
        let second_load = builder.push_ld(ptr);
        builder.push_ret(second_load);
        cse(&mut g);
        assert_ne!(g.inst(second_load).inputs[0], first_load);
        let kinds_after: Vec<_> = g
            .block_insts(b0)
            .map(|id| g.inst(id).kind)
            .collect();
        assert_eq!(kinds_after.iter().filter(|k| **k == InstKind::Ld).count(), 2);
    }
}
