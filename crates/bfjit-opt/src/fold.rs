use bfjit_ir::{Graph, Immediate, InstId, InstKind};

/// What a matched rule wants done with the instruction it matched.
enum Patch {
    /// Every user of the matched instruction should instead use this
    /// already-existing value; the matched instruction is then destroyed.
    RewriteTo(InstId),
    /// Every user should instead use a new `Gep(base, imm(offset))`, built
    /// just before the matched instruction.
    CombineGep { base: InstId, offset: i64 },
}

/// A single masked-key peephole rule: kind of the matched instruction, plus
/// an optional kind each input must additionally match (`None` = wildcard).
/// `original_source`'s `foldInst` tries the full key first, then each
/// single-wildcard variant, then the fully wildcarded one — four lookups
/// against the same rule table. With only two standard rules here a linear
/// scan is equivalent and clearer; the masking order is preserved by simply
/// trying the more specific rule before the more general one below.
fn try_fold(graph: &Graph, id: InstId) -> Option<Patch> {
    let data = graph.inst(id);
    if data.kind != InstKind::Gep {
        return None;
    }
    let base = data.inputs[0];
    let offset = data.inputs[1];
    let offset_v = as_const(graph, offset)?;

    // GEP(GEP(x, IMM a), IMM b) -> GEP(x, IMM (a+b)) — only valid when both
    // offsets are compile-time constants; the inner GEP's base is reused
    // as-is, so this never depends on purity beyond GEP already being pure.
    if graph.inst(base).kind == InstKind::Gep {
        let inner = graph.inst(base);
        let inner_base = inner.inputs[0];
        let inner_offset = inner.inputs[1];
        if let Some(inner_v) = as_const(graph, inner_offset) {
            return Some(Patch::CombineGep {
                base: inner_base,
                offset: offset_v.checked_add(inner_v)?,
            });
        }
    }

    // GEP(x, IMM 0) -> x
    if offset_v == 0 {
        return Some(Patch::RewriteTo(base));
    }

    None
}

fn as_const(graph: &Graph, id: InstId) -> Option<i64> {
    let data = graph.inst(id);
    if data.kind != InstKind::Imm {
        return None;
    }
    match data.imm {
        Immediate::Int(v) | Immediate::Size(v) => Some(v),
        _ => None,
    }
}

/// Runs the rule table to a fixpoint: applying one rewrite can expose
/// another (folding a chain of GEPs peels one layer per pass).
pub fn fold(graph: &mut Graph) {
    let mut changed = true;
    while changed {
        changed = false;
        let ids: Vec<InstId> = live_inst_ids(graph);
        for id in ids {
            if !graph.inst(id).mounted {
                continue;
            }
            if let Some(patch) = try_fold(graph, id) {
                apply_patch(graph, id, patch);
                changed = true;
            }
        }
    }
}

fn apply_patch(graph: &mut Graph, id: InstId, patch: Patch) {
    match patch {
        Patch::RewriteTo(existing) => {
            graph.rewrite_with(id, existing).unwrap();
        }
        Patch::CombineGep { base, offset } => {
            let block = graph.inst(id).block;
            let prev = graph.inst(id).prev;
            let imm = graph.push(block, prev, InstKind::Imm, Immediate::Size(offset), &[]);
            let new_gep = graph.push(block, Some(imm), InstKind::Gep, Immediate::None, &[base, imm]);
            graph.rewrite_with(id, new_gep).unwrap();
        }
    }
}

fn live_inst_ids(graph: &Graph) -> Vec<InstId> {
    graph
        .live_blocks()
        .flat_map(|b| graph.block_insts(b).collect::<Vec<_>>())
        .collect()
}
