use crate::graph::Graph;
use crate::ids::InstId;
use crate::inst::{Immediate, InstKind};
use crate::types::{max_type, RegKind, TypeId};

/// Assigns a [`TypeId`] to every mounted instruction in `graph`.
///
/// Most kinds have a type that falls straight out of their cell width or
/// kind (`Ld`/`GetChar`/`Reg(Def)` produce the configured cell type, `Gep`/
/// `Reg(Ptr)` produce `Ptr`, effect-only kinds produce `None`). `Phi` and
/// arithmetic are the exception: their type is the widest of their operand
/// types, and a loop header's phi can depend on itself through a backedge.
///
/// Rather than recursing (which would need to detect the cycle and bail with
/// the `Invalid` sentinel, as `original_source` does per-call), this runs a
/// small fixpoint: every instruction starts `Invalid` and each round
/// recomputes its type from its operands' *current* type, stopping once a
/// round changes nothing. Since every rule here only ever turns `Invalid`
/// into a concrete type (never the reverse), this always terminates, and a
/// phi whose only operands are as-yet-unresolved cycle members simply stays
/// `Invalid` until a later round fills in the rest.
pub fn resolve_types(graph: &mut Graph) {
    let ids: Vec<InstId> = live_inst_ids(graph);
    for &id in &ids {
        graph.inst_mut(id).ty = TypeId::Invalid;
    }
    let mut changed = true;
    while changed {
        changed = false;
        for &id in &ids {
            let new_ty = compute_type(graph, id);
            if graph.inst(id).ty != new_ty {
                graph.inst_mut(id).ty = new_ty;
                changed = true;
            }
        }
    }
}

fn live_inst_ids(graph: &Graph) -> Vec<InstId> {
    graph
        .live_blocks()
        .flat_map(|b| graph.block_insts(b).collect::<Vec<_>>())
        .collect()
}

fn compute_type(graph: &Graph, id: InstId) -> TypeId {
    let data = graph.inst(id);
    match data.kind {
        InstKind::Nop
        | InstKind::Str
        | InstKind::SetReg
        | InstKind::PutChar
        | InstKind::If
        | InstKind::Goto
        | InstKind::Ret => TypeId::None,

        InstKind::Imm => match data.imm {
            Immediate::Int(_) => cell_type(graph),
            Immediate::Size(_) => TypeId::Size,
            _ => TypeId::Size,
        },

        InstKind::Gep => TypeId::Ptr,
        InstKind::Ld | InstKind::GetChar => cell_type(graph),

        InstKind::Reg => match data.imm {
            Immediate::Reg(RegKind::Ptr) => TypeId::Ptr,
            Immediate::Reg(RegKind::Def) => cell_type(graph),
            _ => unreachable!("Reg instruction without a RegKind immediate"),
        },

        InstKind::Add | InstKind::Sub => {
            let inputs = data.inputs.clone();
            let a = graph.inst(inputs[0]).ty;
            let b = graph.inst(inputs[1]).ty;
            if a == TypeId::Invalid || b == TypeId::Invalid {
                TypeId::Invalid
            } else {
                max_type(a, b)
            }
        }

        InstKind::Phi => {
            let mut result: Option<TypeId> = None;
            for &input in &data.inputs {
                let t = graph.inst(input).ty;
                if t == TypeId::Invalid {
                    continue;
                }
                result = Some(match result {
                    None => t,
                    Some(r) => max_type(r, t),
                });
            }
            result.unwrap_or(TypeId::Invalid)
        }
    }
}

fn cell_type(graph: &Graph) -> TypeId {
    TypeId::for_cell_width(graph.config.cell_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::types::{CellWidth, Config};

    #[test]
    fn arithmetic_takes_the_wider_operand() {
        let mut g = Graph::new(Config {
            cell_width: CellWidth::W32,
            eof_value: 0,
        });
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let a = builder.push_imm(1);
        let b = builder.push_imm(2);
        let add = builder.push_add(a, b);
        builder.push_ret(add);
        resolve_types(&mut g);
        assert_eq!(g.inst(add).ty, TypeId::I32);
    }

    #[test]
    fn gep_offset_stays_size_typed_under_narrow_cells() {
        let mut g = Graph::new(Config {
            cell_width: CellWidth::W8,
            eof_value: 0,
        });
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let ptr = builder.push_reg(crate::types::RegKind::Ptr);
        let offset = builder.push_size_imm(200);
        let gep = builder.push_gep(ptr, offset);
        builder.push_ret(gep);
        resolve_types(&mut g);
        assert_eq!(g.inst(offset).ty, TypeId::Size);
        assert_ne!(g.inst(offset).ty, TypeId::I8);
    }

    #[test]
    fn phi_resolves_through_a_loop_backedge() {
        let mut g = Graph::new(Config::default());
        let entry = g.open_block();
        let header = g.open_block();
        let body = g.open_block();
        let exit = g.open_block();

        let init = g.push(entry, None, InstKind::Imm, Immediate::Int(0), &[]);
        g.close_block(entry, InstKind::Goto, &[], &[header]).unwrap();

        let phi = g.push(header, None, InstKind::Phi, Immediate::None, &[]);
        g.add_input(phi, init);
        let cond = g.push(header, Some(phi), InstKind::Imm, Immediate::Int(1), &[]);
        g.close_block(header, InstKind::If, &[cond], &[body, exit])
            .unwrap();

        let bumped = g.push(body, None, InstKind::Add, Immediate::None, &[phi, init]);
        g.add_input(phi, bumped);
        g.close_block(body, InstKind::Goto, &[], &[header]).unwrap();
        g.close_block(exit, InstKind::Ret, &[], &[]).unwrap();

        resolve_types(&mut g);
        assert_eq!(g.inst(phi).ty, TypeId::I8);
        assert_eq!(g.inst(bumped).ty, TypeId::I8);
    }
}
