use crate::graph::Graph;
use crate::ids::{BlockId, InstId};
use crate::inst::{Immediate, InstKind};
use crate::types::RegKind;

/// A cursor over a [`Graph`]: a current block and a current instruction,
/// new pushes land immediately after the cursor and the cursor follows them.
///
/// Mirrors `original_source`'s `Builder`, which tracks the same
/// `(block, inst)` pair and is reused across lowering and later passes
/// (register resolution repositions it with `setAfter` to splice in phis).
pub struct Builder<'g> {
    pub graph: &'g mut Graph,
    block: BlockId,
    inst: Option<InstId>,
}

impl<'g> Builder<'g> {
    pub fn new(graph: &'g mut Graph, block: BlockId) -> Self {
        Builder {
            graph,
            block,
            inst: None,
        }
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn cursor(&self) -> Option<InstId> {
        self.inst
    }

    /// Repositions the cursor to just after `inst`, switching blocks if
    /// `inst` lives in a different one.
    pub fn set_after(&mut self, inst: InstId) {
        self.block = self.graph.inst(inst).block;
        self.inst = Some(inst);
    }

    /// Repositions the cursor to the start of `block`.
    pub fn set_block_start(&mut self, block: BlockId) {
        self.block = block;
        self.inst = None;
    }

    fn push(&mut self, kind: InstKind, imm: Immediate, inputs: &[InstId]) -> InstId {
        let id = self.graph.push(self.block, self.inst, kind, imm, inputs);
        self.inst = Some(id);
        id
    }

    pub fn push_imm(&mut self, value: i64) -> InstId {
        self.push(InstKind::Imm, Immediate::Int(value), &[])
    }

    /// A pointer-sized literal, for GEP/seek offsets. Typed `Size` by the
    /// resolver regardless of cell width, so a displacement that doesn't
    /// fit the cell type (e.g. 200 under 8-bit cells) never gets truncated.
    pub fn push_size_imm(&mut self, value: i64) -> InstId {
        self.push(InstKind::Imm, Immediate::Size(value), &[])
    }

    pub fn push_add(&mut self, a: InstId, b: InstId) -> InstId {
        self.push(InstKind::Add, Immediate::None, &[a, b])
    }

    pub fn push_sub(&mut self, a: InstId, b: InstId) -> InstId {
        self.push(InstKind::Sub, Immediate::None, &[a, b])
    }

    pub fn push_gep(&mut self, base: InstId, offset: InstId) -> InstId {
        self.push(InstKind::Gep, Immediate::None, &[base, offset])
    }

    pub fn push_ld(&mut self, ptr: InstId) -> InstId {
        self.push(InstKind::Ld, Immediate::None, &[ptr])
    }

    pub fn push_str(&mut self, ptr: InstId, value: InstId) -> InstId {
        self.push(InstKind::Str, Immediate::None, &[ptr, value])
    }

    pub fn push_reg(&mut self, reg: RegKind) -> InstId {
        self.push(InstKind::Reg, Immediate::Reg(reg), &[])
    }

    pub fn push_set_reg(&mut self, reg: RegKind, value: InstId) -> InstId {
        self.push(InstKind::SetReg, Immediate::Reg(reg), &[value])
    }

    pub fn push_get_char(&mut self) -> InstId {
        self.push(InstKind::GetChar, Immediate::None, &[])
    }

    pub fn push_put_char(&mut self, value: InstId) -> InstId {
        self.push(InstKind::PutChar, Immediate::None, &[value])
    }

    pub fn push_phi(&mut self) -> InstId {
        self.push(InstKind::Phi, Immediate::None, &[])
    }

    /// Opens a fresh block and repositions the cursor at its start.
    pub fn open_block(&mut self) -> BlockId {
        let b = self.graph.open_block();
        self.block = b;
        self.inst = None;
        b
    }

    pub fn push_if(&mut self, cond: InstId, then_block: BlockId, else_block: BlockId) -> InstId {
        self.graph
            .close_block(self.block, InstKind::If, &[cond], &[then_block, else_block])
            .expect("block must be open")
    }

    pub fn push_goto(&mut self, target: BlockId) -> InstId {
        self.graph
            .close_block(self.block, InstKind::Goto, &[], &[target])
            .expect("block must be open")
    }

    pub fn push_ret(&mut self, value: InstId) -> InstId {
        self.graph
            .close_block(self.block, InstKind::Ret, &[value], &[])
            .expect("block must be open")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Config;

    #[test]
    fn cursor_advances_with_each_push() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let mut builder = Builder::new(&mut g, b0);
        let a = builder.push_imm(1);
        let b = builder.push_imm(2);
        let add = builder.push_add(a, b);
        assert_eq!(builder.cursor(), Some(add));
        builder.push_ret(add);
        assert_eq!(g.block_insts(b0).collect::<Vec<_>>(), vec![a, b, add, builder_ret_id(&g, b0)]);
    }

    fn builder_ret_id(g: &Graph, block: BlockId) -> InstId {
        g.block(block).last.unwrap()
    }
}
