use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::block::BlockData;
use crate::error::GraphError;
use crate::ids::{BlockId, InstId};
use crate::inst::{Immediate, InstData, InstKind};
use crate::types::{Config, TypeId};

/// The whole compute graph for one compiled function.
///
/// Blocks and instructions live in flat arenas indexed directly by id;
/// nothing is ever removed from the arena, only tombstoned (`mounted =
/// false` / `orphan = true`), so ids stay stable across every edit.
/// `original_source`'s `Graph` instead owns `std::vector<Block*>` of
/// heap-allocated nodes freed on graph destruction; the arena form is the
/// Design Notes' recommended translation for a garbage-collected host
/// language without manual `delete`.
#[derive(Debug, Clone)]
pub struct Graph {
    pub config: Config,
    blocks: Vec<BlockData>,
    insts: Vec<InstData>,
    pub dominators_built: bool,
}

impl Graph {
    pub fn new(config: Config) -> Self {
        Graph {
            config,
            blocks: Vec::new(),
            insts: Vec::new(),
            dominators_built: false,
        }
    }

    // -- accessors ---------------------------------------------------

    pub fn block(&self, id: BlockId) -> &BlockData {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BlockData {
        self.dominators_built = false;
        &mut self.blocks[id.0 as usize]
    }

    pub fn inst(&self, id: InstId) -> &InstData {
        &self.insts[id.0 as usize]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut InstData {
        &mut self.insts[id.0 as usize]
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Blocks in id order, skipping orphans. Id order is a valid reverse
    /// postorder for any graph built through `open_block`/`close_block`,
    /// since a block is only ever opened after its predecessor closes.
    pub fn live_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks
            .iter()
            .filter(|b| !b.orphan)
            .map(|b| b.id)
    }

    /// Instructions of a block, in list order.
    pub fn block_insts(&self, block: BlockId) -> impl Iterator<Item = InstId> + '_ {
        let mut cur = self.block(block).first;
        std::iter::from_fn(move || {
            let id = cur?;
            cur = self.inst(id).next;
            Some(id)
        })
    }

    // -- construction --------------------------------------------------

    /// Opens a fresh block attached to the graph, positioned with an empty
    /// instruction list and no edges yet.
    pub fn open_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BlockData::new(id));
        self.dominators_built = false;
        id
    }

    /// Appends a new instruction to `block`, inserted immediately after
    /// `after` (`None` means at the very start of the block's list), wiring
    /// the use-def edges to `inputs` along the way.
    pub fn push(
        &mut self,
        block: BlockId,
        after: Option<InstId>,
        kind: InstKind,
        imm: Immediate,
        inputs: &[InstId],
    ) -> InstId {
        let id = InstId(self.insts.len() as u32);
        self.insts.push(InstData {
            id,
            kind,
            ty: TypeId::Invalid,
            imm,
            block,
            mounted: true,
            prev: None,
            next: None,
            inputs: SmallVec::from_slice(inputs),
            outputs: SmallVec::new(),
            comment: None,
        });
        for &input in inputs {
            self.inst_mut(input).outputs.push(id);
        }
        self.splice_into_list(block, id, after);
        id
    }

    pub fn add_input(&mut self, inst: InstId, input: InstId) {
        self.inst_mut(inst).inputs.push(input);
        self.inst_mut(input).outputs.push(inst);
    }

    pub fn set_comment(&mut self, inst: InstId, comment: &'static str) {
        self.inst_mut(inst).comment = Some(comment);
    }

    /// Installs a terminator in `block` and wires its successor edges,
    /// mirroring `predecessors`/`successors` on both ends.
    pub fn close_block(
        &mut self,
        block: BlockId,
        kind: InstKind,
        inputs: &[InstId],
        successors: &[BlockId],
    ) -> Result<InstId, GraphError> {
        if !self.block(block).open {
            return Err(GraphError::BlockAlreadyClosed(block));
        }
        let after = self.block(block).last;
        let term = self.push(block, after, kind, Immediate::None, inputs);
        self.block_mut(block).open = false;
        for &succ in successors {
            self.block_mut(block).successors.push(succ);
            self.block_mut(succ).predecessors.push(block);
        }
        Ok(term)
    }

    fn splice_into_list(&mut self, block: BlockId, id: InstId, after: Option<InstId>) {
        match after {
            None => {
                let old_first = self.block(block).first;
                self.inst_mut(id).next = old_first;
                self.inst_mut(id).prev = None;
                if let Some(f) = old_first {
                    self.inst_mut(f).prev = Some(id);
                }
                self.block_mut(block).first = Some(id);
                if self.block(block).last.is_none() {
                    self.block_mut(block).last = Some(id);
                }
            }
            Some(after_id) => {
                let old_next = self.inst(after_id).next;
                self.inst_mut(id).prev = Some(after_id);
                self.inst_mut(id).next = old_next;
                self.inst_mut(after_id).next = Some(id);
                match old_next {
                    Some(n) => self.inst_mut(n).prev = Some(id),
                    None => self.block_mut(block).last = Some(id),
                }
            }
        }
    }

    fn unsplice_from_list(&mut self, id: InstId) {
        let (block, prev, next) = {
            let d = self.inst(id);
            (d.block, d.prev, d.next)
        };
        match prev {
            Some(p) => self.inst_mut(p).next = next,
            None => self.block_mut(block).first = next,
        }
        match next {
            Some(n) => self.inst_mut(n).prev = prev,
            None => self.block_mut(block).last = prev,
        }
        let d = self.inst_mut(id);
        d.prev = None;
        d.next = None;
    }

    // -- edit primitives ------------------------------------------------

    /// List-only removal: unlinks `id` from its block's instruction list.
    /// Use-def edges are left untouched, so the caller is responsible for
    /// re-inserting it (via `move_after`/`move_before`) or unwiring it
    /// explicitly before it is dropped from use.
    pub fn detach(&mut self, id: InstId) {
        self.unsplice_from_list(id);
        self.inst_mut(id).mounted = false;
    }

    /// List removal plus unwiring from every input's output list. The
    /// instruction must have no outputs of its own (nothing may use a value
    /// once its producer is gone this way).
    pub fn remove(&mut self, id: InstId) -> Result<(), GraphError> {
        if !self.inst(id).outputs.is_empty() {
            return Err(GraphError::InstructionHasOutputs(id));
        }
        let inputs: SmallVec<[InstId; 2]> = self.inst(id).inputs.clone();
        for input in inputs {
            remove_one(&mut self.inst_mut(input).outputs, id);
        }
        self.inst_mut(id).inputs.clear();
        self.detach(id);
        Ok(())
    }

    /// List removal and unwiring in both directions: every input loses its
    /// back-reference to `id`, and every current user also loses its
    /// forward reference to `id`, leaving those users with a hole in their
    /// input list. Rarely the right call outside of whole-graph teardown;
    /// prefer `rewrite_with` when users should instead point somewhere else.
    pub fn force_remove(&mut self, id: InstId) {
        let inputs: SmallVec<[InstId; 2]> = self.inst(id).inputs.clone();
        for input in inputs {
            remove_one(&mut self.inst_mut(input).outputs, id);
        }
        let outputs: SmallVec<[InstId; 2]> = self.inst(id).outputs.clone();
        for output in outputs {
            remove_one(&mut self.inst_mut(output).inputs, id);
        }
        self.inst_mut(id).inputs.clear();
        self.inst_mut(id).outputs.clear();
        self.detach(id);
    }

    /// Tombstones `id`: requires it has no outputs. Equivalent to `remove`
    /// plus marking the slot permanently dead.
    pub fn destroy(&mut self, id: InstId) -> Result<(), GraphError> {
        self.remove(id)
    }

    /// Tombstones `id` unconditionally, punching a hole in any remaining
    /// users' input lists.
    pub fn force_destroy(&mut self, id: InstId) {
        self.force_remove(id)
    }

    /// Destroys `old` (which must be unused) and splices `new` into the
    /// list slot it occupied.
    pub fn replace_with(&mut self, old: InstId, new: InstId) -> Result<(), GraphError> {
        let (block, prev) = {
            let d = self.inst(old);
            (d.block, d.prev)
        };
        self.destroy(old)?;
        if self.inst(new).mounted {
            self.detach(new);
        }
        self.inst_mut(new).block = block;
        self.splice_into_list(block, new, prev);
        self.inst_mut(new).mounted = true;
        Ok(())
    }

    /// Redirects every current user of `old` to use `new` instead, then
    /// destroys `old`. This is the usual way to eliminate a value: folding
    /// and register resolution both call this rather than `replace_with`.
    pub fn rewrite_with(&mut self, old: InstId, new: InstId) -> Result<(), GraphError> {
        let users: SmallVec<[InstId; 2]> = self.inst(old).outputs.clone();
        for user in users {
            for slot in self.inst_mut(user).inputs.iter_mut() {
                if *slot == old {
                    *slot = new;
                }
            }
            self.inst_mut(new).outputs.push(user);
        }
        self.inst_mut(old).outputs.clear();
        self.destroy(old)
    }

    /// Detaches `id` and re-inserts it into `block` immediately after
    /// `after` (`None` = start of block).
    pub fn move_after(&mut self, id: InstId, block: BlockId, after: Option<InstId>) {
        if self.inst(id).mounted {
            self.unsplice_from_list(id);
        }
        self.inst_mut(id).block = block;
        self.splice_into_list(block, id, after);
        self.inst_mut(id).mounted = true;
    }

    /// Detaches `id` and re-inserts it into `block` immediately before
    /// `before` (`None` = end of block).
    pub fn move_before(&mut self, id: InstId, block: BlockId, before: Option<InstId>) {
        let after = match before {
            None => self.block(block).last,
            Some(b) => self.inst(b).prev,
        };
        self.move_after(id, block, after);
    }

    // -- dominance --------------------------------------------------------

    /// Computes the immediate dominator of every live block via the classic
    /// Cooper/Harvey/Kennedy iterative algorithm, restricted to forward
    /// edges: a predecessor only seeds a block's dominator set if its id is
    /// lower, so a loop's back-edge into the header never participates.
    pub fn build_dominators(&mut self) {
        let entry = BlockId(0);
        if self.blocks.is_empty() {
            self.dominators_built = true;
            return;
        }
        for b in self.blocks.iter_mut() {
            b.dominator = None;
        }
        self.blocks[entry.0 as usize].dominator = Some(entry);

        let order: Vec<BlockId> = self.live_blocks().filter(|&b| b != entry).collect();
        let mut changed = true;
        while changed {
            changed = false;
            for &b in &order {
                let preds = self.block(b).predecessors.clone();
                let mut new_idom: Option<BlockId> = None;
                for p in preds {
                    if p.0 >= b.0 {
                        continue;
                    }
                    if self.block(p).dominator.is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => p,
                        Some(cur) => self.intersect(cur, p),
                    });
                }
                if let Some(idom) = new_idom {
                    if self.block(b).dominator != Some(idom) {
                        self.block_mut(b).dominator = Some(idom);
                        changed = true;
                    }
                }
            }
        }
        self.dominators_built = true;
    }

    fn intersect(&self, mut a: BlockId, mut b: BlockId) -> BlockId {
        while a != b {
            while a.0 > b.0 {
                a = self.block(a).dominator.expect("dominator chain must reach entry");
            }
            while b.0 > a.0 {
                b = self.block(b).dominator.expect("dominator chain must reach entry");
            }
        }
        a
    }

    /// Whether `a` dominates `b`, i.e. every path from the entry to `b`
    /// passes through `a`. Requires `build_dominators` to have run.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        debug_assert!(self.dominators_built, "dominators not built");
        let mut cur = b;
        loop {
            if cur == a {
                return true;
            }
            match self.block(cur).dominator {
                Some(d) if d != cur => cur = d,
                _ => return cur == a,
            }
        }
    }

    pub fn dominated_by(&self, a: BlockId, b: BlockId) -> bool {
        self.dominates(b, a)
    }

    /// Whether `b` is reachable from `a` by following successor edges.
    pub fn reaches(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let mut seen = vec![false; self.blocks.len()];
        let mut queue = VecDeque::new();
        queue.push_back(a);
        seen[a.0 as usize] = true;
        while let Some(cur) = queue.pop_front() {
            for &succ in &self.block(cur).successors {
                if succ == b {
                    return true;
                }
                if !seen[succ.0 as usize] {
                    seen[succ.0 as usize] = true;
                    queue.push_back(succ);
                }
            }
        }
        false
    }

    pub fn reached_by(&self, a: BlockId, b: BlockId) -> bool {
        self.reaches(b, a)
    }

    /// Whether `a` dominates `b` — every path from the entry block to `b`
    /// passes through `a` — computed independently of the stored dominator
    /// tree by excising `a` from the graph and checking whether `b` is
    /// still reachable from entry. Used to cross-check `build_dominators`'
    /// result rather than trust it.
    pub fn always_reaches(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let entry = BlockId(0);
        let mut seen = vec![false; self.blocks.len()];
        seen[a.0 as usize] = true;
        let mut queue = VecDeque::new();
        if entry != a {
            seen[entry.0 as usize] = true;
            queue.push_back(entry);
        }
        while let Some(cur) = queue.pop_front() {
            if cur == b {
                return false;
            }
            for &succ in &self.block(cur).successors {
                if !seen[succ.0 as usize] {
                    seen[succ.0 as usize] = true;
                    queue.push_back(succ);
                }
            }
        }
        true
    }

    pub fn always_reached_by(&self, a: BlockId, b: BlockId) -> bool {
        self.always_reaches(b, a)
    }
}

fn remove_one(v: &mut SmallVec<[InstId; 2]>, id: InstId) {
    if let Some(pos) = v.iter().position(|&x| x == id) {
        v.remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_line_graph() -> (Graph, BlockId, BlockId) {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let b1 = g.open_block();
        g.close_block(b0, InstKind::Goto, &[], &[b1]).unwrap();
        g.close_block(b1, InstKind::Ret, &[], &[]).unwrap();
        (g, b0, b1)
    }

    #[test]
    fn close_block_wires_predecessors_and_successors() {
        let (g, b0, b1) = straight_line_graph();
        assert_eq!(g.block(b0).successors.as_slice(), &[b1]);
        assert_eq!(g.block(b1).predecessors.as_slice(), &[b0]);
        assert!(!g.block(b0).open);
    }

    #[test]
    fn push_wires_use_def_edges() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let c = g.push(b0, None, InstKind::Imm, Immediate::Int(1), &[]);
        let add = g.push(b0, Some(c), InstKind::Add, Immediate::None, &[c, c]);
        assert_eq!(g.inst(add).inputs.as_slice(), &[c, c]);
        assert_eq!(g.inst(c).outputs.as_slice(), &[add, add]);
    }

    #[test]
    fn remove_requires_no_outputs() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let c = g.push(b0, None, InstKind::Imm, Immediate::Int(1), &[]);
        let _add = g.push(b0, Some(c), InstKind::Add, Immediate::None, &[c, c]);
        assert_eq!(g.remove(c), Err(GraphError::InstructionHasOutputs(c)));
    }

    #[test]
    fn rewrite_with_redirects_users_and_destroys_old() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let old = g.push(b0, None, InstKind::Imm, Immediate::Int(1), &[]);
        let new = g.push(b0, Some(old), InstKind::Imm, Immediate::Int(2), &[]);
        let user = g.push(b0, Some(new), InstKind::Add, Immediate::None, &[old, old]);
        g.rewrite_with(old, new).unwrap();
        assert_eq!(g.inst(user).inputs.as_slice(), &[new, new]);
        assert_eq!(g.inst(new).outputs.as_slice(), &[user, user]);
        assert!(!g.inst(old).mounted);
    }

    #[test]
    fn dominance_over_diamond() {
        let mut g = Graph::new(Config::default());
        let entry = g.open_block();
        let left = g.open_block();
        let right = g.open_block();
        let join = g.open_block();
        let cond = g.push(entry, None, InstKind::Imm, Immediate::Int(0), &[]);
        g.close_block(entry, InstKind::If, &[cond], &[left, right])
            .unwrap();
        g.close_block(left, InstKind::Goto, &[], &[join]).unwrap();
        g.close_block(right, InstKind::Goto, &[], &[join]).unwrap();
        g.close_block(join, InstKind::Ret, &[], &[]).unwrap();

        g.build_dominators();
        assert!(g.dominates(entry, join));
        assert!(g.dominates(entry, left));
        assert!(!g.dominates(left, join));
        assert!(!g.dominates(right, join));
        assert_eq!(g.block(join).dominator, Some(entry));
    }

    #[test]
    fn loop_back_edge_does_not_confuse_dominance() {
        let mut g = Graph::new(Config::default());
        let entry = g.open_block();
        let header = g.open_block();
        let body = g.open_block();
        let exit = g.open_block();
        g.close_block(entry, InstKind::Goto, &[], &[header]).unwrap();
        let cond = g.push(header, None, InstKind::Imm, Immediate::Int(0), &[]);
        g.close_block(header, InstKind::If, &[cond], &[body, exit])
            .unwrap();
        g.close_block(body, InstKind::Goto, &[], &[header]).unwrap();
        g.close_block(exit, InstKind::Ret, &[], &[]).unwrap();

        g.build_dominators();
        assert!(g.dominates(entry, header));
        assert!(g.dominates(header, body));
        assert!(g.dominates(header, exit));
        assert_eq!(g.block(header).dominator, Some(entry));
    }

    #[test]
    fn reachability_and_tree_free_dominance() {
        let (g, b0, b1) = straight_line_graph();
        assert!(g.reaches(b0, b1));
        assert!(!g.reaches(b1, b0));
        assert!(g.always_reaches(b0, b1));
    }

    #[test]
    fn always_reaches_false_past_a_branch_the_dominator_does_not_own() {
        let mut g = Graph::new(Config::default());
        let entry = g.open_block();
        let header = g.open_block();
        let body = g.open_block();
        let next = g.open_block();
        g.close_block(entry, InstKind::Goto, &[], &[header]).unwrap();
        let cond = g.push(header, None, InstKind::Imm, Immediate::Int(0), &[]);
        g.close_block(header, InstKind::If, &[cond], &[body, next]).unwrap();
        g.close_block(body, InstKind::Goto, &[], &[header]).unwrap();
        g.close_block(next, InstKind::Ret, &[], &[]).unwrap();

        g.build_dominators();
        assert_eq!(g.block(body).dominator, Some(header));
        // `header` dominates `body` (every path from entry to it crosses
        // header) even though not every path leaving `header` reaches it.
        assert!(g.always_reaches(header, body));
        assert!(!g.always_reaches(body, next));
    }

    #[test]
    fn move_after_relocates_instruction() {
        let mut g = Graph::new(Config::default());
        let b0 = g.open_block();
        let b1 = g.open_block();
        let a = g.push(b0, None, InstKind::Imm, Immediate::Int(1), &[]);
        g.move_after(a, b1, None);
        assert_eq!(g.inst(a).block, b1);
        assert_eq!(g.block(b1).first, Some(a));
        assert!(g.block(b0).first.is_none());
    }
}
