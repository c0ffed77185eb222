use smallvec::SmallVec;

use crate::ids::{BlockId, InstId};

/// One basic block: an ordered, doubly-linked instruction list plus the
/// control-flow edges that connect it to the rest of the graph.
///
/// Ids increase along every forward edge; this is the invariant dominance
/// computation relies on (`original_source`'s `Block` struct, `ir.h`).
#[derive(Debug, Clone)]
pub struct BlockData {
    pub id: BlockId,
    pub first: Option<InstId>,
    pub last: Option<InstId>,
    pub predecessors: SmallVec<[BlockId; 2]>,
    pub successors: SmallVec<[BlockId; 2]>,
    /// `true` until `close_block` installs a terminator.
    pub open: bool,
    /// Lazily orphaned rather than removed: a block with no predecessors
    /// other than the entry is left in the arena, excluded from iteration
    /// that only visits reachable blocks.
    pub orphan: bool,
    pub dominator: Option<BlockId>,
}

impl BlockData {
    pub fn new(id: BlockId) -> Self {
        BlockData {
            id,
            first: None,
            last: None,
            predecessors: SmallVec::new(),
            successors: SmallVec::new(),
            open: true,
            orphan: false,
            dominator: None,
        }
    }

    pub fn is_entry(&self) -> bool {
        self.id.0 == 0
    }
}
