use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a [`crate::block::BlockData`] within a [`crate::graph::Graph`].
///
/// Ids are assigned once, in increasing order, and never reused even after a
/// block is orphaned. Dominance computation relies on this monotonicity: a
/// forward edge always points from a lower id to a higher one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

/// Identifies an [`crate::inst::InstData`] within a [`crate::graph::Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl From<u32> for BlockId {
    fn from(v: u32) -> Self {
        BlockId(v)
    }
}

impl From<BlockId> for u32 {
    fn from(v: BlockId) -> Self {
        v.0
    }
}

impl From<u32> for InstId {
    fn from(v: u32) -> Self {
        InstId(v)
    }
}

impl From<InstId> for u32 {
    fn from(v: InstId) -> Self {
        v.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(BlockId(3).to_string(), "b3");
        assert_eq!(InstId(7).to_string(), "%7");
    }

    #[test]
    fn roundtrips_through_u32() {
        let b: BlockId = 5u32.into();
        let back: u32 = b.into();
        assert_eq!(back, 5);
    }

    #[test]
    fn serde_roundtrip() {
        let id = InstId(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: InstId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
