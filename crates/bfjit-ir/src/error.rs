use thiserror::Error;

use crate::ids::{BlockId, InstId};

/// Recoverable preconditions at the edit-primitive boundary.
///
/// Everything here corresponds to an `assert()` in `original_source`; since
/// this is a library rather than a standalone compiler binary, callers of the
/// low-level graph API get a `Result` back instead of an abort, but the
/// validator and type resolver still panic on a violation that could only
/// mean a bug elsewhere in the pipeline (spec's class-3 internal invariants).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("block {0} is not open")]
    BlockNotOpen(BlockId),
    #[error("block {0} is already closed")]
    BlockAlreadyClosed(BlockId),
    #[error("instruction {0} still has outputs")]
    InstructionHasOutputs(InstId),
    #[error("instruction {0} is not mounted")]
    InstructionNotMounted(InstId),
    #[error("instruction {0} not found")]
    InstructionNotFound(InstId),
    #[error("block {0} not found")]
    BlockNotFound(BlockId),
    #[error("instruction {inst} belongs to block {actual}, expected {expected}")]
    WrongBlock {
        inst: InstId,
        expected: BlockId,
        actual: BlockId,
    },
}
