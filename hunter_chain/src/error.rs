// Errors of the chain integration.
//
// `StoreError` covers the snapshot store: encoding and the backend itself.
// `ChainError` is what the block hooks return. Unknown blocks and requests
// off the main chain are rejected before any replay; height or hash
// mismatches between a computed state and its block mean the chain and the
// store disagree and must stop block processing.

use hunter_sim::error::StepError;
use hunter_sim::types::BlockHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot encoding failed: {0}")]
    Codec(#[from] bincode::Error),
    #[error("legacy snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot schema version {0} is newer than this software")]
    UnsupportedVersion(u32),
    #[error("cannot store the state before genesis")]
    PreGenesis,
    #[error("snapshot backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("unknown block {0}")]
    UnknownBlock(BlockHash),
    #[error("block {0} is not on the main chain")]
    NotOnMainChain(BlockHash),
    #[error("state at height {state} cannot belong to block {hash} at height {block}")]
    HeightMismatch {
        hash: BlockHash,
        block: u32,
        state: i32,
    },
    #[error("state for block {expected} carries hash {found}")]
    HashMismatch {
        expected: BlockHash,
        found: BlockHash,
    },
    #[error("block {hash} cannot be stepped: {source}")]
    Step {
        hash: BlockHash,
        #[source]
        source: StepError,
    },
    #[error("block {hash} carries invalid game data: {reason}")]
    BlockData { hash: BlockHash, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChainError {
    /// Whether block processing must stop, as opposed to rejecting the
    /// block or request at hand.
    pub fn is_fatal(&self) -> bool {
        match self {
            ChainError::HeightMismatch { .. }
            | ChainError::HashMismatch { .. }
            | ChainError::Store(_) => true,
            ChainError::Step { source, .. } => source.is_fatal(),
            ChainError::UnknownBlock(_)
            | ChainError::NotOnMainChain(_)
            | ChainError::BlockData { .. } => false,
        }
    }
}
