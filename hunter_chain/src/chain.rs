// The view of the block chain the integrator needs.
//
// The chain (block index, main-chain selection, transaction storage) lives
// outside this workspace. `ChainView` is the narrow interface the integrator
// and the cache use to look at it: block linkage by hash, main-chain
// membership, and the game inputs of a block.
//
// A block's game inputs are its name operations plus the treasure minted with
// it. `step_data_from_updates` turns name operations into validated-syntax
// `Move`s; a value that does not parse makes the whole block invalid.

use crate::error::ChainError;
use hunter_sim::moves::Move;
use hunter_sim::rules::Ruleset;
use hunter_sim::step::StepData;
use hunter_sim::types::{Amount, BlockHash};
use serde::{Deserialize, Serialize};

/// Linkage of one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub hash: BlockHash,
    /// `None` for the genesis block.
    pub prev: Option<BlockHash>,
    pub height: u32,
}

pub trait ChainView {
    fn block(&self, hash: &BlockHash) -> Option<BlockRef>;

    fn is_on_main_chain(&self, hash: &BlockHash) -> bool;

    /// The moves, hash and treasure of `block`.
    fn step_data(&self, block: &BlockRef, rules: &Ruleset) -> Result<StepData, ChainError>;
}

/// One name operation of a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameUpdate {
    pub name: String,
    /// The JSON move.
    pub value: String,
    /// Coins locked in the name output after the operation.
    pub locked: Amount,
}

impl NameUpdate {
    pub fn new(name: &str, value: &str, locked: Amount) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
            locked,
        }
    }
}

/// Parse the name operations of `block` into the inputs of a step.
pub fn step_data_from_updates(
    rules: &Ruleset,
    block: &BlockRef,
    updates: &[NameUpdate],
    treasure: Amount,
) -> Result<StepData, ChainError> {
    let moves = updates
        .iter()
        .map(|u| {
            Move::parse(&u.name, &u.value, u.locked, rules).map_err(|e| ChainError::BlockData {
                hash: block.hash,
                reason: format!("move of {}: {e}", u.name),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StepData {
        moves,
        new_hash: block.hash,
        treasure,
    })
}
