// Loot bookkeeping.
//
// `LootInfo` is a pile of coins lying on a tile, with the heights of the
// first and last block that added to it. `CollectedLootInfo` is the same pile
// once a character picked it up, plus the heights at which the character
// first and last collected. A collected pile with `collected_first_block ==
// -1` and a positive amount is a *refund*: the value of a general that is
// paid back to its player rather than loot. Refunds and loot must never be merged.
//
// `CollectedBounty` is one payout produced by a step: a character's banked
// loot or a refund, with the address the payout goes to.

use crate::state::GameState;
use crate::types::{Amount, CharacterId};
use serde::{Deserialize, Serialize};

/// Coins lying on one tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootInfo {
    pub amount: Amount,
    pub first_block: i32,
    pub last_block: i32,
}

impl LootInfo {
    pub fn new(amount: Amount, height: i32) -> Self {
        Self {
            amount,
            first_block: height,
            last_block: height,
        }
    }
}

impl Default for LootInfo {
    fn default() -> Self {
        Self {
            amount: 0,
            first_block: -1,
            last_block: -1,
        }
    }
}

/// Coins held by a character (or a refund queued for payout).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedLootInfo {
    pub amount: Amount,
    pub first_block: i32,
    pub last_block: i32,
    pub collected_first_block: i32,
    pub collected_last_block: i32,
}

impl Default for CollectedLootInfo {
    fn default() -> Self {
        Self {
            amount: 0,
            first_block: -1,
            last_block: -1,
            collected_first_block: -1,
            collected_last_block: -1,
        }
    }
}

impl CollectedLootInfo {
    /// A refund of `amount` issued at `height`.
    pub fn refund(amount: Amount, height: i32) -> Self {
        Self {
            amount,
            first_block: height,
            last_block: height,
            ..Self::default()
        }
    }

    pub fn is_refund(&self) -> bool {
        self.amount > 0 && self.collected_first_block == -1
    }

    /// Add a pile picked up at height `height`.
    ///
    /// Panics when called on a refund.
    pub fn collect(&mut self, loot: &LootInfo, height: i32) {
        assert!(!self.is_refund(), "refunds cannot collect loot");
        if loot.amount <= 0 {
            return;
        }
        self.amount += loot.amount;
        if self.first_block < 0 || loot.first_block < self.first_block {
            self.first_block = loot.first_block;
        }
        if loot.last_block > self.last_block {
            self.last_block = loot.last_block;
        }
        if self.collected_first_block < 0 {
            self.collected_first_block = height;
        }
        self.collected_last_block = height;
    }
}

/// One payout of a step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedBounty {
    pub character: CharacterId,
    pub loot: CollectedLootInfo,
    pub address: String,
}

impl CollectedBounty {
    pub fn new(character: CharacterId, loot: CollectedLootInfo, address: String) -> Self {
        Self {
            character,
            loot,
            address,
        }
    }

    /// Follow the player's current reward address, if the player still lives.
    pub fn update_address(&mut self, state: &GameState) {
        if let Some(player) = state.players.get(&self.character.player) {
            self.address = player.address.clone();
        }
    }
}
