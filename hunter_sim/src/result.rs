// What a step produces besides the new world state.
//
// `KilledByInfo` records why a player died. Its variant order is the reason
// code (destruct = 1, bank timeout = 2, poison = 3) and doubles as the
// priority used when the block's game transaction lists kills, so the derived
// `Ord` must stay in this order. It also decides the fate of the victim's
// coins: whether the miner takes the death tax, whether the coins drop on the
// map, and whether the general's value is refunded to the player.
//
// `StepResult` accumulates the miner tax, the bounties to pay out, and every
// killed player with all reasons it was killed for.

use crate::config::{Fork, GameConfig};
use crate::loot::CollectedBounty;
use crate::state::PlayerState;
use crate::types::{Amount, CharacterId, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KilledByInfo {
    /// Killed by another character's destruct (or its own, before life-steal).
    Destruct { killer: CharacterId },
    /// Stayed on a bank tile for too long.
    SpawnTimeout,
    /// Poison from a disaster ran out.
    Poison,
}

impl KilledByInfo {
    pub fn reason_code(&self) -> u8 {
        match self {
            KilledByInfo::Destruct { .. } => 1,
            KilledByInfo::SpawnTimeout => 2,
            KilledByInfo::Poison => 3,
        }
    }

    /// Whether the miner takes the death tax from the dropped coins.
    pub fn has_death_tax(&self) -> bool {
        !matches!(self, KilledByInfo::SpawnTimeout)
    }

    /// Whether the victim's coins drop on the map (otherwise they go to the
    /// game fund). Poisoned players stop dropping coins after less-hearts.
    /// `remaining_life == 0` still counts as poisoned: that is the state of
    /// a player killed by poison.
    pub fn drop_coins(&self, config: &GameConfig, height: i32, victim: &PlayerState) -> bool {
        if !config.fork_in_effect(Fork::LessHearts, height) {
            return true;
        }
        victim.remaining_life < 0
    }

    /// Whether the victim's general value is refunded.
    pub fn can_refund(&self, config: &GameConfig, height: i32, victim: &PlayerState) -> bool {
        if !config.fork_in_effect(Fork::LessHearts, height) {
            return false;
        }
        let life_steal = config.fork_in_effect(Fork::LifeSteal, height);
        match self {
            KilledByInfo::Destruct { .. } => false,
            // Before life-steal, poisoned players timing out on a bank were
            // not refunded.
            KilledByInfo::SpawnTimeout => life_steal || victim.remaining_life < 0,
            KilledByInfo::Poison => life_steal,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub tax_amount: Amount,
    pub bounties: Vec<CollectedBounty>,
    killed_by: BTreeMap<PlayerId, BTreeSet<KilledByInfo>>,
}

impl StepResult {
    pub fn kill_player(&mut self, victim: PlayerId, info: KilledByInfo) {
        self.killed_by.entry(victim).or_default().insert(info);
    }

    pub fn is_killed(&self, victim: &PlayerId) -> bool {
        self.killed_by.contains_key(victim)
    }

    /// Killed players in name order.
    pub fn killed_players(&self) -> impl Iterator<Item = &PlayerId> {
        self.killed_by.keys()
    }

    /// All recorded reasons for `victim`, lowest reason code first.
    pub fn killed_by(&self, victim: &PlayerId) -> impl Iterator<Item = &KilledByInfo> {
        self.killed_by.get(victim).into_iter().flatten()
    }

    /// The reason that decides how the victim's coins are handled.
    pub fn primary_killer(&self, victim: &PlayerId) -> Option<&KilledByInfo> {
        self.killed_by.get(victim).and_then(|set| set.iter().next())
    }

    /// Sum of all bounty payouts, refunds included.
    pub fn bounty_total(&self) -> Amount {
        self.bounties.iter().map(|b| b.loot.amount).sum()
    }

    /// Sum of all refunds.
    pub fn refund_total(&self) -> Amount {
        self.bounties
            .iter()
            .filter(|b| b.loot.is_refund())
            .map(|b| b.loot.amount)
            .sum()
    }
}
