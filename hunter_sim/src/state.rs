// The world state.
//
// `GameState` is the authoritative snapshot of the game after a block: the
// live players with their characters, loot lying on tiles, hearts, banks,
// the crown, and the game fund. It is created once (height -1, before
// genesis) by `GameState::new()` and afterwards only ever produced by
// `step::perform_step`, one state per block. Once returned it is treated as
// an immutable value; callers that need a working copy clone it.
//
// A player's `value` is the in-game balance of the player. Before the
// life-steal fork it always equals the locked coins of the name; afterwards
// combat drains and credits it independently.
//
// Coins inside the world are counted by `coins_on_map()`: loot on tiles,
// loot held by characters, and player values. Together with `game_fund` this
// is the quantity the step's conservation check balances.
//
// Save/load: `GameState` derives serde. `to_json()`/`from_json()` give the
// human-readable form; the snapshot store uses bincode. Coordinate-keyed maps
// are encoded as pair lists (see `types::coord_map`).
//
// See also: `step.rs` for the transition function, `movement.rs` for
// character movement, `result.rs` for `KilledByInfo` and `StepResult`.
//
// **Critical constraint: determinism.** Every collection is a `BTreeMap` or
// `BTreeSet` so iteration follows the consensus ordering of `Coord`,
// `PlayerId` and character index.

use crate::config::Fork;
use crate::error::StepError;
use crate::loot::{CollectedBounty, CollectedLootInfo, LootInfo};
use crate::map::GameMap;
use crate::prng::GameRng;
use crate::result::{KilledByInfo, StepResult};
use crate::rules::Ruleset;
use crate::types::{coord_map, Amount, BlockHash, CharacterId, Coord, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Characters
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterState {
    pub coord: Coord,
    /// Start of the current straight-line segment towards the next waypoint.
    pub from: Coord,
    /// Facing, numpad-encoded: 1-9 without 5, y growing downwards.
    pub dir: u8,
    /// Remaining waypoints, the next target *last*.
    pub waypoints: Vec<Coord>,
    pub loot: CollectedLootInfo,
    /// Consecutive blocks spent on a bank tile.
    pub stay_in_spawn_area: u32,
}

impl CharacterState {
    pub fn new(coord: Coord, dir: u8) -> Self {
        Self {
            coord,
            from: coord,
            dir,
            waypoints: Vec::new(),
            loot: CollectedLootInfo::default(),
            stay_in_spawn_area: 0,
        }
    }

    /// Pick up `loot`, limited by the carrying capacity (`None` =
    /// unlimited). Returns the amount that could not be taken.
    ///
    /// If the capacity dropped below what the character already holds, it
    /// keeps its loot but cannot take more.
    pub fn collect_loot(&mut self, mut loot: LootInfo, height: i32, capacity: Option<Amount>) -> Amount {
        let mut remaining = 0;
        if let Some(cap) = capacity {
            let free = (cap - self.loot.amount).max(0);
            if loot.amount > free {
                remaining = loot.amount - free;
                loot.amount = free;
            }
        }
        self.loot.collect(&loot, height);
        remaining
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub color: u8,
    /// Coins locked in the player's name output on chain.
    pub locked_coins: Amount,
    /// In-game balance (the "life" after the life-steal fork).
    pub value: Amount,
    pub characters: BTreeMap<u32, CharacterState>,
    pub next_character_index: u32,
    /// Poison countdown; -1 when not poisoned.
    pub remaining_life: i32,
    pub message: String,
    pub message_block: i32,
    /// Reward address for bounties; empty means the name's own address.
    pub address: String,
    /// Address allowed to change `address`; empty means the name owner.
    pub address_lock: String,
}

impl PlayerState {
    pub fn new(color: u8) -> Self {
        Self {
            color,
            locked_coins: 0,
            value: 0,
            characters: BTreeMap::new(),
            next_character_index: 0,
            remaining_life: -1,
            message: String::new(),
            message_block: 0,
            address: String::new(),
            address_lock: String::new(),
        }
    }

    pub fn can_spawn_character(&self, rules: &Ruleset) -> bool {
        self.characters.len() < rules.config.max_characters_per_player
            && self.next_character_index < rules.config.max_characters_per_player_total
    }

    /// Add a character at a random spawn location.
    ///
    /// Before the life-steal fork the character appears on the team's corner
    /// strip facing into the map; afterwards anywhere walkable, facing down.
    pub fn spawn_character(&mut self, rules: &Ruleset, height: i32, rng: &mut GameRng) {
        let map = &rules.map;
        let (coord, dir) = if rules.config.fork_in_effect(Fork::LifeSteal, height) {
            let tiles = map.walkable_tiles();
            (tiles[rng.next_index(tiles.len())], 2)
        } else {
            let pos = rng.next_int(map.spawn_strip_len());
            map.spawn_tile(self.color, pos)
        };
        self.characters
            .insert(self.next_character_index, CharacterState::new(coord, dir));
        self.next_character_index += 1;
    }

    /// Coins held by all characters of this player.
    pub fn held_loot(&self) -> Amount {
        self.characters.values().map(|c| c.loot.amount).sum()
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub players: BTreeMap<PlayerId, PlayerState>,
    /// Last messages of players killed in this step, for display.
    pub dead_players_chat: BTreeMap<PlayerId, PlayerState>,
    #[serde(with = "coord_map")]
    pub loot: BTreeMap<Coord, LootInfo>,
    pub hearts: BTreeSet<Coord>,
    /// Bank tiles with their remaining lifetime (0 for the fixed legacy banks).
    #[serde(with = "coord_map")]
    pub banks: BTreeMap<Coord, u32>,
    pub crown_pos: Coord,
    pub crown_holder: Option<CharacterId>,
    pub game_fund: Amount,
    pub height: i32,
    pub disaster_height: i32,
    pub hash_block: BlockHash,
}

impl GameState {
    /// The state before the genesis block.
    pub fn new(map: &GameMap) -> Self {
        Self {
            players: BTreeMap::new(),
            dead_players_chat: BTreeMap::new(),
            loot: BTreeMap::new(),
            hearts: BTreeSet::new(),
            banks: map.original_spawn_tiles().map(|c| (c, 0)).collect(),
            crown_pos: map.crown_start(),
            crown_holder: None,
            game_fund: 0,
            height: -1,
            disaster_height: -1,
            hash_block: BlockHash::ZERO,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn character(&self, id: &CharacterId) -> Option<&CharacterState> {
        self.players.get(&id.player)?.characters.get(&id.index)
    }

    pub fn is_bank(&self, c: Coord) -> bool {
        self.banks.contains_key(&c)
    }

    /// Total coins inside the world: loot on tiles, loot held by
    /// characters, and player values.
    pub fn coins_on_map(&self) -> Amount {
        let on_tiles: Amount = self.loot.values().map(|l| l.amount).sum();
        let in_players: Amount = self
            .players
            .values()
            .map(|p| p.value + p.held_loot())
            .sum();
        on_tiles + in_players
    }

    /// Loot carrying capacity of a character at this state's height.
    pub fn carrying_capacity(&self, rules: &Ruleset, id: &CharacterId) -> Option<Amount> {
        let is_holder = self.crown_holder.as_ref() == Some(id);
        rules
            .config
            .carrying_capacity(self.height, id.is_general(), is_holder)
    }

    /// Drop coins on a tile. A pile that reaches zero disappears.
    pub fn add_loot(&mut self, coord: Coord, amount: Amount) {
        if amount == 0 {
            return;
        }
        let height = self.height;
        match self.loot.get_mut(&coord) {
            Some(pile) => {
                pile.amount += amount;
                if pile.amount == 0 {
                    self.loot.remove(&coord);
                } else {
                    pile.last_block = height;
                }
            }
            None => {
                self.loot.insert(coord, LootInfo::new(amount, height));
            }
        }
    }

    /// Dispose of the coins of a dying character.
    ///
    /// For a general that qualifies, its value leaves the map as a refund
    /// bounty. Otherwise the general's value joins its held loot. The death tax is deducted unless
    /// the kill was a bank timeout. The rest drops on the character's tile
    /// (pushed off the legacy spawn strips before life-steal), or goes to the
    /// game fund when the victim was poisoned after the less-hearts fork.
    ///
    /// The character itself is not removed.
    pub fn handle_killed_loot(
        &mut self,
        rules: &Ruleset,
        player_id: &PlayerId,
        index: u32,
        info: &KilledByInfo,
        result: &mut StepResult,
    ) -> Result<(), StepError> {
        let config = &rules.config;
        let height = self.height;
        let player = self.players.get(player_id).ok_or_else(|| {
            StepError::InvariantViolation(format!("killed player {player_id} does not exist"))
        })?;
        let ch = player.characters.get(&index).ok_or_else(|| {
            StepError::InvariantViolation(format!(
                "killed character {player_id}.{index} does not exist"
            ))
        })?;

        let mut amount = ch.loot.amount;
        if index == 0 {
            if info.can_refund(config, height, player) {
                result.bounties.push(CollectedBounty::new(
                    CharacterId::new(player_id.clone(), 0),
                    CollectedLootInfo::refund(player.value, height),
                    player.address.clone(),
                ));
            } else {
                amount += player.value;
            }
        }

        if info.has_death_tax() {
            let tax = amount / config.death_tax_divisor;
            result.tax_amount += tax;
            amount -= tax;
        }

        let drop = info.drop_coins(config, height, player);
        let mut pos = ch.coord;
        if !config.fork_in_effect(Fork::LifeSteal, height) {
            pos = rules.map.push_out_of_spawn_area(pos);
        }

        if drop {
            self.add_loot(pos, amount);
        } else {
            self.game_fund += amount;
        }
        Ok(())
    }

    /// Structural invariants every state must satisfy.
    pub fn check_invariants(&self, rules: &Ruleset) -> Result<(), String> {
        if self.game_fund < 0 {
            return Err(format!("negative game fund {}", self.game_fund));
        }
        for (id, p) in &self.players {
            if p.value < 0 || p.locked_coins < 0 {
                return Err(format!(
                    "player {id} has value {} and locked coins {}",
                    p.value, p.locked_coins
                ));
            }
            if p.characters.len() > rules.config.max_characters_per_player
                || p.next_character_index > rules.config.max_characters_per_player_total
            {
                return Err(format!("player {id} exceeds the character limits"));
            }
            if p.characters.keys().any(|&i| i >= p.next_character_index) {
                return Err(format!("player {id} has a character index beyond the next one"));
            }
            if p.characters.values().any(|c| c.loot.amount < 0) {
                return Err(format!("player {id} holds negative loot"));
            }
        }
        if let Some((c, l)) = self.loot.iter().find(|(_, l)| l.amount <= 0) {
            return Err(format!("loot tile {c} holds {}", l.amount));
        }
        if let Some(holder) = &self.crown_holder {
            match self.character(holder) {
                Some(ch) if ch.coord == self.crown_pos => {}
                Some(_) => return Err(format!("crown holder {holder} is not on the crown tile")),
                None => return Err(format!("crown holder {holder} does not exist")),
            }
        }
        Ok(())
    }
}
