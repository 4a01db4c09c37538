// Consensus parameters of the game.
//
// All rule constants live in `GameConfig`: the activation heights of the
// rule-changing forks and every coin amount, ratio, and timing constant that
// depends on them. The step never uses magic numbers; it asks the config.
// Named presets (`mainnet()`, `testnet()`, `regtest()`) differ only in their
// fork heights. A config can also be loaded from JSON, which the tests use to
// activate forks at convenient heights.
//
// Heights are `i32` because the world state before genesis has height -1.
// Fork-dependent rules are always evaluated against the height of the state
// being produced, except for move validation, which looks one block ahead.
//
// See also: `map.rs` for the map geometry constants, `rules.rs` for the
// `Ruleset` that bundles this config with a map.
//
// **Critical constraint: determinism.** Every node on a network must use the
// same config. Changing any value here is a consensus change.

use crate::types::{Amount, COIN};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Forks
// ---------------------------------------------------------------------------

/// The rule changes activated at fixed block heights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Fork {
    /// Poison disasters, higher name cost, a single initial character.
    Poison,
    /// Characters can only carry a limited amount of loot.
    CarryingCap,
    /// Hearts become rare, refunds for bank timeouts, general radius shrinks.
    LessHearts,
    /// Combat drains coins instead of killing; dynamic banks; no hearts.
    LifeSteal,
    /// Cheaper names with a spawn surcharge.
    TimeSave,
}

/// Activation heights of each fork.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkHeights {
    pub poison: i32,
    pub carrying_cap: i32,
    pub less_hearts: i32,
    pub life_steal: i32,
    pub time_save: i32,
}

impl ForkHeights {
    pub fn height(&self, fork: Fork) -> i32 {
        match fork {
            Fork::Poison => self.poison,
            Fork::CarryingCap => self.carrying_cap,
            Fork::LessHearts => self.less_hearts,
            Fork::LifeSteal => self.life_steal,
            Fork::TimeSave => self.time_save,
        }
    }

    /// All forks active from `height` on. Handy for tests of a single era.
    pub fn all_at(height: i32) -> Self {
        Self {
            poison: height,
            carrying_cap: height,
            less_hearts: height,
            life_steal: height,
            time_save: height,
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter groups
// ---------------------------------------------------------------------------

/// Poison disaster timing and severity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisasterParams {
    /// No disaster can happen fewer than this many blocks after the last one.
    pub min_time: i32,
    /// A disaster is forced once this many blocks passed since the last one.
    pub max_time: i32,
    /// In between, a disaster happens with probability `1 / probability`.
    pub probability: u32,
    /// Range of the poison countdown assigned to every player.
    pub min_life: i32,
    pub max_life: i32,
}

/// Dynamic bank placement (life-steal era).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankParams {
    pub count: usize,
    pub min_life: u32,
    pub max_life: u32,
}

/// Loot carrying capacity in each era. Before the carrying-cap fork (and for
/// the crown holder) capacity is unlimited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityParams {
    pub general: Amount,
    pub other: Amount,
    pub less_hearts: Amount,
    pub life_steal: Amount,
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub forks: ForkHeights,

    /// Cost of registering a player, per era.
    pub name_coin_initial: Amount,
    pub name_coin_poison: Amount,
    pub name_coin_less_hearts: Amount,
    pub name_coin_time_save: Amount,
    /// Extra fee on spawns after the time-save fork, paid into the game fund.
    pub spawn_surcharge: Amount,
    /// Fee per destructing character after the life-steal fork.
    pub destruct_fee: Amount,
    /// Coins drained from a victim per attacker after the life-steal fork.
    pub life_steal_damage: Amount,

    /// Miner tax on dropped loot of killed characters, as a divisor (25 = 4%).
    pub death_tax_divisor: Amount,
    /// Miner tax on banked loot, as a divisor (10 = 10%).
    pub bank_tax_divisor: Amount,

    pub max_stay_on_bank: u32,
    pub max_stay_on_bank_life_steal: u32,

    pub heart_interval: i32,
    pub heart_interval_less_hearts: i32,

    pub initial_characters: u32,
    pub initial_characters_poison: u32,
    pub max_characters_per_player: usize,
    pub max_characters_per_player_total: u32,
    pub max_waypoints: usize,
    pub num_team_colors: u8,

    pub disaster: DisasterParams,
    pub banks: BankParams,
    pub capacity: CapacityParams,
}

impl GameConfig {
    pub fn mainnet() -> Self {
        Self::with_forks(ForkHeights {
            poison: 255_000,
            carrying_cap: 500_000,
            less_hearts: 590_000,
            life_steal: 795_000,
            time_save: 1_521_500,
        })
    }

    pub fn testnet() -> Self {
        Self::with_forks(ForkHeights {
            poison: 190_000,
            carrying_cap: 200_000,
            less_hearts: 240_000,
            life_steal: 301_000,
            time_save: 331_500,
        })
    }

    pub fn regtest() -> Self {
        Self::with_forks(ForkHeights {
            poison: 500,
            carrying_cap: 600,
            less_hearts: 700,
            life_steal: 1_000,
            time_save: 1_500,
        })
    }

    /// The standard economic parameters with the given fork schedule.
    pub fn with_forks(forks: ForkHeights) -> Self {
        Self {
            forks,
            name_coin_initial: COIN,
            name_coin_poison: 10 * COIN,
            name_coin_less_hearts: 200 * COIN,
            name_coin_time_save: 100 * COIN,
            spawn_surcharge: 5 * COIN,
            destruct_fee: COIN,
            life_steal_damage: COIN,
            death_tax_divisor: 25,
            bank_tax_divisor: 10,
            max_stay_on_bank: 30,
            max_stay_on_bank_life_steal: 2,
            heart_interval: 10,
            heart_interval_less_hearts: 500,
            initial_characters: 3,
            initial_characters_poison: 1,
            max_characters_per_player: 20,
            max_characters_per_player_total: 1000,
            max_waypoints: 100,
            num_team_colors: 4,
            disaster: DisasterParams {
                min_time: 1440,
                max_time: 12 * 1440,
                probability: 10_000,
                min_life: 1,
                max_life: 50,
            },
            banks: BankParams {
                count: 75,
                min_life: 25,
                max_life: 100,
            },
            capacity: CapacityParams {
                general: 50 * COIN,
                other: 25 * COIN,
                less_hearts: 2_000 * COIN,
                life_steal: 100 * COIN,
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn fork_in_effect(&self, fork: Fork, height: i32) -> bool {
        height >= self.forks.height(fork)
    }

    pub fn is_fork_height(&self, fork: Fork, height: i32) -> bool {
        height == self.forks.height(fork)
    }

    /// Cost of a name (and the in-game value of a fresh player after the
    /// life-steal fork).
    pub fn name_coin_amount(&self, height: i32) -> Amount {
        if self.fork_in_effect(Fork::TimeSave, height) {
            self.name_coin_time_save
        } else if self.fork_in_effect(Fork::LessHearts, height) {
            self.name_coin_less_hearts
        } else if self.fork_in_effect(Fork::Poison, height) {
            self.name_coin_poison
        } else {
            self.name_coin_initial
        }
    }

    /// Number of characters a freshly spawned player starts with.
    pub fn initial_character_count(&self, height: i32) -> u32 {
        if self.fork_in_effect(Fork::Poison, height) {
            self.initial_characters_poison
        } else {
            self.initial_characters
        }
    }

    /// How many blocks a character may stand on a bank; `None` is unlimited.
    pub fn max_stay_on_bank(&self, height: i32) -> Option<u32> {
        if self.fork_in_effect(Fork::LifeSteal, height) {
            return Some(self.max_stay_on_bank_life_steal);
        }
        // Between these two forks, bank timeouts were disabled.
        if self.fork_in_effect(Fork::CarryingCap, height)
            && !self.fork_in_effect(Fork::LessHearts, height)
        {
            return None;
        }
        Some(self.max_stay_on_bank)
    }

    /// Whether a heart drops at this height.
    pub fn drop_heart(&self, height: i32) -> bool {
        if self.fork_in_effect(Fork::LifeSteal, height) {
            return false;
        }
        let interval = if self.fork_in_effect(Fork::LessHearts, height) {
            self.heart_interval_less_hearts
        } else {
            self.heart_interval
        };
        height % interval == 0
    }

    /// Loot carrying capacity; `None` is unlimited.
    pub fn carrying_capacity(
        &self,
        height: i32,
        is_general: bool,
        is_crown_holder: bool,
    ) -> Option<Amount> {
        if is_crown_holder || !self.fork_in_effect(Fork::CarryingCap, height) {
            return None;
        }
        if self.fork_in_effect(Fork::LifeSteal, height) {
            return Some(self.capacity.life_steal);
        }
        if self.fork_in_effect(Fork::LessHearts, height) {
            return Some(self.capacity.less_hearts);
        }
        Some(if is_general {
            self.capacity.general
        } else {
            self.capacity.other
        })
    }

    /// Destruct radius of a character.
    pub fn destruct_radius(&self, height: i32, is_general: bool) -> i32 {
        if is_general && !self.fork_in_effect(Fork::LessHearts, height) {
            2
        } else {
            1
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_only_in_forks() {
        let main = GameConfig::mainnet();
        let mut test = GameConfig::testnet();
        assert_ne!(main.forks, test.forks);
        test.forks = main.forks.clone();
        assert_eq!(main, test);
        assert_eq!(GameConfig::default(), main);
    }

    #[test]
    fn fork_queries() {
        let c = GameConfig::regtest();
        assert!(!c.fork_in_effect(Fork::LifeSteal, 999));
        assert!(c.fork_in_effect(Fork::LifeSteal, 1000));
        assert!(c.is_fork_height(Fork::LifeSteal, 1000));
        assert!(!c.is_fork_height(Fork::LifeSteal, 1001));
    }

    #[test]
    fn name_coin_schedule() {
        let c = GameConfig::regtest();
        assert_eq!(c.name_coin_amount(0), COIN);
        assert_eq!(c.name_coin_amount(500), 10 * COIN);
        assert_eq!(c.name_coin_amount(700), 200 * COIN);
        assert_eq!(c.name_coin_amount(1500), 100 * COIN);
    }

    #[test]
    fn bank_stay_window() {
        let c = GameConfig::regtest();
        assert_eq!(c.max_stay_on_bank(0), Some(30));
        assert_eq!(c.max_stay_on_bank(600), None);
        assert_eq!(c.max_stay_on_bank(699), None);
        assert_eq!(c.max_stay_on_bank(700), Some(30));
        assert_eq!(c.max_stay_on_bank(1000), Some(2));
    }

    #[test]
    fn heart_cadence() {
        let c = GameConfig::regtest();
        assert!(c.drop_heart(10));
        assert!(!c.drop_heart(11));
        assert!(!c.drop_heart(710));
        assert!(!c.drop_heart(1000), "life-steal fork stops hearts");

        let mut late = GameConfig::regtest();
        late.forks.life_steal = 5_000;
        assert!(late.drop_heart(1000));
        assert!(!late.drop_heart(1010));
    }

    #[test]
    fn carrying_capacity_by_era() {
        let c = GameConfig::regtest();
        assert_eq!(c.carrying_capacity(0, false, false), None);
        assert_eq!(c.carrying_capacity(600, true, false), Some(50 * COIN));
        assert_eq!(c.carrying_capacity(600, false, false), Some(25 * COIN));
        assert_eq!(c.carrying_capacity(600, false, true), None);
        assert_eq!(c.carrying_capacity(700, false, false), Some(2000 * COIN));
        assert_eq!(c.carrying_capacity(1000, true, false), Some(100 * COIN));
    }

    #[test]
    fn destruct_radius_shrinks_for_generals() {
        let c = GameConfig::regtest();
        assert_eq!(c.destruct_radius(0, true), 2);
        assert_eq!(c.destruct_radius(0, false), 1);
        assert_eq!(c.destruct_radius(700, true), 1);
    }

    #[test]
    fn json_roundtrip() {
        let c = GameConfig::with_forks(ForkHeights::all_at(3));
        let json = c.to_json().unwrap();
        let back = GameConfig::from_json(&json).unwrap();
        assert_eq!(back, c);
    }
}
