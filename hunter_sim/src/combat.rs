// Combat: destructs, attacks, and life drawn from victims.
//
// `CharactersOnTiles` resolves one block's destructs in three phases:
//
//   1. `apply_attacks`: every destructing character (except the crown
//      holder) attacks all characters within its radius, skipping its own
//      team. Before the life-steal fork a destruct is also lethal to the
//      destructing character itself.
//   2. `defend_mutual_attacks` (life-steal era): if A attacks B and B
//      attacks A in the same block, both attacks are dropped.
//   3. `draw_life`: before life-steal every attacked character dies. After
//      it, each attacker drains a fixed amount of the victim's value; the
//      victim dies only when its value is used up. The drained coins are
//      remembered per victim.
//
// Later in the step, once the random generator exists,
// `distribute_drawn_life` hands each victim's drained coins to its surviving
// attackers, one damage unit per attacker, picked at random without
// replacement. Whatever cannot be handed out goes to the game fund.
//
// The tile index (`Coord` -> characters) costs a pass over every live
// character, so it is only built once the first destruct is seen.
//
// **Critical constraint: determinism.** The tile index uses `FxHashMap`
// purely for lookups and is never iterated. Attack sets are `BTreeSet`s, and
// the random redistribution draws from an ordered `Vec` with `remove(i)`
// (shifting, never swap-with-last).

use crate::config::Fork;
use crate::error::StepError;
use crate::moves::Move;
use crate::prng::GameRng;
use crate::result::{KilledByInfo, StepResult};
use crate::rules::Ruleset;
use crate::state::GameState;
use crate::types::{Amount, CharacterId, Coord};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

type TileIndex = FxHashMap<Coord, SmallVec<[CharacterId; 2]>>;

#[derive(Debug, Default)]
pub struct CharactersOnTiles {
    tiles: Option<TileIndex>,
    /// Victim -> attackers.
    attackers: BTreeMap<CharacterId, BTreeSet<CharacterId>>,
    /// Victim -> coins drained from it (life-steal era).
    drawn_life: BTreeMap<CharacterId, Amount>,
}

impl CharactersOnTiles {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_index(state: &GameState) -> TileIndex {
        let mut tiles = TileIndex::default();
        for (player, p) in &state.players {
            for (&index, ch) in &p.characters {
                tiles
                    .entry(ch.coord)
                    .or_default()
                    .push(CharacterId::new(player.clone(), index));
            }
        }
        tiles
    }

    pub fn attackers(&self) -> &BTreeMap<CharacterId, BTreeSet<CharacterId>> {
        &self.attackers
    }

    pub fn drawn_life(&self) -> &BTreeMap<CharacterId, Amount> {
        &self.drawn_life
    }

    /// Record the attacks of all destructs in `moves`.
    pub fn apply_attacks(&mut self, state: &GameState, rules: &Ruleset, moves: &[Move]) {
        let config = &rules.config;
        let life_steal = config.fork_in_effect(Fork::LifeSteal, state.height);

        for mv in moves {
            let Some(player) = state.players.get(&mv.player) else {
                continue;
            };
            for index in mv.destruct() {
                let Some(ch) = player.characters.get(&index) else {
                    continue;
                };
                let attacker = CharacterId::new(mv.player.clone(), index);
                if state.crown_holder.as_ref() == Some(&attacker) {
                    continue;
                }

                let tiles = self.tiles.get_or_insert_with(|| Self::build_index(state));
                let radius = config.destruct_radius(state.height, attacker.is_general());
                for y in ch.coord.y - radius..=ch.coord.y + radius {
                    for x in ch.coord.x - radius..=ch.coord.x + radius {
                        let Some(here) = tiles.get(&Coord::new(x, y)) else {
                            continue;
                        };
                        for victim in here {
                            if *victim == attacker {
                                if !life_steal {
                                    self.attackers
                                        .entry(attacker.clone())
                                        .or_default()
                                        .insert(attacker.clone());
                                }
                                continue;
                            }
                            let same_team = state
                                .players
                                .get(&victim.player)
                                .is_some_and(|v| v.color == player.color);
                            if same_team {
                                continue;
                            }
                            self.attackers
                                .entry(victim.clone())
                                .or_default()
                                .insert(attacker.clone());
                        }
                    }
                }
            }
        }
    }

    /// Cancel attacks that were answered by the victim in the same block.
    pub fn defend_mutual_attacks(&mut self) {
        let pairs: BTreeSet<(CharacterId, CharacterId)> = self
            .attackers
            .iter()
            .flat_map(|(victim, set)| set.iter().map(move |a| (a.clone(), victim.clone())))
            .collect();

        for (victim, set) in &mut self.attackers {
            set.retain(|a| !pairs.contains(&(victim.clone(), a.clone())));
        }
        self.attackers.retain(|_, set| !set.is_empty());
    }

    /// Apply the attacks: kill victims (before life-steal) or drain their
    /// value (after), recording kills in `result`.
    pub fn draw_life(
        &mut self,
        state: &mut GameState,
        rules: &Ruleset,
        result: &mut StepResult,
    ) -> Result<(), StepError> {
        let config = &rules.config;
        let life_steal = config.fork_in_effect(Fork::LifeSteal, state.height);

        for (victim, attackers) in &self.attackers {
            let Some(first) = attackers.iter().next() else {
                continue;
            };

            if !life_steal {
                if victim.is_general() {
                    for a in attackers {
                        result.kill_player(
                            victim.player.clone(),
                            KilledByInfo::Destruct { killer: a.clone() },
                        );
                    }
                } else {
                    let info = KilledByInfo::Destruct {
                        killer: first.clone(),
                    };
                    state.handle_killed_loot(rules, &victim.player, victim.index, &info, result)?;
                    if let Some(p) = state.players.get_mut(&victim.player) {
                        p.characters.remove(&victim.index);
                    }
                }
                continue;
            }

            let damage = config.life_steal_damage;
            let player = state.players.get_mut(&victim.player).ok_or_else(|| {
                StepError::InvariantViolation(format!("attacked player {} is missing", victim.player))
            })?;
            let mut drawn = (damage * attackers.len() as Amount).min(player.value);
            player.value -= drawn;
            if player.value < damage {
                drawn += player.value;
                player.value = 0;
            }
            *self.drawn_life.entry(victim.clone()).or_default() += drawn;

            if player.value == 0 {
                for a in attackers {
                    result.kill_player(
                        victim.player.clone(),
                        KilledByInfo::Destruct { killer: a.clone() },
                    );
                }
            }
        }
        Ok(())
    }

    /// Give drained coins to surviving attackers at random.
    pub fn distribute_drawn_life(&self, rng: &mut GameRng, state: &mut GameState, rules: &Ruleset) {
        let damage = rules.config.life_steal_damage;
        for (victim, &drawn) in &self.drawn_life {
            let mut alive: Vec<&CharacterId> = self
                .attackers
                .get(victim)
                .into_iter()
                .flatten()
                .filter(|a| state.character(a).is_some())
                .collect();

            let mut remaining = drawn;
            while remaining >= damage && !alive.is_empty() {
                let winner = alive.remove(rng.next_index(alive.len()));
                if let Some(p) = state.players.get_mut(&winner.player) {
                    p.value += damage;
                    remaining -= damage;
                }
            }
            state.game_fund += remaining;
        }
    }
}
