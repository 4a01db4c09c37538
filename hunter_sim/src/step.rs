// The block-to-block transition function.
//
// `perform_step` takes the state after block N, the moves of block N+1, the
// hash of block N+1 and the treasure minted with it, and returns the state
// after block N+1 together with the `StepResult` (miner tax, bounties and
// refunds to pay out, killed players). It is a pure function of its inputs;
// the prior state is never modified.
//
// The phases run in a fixed order, and the order is consensus:
//
//   1. bookkeeping: height, hash, game fees into the fund
//   2. combat (attacks, parries, drawn life) and bank timeouts
//   3. poison countdowns, removal of killed players, heart removal at the
//      life-steal fork
//   4. waypoints and one movement step for every character
//   5. crown tracking and banking
//   -- an all-zero hash returns here: the tax is known, which is all a miner
//      previewing a block needs
//   6. seed the generator from the hash; disaster, life redistribution,
//      spawns, messages and addresses
//   7. treasure, loot pickup, crown bonus
//   8. banks, hearts, crown pickup
//   9. invariants and the coin conservation check
//
// Every random draw comes from the block's `GameRng`, and the number and
// order of draws depends only on the state and the moves, so all nodes agree.
//
// See also: `combat.rs` for the destruct resolution, `state.rs` for the
// death loot policy (`handle_killed_loot`), `moves.rs` for move validation.
//
// **Critical constraint: determinism.** Moves are sorted by player before
// anything is applied, so the order in which a caller supplies them does not
// matter. Never iterate a hash-based collection here.

use crate::combat::CharactersOnTiles;
use crate::config::Fork;
use crate::error::StepError;
use crate::loot::{CollectedBounty, LootInfo};
use crate::moves::Move;
use crate::prng::GameRng;
use crate::result::{KilledByInfo, StepResult};
use crate::rules::Ruleset;
use crate::state::GameState;
use crate::types::{Amount, BlockHash, CharacterId, Coord, PlayerId};
use std::collections::BTreeMap;

/// Inputs of one step besides the prior state.
#[derive(Clone, Debug, Default)]
pub struct StepData {
    pub moves: Vec<Move>,
    /// Hash of the block being connected; all-zero to only compute the tax.
    pub new_hash: BlockHash,
    /// Coins minted into the harvest areas and the crown bonus.
    pub treasure: Amount,
}

/// Compute the state after the block described by `data`.
pub fn perform_step(
    rules: &Ruleset,
    prior: &GameState,
    data: &StepData,
) -> Result<(GameState, StepResult), StepError> {
    let moves = canonical_moves(rules, prior, &data.moves)?;
    let config = &rules.config;

    let mut state = prior.clone();
    state.height += 1;
    state.hash_block = data.new_hash;
    state.dead_players_chat.clear();
    let height = state.height;
    let life_steal = config.fork_in_effect(Fork::LifeSteal, height);
    let mut result = StepResult::default();

    // Game fees go into the fund; spawned names bring their locked coins.
    let mut money_in: Amount = 0;
    for mv in &moves {
        if mv.is_spawn() {
            money_in += mv.new_locked;
            continue;
        }
        let player = state
            .players
            .get_mut(&mv.player)
            .ok_or_else(|| StepError::InvariantViolation(format!("moving player {} is missing", mv.player)))?;
        let fee = mv.new_locked - player.locked_coins;
        state.game_fund += fee;
        player.locked_coins = mv.new_locked;
        money_in += fee;
    }

    let mut combat = CharactersOnTiles::new();
    combat.apply_attacks(&state, rules, &moves);
    if life_steal {
        combat.defend_mutual_attacks();
    }
    combat.draw_life(&mut state, rules, &mut result)?;

    kill_spawn_area(&mut state, rules, &mut result)?;
    decrement_life(&mut state, &mut result);
    finalize_kills(&mut state, rules, &mut result)?;
    if config.is_fork_height(Fork::LifeSteal, height) {
        remove_hearted_characters(&mut state, rules, &mut result)?;
    }

    for mv in moves.iter().filter(|m| !m.is_spawn()) {
        mv.apply_waypoints(&mut state);
    }
    for player in state.players.values_mut() {
        for ch in player.characters.values_mut() {
            ch.move_towards_waypoint(&rules.map);
        }
    }

    let respawn_crown = update_crown_state(&mut state);
    bank_loot(&mut state, rules, &mut result);

    if data.new_hash.is_zero() {
        return Ok((state, result));
    }

    let mut rng = GameRng::new(data.new_hash.as_bytes());

    if check_for_disaster(&state, rules, &mut rng) {
        apply_disaster(&mut state, rules, &mut rng);
    }
    if life_steal {
        combat.distribute_drawn_life(&mut rng, &mut state, rules);
    }

    for mv in moves.iter().filter(|m| m.is_spawn()) {
        mv.apply_spawn(&mut state, rules, &mut rng);
    }
    for mv in &moves {
        mv.apply_common(&mut state);
    }
    for bounty in &mut result.bounties {
        bounty.update_address(&state);
    }
    for (id, ghost) in &mut state.dead_players_chat {
        if let Some(p) = prior.players.get(id) {
            ghost.color = p.color;
        }
    }

    let crown_bonus = drop_treasure(&mut state, rules, data.treasure, &mut rng)?;
    divide_loot_among_players(&mut state, rules);
    pay_crown_bonus(&mut state, rules, crown_bonus);

    update_banks(&mut state, rules, &mut rng);
    if config.drop_heart(height) {
        drop_heart(&mut state, rules, &mut rng);
    }
    collect_hearts(&mut state, rules, &mut rng);
    collect_crown(&mut state, rules, respawn_crown, &mut rng);

    state
        .check_invariants(rules)
        .map_err(StepError::InvariantViolation)?;

    let total_in = prior.coins_on_map() + prior.game_fund + data.treasure + money_in;
    let total_out =
        state.coins_on_map() + state.game_fund + result.tax_amount + result.bounty_total();
    if total_in != total_out {
        tracing::error!(
            height,
            total_in,
            total_out,
            "coin conservation violated"
        );
        return Err(StepError::BalanceMismatch {
            money_in: total_in,
            money_out: total_out,
        });
    }

    tracing::trace!(
        height,
        players = state.players.len(),
        tax = result.tax_amount,
        bounties = result.bounties.len(),
        "step done"
    );
    Ok((state, result))
}

/// Validate all moves against the prior state and sort them by player.
fn canonical_moves(
    rules: &Ruleset,
    prior: &GameState,
    moves: &[Move],
) -> Result<Vec<Move>, StepError> {
    for mv in moves {
        mv.is_valid(prior, rules)
            .map_err(|source| StepError::InvalidMove {
                player: mv.player.clone(),
                source,
            })?;
    }
    let mut sorted = moves.to_vec();
    sorted.sort_by(|a, b| a.player.cmp(&b.player));
    if let Some(pair) = sorted.windows(2).find(|w| w[0].player == w[1].player) {
        return Err(StepError::DuplicateMove(pair[0].player.clone()));
    }
    Ok(sorted)
}

// ---------------------------------------------------------------------------
// Deaths
// ---------------------------------------------------------------------------

/// Kill characters that stayed on a bank for too long. The stay counters
/// are kept up to date even while there is no limit.
fn kill_spawn_area(
    state: &mut GameState,
    rules: &Ruleset,
    result: &mut StepResult,
) -> Result<(), StepError> {
    let max_stay = rules.config.max_stay_on_bank(state.height);

    let mut timed_out: Vec<(PlayerId, u32)> = Vec::new();
    for (id, player) in &mut state.players {
        for (&index, ch) in &mut player.characters {
            if !state.banks.contains_key(&ch.coord) {
                ch.stay_in_spawn_area = 0;
                continue;
            }
            match max_stay {
                Some(max) if ch.stay_in_spawn_area >= max => {
                    timed_out.push((id.clone(), index));
                }
                _ => ch.stay_in_spawn_area += 1,
            }
        }
    }

    for (id, index) in timed_out {
        let info = KilledByInfo::SpawnTimeout;
        state.handle_killed_loot(rules, &id, index, &info, result)?;
        if index == 0 {
            result.kill_player(id.clone(), info);
        }
        if let Some(p) = state.players.get_mut(&id) {
            p.characters.remove(&index);
        }
    }
    Ok(())
}

fn decrement_life(state: &mut GameState, result: &mut StepResult) {
    for (id, player) in &mut state.players {
        if player.remaining_life <= 0 {
            continue;
        }
        player.remaining_life -= 1;
        if player.remaining_life == 0 {
            result.kill_player(id.clone(), KilledByInfo::Poison);
        }
    }
}

/// Dispose of the characters of every killed player and remove the player.
fn finalize_kills(
    state: &mut GameState,
    rules: &Ruleset,
    result: &mut StepResult,
) -> Result<(), StepError> {
    let victims: Vec<(PlayerId, KilledByInfo)> = result
        .killed_players()
        .filter_map(|id| Some((id.clone(), result.primary_killer(id)?.clone())))
        .collect();

    for (victim, info) in victims {
        let Some(player) = state.players.get(&victim) else {
            continue;
        };
        let indices: Vec<u32> = player.characters.keys().copied().collect();
        for index in indices {
            state.handle_killed_loot(rules, &victim, index, &info, result)?;
        }
        state.players.remove(&victim);
    }
    Ok(())
}

/// At the life-steal fork every character except the generals dies and the
/// hearts disappear.
fn remove_hearted_characters(
    state: &mut GameState,
    rules: &Ruleset,
    result: &mut StepResult,
) -> Result<(), StepError> {
    state.hearts.clear();

    let hearted: Vec<(PlayerId, u32)> = state
        .players
        .iter()
        .flat_map(|(id, p)| {
            p.characters
                .keys()
                .filter(|&&i| i != 0)
                .map(move |&i| (id.clone(), i))
        })
        .collect();
    tracing::debug!(
        height = state.height,
        count = hearted.len(),
        "removing hearted characters"
    );

    for (id, index) in hearted {
        state.handle_killed_loot(rules, &id, index, &KilledByInfo::Poison, result)?;
        if let Some(p) = state.players.get_mut(&id) {
            p.characters.remove(&index);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Crown and banking
// ---------------------------------------------------------------------------

/// Move the crown with its holder, or drop it. Returns whether the crown must
/// respawn at one of the fixed locations (its holder entered a bank).
fn update_crown_state(state: &mut GameState) -> bool {
    let Some(holder) = state.crown_holder.clone() else {
        return false;
    };
    let Some(coord) = state.character(&holder).map(|ch| ch.coord) else {
        state.crown_holder = None;
        return false;
    };
    state.crown_pos = coord;
    if state.is_bank(coord) {
        state.crown_holder = None;
        return true;
    }
    false
}

/// Characters on a bank tile cash in their loot, minus the bank tax.
fn bank_loot(state: &mut GameState, rules: &Ruleset, result: &mut StepResult) {
    for (id, player) in &mut state.players {
        for (&index, ch) in &mut player.characters {
            if !state.banks.contains_key(&ch.coord) || ch.loot.amount <= 0 {
                continue;
            }
            let mut loot = std::mem::take(&mut ch.loot);
            let tax = loot.amount / rules.config.bank_tax_divisor;
            result.tax_amount += tax;
            loot.amount -= tax;
            result.bounties.push(CollectedBounty::new(
                CharacterId::new(id.clone(), index),
                loot,
                player.address.clone(),
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Disasters
// ---------------------------------------------------------------------------

fn check_for_disaster(state: &GameState, rules: &Ruleset, rng: &mut GameRng) -> bool {
    let config = &rules.config;
    if !config.fork_in_effect(Fork::Poison, state.height) {
        return false;
    }
    let dist = state.height - state.disaster_height;
    if dist < config.disaster.min_time {
        return false;
    }
    if dist >= config.disaster.max_time {
        return true;
    }
    rng.next_int(config.disaster.probability) == 0
}

/// Poison every player and reset the disaster clock.
fn apply_disaster(state: &mut GameState, rules: &Ruleset, rng: &mut GameRng) {
    let params = &rules.config.disaster;
    for player in state.players.values_mut() {
        player.remaining_life = rng.next_range(params.min_life, params.max_life);
    }
    if rules.config.fork_in_effect(Fork::LessHearts, state.height) {
        state.hearts.clear();
    }
    state.disaster_height = state.height;
    tracing::debug!(
        height = state.height,
        players = state.players.len(),
        "disaster struck"
    );
}

// ---------------------------------------------------------------------------
// Treasure and loot
// ---------------------------------------------------------------------------

/// Drop the harvest shares of `treasure` on one random tile of each harvest
/// area. Returns the crown bonus share.
fn drop_treasure(
    state: &mut GameState,
    rules: &Ruleset,
    treasure: Amount,
    rng: &mut GameRng,
) -> Result<Amount, StepError> {
    let map = &rules.map;
    let share = |portion: i64| (i128::from(treasure) * i128::from(portion) / i128::from(map.total_harvest())) as Amount;

    let shares: Vec<Amount> = map.harvest_areas().iter().map(|a| share(a.portion)).collect();
    let crown_bonus = share(map.crown_bonus_portion());
    if shares.iter().sum::<Amount>() + crown_bonus != treasure {
        return Err(StepError::TreasureSplit(treasure));
    }

    for (area, amount) in map.harvest_areas().iter().zip(shares) {
        let tile = area.tiles[rng.next_index(area.tiles.len())];
        state.add_loot(tile, amount);
    }
    Ok(crown_bonus)
}

/// Characters standing on loot pick up equal shares of it, those with the
/// least free capacity first.
fn divide_loot_among_players(state: &mut GameState, rules: &Ruleset) {
    let mut on_tile: BTreeMap<Coord, usize> = BTreeMap::new();
    // (unlimited, free capacity, character)
    let mut collectors: Vec<(bool, Amount, CharacterId)> = Vec::new();
    for (id, player) in &state.players {
        for (&index, ch) in &player.characters {
            if state.is_bank(ch.coord) || !state.loot.contains_key(&ch.coord) {
                continue;
            }
            *on_tile.entry(ch.coord).or_default() += 1;
            let cid = CharacterId::new(id.clone(), index);
            let free = state
                .carrying_capacity(rules, &cid)
                .map(|cap| (cap - ch.loot.amount).max(0));
            collectors.push((free.is_none(), free.unwrap_or(0), cid));
        }
    }
    collectors.sort();

    let height = state.height;
    for (_, _, cid) in collectors {
        let capacity = state.carrying_capacity(rules, &cid);
        let Some(coord) = state.character(&cid).map(|ch| ch.coord) else {
            continue;
        };
        let Some(count) = on_tile.get_mut(&coord) else {
            continue;
        };
        let n = *count as Amount;
        *count -= 1;
        let Some(mut share) = state.loot.get(&coord).cloned() else {
            continue;
        };
        share.amount /= n;
        let taken = share.amount;

        let Some(ch) = state
            .players
            .get_mut(&cid.player)
            .and_then(|p| p.characters.get_mut(&cid.index))
        else {
            continue;
        };
        let rem = ch.collect_loot(share, height, capacity);
        state.add_loot(coord, rem - taken);
    }
}

fn pay_crown_bonus(state: &mut GameState, rules: &Ruleset, bonus: Amount) {
    let height = state.height;
    let Some(holder) = state.crown_holder.clone() else {
        state.game_fund += bonus;
        return;
    };
    let capacity = state.carrying_capacity(rules, &holder);
    let rem = match state
        .players
        .get_mut(&holder.player)
        .and_then(|p| p.characters.get_mut(&holder.index))
    {
        Some(ch) => ch.collect_loot(LootInfo::new(bonus, height), height, capacity),
        None => bonus,
    };
    // What the holder cannot carry goes to the fund, not the map.
    state.game_fund += rem;
}

// ---------------------------------------------------------------------------
// Banks, hearts, crown
// ---------------------------------------------------------------------------

/// Age the dynamic banks and refill them to the configured count.
fn update_banks(state: &mut GameState, rules: &Ruleset, rng: &mut GameRng) {
    let config = &rules.config;
    if !config.fork_in_effect(Fork::LifeSteal, state.height) {
        return;
    }

    let mut banks: BTreeMap<Coord, u32> = BTreeMap::new();
    if config.is_fork_height(Fork::LifeSteal, state.height) {
        tracing::debug!(height = state.height, "replacing the legacy banks");
    } else {
        for (&c, &life) in &state.banks {
            if life > 1 {
                banks.insert(c, life - 1);
            }
        }
    }

    let mut options: Vec<Coord> = rules
        .map
        .walkable_tiles()
        .iter()
        .copied()
        .filter(|c| !banks.contains_key(c))
        .collect();
    let params = &config.banks;
    while banks.len() < params.count && !options.is_empty() {
        let index = rng.next_index(options.len());
        let life = rng.next_range(params.min_life as i32, params.max_life as i32) as u32;
        // Ordered removal: the position of every remaining option matters.
        let c = options.remove(index);
        banks.insert(c, life);
    }
    state.banks = banks;
}

fn drop_heart(state: &mut GameState, rules: &Ruleset, rng: &mut GameRng) {
    let map = &rules.map;
    loop {
        let x = rng.next_int(map.width() as u32) as i32;
        let y = rng.next_int(map.height() as u32) as i32;
        let c = Coord::new(x, y);
        if map.is_walkable(c) && !map.is_original_spawn_area(c) {
            state.hearts.insert(c);
            return;
        }
    }
}

/// Players standing on a heart get a new character; on a crowded heart one
/// eligible player is drawn.
fn collect_hearts(state: &mut GameState, rules: &Ruleset, rng: &mut GameRng) {
    if state.hearts.is_empty() {
        return;
    }
    let mut on_heart: BTreeMap<Coord, Vec<PlayerId>> = BTreeMap::new();
    for (id, player) in &state.players {
        if !player.can_spawn_character(rules) {
            continue;
        }
        for ch in player.characters.values() {
            if state.hearts.contains(&ch.coord) {
                on_heart.entry(ch.coord).or_default().push(id.clone());
            }
        }
    }

    let height = state.height;
    for (coord, mut candidates) in on_heart {
        while !candidates.is_empty() {
            let i = if candidates.len() == 1 {
                0
            } else {
                rng.next_index(candidates.len())
            };
            let Some(player) = state.players.get_mut(&candidates[i]) else {
                candidates.remove(i);
                continue;
            };
            if !player.can_spawn_character(rules) {
                candidates.remove(i);
                continue;
            }
            player.spawn_character(rules, height, rng);
            state.hearts.remove(&coord);
            break;
        }
    }
}

/// Hand an unheld crown to a character on its tile, respawning it first if
/// its last holder banked.
fn collect_crown(state: &mut GameState, rules: &Ruleset, respawn: bool, rng: &mut GameRng) {
    if state.crown_holder.is_some() {
        return;
    }
    if respawn {
        let spawns = rules.map.crown_spawns();
        state.crown_pos = spawns[rng.next_index(spawns.len())];
        tracing::debug!(height = state.height, pos = %state.crown_pos, "crown respawned");
    }

    let pos = state.crown_pos;
    let on_tile: Vec<CharacterId> = state
        .players
        .iter()
        .flat_map(|(id, p)| {
            p.characters
                .iter()
                .filter(move |(_, ch)| ch.coord == pos)
                .map(move |(&i, _)| CharacterId::new(id.clone(), i))
        })
        .collect();
    let i = match on_tile.len() {
        0 => return,
        1 => 0,
        n => rng.next_index(n),
    };
    state.crown_holder = on_tile.into_iter().nth(i);
}
