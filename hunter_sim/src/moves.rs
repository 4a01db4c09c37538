// Player moves.
//
// A `Move` is one player's action for one block, parsed from the JSON value
// of a name transaction. It is either a spawn (`{"color": 0..3}`) creating
// the player, or an update of an existing player: per-character waypoints
// and destructs, keyed by the decimal character index. Both kinds may carry
// a chat message (`msg`), a new reward address (`address`), and a new
// address lock (`addressLock`).
//
// Parsing is strict: any unrecognized field at any level rejects the move.
// Waypoint lists are flat `[x0, y0, x1, y1, ...]` arrays in travel order;
// they are stored reversed (next target last) so characters can pop them.
//
// Validation against a state (`is_valid`) checks that spawns and updates
// match player existence and that the coins newly locked in the name cover
// the height-dependent game fee. The `apply_*` methods are called by the
// step in a fixed order; they assume the move was validated.
//
// See also: `step.rs` for the order in which moves are applied, `combat.rs`
// which reads the destruct sets.

use crate::config::Fork;
use crate::error::MoveError;
use crate::prng::GameRng;
use crate::rules::Ruleset;
use crate::state::{GameState, PlayerState};
use crate::types::{Amount, Coord, PlayerId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Length bounds of a base58 address string.
const ADDRESS_MIN_LEN: usize = 26;
const ADDRESS_MAX_LEN: usize = 35;
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Whether `address` looks like a base58 address. The empty string is
/// accepted and means "reset to the default".
pub fn is_valid_address(address: &str) -> bool {
    address.is_empty()
        || ((ADDRESS_MIN_LEN..=ADDRESS_MAX_LEN).contains(&address.len())
            && address.chars().all(|c| BASE58_ALPHABET.contains(c)))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveAction {
    Spawn {
        color: u8,
    },
    Update {
        /// New waypoint queues by character index, next target last.
        waypoints: BTreeMap<u32, Vec<Coord>>,
        destruct: BTreeSet<u32>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub player: PlayerId,
    pub action: MoveAction,
    pub message: Option<String>,
    pub address: Option<String>,
    pub address_lock: Option<String>,
    /// Coins locked in the name output after this move's transaction.
    pub new_locked: Amount,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn string_field(key: &str, v: &Value) -> Result<String, MoveError> {
    v.as_str()
        .map(str::to_owned)
        .ok_or_else(|| MoveError::WrongType(key.to_owned()))
}

fn parse_character_index(key: &str) -> Result<u32, MoveError> {
    match key.parse::<u32>() {
        Ok(i) if i.to_string() == key => Ok(i),
        _ => Err(MoveError::InvalidCharacterIndex(key.to_owned())),
    }
}

fn parse_waypoints(v: &Value, rules: &Ruleset) -> Result<Vec<Coord>, MoveError> {
    let arr = v
        .as_array()
        .ok_or_else(|| MoveError::WrongType("wp".to_owned()))?;
    if arr.len() % 2 != 0 {
        return Err(MoveError::InvalidWaypoints("odd number of coordinates"));
    }
    if arr.len() / 2 > rules.config.max_waypoints {
        return Err(MoveError::InvalidWaypoints("too many waypoints"));
    }
    let mut out: Vec<Coord> = Vec::with_capacity(arr.len() / 2);
    for pair in arr.chunks(2) {
        let coord = |v: &Value| {
            v.as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| MoveError::WrongType("wp".to_owned()))
        };
        let c = Coord::new(coord(&pair[0])?, coord(&pair[1])?);
        if !rules.map.in_bounds(c) {
            return Err(MoveError::InvalidWaypoints("coordinate outside the map"));
        }
        if out.last() == Some(&c) {
            return Err(MoveError::InvalidWaypoints("consecutive duplicate waypoints"));
        }
        out.push(c);
    }
    out.reverse();
    Ok(out)
}

impl Move {
    /// Parse the JSON value of `player`'s name transaction.
    pub fn parse(
        player: &str,
        json: &str,
        new_locked: Amount,
        rules: &Ruleset,
    ) -> Result<Move, MoveError> {
        if !PlayerId::is_valid_name(player) {
            return Err(MoveError::InvalidPlayerName(player.to_owned()));
        }
        let Value::Object(obj) = serde_json::from_str::<Value>(json)? else {
            return Err(MoveError::NotAnObject);
        };

        let mut mv = Move {
            player: PlayerId::new(player),
            action: MoveAction::Spawn { color: 0 },
            message: None,
            address: None,
            address_lock: None,
            new_locked,
        };

        let is_spawn = obj.contains_key("color");
        let mut waypoints = BTreeMap::new();
        let mut destruct = BTreeSet::new();

        for (key, v) in &obj {
            match key.as_str() {
                "msg" => mv.message = Some(string_field(key, v)?),
                "address" => mv.address = Some(string_field(key, v)?),
                "addressLock" => mv.address_lock = Some(string_field(key, v)?),
                "color" => {
                    let color = v
                        .as_i64()
                        .ok_or_else(|| MoveError::WrongType(key.clone()))?;
                    if color < 0 || color >= i64::from(rules.config.num_team_colors) {
                        return Err(MoveError::InvalidColor(color));
                    }
                    mv.action = MoveAction::Spawn { color: color as u8 };
                }
                _ if is_spawn => return Err(MoveError::UnknownField(key.clone())),
                _ => {
                    let index = parse_character_index(key)?;
                    let sub: &Map<String, Value> = v
                        .as_object()
                        .ok_or_else(|| MoveError::WrongType(key.clone()))?;
                    for (sub_key, sv) in sub {
                        match sub_key.as_str() {
                            "wp" => {
                                waypoints.insert(index, parse_waypoints(sv, rules)?);
                            }
                            "destruct" => {
                                let d = sv
                                    .as_bool()
                                    .ok_or_else(|| MoveError::WrongType(sub_key.clone()))?;
                                if d {
                                    destruct.insert(index);
                                }
                            }
                            _ => return Err(MoveError::UnknownField(sub_key.clone())),
                        }
                    }
                }
            }
        }

        for addr in [&mv.address, &mv.address_lock].into_iter().flatten() {
            if !is_valid_address(addr) {
                return Err(MoveError::InvalidAddress(addr.clone()));
            }
        }

        if !is_spawn {
            mv.action = MoveAction::Update {
                waypoints,
                destruct,
            };
        }
        Ok(mv)
    }

    pub fn is_spawn(&self) -> bool {
        matches!(self.action, MoveAction::Spawn { .. })
    }

    /// Character indices that destruct in this move.
    pub fn destruct(&self) -> impl Iterator<Item = u32> + '_ {
        match &self.action {
            MoveAction::Update { destruct, .. } => Some(destruct.iter().copied()),
            MoveAction::Spawn { .. } => None,
        }
        .into_iter()
        .flatten()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Minimum game fee for this move taking effect at `height`.
    pub fn minimum_game_fee(&self, rules: &Ruleset, height: i32) -> Amount {
        let config = &rules.config;
        match &self.action {
            MoveAction::Spawn { .. } => {
                let mut fee = config.name_coin_amount(height);
                if config.fork_in_effect(Fork::TimeSave, height) {
                    fee += config.spawn_surcharge;
                }
                fee
            }
            MoveAction::Update { destruct, .. } => {
                if config.fork_in_effect(Fork::LifeSteal, height) {
                    config.destruct_fee * destruct.len() as Amount
                } else {
                    0
                }
            }
        }
    }

    /// Check the move against the state it will be applied to. Rules that
    /// depend on forks use the height of the next block.
    pub fn is_valid(&self, state: &GameState, rules: &Ruleset) -> Result<(), MoveError> {
        let height = state.height + 1;
        let old_locked = match (state.players.get(&self.player), &self.action) {
            (None, MoveAction::Spawn { .. }) => 0,
            (None, MoveAction::Update { .. }) => {
                return Err(MoveError::UnknownPlayer(self.player.clone()));
            }
            (Some(_), MoveAction::Spawn { .. }) => {
                return Err(MoveError::SpawnForExistingPlayer(self.player.clone()));
            }
            (Some(p), MoveAction::Update { .. }) => p.locked_coins,
        };

        let paid = self.new_locked - old_locked;
        let required = self.minimum_game_fee(rules, height);
        if paid < required {
            return Err(MoveError::InsufficientFee { paid, required });
        }

        if rules.config.fork_in_effect(Fork::LifeSteal, height) {
            return Ok(());
        }
        if let MoveAction::Update {
            waypoints,
            destruct,
        } = &self.action
        {
            if let Some(&i) = destruct.iter().find(|i| waypoints.contains_key(i)) {
                return Err(MoveError::WaypointsWithDestruct(i));
            }
        }
        Ok(())
    }

    /// The address that must sign a move changing `address` or
    /// `addressLock`, if any.
    pub fn address_operation_permission<'a>(&self, state: &'a GameState) -> Option<&'a str> {
        if self.is_spawn() || (self.address.is_none() && self.address_lock.is_none()) {
            return None;
        }
        let lock = &state.players.get(&self.player)?.address_lock;
        (!lock.is_empty()).then_some(lock.as_str())
    }

    // -----------------------------------------------------------------------
    // Application
    // -----------------------------------------------------------------------

    /// Create the player of a spawn move with its initial characters.
    pub fn apply_spawn(&self, state: &mut GameState, rules: &Ruleset, rng: &mut GameRng) {
        let MoveAction::Spawn { color } = self.action else {
            return;
        };
        let config = &rules.config;
        let height = state.height;
        let mut player = PlayerState::new(color);
        player.locked_coins = self.new_locked;
        if config.fork_in_effect(Fork::LifeSteal, height) {
            let coin = config.name_coin_amount(height);
            player.value = coin;
            state.game_fund += self.new_locked - coin;
        } else {
            player.value = self.new_locked;
        }
        for _ in 0..config.initial_character_count(height) {
            player.spawn_character(rules, height, rng);
        }
        state.players.insert(self.player.clone(), player);
    }

    /// Replace the waypoint queues of the player's surviving characters.
    ///
    /// The straight-line anchor is kept only when both the old and the new
    /// queue are non-empty and head for the same next target.
    pub fn apply_waypoints(&self, state: &mut GameState) {
        let MoveAction::Update { waypoints, .. } = &self.action else {
            return;
        };
        let Some(player) = state.players.get_mut(&self.player) else {
            return;
        };
        for (index, wp) in waypoints {
            let Some(ch) = player.characters.get_mut(index) else {
                continue;
            };
            if ch.waypoints.is_empty() || wp.is_empty() || ch.waypoints.last() != wp.last() {
                ch.from = ch.coord;
            }
            ch.waypoints = wp.clone();
        }
    }

    /// Apply message and address changes. Messages of players that died in
    /// this step go to the ghost chat map.
    pub fn apply_common(&self, state: &mut GameState) {
        let height = state.height;
        let Some(player) = state.players.get_mut(&self.player) else {
            if let Some(msg) = &self.message {
                let ghost = state
                    .dead_players_chat
                    .entry(self.player.clone())
                    .or_insert_with(|| PlayerState::new(0));
                ghost.message = msg.clone();
                ghost.message_block = height;
            }
            return;
        };
        if let Some(msg) = &self.message {
            player.message = msg.clone();
            player.message_block = height;
        }
        if let Some(address) = &self.address {
            player.address = address.clone();
        }
        if let Some(lock) = &self.address_lock {
            player.address_lock = lock.clone();
        }
    }
}
