// Small deterministic fixtures for unit tests.

use crate::config::GameConfig;
use crate::map::{GameMap, HarvestArea, MapLayout};
use crate::rules::Ruleset;
use crate::state::{CharacterState, GameState, PlayerState};
use crate::types::{Amount, Coord, PlayerId};

/// A 20x20 open map with 5-tile spawn strips and two harvest areas.
pub fn small_layout() -> MapLayout {
    MapLayout {
        width: 20,
        height: 20,
        spawn_area_length: 5,
        obstacles: Vec::new(),
        harvest_areas: vec![
            HarvestArea {
                portion: 50,
                tiles: vec![Coord::new(10, 12), Coord::new(11, 12)],
            },
            HarvestArea {
                portion: 25,
                tiles: vec![Coord::new(15, 15)],
            },
        ],
        crown_bonus_portion: 25,
        total_harvest: 100,
        crown_start: Coord::new(10, 10),
        crown_spawns: vec![Coord::new(10, 10), Coord::new(12, 10)],
    }
}

pub fn small_rules(config: GameConfig) -> Ruleset {
    Ruleset::new(config, GameMap::new(small_layout()).unwrap())
}

/// Insert a player whose locked coins and value are both `value`, with one
/// character per coordinate (index 0 is the general).
pub fn add_player(
    state: &mut GameState,
    name: &str,
    color: u8,
    value: Amount,
    coords: &[Coord],
) -> PlayerId {
    let mut p = PlayerState::new(color);
    p.locked_coins = value;
    p.value = value;
    for (i, &c) in coords.iter().enumerate() {
        p.characters.insert(i as u32, CharacterState::new(c, 2));
    }
    p.next_character_index = coords.len() as u32;
    let id = PlayerId::from(name);
    state.players.insert(id.clone(), p);
    id
}
