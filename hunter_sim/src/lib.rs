// hunter_sim: the deterministic world simulation of the hunter game.
//
// This crate contains the consensus rules of the game: the world state, move
// parsing and validation, combat, and the step function that turns one world
// state plus one block's moves into the next world state. It knows nothing
// about blocks, storage or networking; `hunter_chain` wires it to a chain.
//
// Module overview:
// - `step.rs`:     `perform_step`, the block-to-block transition function.
// - `state.rs`:    GameState, PlayerState, CharacterState, loot disposal on death.
// - `moves.rs`:    Move parsing (strict JSON grammar), validation, application.
// - `combat.rs`:   CharactersOnTiles: destruct attacks, parries, drawn life.
// - `movement.rs`: Straight-line stepping towards waypoints.
// - `result.rs`:   KilledByInfo and StepResult (tax, bounties, kills).
// - `loot.rs`:     Loot piles, collected loot, bounties.
// - `config.rs`:   GameConfig: fork heights and every rule constant.
// - `map.rs`:      GameMap: walkability, spawn strips, harvest areas, crown spots.
// - `rules.rs`:    Ruleset = GameConfig + GameMap, passed to everything.
// - `error.rs`:    MoveError and StepError.
// - `prng`:        Re-exported from `hunter_prng`, the block-seeded generator.
// - `types.rs`:    Coord, PlayerId, CharacterId, BlockHash, Amount.
//
// **Critical constraint: determinism.** Every node must compute the same
// state from the same inputs. All randomness comes from `GameRng` seeded with
// the block hash. No `HashMap` iteration, no floats, no system time. Use
// `BTreeMap` for anything that is iterated.

pub mod combat;
pub mod config;
pub mod error;
pub mod loot;
pub mod map;
pub mod movement;
pub mod moves;
pub use hunter_prng as prng;
pub mod result;
pub mod rules;
pub mod state;
pub mod step;
pub mod types;

#[cfg(test)]
pub(crate) mod test_util;
