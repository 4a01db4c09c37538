// Benchmark of `perform_step` on the standard map.
//
// Builds a world with a few dozen players walking and destructing, then
// measures single steps in the classic era and in the life-steal era (where
// every step also ages and refills the dynamic banks).

use criterion::{criterion_group, criterion_main, Criterion};
use hunter_sim::config::{ForkHeights, GameConfig};
use hunter_sim::map::GameMap;
use hunter_sim::moves::Move;
use hunter_sim::rules::Ruleset;
use hunter_sim::state::GameState;
use hunter_sim::step::{perform_step, StepData};
use hunter_sim::types::{BlockHash, COIN};
use std::hint::black_box;

const PLAYERS: u32 = 40;

fn hash(n: u32) -> BlockHash {
    let mut h = [0x33; 32];
    h[..4].copy_from_slice(&n.to_le_bytes());
    BlockHash(h)
}

fn populated_world(rules: &Ruleset) -> GameState {
    let mut state = GameState::new(&rules.map);
    let spawns = (0..PLAYERS)
        .map(|i| {
            let json = format!(r#"{{"color": {}}}"#, i % 4);
            Move::parse(&format!("p{i}"), &json, 200 * COIN, rules).unwrap()
        })
        .collect();
    let data = StepData {
        moves: spawns,
        new_hash: hash(0),
        treasure: 100 * COIN,
    };
    state = perform_step(rules, &state, &data).unwrap().0;

    for n in 1..20 {
        let moves = state
            .players
            .iter()
            .map(|(id, p)| {
                let x = 20 + (n * 13 + p.color as u32 * 31) % 400;
                let y = 20 + (n * 7 + id.as_str().len() as u32 * 17) % 400;
                let json = format!(r#"{{"0": {{"wp": [{x}, {y}]}}}}"#);
                Move::parse(id.as_str(), &json, p.locked_coins, rules).unwrap()
            })
            .collect();
        let data = StepData {
            moves,
            new_hash: hash(n),
            treasure: 100 * COIN,
        };
        state = perform_step(rules, &state, &data).unwrap().0;
    }
    state
}

fn bench_step(c: &mut Criterion, name: &str, forks: ForkHeights) {
    let rules = Ruleset::new(GameConfig::with_forks(forks), GameMap::standard());
    let state = populated_world(&rules);
    let data = StepData {
        moves: Vec::new(),
        new_hash: hash(1000),
        treasure: 100 * COIN,
    };
    c.bench_function(name, |b| {
        b.iter(|| perform_step(black_box(&rules), black_box(&state), black_box(&data)).unwrap())
    });
}

fn step_classic(c: &mut Criterion) {
    bench_step(c, "step_classic", ForkHeights::all_at(1_000_000));
}

fn step_life_steal(c: &mut Criterion) {
    bench_step(c, "step_life_steal", ForkHeights::all_at(5));
}

criterion_group!(benches, step_classic, step_life_steal);
criterion_main!(benches);
