// Shared fixtures for the integrator tests: an in-memory block tree with a
// selectable main chain, and a small map so replays stay fast.

#![allow(dead_code)]

use hunter_chain::chain::step_data_from_updates;
use hunter_chain::{
    BlockRef, ChainError, ChainView, IntegratorConfig, MemoryBackend, NameUpdate,
    SnapshotStore, StateIntegrator,
};
use hunter_sim::config::GameConfig;
use hunter_sim::map::{GameMap, HarvestArea, MapLayout};
use hunter_sim::prng::hash256;
use hunter_sim::rules::Ruleset;
use hunter_sim::step::StepData;
use hunter_sim::types::{Amount, BlockHash, Coord, COIN};
use std::collections::{BTreeMap, BTreeSet};

pub const TREASURE: Amount = 10 * COIN;

pub fn rules() -> Ruleset {
    let layout = MapLayout {
        width: 20,
        height: 20,
        spawn_area_length: 5,
        obstacles: vec![Coord::new(9, 9)],
        harvest_areas: vec![
            HarvestArea {
                portion: 50,
                tiles: vec![Coord::new(10, 12), Coord::new(11, 12), Coord::new(12, 12)],
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
    };
    Ruleset::new(GameConfig::regtest(), GameMap::new(layout).unwrap())
}

#[derive(Default)]
pub struct MemoryChain {
    blocks: BTreeMap<BlockHash, (BlockRef, Vec<NameUpdate>)>,
    main: BTreeSet<BlockHash>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block on top of `prev`. `salt` tells apart siblings.
    pub fn add_block(
        &mut self,
        prev: Option<&BlockRef>,
        salt: u8,
        updates: Vec<NameUpdate>,
    ) -> BlockRef {
        let height = prev.map_or(0, |p| p.height + 1);
        let mut seed = Vec::new();
        if let Some(p) = prev {
            seed.extend_from_slice(p.hash.as_bytes());
        }
        seed.extend_from_slice(&height.to_le_bytes());
        seed.push(salt);
        let block = BlockRef {
            hash: BlockHash(hash256(&seed)),
            prev: prev.map(|p| p.hash),
            height,
        };
        self.blocks.insert(block.hash, (block, updates));
        block
    }

    /// Add `n` empty blocks on top of `prev`.
    pub fn extend(&mut self, prev: &BlockRef, n: usize, salt: u8) -> Vec<BlockRef> {
        let mut out: Vec<BlockRef> = Vec::with_capacity(n);
        let mut tip = *prev;
        for _ in 0..n {
            tip = self.add_block(Some(&tip), salt, Vec::new());
            out.push(tip);
        }
        out
    }

    /// Make the chain ending in `tip` the main chain.
    pub fn set_main_chain(&mut self, tip: &BlockRef) {
        self.main.clear();
        let mut cur = Some(tip.hash);
        while let Some(hash) = cur {
            self.main.insert(hash);
            cur = self.blocks[&hash].0.prev;
        }
    }

    pub fn data(&self, block: &BlockRef, rules: &Ruleset) -> StepData {
        self.step_data(block, rules).unwrap()
    }
}

impl ChainView for MemoryChain {
    fn block(&self, hash: &BlockHash) -> Option<BlockRef> {
        self.blocks.get(hash).map(|(b, _)| *b)
    }

    fn is_on_main_chain(&self, hash: &BlockHash) -> bool {
        self.main.contains(hash)
    }

    fn step_data(&self, block: &BlockRef, rules: &Ruleset) -> Result<StepData, ChainError> {
        let (_, updates) = self
            .blocks
            .get(&block.hash)
            .ok_or(ChainError::UnknownBlock(block.hash))?;
        step_data_from_updates(rules, block, updates, TREASURE)
    }
}

/// A genesis block that spawns two players, and a second block moving them.
pub fn opening(chain: &mut MemoryChain) -> Vec<BlockRef> {
    let genesis = chain.add_block(
        None,
        0,
        vec![
            NameUpdate::new("alice", r#"{"color": 0}"#, COIN),
            NameUpdate::new("bob", r#"{"color": 3}"#, COIN),
        ],
    );
    let second = chain.add_block(
        Some(&genesis),
        0,
        vec![
            NameUpdate::new("alice", r#"{"0": {"wp": [10, 12]}, "1": {"wp": [6, 6]}}"#, COIN),
            NameUpdate::new("bob", r#"{"0": {"wp": [15, 15]}, "msg": "hi"}"#, COIN),
        ],
    );
    vec![genesis, second]
}

/// A main chain of `len` blocks starting with `opening`.
pub fn main_chain(chain: &mut MemoryChain, len: usize) -> Vec<BlockRef> {
    let mut blocks = opening(chain);
    let tip = blocks[blocks.len() - 1];
    blocks.extend(chain.extend(&tip, len - blocks.len(), 0));
    chain.set_main_chain(&blocks[blocks.len() - 1]);
    blocks
}

pub fn integrator(
    backend: MemoryBackend,
    snapshot_interval: u32,
    cache_capacity: usize,
) -> StateIntegrator<MemoryBackend> {
    let config = IntegratorConfig {
        snapshot_interval,
        cache_capacity,
    };
    StateIntegrator::new(rules(), config, SnapshotStore::open(backend).unwrap())
}

/// Connect `blocks` in order, returning the tax of each.
pub fn connect_all(
    integ: &mut StateIntegrator<MemoryBackend>,
    chain: &MemoryChain,
    blocks: &[BlockRef],
) -> Vec<Amount> {
    blocks
        .iter()
        .map(|b| {
            let data = chain.data(b, integ.rules());
            integ.advance(chain, b, &data).unwrap()
        })
        .collect()
}
