// Keeps game states in step with the block chain.
//
// `StateIntegrator` owns the ruleset, the state cache and the snapshot
// store, and answers "what is the game state after block B?":
//
//   1. before genesis: the initial state.
//   2. the cache, by block hash.
//   3. the store, by block height (only if the snapshot's hash is B's).
//   4. otherwise walk back along `prev` links until one of the above hits,
//      then replay `perform_step` forward to B. Every block on the replay
//      path must be on the main chain. Snapshots at multiples of
//      `snapshot_interval` are persisted along the way.
//
// The block hooks:
// - `advance` is called when a block is connected. It computes the block's
//   state, persists it as the new tip snapshot, and erases the previous tip
//   snapshot unless that one sits on the interval. Returns the miner tax.
// - `rollback` is called when a block is disconnected and erases its
//   snapshot. The parent's state is found again through the cache or by
//   replaying from the last interval snapshot.
//
// Every computed state is checked against its block: height and hash must
// match. A mismatch means the chain and the stored states disagree.

use crate::cache::StateCache;
use crate::chain::{BlockRef, ChainView};
use crate::error::ChainError;
use crate::store::{SnapshotBackend, SnapshotStore};
use hunter_sim::result::StepResult;
use hunter_sim::rules::Ruleset;
use hunter_sim::state::GameState;
use hunter_sim::step::{perform_step, StepData};
use hunter_sim::types::{Amount, BlockHash};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegratorConfig {
    /// Heights that are a multiple of this keep their snapshot for good.
    pub snapshot_interval: u32,
    pub cache_capacity: usize,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: 2000,
            cache_capacity: 10,
        }
    }
}

pub struct StateIntegrator<B> {
    rules: Ruleset,
    config: IntegratorConfig,
    cache: StateCache,
    store: SnapshotStore<B>,
}

impl<B: SnapshotBackend> StateIntegrator<B> {
    /// Panics if the snapshot interval or the cache capacity is zero.
    pub fn new(rules: Ruleset, config: IntegratorConfig, store: SnapshotStore<B>) -> Self {
        assert!(config.snapshot_interval > 0, "snapshot interval must be positive");
        Self {
            rules,
            cache: StateCache::new(config.cache_capacity),
            config,
            store,
        }
    }

    pub fn rules(&self) -> &Ruleset {
        &self.rules
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn store(&self) -> &SnapshotStore<B> {
        &self.store
    }

    pub fn into_store(self) -> SnapshotStore<B> {
        self.store
    }

    /// The state after `block`; `None` is the state before genesis.
    pub fn get_state(
        &mut self,
        chain: &dyn ChainView,
        block: Option<&BlockHash>,
    ) -> Result<GameState, ChainError> {
        let Some(hash) = block else {
            return Ok(GameState::new(&self.rules.map));
        };
        let target = chain.block(hash).ok_or(ChainError::UnknownBlock(*hash))?;
        if let Some(state) = self.lookup(&target)? {
            return Ok(state);
        }
        if !chain.is_on_main_chain(&target.hash) {
            return Err(ChainError::NotOnMainChain(target.hash));
        }

        // Blocks to replay, newest first.
        let mut path = vec![target];
        let mut state = loop {
            let Some(prev_hash) = path[path.len() - 1].prev else {
                break GameState::new(&self.rules.map);
            };
            let prev = chain
                .block(&prev_hash)
                .ok_or(ChainError::UnknownBlock(prev_hash))?;
            if let Some(state) = self.lookup(&prev)? {
                break state;
            }
            path.push(prev);
        };

        tracing::debug!(
            from = state.height,
            to = target.height,
            "replaying game states"
        );
        for block in path.iter().rev() {
            if !chain.is_on_main_chain(&block.hash) {
                return Err(ChainError::NotOnMainChain(block.hash));
            }
            let data = chain.step_data(block, &self.rules)?;
            let (next, _) = self.step(&state, block, &data)?;
            if block.height % self.config.snapshot_interval == 0 {
                self.store.save(&next)?;
            }
            state = next;
        }

        self.cache.store(state.clone(), chain);
        Ok(state)
    }

    /// Compute and persist the state of a newly connected block. Returns the
    /// tax the block's miner collects.
    pub fn advance(
        &mut self,
        chain: &dyn ChainView,
        block: &BlockRef,
        data: &StepData,
    ) -> Result<Amount, ChainError> {
        let prior = self.get_state(chain, block.prev.as_ref())?;
        let (next, result) = self.step(&prior, block, data)?;

        self.store.save(&next)?;
        if let Some(prev_height) = block.height.checked_sub(1) {
            if prev_height % self.config.snapshot_interval != 0 {
                self.store.erase(prev_height)?;
            }
        }
        self.cache.store(next, chain);

        tracing::debug!(
            height = block.height,
            hash = %block.hash,
            tax = result.tax_amount,
            "advanced game state"
        );
        Ok(result.tax_amount)
    }

    /// Forget the snapshot of a disconnected block.
    pub fn rollback(&mut self, block: &BlockRef) -> Result<(), ChainError> {
        self.store.erase(block.height)?;
        tracing::debug!(height = block.height, hash = %block.hash, "rolled back game state");
        Ok(())
    }

    /// A cached or stored state for `block`, if it is known.
    fn lookup(&self, block: &BlockRef) -> Result<Option<GameState>, ChainError> {
        if let Some(state) = self.cache.get(&block.hash) {
            return Ok(Some(state.clone()));
        }
        match self.store.load(block.height)? {
            Some(state) if state.hash_block == block.hash => Ok(Some(state)),
            Some(state) => {
                tracing::warn!(
                    height = block.height,
                    stored = %state.hash_block,
                    wanted = %block.hash,
                    "ignoring snapshot of another branch"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn step(
        &self,
        prior: &GameState,
        block: &BlockRef,
        data: &StepData,
    ) -> Result<(GameState, StepResult), ChainError> {
        if prior.height + 1 != block.height as i32 {
            return Err(ChainError::HeightMismatch {
                hash: block.hash,
                block: block.height,
                state: prior.height + 1,
            });
        }
        if let Some(prev) = block.prev {
            if prior.hash_block != prev {
                return Err(ChainError::HashMismatch {
                    expected: prev,
                    found: prior.hash_block,
                });
            }
        }
        if data.new_hash != block.hash {
            return Err(ChainError::HashMismatch {
                expected: block.hash,
                found: data.new_hash,
            });
        }

        let (next, result) =
            perform_step(&self.rules, prior, data).map_err(|source| ChainError::Step {
                hash: block.hash,
                source,
            })?;
        if next.hash_block != block.hash {
            return Err(ChainError::HashMismatch {
                expected: block.hash,
                found: next.hash_block,
            });
        }
        Ok((next, result))
    }
}
