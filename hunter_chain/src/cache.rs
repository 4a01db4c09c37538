// Bounded in-memory cache of recent game states, keyed by block hash.
//
// Block connection usually asks for the state of the current tip, and
// reorgs ask for states a few blocks back; keeping a handful of recent
// states avoids replaying from the last snapshot each time.
//
// When full, the cache evicts states that are no longer useful first: any
// state whose block is unknown to the chain or not on the main chain. Only
// if every cached state is on the main chain does it evict the lowest one.
// Ties are broken by hash order so eviction is reproducible.

use crate::chain::ChainView;
use hunter_sim::state::GameState;
use hunter_sim::types::BlockHash;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct StateCache {
    capacity: usize,
    states: BTreeMap<BlockHash, GameState>,
}

impl StateCache {
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "state cache needs room for at least one state");
        Self {
            capacity,
            states: BTreeMap::new(),
        }
    }

    /// Insert or replace the state of its block, evicting as needed.
    pub fn store(&mut self, state: GameState, chain: &dyn ChainView) {
        let hash = state.hash_block;
        if let Some(slot) = self.states.get_mut(&hash) {
            *slot = state;
            return;
        }
        self.states.insert(hash, state);
        while self.states.len() > self.capacity {
            let Some(victim) = self.eviction_candidate(chain) else {
                break;
            };
            self.states.remove(&victim);
            tracing::trace!(hash = %victim, "evicted cached state");
        }
    }

    fn eviction_candidate(&self, chain: &dyn ChainView) -> Option<BlockHash> {
        let stale = self
            .states
            .keys()
            .find(|h| chain.block(h).is_none() || !chain.is_on_main_chain(h));
        if let Some(h) = stale {
            return Some(*h);
        }
        self.states
            .iter()
            .min_by_key(|(h, s)| (s.height, **h))
            .map(|(h, _)| *h)
    }

    pub fn get(&self, hash: &BlockHash) -> Option<&GameState> {
        self.states.get(hash)
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.states.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
