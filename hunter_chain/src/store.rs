// Durable game state snapshots.
//
// One record per block height: the full `GameState` of the main-chain block
// at that height. Not every height is kept; the integrator decides which
// snapshots to retain (see `integrator.rs`). The storage engine is reached
// through `SnapshotBackend`; `MemoryBackend` is the in-process version used
// by tests and tools.
//
// Record format and schema versions:
// - version 3 (current): bincode-encoded `GameState`.
// - version 2: JSON-encoded `GameState`. Upgraded in place on open.
// - below 2, or records without any version: incompatible; the store is
//   wiped and states are rebuilt by replaying the chain.
// A version newer than this software is refused.

use crate::error::StoreError;
use hunter_sim::state::GameState;
use std::collections::BTreeMap;

pub const CURRENT_VERSION: u32 = 3;
pub const LAST_INCOMPATIBLE_VERSION: u32 = 2;

/// Height-keyed byte storage with a schema version marker.
pub trait SnapshotBackend {
    fn get(&self, height: u32) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&mut self, height: u32, bytes: Vec<u8>) -> Result<(), StoreError>;
    fn delete(&mut self, height: u32) -> Result<(), StoreError>;
    /// All stored heights, ascending.
    fn heights(&self) -> Result<Vec<u32>, StoreError>;
    fn schema_version(&self) -> Result<Option<u32>, StoreError>;
    fn set_schema_version(&mut self, version: u32) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    records: BTreeMap<u32, Vec<u8>>,
    version: Option<u32>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotBackend for MemoryBackend {
    fn get(&self, height: u32) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.records.get(&height).cloned())
    }

    fn put(&mut self, height: u32, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.records.insert(height, bytes);
        Ok(())
    }

    fn delete(&mut self, height: u32) -> Result<(), StoreError> {
        self.records.remove(&height);
        Ok(())
    }

    fn heights(&self) -> Result<Vec<u32>, StoreError> {
        Ok(self.records.keys().copied().collect())
    }

    fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        Ok(self.version)
    }

    fn set_schema_version(&mut self, version: u32) -> Result<(), StoreError> {
        self.version = Some(version);
        Ok(())
    }
}

fn encode(state: &GameState) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serialize(state)?)
}

fn decode(bytes: &[u8]) -> Result<GameState, StoreError> {
    Ok(bincode::deserialize(bytes)?)
}

#[derive(Debug)]
pub struct SnapshotStore<B> {
    backend: B,
}

impl<B: SnapshotBackend> SnapshotStore<B> {
    /// Open a store, upgrading or wiping records of older schema versions.
    pub fn open(mut backend: B) -> Result<Self, StoreError> {
        let heights = backend.heights()?;
        match backend.schema_version()? {
            Some(CURRENT_VERSION) => return Ok(Self { backend }),
            Some(v) if v > CURRENT_VERSION => return Err(StoreError::UnsupportedVersion(v)),
            Some(v) if v >= LAST_INCOMPATIBLE_VERSION => {
                tracing::info!(from = v, records = heights.len(), "upgrading game state snapshots");
                for &h in &heights {
                    let Some(bytes) = backend.get(h)? else {
                        continue;
                    };
                    let state: GameState = serde_json::from_slice(&bytes)?;
                    backend.put(h, encode(&state)?)?;
                }
            }
            None if heights.is_empty() => {}
            version => {
                tracing::warn!(
                    ?version,
                    records = heights.len(),
                    "discarding incompatible game state snapshots"
                );
                for &h in &heights {
                    backend.delete(h)?;
                }
            }
        }
        backend.set_schema_version(CURRENT_VERSION)?;
        Ok(Self { backend })
    }

    pub fn load(&self, height: u32) -> Result<Option<GameState>, StoreError> {
        self.backend
            .get(height)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Store `state` under its own height.
    pub fn save(&mut self, state: &GameState) -> Result<(), StoreError> {
        let height = u32::try_from(state.height).map_err(|_| StoreError::PreGenesis)?;
        self.backend.put(height, encode(state)?)
    }

    pub fn erase(&mut self, height: u32) -> Result<(), StoreError> {
        self.backend.delete(height)
    }

    pub fn heights(&self) -> Result<Vec<u32>, StoreError> {
        self.backend.heights()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}
