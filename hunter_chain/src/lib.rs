// hunter_chain: connects the world simulation to a block chain.
//
// `hunter_sim` computes one state from the previous one. This crate keeps
// track of which state belongs to which block: it caches recent states,
// persists periodic snapshots, replays blocks forward from the nearest known
// state, and exposes the hooks that block connection and disconnection call.
// The chain itself (block index, transactions, storage engine) stays outside;
// it is reached through the `ChainView` and `SnapshotBackend` traits.
//
// Module overview:
// - `chain.rs`:      ChainView trait, BlockRef, NameUpdate -> StepData.
// - `cache.rs`:      StateCache, a bounded hash-keyed cache of states.
// - `store.rs`:      SnapshotStore over a SnapshotBackend, schema upgrades.
// - `integrator.rs`: StateIntegrator: get_state / advance / rollback.
// - `miner.rs`:      TaxPreview for block assembly.
// - `error.rs`:      ChainError and StoreError.
//
// Concurrency: none. Every method takes `&mut self` or `&self` and is meant
// to be called while the caller holds its own chain lock.

pub mod cache;
pub mod chain;
pub mod error;
pub mod integrator;
pub mod miner;
pub mod store;

pub use cache::StateCache;
pub use chain::{BlockRef, ChainView, NameUpdate};
pub use error::{ChainError, StoreError};
pub use integrator::{IntegratorConfig, StateIntegrator};
pub use miner::TaxPreview;
pub use store::{MemoryBackend, SnapshotBackend, SnapshotStore};
