// Integration tests for chain reorganisations: disconnecting blocks with
// `rollback`, connecting a competing branch, and requests for blocks that
// left the main chain.

mod common;

use common::{connect_all, integrator, main_chain, MemoryChain};
use hunter_chain::{ChainError, MemoryBackend};

#[test]
fn switching_branches_replaces_the_tip_snapshot() {
    let mut chain = MemoryChain::new();
    let blocks = main_chain(&mut chain, 8);
    let mut integ = integrator(MemoryBackend::new(), 5, 3);
    connect_all(&mut integ, &chain, &blocks);
    assert_eq!(integ.store().heights().unwrap(), vec![0, 5, 7]);

    let side = chain.extend(&blocks[5], 3, 1);
    integ.rollback(&blocks[7]).unwrap();
    integ.rollback(&blocks[6]).unwrap();
    assert_eq!(integ.store().heights().unwrap(), vec![0, 5]);

    chain.set_main_chain(&side[2]);
    connect_all(&mut integ, &chain, &side);
    assert_eq!(integ.store().heights().unwrap(), vec![0, 5, 8]);

    let tip = integ.get_state(&chain, Some(&side[2].hash)).unwrap();
    assert_eq!(tip.height, 8);
    assert_eq!(tip.hash_block, side[2].hash);

    let mut scratch = integrator(MemoryBackend::new(), 5, 3);
    assert_eq!(scratch.get_state(&chain, Some(&side[2].hash)).unwrap(), tip);
}

#[test]
fn abandoned_blocks_cannot_be_replayed() {
    let mut chain = MemoryChain::new();
    let blocks = main_chain(&mut chain, 8);
    let mut integ = integrator(MemoryBackend::new(), 5, 3);
    connect_all(&mut integ, &chain, &blocks);

    let side = chain.extend(&blocks[5], 3, 1);
    integ.rollback(&blocks[7]).unwrap();
    integ.rollback(&blocks[6]).unwrap();
    chain.set_main_chain(&side[2]);
    connect_all(&mut integ, &chain, &side);

    let mut fresh = integrator(integ.into_store().into_backend(), 5, 3);
    for old in &blocks[6..] {
        let err = fresh.get_state(&chain, Some(&old.hash)).unwrap_err();
        assert!(matches!(err, ChainError::NotOnMainChain(h) if h == old.hash));
        assert!(!err.is_fatal());
    }
    // The shared part of the chain is still served.
    let shared = fresh.get_state(&chain, Some(&blocks[5].hash)).unwrap();
    assert_eq!(shared.hash_block, blocks[5].hash);
}

#[test]
fn snapshot_of_another_branch_is_ignored() {
    let mut chain = MemoryChain::new();
    let blocks = main_chain(&mut chain, 7);
    let mut integ = integrator(MemoryBackend::new(), 5, 3);
    connect_all(&mut integ, &chain, &blocks);
    assert_eq!(integ.store().heights().unwrap(), vec![0, 5, 6]);

    // The branch switch happens without the old tip being disconnected, so
    // height 6 still holds the old block's state.
    let side = chain.add_block(Some(&blocks[5]), 1, Vec::new());
    chain.set_main_chain(&side);

    let mut fresh = integrator(integ.into_store().into_backend(), 5, 3);
    let state = fresh.get_state(&chain, Some(&side.hash)).unwrap();
    assert_eq!(state.height, 6);
    assert_eq!(state.hash_block, side.hash);

    let mut scratch = integrator(MemoryBackend::new(), 5, 3);
    assert_eq!(scratch.get_state(&chain, Some(&side.hash)).unwrap(), state);
}

#[test]
fn reconnecting_a_block_reproduces_its_state() {
    let mut chain = MemoryChain::new();
    let blocks = main_chain(&mut chain, 4);
    let mut integ = integrator(MemoryBackend::new(), 5, 3);
    connect_all(&mut integ, &chain, &blocks);
    let before = integ.store().load(3).unwrap().unwrap();

    integ.rollback(&blocks[3]).unwrap();
    assert_eq!(integ.store().load(3).unwrap(), None);
    connect_all(&mut integ, &chain, &blocks[3..]);
    assert_eq!(integ.store().load(3).unwrap(), Some(before));
}

#[test]
fn side_branch_that_never_won_is_rejected() {
    let mut chain = MemoryChain::new();
    let blocks = main_chain(&mut chain, 6);
    let stray = chain.add_block(Some(&blocks[3]), 9, Vec::new());
    let mut integ = integrator(MemoryBackend::new(), 5, 3);
    connect_all(&mut integ, &chain, &blocks);

    let err = integ.get_state(&chain, Some(&stray.hash)).unwrap_err();
    assert!(matches!(err, ChainError::NotOnMainChain(_)));
}
