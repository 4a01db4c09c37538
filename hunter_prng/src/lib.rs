// Deterministic, portable block-seeded random number generator.
//
// The generator holds a 256-bit unsigned integer. Each draw of `next_int(m)`
// divides the state by `m` and returns the remainder, so small moduli consume
// only a few bits of entropy per call. When the state has been divided down
// below `MIN_STATE`, the generator reseeds itself: the original seed value is
// hashed with double SHA-256 and becomes both the new seed and the new state.
//
// The initial seed is the double SHA-256 of the 32 bytes of the block hash,
// interpreted as a little-endian 256-bit integer. This matches the hashing
// used for block hashes themselves, so every node derives the same sequence.
//
// This crate is the single source of randomness for the world step in
// `hunter_sim`: disaster rolls, spawn tiles, harvest tiles, combat life
// redistribution, bank refills, heart drops and crown assignment all draw from
// one `GameRng` constructed per block.
//
// **Critical constraint: determinism.** Every method on `GameRng` must produce
// identical output given the same seed and call sequence, regardless of
// platform, compiler version, or optimization level. All arithmetic is on
// fixed-width `u64` limbs; there is no floating point and no OS entropy.

use sha2::{Digest, Sha256};
use std::cmp::Ordering;

/// A 256-bit unsigned integer stored as four little-endian `u64` limbs.
///
/// Only the operations the generator needs are implemented: conversion from
/// and to 32 little-endian bytes, comparison, and division by a small divisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct U256 {
    limbs: [u64; 4],
}

impl U256 {
    pub const ZERO: U256 = U256 { limbs: [0; 4] };

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self { limbs }
    }

    pub fn from_le_bytes(bytes: &[u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
            *limb = u64::from_le_bytes(chunk);
        }
        Self { limbs }
    }

    pub fn to_le_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.limbs.iter().enumerate() {
            out[i * 8..i * 8 + 8].copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    /// Divide in place by `divisor`, returning the remainder.
    ///
    /// Long division from the most significant limb down, using `u128` for
    /// the two-limb intermediate. Panics if `divisor` is zero.
    pub fn div_rem_u32(&mut self, divisor: u32) -> u32 {
        assert!(divisor > 0, "div_rem_u32: division by zero");
        let d = u128::from(divisor);
        let mut rem: u128 = 0;
        for limb in self.limbs.iter_mut().rev() {
            let cur = (rem << 64) | u128::from(*limb);
            *limb = (cur / d) as u64;
            rem = cur % d;
        }
        rem as u32
    }

    /// Decode a Bitcoin-style "compact" representation (exponent byte plus
    /// 23-bit mantissa). Only non-negative, non-overflowing values are
    /// supported, which is all the generator's threshold needs.
    pub const fn from_compact(compact: u32) -> Self {
        let size = (compact >> 24) as usize;
        let word = (compact & 0x007f_ffff) as u64;
        if size <= 3 {
            return Self::from_limbs([word >> (8 * (3 - size)), 0, 0, 0]);
        }
        let shift = 8 * (size - 3);
        let limb = shift / 64;
        let bit = shift % 64;
        let mut limbs = [0u64; 4];
        if limb < 4 {
            limbs[limb] = word << bit;
            if bit > 0 && limb + 1 < 4 {
                limbs[limb + 1] = word >> (64 - bit);
            }
        }
        Self::from_limbs(limbs)
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in (0..4).rev() {
            match self.limbs[i].cmp(&other.limbs[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Threshold below which the state is considered exhausted.
pub const MIN_STATE: U256 = U256::from_compact(0x097f_ffff);

/// Double SHA-256 of `data`.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// Block-seeded divide-and-remainder PRNG used by the world step.
#[derive(Clone, Debug)]
pub struct GameRng {
    state: U256,
    state0: U256,
}

impl GameRng {
    /// Create a generator from a 256-bit seed (normally a block hash in its
    /// internal little-endian byte order).
    pub fn new(seed: &[u8; 32]) -> Self {
        let state0 = U256::from_le_bytes(&hash256(seed));
        Self {
            state: state0,
            state0,
        }
    }

    /// Draw an integer uniformly-ish in `[0, modulo)`.
    ///
    /// Panics if `modulo` is zero.
    pub fn next_int(&mut self, modulo: u32) -> u32 {
        if self.state < MIN_STATE {
            self.state0 = U256::from_le_bytes(&hash256(&self.state0.to_le_bytes()));
            self.state = self.state0;
        }
        self.state.div_rem_u32(modulo)
    }

    /// Draw an integer in the inclusive range `[min, max]`.
    ///
    /// Panics if `min > max`.
    pub fn next_range(&mut self, min: i32, max: i32) -> i32 {
        assert!(min <= max, "next_range: min must be <= max");
        let span = (i64::from(max) - i64::from(min) + 1) as u32;
        min + self.next_int(span) as i32
    }

    /// Draw an index into a collection of `len` elements.
    ///
    /// Panics if `len` is zero.
    pub fn next_index(&mut self, len: usize) -> usize {
        let modulo = u32::try_from(len).unwrap_or(u32::MAX);
        self.next_int(modulo) as usize
    }
}
