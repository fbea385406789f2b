// Randomness for winner selection
use std::sync::atomic::{AtomicU64, Ordering};

use arrayref::array_ref;
use solana_program::hash::hashv;
use uuid::Uuid;

use crate::state::RaffleId;

/// Supplies a fresh 32-byte seed for each draw.
pub trait RandomSource: Send + Sync {
    fn next_seed(&self, raffle_id: RaffleId) -> [u8; 32];
}

/// Seeds from the operating system's generator.
///
/// Two v4 UUIDs provide 244 bits of OS entropy; hashing them together with
/// the raffle id gives a uniformly distributed 32-byte seed.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsEntropy;

impl RandomSource for OsEntropy {
    fn next_seed(&self, raffle_id: RaffleId) -> [u8; 32] {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        hashv(&[
            &first.as_bytes()[..],
            &second.as_bytes()[..],
            &raffle_id.as_bytes()[..],
        ])
        .to_bytes()
    }
}

/// Deterministic seeds derived from a fixed seed and a draw counter.
///
/// Reproduces the same sequence of draws for the same seed, which is what
/// audits and tests need.
#[derive(Debug)]
pub struct SeededEntropy {
    seed: u64,
    counter: AtomicU64,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            counter: AtomicU64::new(0),
        }
    }

    /// Number of seeds handed out so far
    pub fn draws(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl RandomSource for SeededEntropy {
    fn next_seed(&self, raffle_id: RaffleId) -> [u8; 32] {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        hashv(&[
            &self.seed.to_le_bytes()[..],
            &n.to_le_bytes()[..],
            &raffle_id.as_bytes()[..],
        ])
        .to_bytes()
    }
}

/// First eight bytes of a seed as a little-endian u64.
pub fn seed_value(seed: &[u8; 32]) -> u64 {
    u64::from_le_bytes(*array_ref![seed, 0, 8])
}
