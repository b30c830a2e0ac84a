//! Seeded pseudo-random stream.
//!
//! SplitMix64 over a 64-bit state. The sequence for a given seed is fixed by
//! this file alone, so avatars stay identical across platforms and releases.

use sha2::{Digest, Sha256};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedRng {
    state: u64,
}

impl SeedRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seeds the stream from the first eight bytes of SHA-256(`seed`).
    pub fn from_seed_str(seed: &str) -> Self {
        let digest = Sha256::digest(seed.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Self::new(u64::from_le_bytes(head))
    }

    pub fn next_u64(&mut self) -> u64 {
        // SplitMix64
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// A value in `0..count`. `count` must be non-zero.
    pub fn below(&mut self, count: u64) -> u64 {
        debug_assert!(count > 0);
        ((u128::from(self.next_u64()) * u128::from(count)) >> 64) as u64
    }

    /// A value in `min..=max`. Swapped bounds are reordered.
    pub fn range_inclusive(&mut self, min: u32, max: u32) -> u32 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let span = u64::from(hi - lo) + 1;
        lo + self.below(span) as u32
    }
}
