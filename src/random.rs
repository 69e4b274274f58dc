//! Per-process random number generation.
//!
//! Every node and the server own exactly one [`Random`], threaded explicitly
//! through population and strategy construction. There is no global or
//! thread-local RNG anywhere in this crate: two [`Random`]s seeded the same
//! way must reproduce the same search trajectory.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::any::type_name;

pub struct Random {
    config: RandomConfig,
    inner: Box<dyn RngCore + Send>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RandomConfig {
    pub name: &'static str,
    pub seed: u64,
}

impl Random {
    pub fn new<RNG>(seed: u64) -> Self
    where
        RNG: RngCore + SeedableRng + Send + 'static,
    {
        Random {
            config: RandomConfig {
                name: type_name::<RNG>(),
                seed,
            },
            inner: Box::new(RNG::seed_from_u64(seed)),
        }
    }

    /// Seed from a known value, e.g. one read from on-disk configuration.
    pub fn seeded(seed: u64) -> Self {
        Random::new::<ChaCha8Rng>(seed)
    }

    /// A fixed seed for deterministic tests.
    pub fn testing() -> Self {
        Random::seeded(0)
    }

    pub fn config(&self) -> RandomConfig {
        self.config
    }
}

impl RngCore for Random {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

impl Default for Random {
    /// Seeds from OS entropy, matching process startup when no explicit
    /// seed is configured.
    fn default() -> Self {
        Random::seeded(rand::thread_rng().next_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_stream() {
        let mut a = Random::seeded(42);
        let mut b = Random::seeded(42);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn testing_is_deterministic() {
        let mut a = Random::testing();
        let mut b = Random::testing();
        assert_eq!(a.next_u32(), b.next_u32());
    }
}
