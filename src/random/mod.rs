mod macros;
mod sampling_algorithms;

use std::any::{Any, TypeId};

use log::trace;

pub use macros::define_rng;
pub use sampling_algorithms::{sample_multiple_from_known_length, sample_single_from_known_length};

use crate::hashing::hash_str;
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::{Rng, RngCore, SeedableRng};
use crate::HashMap;

pub trait RngId: Copy + Clone + 'static {
    type RngType: SeedableRng + RngCore + 'static;
    fn get_name() -> &'static str;
}

// This is a wrapper that allows for future support for different types of
// random number generators (anything that implements SeedableRng is valid).
struct RngHolder {
    rng: Box<dyn Any>,
}

/// The single seeded source of randomness owned by a simulation run.
///
/// Stores:
/// * `base_seed`: the seed every stream is derived from
/// * `rng_holders`: one generator per [`RngId`], created lazily on first use and seeded with
///   `base_seed` offset by a hash of the id's name. Streams are independent of each other, so
///   drawing from one never shifts the sequence seen by another.
pub struct RngStore {
    base_seed: u64,
    rng_holders: HashMap<TypeId, RngHolder>,
}

impl RngStore {
    #[must_use]
    pub fn new(base_seed: u64) -> Self {
        trace!("initializing random streams with base seed {base_seed}");
        RngStore {
            base_seed,
            rng_holders: HashMap::default(),
        }
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    fn get_rng<R: RngId>(&mut self) -> &mut R::RngType {
        let base_seed = self.base_seed;
        self.rng_holders
            .entry(TypeId::of::<R>())
            // Create a new rng holder if it doesn't exist yet
            .or_insert_with(|| {
                trace!("creating new RNG (seed={base_seed}) for {}", R::get_name());
                let seed_offset = hash_str(R::get_name());
                RngHolder {
                    rng: Box::new(R::RngType::seed_from_u64(
                        base_seed.wrapping_add(seed_offset),
                    )),
                }
            })
            .rng
            .downcast_mut::<R::RngType>()
            .expect("an RngId is always stored with its own RngType")
    }

    /// Gets a random sample from the stream associated with the given [`RngId`] by applying
    /// the specified sampler function.
    pub fn sample<R: RngId, T>(
        &mut self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        sampler(self.get_rng::<R>())
    }

    /// Gets a random sample within the range provided by `range`.
    pub fn sample_range<R: RngId, S, T>(&mut self, rng_id: R, range: S) -> T
    where
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    /// Draws a uniform value in `[0, 1)`. Probability checks throughout the engine compare this
    /// draw against a rate explicitly so the number of draws per decision is always one.
    pub fn sample_uniform<R: RngId>(&mut self, rng_id: R) -> f64 {
        self.sample(rng_id, |rng| rng.random::<f64>())
    }

    /// Picks one element of `items` uniformly, or `None` if it is empty.
    pub fn sample_element<R: RngId, T: Copy>(&mut self, rng_id: R, items: &[T]) -> Option<T> {
        self.sample(rng_id, |rng| {
            sample_single_from_known_length(rng, items.iter().copied())
        })
    }

    /// Draws up to `requested` distinct elements of `items` without replacement.
    pub fn sample_without_replacement<R: RngId, T: Copy>(
        &mut self,
        rng_id: R,
        items: &[T],
        requested: usize,
    ) -> Vec<T> {
        self.sample(rng_id, |rng| {
            sample_multiple_from_known_length(rng, items.iter().copied(), requested)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    define_rng!(FooRng);
    define_rng!(BarRng);

    #[test]
    fn get_rng_basic() {
        let mut rngs = RngStore::new(42);
        let first = rngs.sample(FooRng, |rng| rng.next_u64());
        let second = rngs.sample(FooRng, |rng| rng.next_u64());
        assert_ne!(first, second);
    }

    #[test]
    fn streams_are_independent() {
        let mut interleaved = RngStore::new(42);
        let mut alone = RngStore::new(42);

        let a0 = interleaved.sample(FooRng, |rng| rng.next_u64());
        interleaved.sample(BarRng, |rng| rng.next_u64());
        let a1 = interleaved.sample(FooRng, |rng| rng.next_u64());

        assert_eq!(a0, alone.sample(FooRng, |rng| rng.next_u64()));
        assert_eq!(a1, alone.sample(FooRng, |rng| rng.next_u64()));
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut rngs = RngStore::new(42);
        let run_0 = rngs.sample(FooRng, |rng| rng.next_u64());
        let run_1 = rngs.sample(FooRng, |rng| rng.next_u64());

        // A fresh store with the same seed replays the stream
        let mut replay = RngStore::new(42);
        assert_eq!(run_0, replay.sample(FooRng, |rng| rng.next_u64()));
        assert_eq!(run_1, replay.sample(FooRng, |rng| rng.next_u64()));

        // A different seed gives different values
        let mut other = RngStore::new(88);
        assert_eq!(other.base_seed(), 88);
        assert_ne!(run_0, other.sample(FooRng, |rng| rng.next_u64()));
        assert_ne!(run_1, other.sample(FooRng, |rng| rng.next_u64()));
    }

    #[test]
    fn sample_uniform_in_unit_interval() {
        let mut rngs = RngStore::new(1);
        for _ in 0..1000 {
            let value = rngs.sample_uniform(FooRng);
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn sample_range_inclusive() {
        let mut rngs = RngStore::new(1);
        for _ in 0..1000 {
            let value: u64 = rngs.sample_range(FooRng, 8..=14);
            assert!((8..=14).contains(&value));
        }
    }

    #[test]
    fn sample_element_and_without_replacement() {
        let mut rngs = RngStore::new(3);
        assert_eq!(rngs.sample_element::<_, u8>(FooRng, &[]), None);
        assert_eq!(rngs.sample_element(FooRng, &[9]), Some(9));

        let picked = rngs.sample_without_replacement(BarRng, &[1, 2, 3, 4], 2);
        assert_eq!(picked.len(), 2);
        assert_ne!(picked[0], picked[1]);
    }
}
