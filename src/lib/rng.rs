//! Seeded random number generators.

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Create a random number generator, optionally seeded for reproducibility.
///
/// `None` uses OS entropy.
///
/// ```
/// use linestage_lib::rng::create_rng;
/// use rand::RngExt;
///
/// let mut a = create_rng(Some(42));
/// let mut b = create_rng(Some(42));
/// assert_eq!(a.random::<u64>(), b.random::<u64>());
/// ```
#[must_use]
pub fn create_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

/// Derive a per-worker seed so workers sharing a base seed still draw different streams.
#[must_use]
pub fn derive_seed(seed: Option<u64>, stream: u64) -> Option<u64> {
    seed.map(|s| s.wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
}
