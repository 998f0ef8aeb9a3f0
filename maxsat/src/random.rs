//! Seeding of the per-strategy and per-worker pseudo-random generators.
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::time::{SystemTime, UNIX_EPOCH};

/// The generator every strategy owns.
pub type SearchRng = Pcg64Mcg;

/// A seed derived from the current time, for runs without an explicit seed.
pub fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|x| x.as_nanos() as u64)
        .unwrap_or_default()
}

/// Creates the generator of a strategy run.
pub fn search_rng(seed: u64) -> SearchRng {
    SearchRng::seed_from_u64(seed)
}

/// Creates the generator of one independent unit of work (an offspring pair, an ant).
///
/// The result depends only on the run seed, the round and the unit index, so parallel
/// and sequential runs produce the same individuals.
pub fn worker_rng(seed: u64, round: u64, index: u64) -> SearchRng {
    let stream = splitmix64(splitmix64(seed ^ round.rotate_left(32)) ^ index);
    SearchRng::seed_from_u64(stream)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
