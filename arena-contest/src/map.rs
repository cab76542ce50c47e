//! Contract with the off-chain map generator.
//!
//! The generator turns `(randomness, map_size, players)` into a tile layout and
//! starting positions. Verifiability of a game rests on that function being
//! bit-for-bit deterministic; `verify_deterministic` checks a generator against it.

use arena_core::{AccountId, Hash32};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSeed {
    pub randomness: Hash32,
    pub map_size: u64,
    /// Join order, which seeds per-player starting positions.
    pub players: Vec<AccountId>,
}

pub trait MapGenerator {
    type Layout: PartialEq;

    fn generate(&self, seed: &MapSeed) -> Self::Layout;
}

/// Run the generator `runs` times and check every layout is identical.
pub fn verify_deterministic<G: MapGenerator>(generator: &G, seed: &MapSeed, runs: usize) -> bool {
    let reference = generator.generate(seed);
    (1..runs).all(|_| generator.generate(seed) == reference)
}
