//! External entropy source.
//!
//! A beacon publishes one tamper-evident sample per checkpoint. Samples are only
//! readable for a bounded number of checkpoints after they are produced, so
//! consumers that need a sample must capture it promptly.

use crate::types::{sha256, Hash32};
use parking_lot::RwLock;
use std::collections::BTreeMap;

pub trait EntropyBeacon: Send + Sync {
    /// Latest checkpoint that has a sample.
    fn tip(&self) -> u64;

    /// Sample for `checkpoint`, or `None` if it does not exist yet or is no longer retained.
    fn sample(&self, checkpoint: u64) -> Option<Hash32>;

    fn has_reached(&self, checkpoint: u64) -> bool {
        self.tip() >= checkpoint
    }
}

#[derive(Debug, Clone)]
struct BeaconChain {
    tip: u64,
    retention: u64,
    samples: BTreeMap<u64, Hash32>,
}

impl BeaconChain {
    fn produce(&mut self) {
        let prev = self
            .samples
            .get(&self.tip)
            .copied()
            .unwrap_or_else(|| sha256(&[b"arena-beacon-genesis"]));
        self.tip += 1;
        let next = sha256(&[prev.as_bytes(), &self.tip.to_be_bytes()]);
        self.samples.insert(self.tip, next);
        self.prune();
    }

    fn prune(&mut self) {
        // keep checkpoints in (tip - retention, tip]
        let oldest = self.tip.saturating_sub(self.retention) + 1;
        self.samples = self.samples.split_off(&oldest);
    }
}

/// Hash-chain beacon where each sample commits to its predecessor.
#[derive(Debug)]
pub struct SimulatedBeacon {
    chain: RwLock<BeaconChain>,
}

impl SimulatedBeacon {
    pub fn new(retention: u64) -> Self {
        let mut chain = BeaconChain {
            tip: 0,
            retention: retention.max(1),
            samples: BTreeMap::new(),
        };
        chain.produce();
        Self {
            chain: RwLock::new(chain),
        }
    }

    /// Rebuild from persisted state.
    pub fn from_samples(retention: u64, tip: u64, samples: BTreeMap<u64, Hash32>) -> Self {
        let mut chain = BeaconChain {
            tip,
            retention: retention.max(1),
            samples,
        };
        chain.prune();
        Self {
            chain: RwLock::new(chain),
        }
    }

    /// Produce `checkpoints` new samples.
    pub fn advance(&self, checkpoints: u64) -> u64 {
        let mut chain = self.chain.write();
        for _ in 0..checkpoints {
            chain.produce();
        }
        tracing::debug!("Beacon advanced to checkpoint {}", chain.tip);
        chain.tip
    }

    pub fn retention(&self) -> u64 {
        self.chain.read().retention
    }

    pub fn retained(&self) -> BTreeMap<u64, Hash32> {
        self.chain.read().samples.clone()
    }
}

impl EntropyBeacon for SimulatedBeacon {
    fn tip(&self) -> u64 {
        self.chain.read().tip
    }

    fn sample(&self, checkpoint: u64) -> Option<Hash32> {
        self.chain.read().samples.get(&checkpoint).copied()
    }
}

/// Check that `next` is the sample the hash chain produces after `prev`.
pub fn verify_link(prev: &Hash32, checkpoint: u64, next: &Hash32) -> bool {
    sha256(&[prev.as_bytes(), &checkpoint.to_be_bytes()]) == *next
}
