pub mod engine;
pub mod scheme;

pub use engine::{CommitReveal, CommitState};
pub use scheme::{CommitmentScheme, Sha256Scheme};

use arena_core::{sha256, Hash32};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Hash based commitment held by the gamemaster until reveal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashCommitment {
    hash: Hash32,
    #[serde(skip)]
    secret: Option<Vec<u8>>,
}

impl HashCommitment {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            hash: Sha256Scheme::commit(&secret),
            secret: Some(secret),
        }
    }

    pub fn from_hash(hash: Hash32) -> Self {
        Self { hash, secret: None }
    }

    pub fn hash(&self) -> Hash32 {
        self.hash
    }

    pub fn verify(&self, secret: &[u8]) -> bool {
        Sha256Scheme::verify(&self.hash, secret)
    }

    pub fn reveal(self) -> Option<Vec<u8>> {
        self.secret
    }
}

/// Rnd secret for commitment
pub fn generate_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

/// Final randomness: `sha256(entropy || secret)`. Anyone holding both inputs can recompute it.
pub fn derive_randomness(entropy: &Hash32, secret: &[u8]) -> Hash32 {
    sha256(&[entropy.as_bytes(), secret])
}
