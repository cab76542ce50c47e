use arena_core::{sha256, Hash32};

/// Trait for commitment schemes
pub trait CommitmentScheme {
    type Secret: ?Sized;
    type Commitment;

    fn commit(secret: &Self::Secret) -> Self::Commitment;
    fn verify(commitment: &Self::Commitment, secret: &Self::Secret) -> bool;
}

/// `commitment = sha256(secret)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Scheme;

impl CommitmentScheme for Sha256Scheme {
    type Secret = [u8];
    type Commitment = Hash32;

    fn commit(secret: &[u8]) -> Hash32 {
        sha256(&[secret])
    }

    fn verify(commitment: &Hash32, secret: &[u8]) -> bool {
        Self::commit(secret) == *commitment
    }
}
