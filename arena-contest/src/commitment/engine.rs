use crate::commitment::{derive_randomness, CommitmentScheme, Sha256Scheme};
use crate::{ContestError, Result};
use arena_core::{EntropyBeacon, Hash32};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CommitState {
    Uncommitted,
    Committed {
        hash: Hash32,
        checkpoint: u64,
        entropy: Option<Hash32>,
    },
    Revealed {
        hash: Hash32,
        checkpoint: u64,
        entropy: Hash32,
        #[serde(with = "hex::serde")]
        secret: Vec<u8>,
        randomness: Hash32,
    },
}

/// Commit-reveal randomness for one game.
///
/// The hash is fixed before the beacon sample at `checkpoint` exists, so the
/// committer cannot pick a secret after seeing the entropy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReveal {
    state: CommitState,
}

impl Default for CommitReveal {
    fn default() -> Self {
        Self {
            state: CommitState::Uncommitted,
        }
    }
}

impl CommitReveal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CommitState {
        &self.state
    }

    pub fn commit(&mut self, hash: Hash32, checkpoint: u64) -> Result<()> {
        match self.state {
            CommitState::Uncommitted => {
                self.state = CommitState::Committed {
                    hash,
                    checkpoint,
                    entropy: None,
                };
                Ok(())
            }
            CommitState::Committed { .. } | CommitState::Revealed { .. } => {
                Err(ContestError::AlreadyCommitted)
            }
        }
    }

    /// Read the beacon sample for the committed checkpoint while it is still retained.
    pub fn capture(&mut self, beacon: &dyn EntropyBeacon) -> Result<Hash32> {
        let (checkpoint, slot) = match &mut self.state {
            CommitState::Uncommitted => return Err(ContestError::NotCommitted),
            CommitState::Revealed { .. }
            | CommitState::Committed {
                entropy: Some(_), ..
            } => return Err(ContestError::EntropyAlreadyCaptured),
            CommitState::Committed {
                checkpoint,
                entropy,
                ..
            } => (*checkpoint, entropy),
        };

        if !beacon.has_reached(checkpoint) {
            return Err(ContestError::CheckpointNotReached {
                checkpoint,
                tip: beacon.tip(),
            });
        }

        let sample = beacon.sample(checkpoint).ok_or_else(|| {
            tracing::warn!(
                "Entropy for checkpoint {} expired before capture (tip {})",
                checkpoint,
                beacon.tip()
            );
            ContestError::EntropyExpired(checkpoint)
        })?;

        *slot = Some(sample);
        Ok(sample)
    }

    /// Verify `secret` against the commitment and derive the final randomness.
    ///
    /// A mismatching secret leaves the commitment untouched so the call can be retried.
    pub fn reveal(&mut self, secret: &[u8], beacon: &dyn EntropyBeacon) -> Result<Hash32> {
        let (hash, checkpoint, entropy) = match &self.state {
            CommitState::Uncommitted => return Err(ContestError::NotCommitted),
            CommitState::Revealed { .. } => return Err(ContestError::AlreadyRevealed),
            CommitState::Committed {
                hash,
                checkpoint,
                entropy,
            } => (*hash, *checkpoint, *entropy),
        };

        if !beacon.has_reached(checkpoint) {
            return Err(ContestError::CheckpointNotReached {
                checkpoint,
                tip: beacon.tip(),
            });
        }

        if !Sha256Scheme::verify(&hash, secret) {
            return Err(ContestError::InvalidCommitment);
        }

        let entropy = entropy.ok_or(ContestError::EntropyNotCaptured(checkpoint))?;
        let randomness = derive_randomness(&entropy, secret);

        self.state = CommitState::Revealed {
            hash,
            checkpoint,
            entropy,
            secret: secret.to_vec(),
            randomness,
        };
        Ok(randomness)
    }

    pub fn is_committed(&self) -> bool {
        !matches!(self.state, CommitState::Uncommitted)
    }

    pub fn is_revealed(&self) -> bool {
        matches!(self.state, CommitState::Revealed { .. })
    }

    pub fn has_captured_entropy(&self) -> bool {
        self.entropy().is_some()
    }

    pub fn committed_hash(&self) -> Option<Hash32> {
        match &self.state {
            CommitState::Uncommitted => None,
            CommitState::Committed { hash, .. } | CommitState::Revealed { hash, .. } => Some(*hash),
        }
    }

    pub fn checkpoint(&self) -> Option<u64> {
        match &self.state {
            CommitState::Uncommitted => None,
            CommitState::Committed { checkpoint, .. }
            | CommitState::Revealed { checkpoint, .. } => Some(*checkpoint),
        }
    }

    pub fn entropy(&self) -> Option<Hash32> {
        match &self.state {
            CommitState::Uncommitted => None,
            CommitState::Committed { entropy, .. } => *entropy,
            CommitState::Revealed { entropy, .. } => Some(*entropy),
        }
    }

    pub fn secret(&self) -> Option<&[u8]> {
        match &self.state {
            CommitState::Revealed { secret, .. } => Some(secret),
            _ => None,
        }
    }

    pub fn randomness(&self) -> Option<Hash32> {
        match &self.state {
            CommitState::Revealed { randomness, .. } => Some(*randomness),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use arena_core::SimulatedBeacon;

    fn committed(secret: &[u8], beacon: &SimulatedBeacon) -> CommitReveal {
        let mut engine = CommitReveal::new();
        engine
            .commit(Sha256Scheme::commit(secret), beacon.tip() + 1)
            .unwrap();
        engine
    }

    #[test]
    fn test_full_cycle() {
        let beacon = SimulatedBeacon::new(16);
        let mut engine = committed(b"s3cret", &beacon);

        beacon.advance(1);
        let entropy = engine.capture(&beacon).unwrap();
        let randomness = engine.reveal(b"s3cret", &beacon).unwrap();

        assert_eq!(randomness, derive_randomness(&entropy, b"s3cret"));
        assert!(engine.is_revealed());
        assert_eq!(engine.secret(), Some(&b"s3cret"[..]));
    }

    #[test]
    fn test_commit_once() {
        let beacon = SimulatedBeacon::new(16);
        let mut engine = committed(b"a", &beacon);
        let original = engine.committed_hash();

        let err = engine.commit(Sha256Scheme::commit(b"b"), 99).unwrap_err();
        assert!(matches!(err, ContestError::AlreadyCommitted));
        assert_eq!(engine.committed_hash(), original);
    }

    #[test]
    fn test_capture_before_checkpoint_fails() {
        let beacon = SimulatedBeacon::new(16);
        let mut engine = committed(b"a", &beacon);

        let err = engine.capture(&beacon).unwrap_err();
        assert!(matches!(err, ContestError::CheckpointNotReached { .. }));
        assert!(!engine.has_captured_entropy());
    }

    #[test]
    fn test_capture_once() {
        let beacon = SimulatedBeacon::new(16);
        let mut engine = committed(b"a", &beacon);
        beacon.advance(1);

        engine.capture(&beacon).unwrap();
        let err = engine.capture(&beacon).unwrap_err();
        assert!(matches!(err, ContestError::EntropyAlreadyCaptured));
    }

    #[test]
    fn test_late_capture_blocks_reveal() {
        let beacon = SimulatedBeacon::new(4);
        let mut engine = committed(b"a", &beacon);
        beacon.advance(10);

        let err = engine.capture(&beacon).unwrap_err();
        assert!(matches!(err, ContestError::EntropyExpired(_)));

        let err = engine.reveal(b"a", &beacon).unwrap_err();
        assert!(matches!(err, ContestError::EntropyNotCaptured(_)));
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_wrong_secret_keeps_commitment() {
        let beacon = SimulatedBeacon::new(16);
        let mut engine = committed(b"right", &beacon);
        beacon.advance(1);
        engine.capture(&beacon).unwrap();

        let err = engine.reveal(b"wrong", &beacon).unwrap_err();
        assert!(matches!(err, ContestError::InvalidCommitment));
        assert!(!engine.is_revealed());

        engine.reveal(b"right", &beacon).unwrap();
        assert!(engine.is_revealed());

        let err = engine.reveal(b"right", &beacon).unwrap_err();
        assert!(matches!(err, ContestError::AlreadyRevealed));
    }

    #[test]
    fn test_state_serializes_secret_as_hex() {
        let beacon = SimulatedBeacon::new(16);
        let mut engine = committed(b"\x01\x02", &beacon);
        beacon.advance(1);
        engine.capture(&beacon).unwrap();
        engine.reveal(b"\x01\x02", &beacon).unwrap();

        let json = serde_json::to_value(&engine).unwrap();
        assert_eq!(json["state"]["phase"], "revealed");
        assert_eq!(json["state"]["secret"], "0102");

        let back: CommitReveal = serde_json::from_value(json).unwrap();
        assert_eq!(back, engine);
    }
}
