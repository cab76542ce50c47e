//! Multi-game staking contest.
//!
//! Players escrow a fixed stake to join a game, the gamemaster fixes
//! verifiable randomness through commit-reveal against an external entropy
//! beacon, and the pool is split between the declared winners and the
//! operator. Timeouts protect players from a creator who never closes and a
//! gamemaster who never pays.

pub mod commitment;
pub mod error;
pub mod event;
pub mod game;
pub mod ledger;
pub mod map;
pub mod payout;
pub mod registry;
pub mod timeout;

pub use commitment::{
    derive_randomness, generate_secret, CommitReveal, CommitState, CommitmentScheme,
    HashCommitment, Sha256Scheme,
};
pub use error::{ContestError, ErrorKind, Result, Role};
pub use event::{EventRecord, GameEvent};
pub use game::{map_size_for, Game, GameInfo, Lifecycle, Settlement, Withdrawal};
pub use ledger::StakeLedger;
pub use map::{verify_deterministic, MapGenerator, MapSeed};
pub use payout::{PayoutEngine, PayoutPlan};
pub use registry::GameRegistry;
pub use timeout::TimeoutGuard;

/// Registry-assigned game identifier. Starts at 1 and is never reused.
pub type GameId = u64;
