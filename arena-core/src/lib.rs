//! Stake arena core
//!
//! Shared primitives for the staking contest: identities and digests, the
//! configuration, the clock, entropy beacon and treasury ports, and SQLite
//! persistence for everything the contest needs to survive a restart.

pub mod beacon;
pub mod clock;
pub mod config;
pub mod error;
pub mod storage;
pub mod treasury;
pub mod types;

pub use beacon::{EntropyBeacon, SimulatedBeacon};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ArenaConfig;
pub use error::{ArenaError, Result};
pub use storage::Storage;
pub use treasury::{Treasury, Vault};
pub use types::{sha256, AccountId, Hash32};

pub use ::bitcoin::Amount;
