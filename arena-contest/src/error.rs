use crate::GameId;
use arena_core::{AccountId, ArenaError};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContestError>;

/// Role a caller must hold for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Gamemaster,
    Creator,
    Player,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Gamemaster => write!(f, "gamemaster"),
            Role::Creator => write!(f, "creator"),
            Role::Player => write!(f, "player"),
        }
    }
}

/// Coarse classification every failure falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    State,
    Validation,
    Arithmetic,
    FundTransfer,
    Internal,
}

#[derive(Error, Debug)]
pub enum ContestError {
    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    #[error("Caller {caller:?} is not the {role} of game {game_id}")]
    Unauthorized {
        game_id: GameId,
        caller: AccountId,
        role: Role,
    },

    #[error("Invalid game state: {0}")]
    InvalidState(String),

    #[error("Commitment already submitted")]
    AlreadyCommitted,

    #[error("Nothing committed yet")]
    NotCommitted,

    #[error("Commitment already revealed")]
    AlreadyRevealed,

    #[error("Entropy already captured")]
    EntropyAlreadyCaptured,

    #[error("Entropy not captured for checkpoint {0}")]
    EntropyNotCaptured(u64),

    #[error("Checkpoint {checkpoint} not reached (beacon tip {tip})")]
    CheckpointNotReached { checkpoint: u64, tip: u64 },

    #[error("Entropy sample for checkpoint {0} is no longer retained")]
    EntropyExpired(u64),

    #[error("Invalid commitment")]
    InvalidCommitment,

    #[error("Player already joined: {0:?}")]
    AlreadyJoined(AccountId),

    #[error("Player not in game: {0:?}")]
    NotAPlayer(AccountId),

    #[error("Player already withdrew: {0:?}")]
    AlreadyWithdrawn(AccountId),

    #[error("Wrong stake: need {need} sats, got {got} sats")]
    WrongStake { need: u64, got: u64 },

    #[error("Identity cannot be zero")]
    ZeroIdentity,

    #[error("Stake amount must be greater than zero")]
    ZeroStake,

    #[error("Winners list is empty")]
    NoWinners,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Game has no players")]
    NoPlayers,

    #[error("Already paid out")]
    AlreadyPaidOut,

    #[error("Withdrawal mode is active")]
    WithdrawalModeActive,

    #[error("Payout timeout has not elapsed")]
    PayoutTimeoutNotElapsed,

    #[error("Per-winner payout rounds to zero")]
    ZeroPayout,

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Fund transfer failed: {0}")]
    Transfer(#[source] ArenaError),

    #[error("Arena core error: {0}")]
    Core(#[from] ArenaError),
}

impl ContestError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn unauthorized(game_id: GameId, caller: AccountId, role: Role) -> Self {
        Self::Unauthorized {
            game_id,
            caller,
            role,
        }
    }

    /// Wrap a treasury failure; plumbing errors stay `Core`.
    pub fn transfer(err: ArenaError) -> Self {
        if err.is_transfer_failure() {
            Self::Transfer(err)
        } else {
            Self::Core(err)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Authorization,

            Self::InvalidState(_)
            | Self::AlreadyCommitted
            | Self::NotCommitted
            | Self::AlreadyRevealed
            | Self::EntropyAlreadyCaptured
            | Self::EntropyNotCaptured(_)
            | Self::CheckpointNotReached { .. }
            | Self::EntropyExpired(_)
            | Self::AlreadyJoined(_)
            | Self::NotAPlayer(_)
            | Self::AlreadyWithdrawn(_)
            | Self::NoPlayers
            | Self::AlreadyPaidOut
            | Self::WithdrawalModeActive
            | Self::PayoutTimeoutNotElapsed => ErrorKind::State,

            Self::GameNotFound(_)
            | Self::InvalidCommitment
            | Self::WrongStake { .. }
            | Self::ZeroIdentity
            | Self::ZeroStake
            | Self::NoWinners
            | Self::InvalidInput(_) => ErrorKind::Validation,

            Self::ZeroPayout | Self::Overflow(_) => ErrorKind::Arithmetic,

            Self::Transfer(_) => ErrorKind::FundTransfer,

            Self::Core(_) => ErrorKind::Internal,
        }
    }
}
