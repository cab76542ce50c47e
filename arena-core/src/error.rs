use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArenaError>;

#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Insufficient funds: need {need} sats, have {available} sats")]
    InsufficientFunds { need: u64, available: u64 },

    #[error("Escrow shortfall: need {need} sats, escrow holds {available} sats")]
    EscrowShortfall { need: u64, available: u64 },

    #[error("Recipient {recipient} refused the payment")]
    TransferRejected { recipient: String },

    #[error("Balance overflow for account {0}")]
    BalanceOverflow(String),

    #[error("Invalid account: {0}")]
    InvalidAccount(String),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArenaError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for failures of a fund movement (as opposed to plumbing errors).
    pub fn is_transfer_failure(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::EscrowShortfall { .. }
                | Self::TransferRejected { .. }
                | Self::BalanceOverflow(_)
        )
    }
}
