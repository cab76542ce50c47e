use crate::GameId;
use arena_core::{AccountId, Amount, Hash32};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observable record of every successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameEvent {
    GameCreated {
        game_id: GameId,
        creator: AccountId,
        gamemaster: AccountId,
        stake: Amount,
    },
    HashCommitted {
        game_id: GameId,
        hash: Hash32,
        checkpoint: u64,
    },
    GameOpened {
        game_id: GameId,
        opened_at: DateTime<Utc>,
    },
    EntropyCaptured {
        game_id: GameId,
        checkpoint: u64,
        entropy: Hash32,
        server_url: String,
    },
    HashRevealed {
        game_id: GameId,
        randomness: Hash32,
    },
    PlayerJoined {
        game_id: GameId,
        player: AccountId,
        position: usize,
    },
    GameClosed {
        game_id: GameId,
        closed_at: DateTime<Utc>,
        map_size: u64,
    },
    PayoutCompleted {
        game_id: GameId,
        winners: Vec<AccountId>,
        per_winner: Amount,
    },
    WithdrawalPeriodStarted {
        game_id: GameId,
        started_at: DateTime<Utc>,
    },
    PlayerWithdrew {
        game_id: GameId,
        player: AccountId,
        amount: Amount,
    },
}

impl GameEvent {
    pub fn game_id(&self) -> GameId {
        match self {
            GameEvent::GameCreated { game_id, .. }
            | GameEvent::HashCommitted { game_id, .. }
            | GameEvent::GameOpened { game_id, .. }
            | GameEvent::EntropyCaptured { game_id, .. }
            | GameEvent::HashRevealed { game_id, .. }
            | GameEvent::PlayerJoined { game_id, .. }
            | GameEvent::GameClosed { game_id, .. }
            | GameEvent::PayoutCompleted { game_id, .. }
            | GameEvent::WithdrawalPeriodStarted { game_id, .. }
            | GameEvent::PlayerWithdrew { game_id, .. } => *game_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::GameCreated { .. } => "GameCreated",
            GameEvent::HashCommitted { .. } => "HashCommitted",
            GameEvent::GameOpened { .. } => "GameOpened",
            GameEvent::EntropyCaptured { .. } => "EntropyCaptured",
            GameEvent::HashRevealed { .. } => "HashRevealed",
            GameEvent::PlayerJoined { .. } => "PlayerJoined",
            GameEvent::GameClosed { .. } => "GameClosed",
            GameEvent::PayoutCompleted { .. } => "PayoutCompleted",
            GameEvent::WithdrawalPeriodStarted { .. } => "WithdrawalPeriodStarted",
            GameEvent::PlayerWithdrew { .. } => "PlayerWithdrew",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub recorded_at: DateTime<Utc>,
    pub event: GameEvent,
}
