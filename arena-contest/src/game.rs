use crate::commitment::CommitReveal;
use crate::error::Role;
use crate::ledger::StakeLedger;
use crate::map::MapSeed;
use crate::payout::{PayoutEngine, PayoutPlan};
use crate::timeout::TimeoutGuard;
use crate::{ContestError, GameEvent, GameId, Result};
use arena_core::{AccountId, Amount, EntropyBeacon, Hash32};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open/close lifecycle of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Lifecycle {
    Created,
    Open {
        opened_at: DateTime<Utc>,
    },
    Closed {
        opened_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
        map_size: u64,
    },
}

impl Lifecycle {
    fn open(self, now: DateTime<Utc>) -> Result<Lifecycle> {
        match self {
            Lifecycle::Created => Ok(Lifecycle::Open { opened_at: now }),
            Lifecycle::Open { .. } | Lifecycle::Closed { .. } => {
                Err(ContestError::invalid_state("game already opened"))
            }
        }
    }

    fn close(self, now: DateTime<Utc>, map_size: u64) -> Result<Lifecycle> {
        match self {
            Lifecycle::Open { opened_at } => Ok(Lifecycle::Closed {
                opened_at,
                closed_at: now,
                map_size,
            }),
            Lifecycle::Created => Err(ContestError::invalid_state("game is not open")),
            Lifecycle::Closed { .. } => Err(ContestError::invalid_state("game already closed")),
        }
    }
}

/// Terminal settlement branch. Payout and withdrawal exclude each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Settlement {
    Unsettled,
    PaidOut {
        winners: Vec<AccountId>,
        per_winner: Amount,
        operator_cut: Amount,
        remainder: Amount,
    },
    Withdrawing {
        started_at: DateTime<Utc>,
    },
}

/// What a successful withdrawal owes the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub amount: Amount,
    pub started_withdrawal_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    id: GameId,
    creator: AccountId,
    gamemaster: AccountId,
    created_at: DateTime<Utc>,
    lifecycle: Lifecycle,
    randomness: CommitReveal,
    ledger: StakeLedger,
    /// Fee split fixed when the game is created.
    payouts: PayoutEngine,
    settlement: Settlement,
    server_url: Option<String>,
}

impl Game {
    pub fn new(
        id: GameId,
        creator: AccountId,
        gamemaster: AccountId,
        stake: Amount,
        operator_fee_divisor: u64,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        if gamemaster.is_zero() || creator.is_zero() {
            return Err(ContestError::ZeroIdentity);
        }

        if stake == Amount::ZERO {
            return Err(ContestError::ZeroStake);
        }

        if operator_fee_divisor == 0 {
            return Err(ContestError::InvalidInput(
                "operator fee divisor must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            id,
            creator,
            gamemaster,
            created_at,
            lifecycle: Lifecycle::Created,
            randomness: CommitReveal::new(),
            ledger: StakeLedger::new(stake),
            payouts: PayoutEngine::new(operator_fee_divisor),
            settlement: Settlement::Unsettled,
            server_url: None,
        })
    }

    /// Commit the randomness hash. Committing is what opens the game for joining.
    pub fn commit(
        &mut self,
        caller: AccountId,
        hash: Hash32,
        checkpoint: u64,
        now: DateTime<Utc>,
    ) -> Result<Vec<GameEvent>> {
        self.require(caller, Role::Gamemaster)?;

        let mut randomness = self.randomness.clone();
        randomness.commit(hash, checkpoint)?;
        let lifecycle = self.lifecycle.open(now)?;

        self.randomness = randomness;
        self.lifecycle = lifecycle;

        Ok(vec![
            GameEvent::HashCommitted {
                game_id: self.id,
                hash,
                checkpoint,
            },
            GameEvent::GameOpened {
                game_id: self.id,
                opened_at: now,
            },
        ])
    }

    /// Capture the beacon sample for the committed checkpoint and publish the game server location.
    pub fn capture_entropy(
        &mut self,
        caller: AccountId,
        server_url: &str,
        beacon: &dyn EntropyBeacon,
    ) -> Result<Vec<GameEvent>> {
        self.require(caller, Role::Gamemaster)?;

        let server_url = server_url.trim();
        if server_url.is_empty() {
            return Err(ContestError::InvalidInput(
                "server url cannot be empty".to_string(),
            ));
        }

        let entropy = self.randomness.capture(beacon)?;
        self.server_url = Some(server_url.to_string());

        Ok(vec![GameEvent::EntropyCaptured {
            game_id: self.id,
            checkpoint: self.randomness.checkpoint().unwrap_or_default(),
            entropy,
            server_url: server_url.to_string(),
        }])
    }

    pub fn reveal(
        &mut self,
        caller: AccountId,
        secret: &[u8],
        beacon: &dyn EntropyBeacon,
    ) -> Result<Vec<GameEvent>> {
        self.require(caller, Role::Gamemaster)?;

        let randomness = self.randomness.reveal(secret, beacon)?;

        Ok(vec![GameEvent::HashRevealed {
            game_id: self.id,
            randomness,
        }])
    }

    /// Add `caller` as a player. Funds are collected by the registry.
    pub fn join(&mut self, caller: AccountId, payment: Amount) -> Result<Vec<GameEvent>> {
        if !matches!(self.lifecycle, Lifecycle::Open { .. }) {
            return Err(ContestError::invalid_state("game is not open for joining"));
        }

        let position = self.ledger.join(caller, payment)?;

        Ok(vec![GameEvent::PlayerJoined {
            game_id: self.id,
            player: caller,
            position,
        }])
    }

    /// Close the game and freeze `map_size = 1 + 4 * |players|`.
    ///
    /// Only the creator may close, unless the game counts as abandoned.
    pub fn close(
        &mut self,
        caller: AccountId,
        now: DateTime<Utc>,
        guard: &TimeoutGuard,
    ) -> Result<Vec<GameEvent>> {
        let opened_at = match self.lifecycle {
            Lifecycle::Open { opened_at } => opened_at,
            Lifecycle::Created => return Err(ContestError::invalid_state("game is not open")),
            Lifecycle::Closed { .. } => {
                return Err(ContestError::invalid_state("game already closed"))
            }
        };

        if caller != self.creator {
            if !guard.is_abandoned(opened_at, self.ledger.player_count(), now) {
                return Err(ContestError::unauthorized(self.id, caller, Role::Creator));
            }
            tracing::info!(
                "Game {} abandoned by creator, closed by {}",
                self.id,
                caller.short()
            );
        }

        let map_size = map_size_for(self.ledger.player_count())?;
        self.lifecycle = self.lifecycle.close(now, map_size)?;

        Ok(vec![GameEvent::GameClosed {
            game_id: self.id,
            closed_at: now,
            map_size,
        }])
    }

    /// Settle through payout. The settlement is recorded here, before any funds move.
    pub fn settle_payout(
        &mut self,
        caller: AccountId,
        winners: &[AccountId],
    ) -> Result<PayoutPlan> {
        self.require(caller, Role::Gamemaster)?;

        match self.settlement {
            Settlement::Unsettled => {}
            Settlement::PaidOut { .. } => return Err(ContestError::AlreadyPaidOut),
            Settlement::Withdrawing { .. } => return Err(ContestError::WithdrawalModeActive),
        }

        if !matches!(self.lifecycle, Lifecycle::Closed { .. }) {
            return Err(ContestError::invalid_state("game must be closed before payout"));
        }

        if self.ledger.player_count() == 0 {
            return Err(ContestError::NoPlayers);
        }

        if winners.iter().any(AccountId::is_zero) {
            return Err(ContestError::ZeroIdentity);
        }

        let plan = self.payouts.plan(self.ledger.pool()?, winners)?;

        self.settlement = Settlement::PaidOut {
            winners: plan.winners.clone(),
            per_winner: plan.per_winner,
            operator_cut: plan.operator_cut,
            remainder: plan.remainder,
        };

        Ok(plan)
    }

    /// Reclaim the caller's stake once the gamemaster missed the payout timeout.
    ///
    /// The first successful call switches the game into withdrawal mode, which
    /// permanently blocks payout.
    pub fn withdraw(
        &mut self,
        caller: AccountId,
        now: DateTime<Utc>,
        guard: &TimeoutGuard,
    ) -> Result<(Withdrawal, Vec<GameEvent>)> {
        let closed_at = match self.lifecycle {
            Lifecycle::Closed { closed_at, .. } => closed_at,
            Lifecycle::Created | Lifecycle::Open { .. } => {
                return Err(ContestError::invalid_state("game is not closed"))
            }
        };

        if !self.ledger.contains(&caller) {
            return Err(ContestError::unauthorized(self.id, caller, Role::Player));
        }

        if self.ledger.has_withdrawn(&caller) {
            return Err(ContestError::AlreadyWithdrawn(caller));
        }

        let mut events = Vec::new();
        let started_withdrawal_mode = match self.settlement {
            Settlement::PaidOut { .. } => return Err(ContestError::AlreadyPaidOut),
            Settlement::Withdrawing { .. } => false,
            Settlement::Unsettled => {
                if !guard.withdrawal_allowed(closed_at, now) {
                    return Err(ContestError::PayoutTimeoutNotElapsed);
                }
                self.settlement = Settlement::Withdrawing { started_at: now };
                events.push(GameEvent::WithdrawalPeriodStarted {
                    game_id: self.id,
                    started_at: now,
                });
                true
            }
        };

        let amount = self.ledger.mark_withdrawn(&caller)?;
        events.push(GameEvent::PlayerWithdrew {
            game_id: self.id,
            player: caller,
            amount,
        });

        Ok((
            Withdrawal {
                amount,
                started_withdrawal_mode,
            },
            events,
        ))
    }

    fn require(&self, caller: AccountId, role: Role) -> Result<()> {
        let allowed = match role {
            Role::Gamemaster => caller == self.gamemaster,
            Role::Creator => caller == self.creator,
            Role::Player => self.ledger.contains(&caller),
        };

        if allowed {
            Ok(())
        } else {
            Err(ContestError::unauthorized(self.id, caller, role))
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn creator(&self) -> AccountId {
        self.creator
    }

    pub fn gamemaster(&self) -> AccountId {
        self.gamemaster
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn operator_fee_divisor(&self) -> u64 {
        self.payouts.operator_fee_divisor()
    }

    pub fn stake(&self) -> Amount {
        self.ledger.stake()
    }

    pub fn players(&self) -> &[AccountId] {
        self.ledger.players()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn settlement(&self) -> &Settlement {
        &self.settlement
    }

    pub fn commit_reveal(&self) -> &CommitReveal {
        &self.randomness
    }

    pub fn ledger(&self) -> &StakeLedger {
        &self.ledger
    }

    pub fn server_url(&self) -> Option<&str> {
        self.server_url.as_deref()
    }

    pub fn has_opened(&self) -> bool {
        !matches!(self.lifecycle, Lifecycle::Created)
    }

    pub fn has_closed(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Closed { .. })
    }

    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        match self.lifecycle {
            Lifecycle::Created => None,
            Lifecycle::Open { opened_at } | Lifecycle::Closed { opened_at, .. } => Some(opened_at),
        }
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        match self.lifecycle {
            Lifecycle::Closed { closed_at, .. } => Some(closed_at),
            _ => None,
        }
    }

    pub fn map_size(&self) -> Option<u64> {
        match self.lifecycle {
            Lifecycle::Closed { map_size, .. } => Some(map_size),
            _ => None,
        }
    }

    pub fn is_paid_out(&self) -> bool {
        matches!(self.settlement, Settlement::PaidOut { .. })
    }

    pub fn withdrawal_mode_active(&self) -> bool {
        matches!(self.settlement, Settlement::Withdrawing { .. })
    }

    /// Inputs for the off-chain map generator, once they are final.
    pub fn map_seed(&self) -> Result<MapSeed> {
        let map_size = self
            .map_size()
            .ok_or_else(|| ContestError::invalid_state("map size is fixed when the game closes"))?;
        let randomness = self
            .randomness
            .randomness()
            .ok_or_else(|| ContestError::invalid_state("randomness not revealed yet"))?;

        Ok(MapSeed {
            randomness,
            map_size,
            players: self.players().to_vec(),
        })
    }

    pub fn info(&self) -> GameInfo {
        let (winners, payout_per_winner) = match &self.settlement {
            Settlement::PaidOut {
                winners,
                per_winner,
                ..
            } => (winners.clone(), Some(*per_winner)),
            _ => (Vec::new(), None),
        };

        GameInfo {
            id: self.id,
            creator: self.creator,
            gamemaster: self.gamemaster,
            stake: self.stake(),
            players: self.players().to_vec(),
            has_opened: self.has_opened(),
            has_closed: self.has_closed(),
            opened_at: self.opened_at(),
            closed_at: self.closed_at(),
            map_size: self.map_size(),
            has_committed: self.randomness.is_committed(),
            committed_hash: self.randomness.committed_hash(),
            commit_checkpoint: self.randomness.checkpoint(),
            has_captured_entropy: self.randomness.has_captured_entropy(),
            captured_entropy: self.randomness.entropy(),
            has_revealed: self.randomness.is_revealed(),
            reveal_secret: self.randomness.secret().map(hex::encode),
            derived_randomness: self.randomness.randomness(),
            server_url: self.server_url.clone(),
            winners,
            payout_per_winner,
            has_paid_out: self.is_paid_out(),
            withdrawal_mode_active: self.withdrawal_mode_active(),
            withdrawn: self.ledger.withdrawn().iter().copied().collect(),
        }
    }
}

/// `1 + 4 * players`
pub fn map_size_for(player_count: usize) -> Result<u64> {
    u64::try_from(player_count)
        .ok()
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| ContestError::Overflow("map size".to_string()))
}

/// Flat read-only view of a game for off-chain collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub id: GameId,
    pub creator: AccountId,
    pub gamemaster: AccountId,
    pub stake: Amount,
    pub players: Vec<AccountId>,
    pub has_opened: bool,
    pub has_closed: bool,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub map_size: Option<u64>,
    pub has_committed: bool,
    pub committed_hash: Option<Hash32>,
    pub commit_checkpoint: Option<u64>,
    pub has_captured_entropy: bool,
    pub captured_entropy: Option<Hash32>,
    pub has_revealed: bool,
    pub reveal_secret: Option<String>,
    pub derived_randomness: Option<Hash32>,
    pub server_url: Option<String>,
    pub winners: Vec<AccountId>,
    pub payout_per_winner: Option<Amount>,
    pub has_paid_out: bool,
    pub withdrawal_mode_active: bool,
    pub withdrawn: Vec<AccountId>,
}
