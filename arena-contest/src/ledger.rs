use crate::{ContestError, Result};
use arena_core::{AccountId, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who joined a game, in join order, and who has reclaimed their stake.
///
/// Join order is kept as-is: the off-chain map generator seeds starting
/// positions from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeLedger {
    stake: Amount,
    players: Vec<AccountId>,
    withdrawn: BTreeSet<AccountId>,
}

impl StakeLedger {
    pub fn new(stake: Amount) -> Self {
        Self {
            stake,
            players: Vec::new(),
            withdrawn: BTreeSet::new(),
        }
    }

    pub fn stake(&self) -> Amount {
        self.stake
    }

    pub fn players(&self) -> &[AccountId] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.players.contains(account)
    }

    pub fn has_withdrawn(&self, account: &AccountId) -> bool {
        self.withdrawn.contains(account)
    }

    pub fn withdrawn(&self) -> &BTreeSet<AccountId> {
        &self.withdrawn
    }

    /// Total ever escrowed: `stake * |players|`.
    pub fn pool(&self) -> Result<Amount> {
        let count = u64::try_from(self.players.len())
            .map_err(|_| ContestError::Overflow("player count".to_string()))?;
        self.stake
            .checked_mul(count)
            .ok_or_else(|| ContestError::Overflow("stake pool".to_string()))
    }

    /// Record a join paid with exactly the stake. Returns the player's 0-based position.
    pub fn join(&mut self, player: AccountId, payment: Amount) -> Result<usize> {
        if player.is_zero() {
            return Err(ContestError::ZeroIdentity);
        }

        if payment != self.stake {
            return Err(ContestError::WrongStake {
                need: self.stake.to_sat(),
                got: payment.to_sat(),
            });
        }

        if self.contains(&player) {
            return Err(ContestError::AlreadyJoined(player));
        }

        self.players.push(player);
        Ok(self.players.len() - 1)
    }

    /// Mark a player's stake as reclaimed. Returns the amount owed to them.
    pub fn mark_withdrawn(&mut self, player: &AccountId) -> Result<Amount> {
        if !self.contains(player) {
            return Err(ContestError::NotAPlayer(*player));
        }

        if !self.withdrawn.insert(*player) {
            return Err(ContestError::AlreadyWithdrawn(*player));
        }

        Ok(self.stake)
    }
}
