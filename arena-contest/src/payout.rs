use crate::{ContestError, Result};
use arena_core::{AccountId, Amount};
use serde::{Deserialize, Serialize};

/// How a pool is split between the operator and the winners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutPlan {
    pub pool: Amount,
    pub operator_cut: Amount,
    pub winners: Vec<AccountId>,
    pub per_winner: Amount,
    /// Integer-division dust that stays in escrow.
    pub remainder: Amount,
}

impl PayoutPlan {
    pub fn distributed(&self) -> Amount {
        self.pool - self.remainder
    }
}

/// Splits a game's pool: `cut = pool / divisor`, `per_winner = (pool - cut) / |winners|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutEngine {
    operator_fee_divisor: u64,
}

impl PayoutEngine {
    pub fn new(operator_fee_divisor: u64) -> Self {
        Self {
            operator_fee_divisor,
        }
    }

    pub fn operator_fee_divisor(&self) -> u64 {
        self.operator_fee_divisor
    }

    pub fn plan(&self, pool: Amount, winners: &[AccountId]) -> Result<PayoutPlan> {
        if winners.is_empty() {
            return Err(ContestError::NoWinners);
        }

        let winner_count = u64::try_from(winners.len())
            .map_err(|_| ContestError::Overflow("winner count".to_string()))?;

        let operator_cut = pool
            .checked_div(self.operator_fee_divisor)
            .ok_or_else(|| ContestError::Overflow("operator fee divisor is zero".to_string()))?;
        let winners_pool = pool
            .checked_sub(operator_cut)
            .ok_or_else(|| ContestError::Overflow("operator cut exceeds pool".to_string()))?;
        let per_winner = winners_pool
            .checked_div(winner_count)
            .ok_or_else(|| ContestError::Overflow("winner split".to_string()))?;

        if per_winner == Amount::ZERO {
            return Err(ContestError::ZeroPayout);
        }

        let paid_to_winners = per_winner
            .checked_mul(winner_count)
            .ok_or_else(|| ContestError::Overflow("winner total".to_string()))?;
        let remainder = winners_pool
            .checked_sub(paid_to_winners)
            .ok_or_else(|| ContestError::Overflow("winner total exceeds pool".to_string()))?;

        Ok(PayoutPlan {
            pool,
            operator_cut,
            winners: winners.to_vec(),
            per_winner,
            remainder,
        })
    }
}
