use crate::error::{ArenaError, Result};
use crate::treasury::Treasury;
use crate::types::AccountId;
use bitcoin::Amount;
use std::collections::{BTreeSet, HashMap};

/// In-memory treasury: account balances plus a single escrow pot.
#[derive(Debug, Clone)]
pub struct Vault {
    balances: HashMap<AccountId, Amount>,
    escrow: Amount,
    refusing: BTreeSet<AccountId>,
}

impl Default for Vault {
    fn default() -> Self {
        Self {
            balances: HashMap::new(),
            escrow: Amount::ZERO,
            refusing: BTreeSet::new(),
        }
    }
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        balances: HashMap<AccountId, Amount>,
        escrow: Amount,
        refusing: BTreeSet<AccountId>,
    ) -> Self {
        Self {
            balances,
            escrow,
            refusing,
        }
    }

    /// Mint funds into an account.
    pub fn credit(&mut self, account: &AccountId, amount: Amount) -> Result<Amount> {
        let balance = self.balance_of(account);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| ArenaError::BalanceOverflow(account.to_string()))?;
        self.balances.insert(*account, updated);
        Ok(updated)
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(Amount::ZERO)
    }

    /// Mark an account as refusing (or accepting again) incoming payments.
    pub fn set_refusing(&mut self, account: &AccountId, refusing: bool) {
        if refusing {
            self.refusing.insert(*account);
        } else {
            self.refusing.remove(account);
        }
    }

    pub fn is_refusing(&self, account: &AccountId) -> bool {
        self.refusing.contains(account)
    }

    pub fn balances(&self) -> &HashMap<AccountId, Amount> {
        &self.balances
    }

    pub fn refusing(&self) -> &BTreeSet<AccountId> {
        &self.refusing
    }
}

impl Treasury for Vault {
    fn collect(&mut self, from: &AccountId, amount: Amount) -> Result<()> {
        let available = self.balance_of(from);
        let remaining = available
            .checked_sub(amount)
            .ok_or(ArenaError::InsufficientFunds {
                need: amount.to_sat(),
                available: available.to_sat(),
            })?;
        let escrow = self
            .escrow
            .checked_add(amount)
            .ok_or_else(|| ArenaError::BalanceOverflow("escrow".to_string()))?;

        self.balances.insert(*from, remaining);
        self.escrow = escrow;
        tracing::debug!("Escrowed {} sats from {}", amount.to_sat(), from.short());
        Ok(())
    }

    fn disburse(&mut self, to: &AccountId, amount: Amount) -> Result<()> {
        if self.refusing.contains(to) {
            return Err(ArenaError::TransferRejected {
                recipient: to.to_string(),
            });
        }

        let escrow = self
            .escrow
            .checked_sub(amount)
            .ok_or(ArenaError::EscrowShortfall {
                need: amount.to_sat(),
                available: self.escrow.to_sat(),
            })?;
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| ArenaError::BalanceOverflow(to.to_string()))?;

        self.escrow = escrow;
        self.balances.insert(*to, balance);
        tracing::debug!("Released {} sats to {}", amount.to_sat(), to.short());
        Ok(())
    }

    fn escrow_balance(&self) -> Amount {
        self.escrow
    }
}
