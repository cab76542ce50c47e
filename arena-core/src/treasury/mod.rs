pub mod vault;

pub use vault::Vault;

use crate::error::Result;
use crate::types::AccountId;
use bitcoin::Amount;

/// Fund movement port used by the contest.
///
/// `collect` moves a payment from an account into escrow, `disburse` moves
/// escrowed funds out to a recipient. Either may fail, in which case nothing moved.
pub trait Treasury {
    fn collect(&mut self, from: &AccountId, amount: Amount) -> Result<()>;

    fn disburse(&mut self, to: &AccountId, amount: Amount) -> Result<()>;

    fn escrow_balance(&self) -> Amount;
}
