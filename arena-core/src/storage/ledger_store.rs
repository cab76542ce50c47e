use crate::error::Result;
use crate::storage::{from_sql_int, read_meta_u64, to_sql_int, write_meta, Storage};
use crate::treasury::{Treasury, Vault};
use crate::types::AccountId;
use bitcoin::Amount;
use rusqlite::{params, Transaction};
use std::collections::{BTreeSet, HashMap};

const ESCROW: &str = "escrow_sats";

/// Persists the vault: account balances, refusing accounts and the escrow pot.
pub struct LedgerStore<'a> {
    storage: &'a Storage,
}

impl<'a> LedgerStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_vault(&self, vault: &Vault) -> Result<()> {
        self.storage
            .write_atomically(|tx| Self::write_vault(tx, vault))
            .await
    }

    /// Replace the stored vault inside a transaction owned by the caller.
    pub fn write_vault(tx: &Transaction<'_>, vault: &Vault) -> Result<()> {
        tx.execute("DELETE FROM accounts", [])?;
        let accounts: BTreeSet<&AccountId> =
            vault.balances().keys().chain(vault.refusing().iter()).collect();
        for account in accounts {
            tx.execute(
                "INSERT INTO accounts (account, balance, refusing) VALUES (?1, ?2, ?3)",
                params![
                    account.to_string(),
                    to_sql_int(vault.balance_of(account).to_sat())?,
                    vault.is_refusing(account),
                ],
            )?;
        }
        write_meta(tx, ESCROW, &vault.escrow_balance().to_sat().to_string())
    }

    pub async fn load_vault(&self) -> Result<Vault> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare("SELECT account, balance, refusing FROM accounts")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, bool>(2)?,
            ))
        })?;

        let mut balances = HashMap::new();
        let mut refusing = BTreeSet::new();
        for row in rows {
            let (account, balance, is_refusing) = row?;
            let account: AccountId = account.parse()?;
            balances.insert(account, Amount::from_sat(from_sql_int(balance)?));
            if is_refusing {
                refusing.insert(account);
            }
        }

        let escrow = read_meta_u64(&conn, ESCROW)?.unwrap_or(0);
        Ok(Vault::from_parts(balances, Amount::from_sat(escrow), refusing))
    }
}
