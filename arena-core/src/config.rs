use crate::error::{ArenaError, Result};
use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// How long a creator may leave an opened, joined game unclosed before anyone may close it.
    pub creator_timeout: Duration,
    /// How long the gamemaster has to pay out a closed game before players may withdraw.
    pub payout_timeout: Duration,
    /// Receives `pool / operator_fee_divisor` on every payout.
    pub operator: AccountId,
    /// Read when a game is created. Existing games keep the divisor they were created with.
    pub operator_fee_divisor: u64,
    /// Number of checkpoints an entropy sample stays readable after it is produced.
    pub entropy_retention: u64,
    /// Distance between the beacon tip at commit time and the committed sample point.
    pub commit_delay: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            creator_timeout: Duration::from_secs(3600),  // 1 hour
            payout_timeout: Duration::from_secs(86_400), // 24 hours
            operator: AccountId::from_label("operator"),
            operator_fee_divisor: 100,
            entropy_retention: 256,
            commit_delay: 1,
        }
    }
}

impl ArenaConfig {
    pub fn with_operator(operator: AccountId) -> Self {
        Self {
            operator,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.creator_timeout.is_zero() {
            return Err(ArenaError::config("Creator timeout must be greater than 0"));
        }

        if self.payout_timeout.is_zero() {
            return Err(ArenaError::config("Payout timeout must be greater than 0"));
        }

        if self.operator.is_zero() {
            return Err(ArenaError::config("Operator account cannot be the zero identity"));
        }

        if self.operator_fee_divisor == 0 {
            return Err(ArenaError::config("Operator fee divisor must be greater than 0"));
        }

        if self.entropy_retention == 0 {
            return Err(ArenaError::config("Entropy retention must be greater than 0"));
        }

        if self.commit_delay == 0 {
            return Err(ArenaError::config("Commit delay must be greater than 0"));
        }

        Ok(())
    }

    /// Load from a JSON file, writing the defaults there first if it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&config)?)?;
            tracing::info!("Wrote default arena config to {}", path.display());
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
