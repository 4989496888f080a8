//! Tunables for the low-S search, signing and change calculation.

use serde::{Deserialize, Serialize};

use bsv_transaction::sighash::{SIGHASH_ALL_FORKID, SIGHASH_FORKID};

use crate::PushTxError;

/// Default cap on lock-time malleation attempts.
pub const DEFAULT_MAX_MALLEATION_ATTEMPTS: u32 = 1_000_000;

/// Default fee rate for P2PKH-funded transactions.
pub const DEFAULT_FEE_RATE_SAT_PER_KB: u64 = 500;

/// Default fee for transactions funded by a non-P2PKH output.
pub const DEFAULT_FLAT_FEE: u64 = 500;

/// Configuration for building and signing push-tx transactions.
///
/// Every field has a default, so a JSON document only needs the fields it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushTxConfig {
    /// Maximum lock-time values to try before giving up.
    pub max_malleation_attempts: u32,
    /// Sighash flags for push-tx signatures. Must include FORKID.
    pub sighash_flag: u32,
    /// Change fee rate when the funding output is P2PKH.
    pub fee_rate_sat_per_kb: u64,
    /// Fee subtracted when the funding output is not P2PKH.
    pub flat_fee: u64,
    /// Treat every non-P2PKH locking script as push-tx.
    pub permissive_template_detection: bool,
}

impl Default for PushTxConfig {
    fn default() -> Self {
        Self {
            max_malleation_attempts: DEFAULT_MAX_MALLEATION_ATTEMPTS,
            sighash_flag: SIGHASH_ALL_FORKID,
            fee_rate_sat_per_kb: DEFAULT_FEE_RATE_SAT_PER_KB,
            flat_fee: DEFAULT_FLAT_FEE,
            permissive_template_detection: false,
        }
    }
}

impl PushTxConfig {
    /// Parse a configuration from JSON and validate it.
    ///
    /// # Arguments
    /// * `json` - A JSON object; missing fields take their defaults.
    ///
    /// # Returns
    /// The validated config, or `InvalidConfig`.
    pub fn from_json(json: &str) -> Result<Self, PushTxError> {
        let config: PushTxConfig =
            serde_json::from_str(json).map_err(|e| PushTxError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field is in range.
    ///
    /// # Returns
    /// `Ok(())`, or `InvalidConfig` naming the first bad field.
    pub fn validate(&self) -> Result<(), PushTxError> {
        if self.max_malleation_attempts == 0 {
            return Err(PushTxError::InvalidConfig(
                "max_malleation_attempts must be at least 1".to_string(),
            ));
        }
        if self.sighash_flag > 0xff {
            return Err(PushTxError::InvalidConfig(format!(
                "sighash_flag {:#x} does not fit in one byte",
                self.sighash_flag
            )));
        }
        if self.sighash_flag & SIGHASH_FORKID == 0 {
            return Err(PushTxError::InvalidConfig(format!(
                "sighash_flag {:#x} is missing FORKID",
                self.sighash_flag
            )));
        }
        Ok(())
    }
}
