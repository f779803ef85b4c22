// Engine configuration: identities arrive as hex, defaults mirror the
// platform's published economics (85/15 sale split, 50/25/15/10 prizes).

use crate::event::{AccountId, ZERO_ACCOUNT};
use crate::tournament::Distribution;
use hex::FromHex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Treasury identity, 32 bytes hex.
    pub treasury_hex: String,
    /// Admin identities, 32 bytes hex each.
    #[serde(default)]
    pub admins_hex: Vec<String>,
    /// Creator share of every sale, in percent.
    #[serde(default = "default_revenue_split")]
    pub revenue_split_percent: u8,
    /// Seed distribution for newly created tournaments.
    #[serde(default)]
    pub default_distribution: Distribution,
}

fn default_revenue_split() -> u8 {
    85
}

/// Validated runtime parameters derived from an EngineConfig.
#[derive(Clone, Debug)]
pub struct EngineParams {
    pub treasury: AccountId,
    pub admins: Vec<AccountId>,
    pub revenue_split_percent: u8,
    pub default_distribution: Distribution,
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<EngineConfig, String> {
        let data = fs::read(path).map_err(|e| format!("{}", e))?;
        serde_json::from_slice::<EngineConfig>(&data).map_err(|e| format!("{}", e))
    }

    pub fn engine_params(&self) -> Result<EngineParams, String> {
        let treasury = parse_account(&self.treasury_hex)?;
        if treasury == ZERO_ACCOUNT {
            return Err("treasury must not be the zero identity".into());
        }
        let mut admins = Vec::with_capacity(self.admins_hex.len());
        for admin_hex in &self.admins_hex {
            admins.push(parse_account(admin_hex)?);
        }
        if self.revenue_split_percent == 0 || self.revenue_split_percent > 100 {
            return Err("revenue_split_percent must be in 1..=100".into());
        }
        if self.default_distribution.total() != 100 {
            return Err("default_distribution must total exactly 100".into());
        }
        Ok(EngineParams {
            treasury,
            admins,
            revenue_split_percent: self.revenue_split_percent,
            default_distribution: self.default_distribution,
        })
    }
}

fn parse_account(hex_str: &str) -> Result<AccountId, String> {
    <[u8; 32]>::from_hex(hex_str)
        .map_err(|_| "invalid account hex (expected 32 bytes)".to_string())
}
