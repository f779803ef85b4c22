// Snapshot persistence: flat rows instead of keyed maps so the JSON form is
// stable and diff-able; writes go through a tmp file and an atomic rename.

use crate::event::{AccountId, SealedEvent};
use crate::marketplace::{Game, Item};
use crate::tournament::{Distribution, Tournament};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnershipRow {
    pub item_id: String,
    pub owner: AccountId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumableRow {
    pub item_id: String,
    pub owner: AccountId,
    pub quantity: u64,
}

/// Full engine state at a point in time. Rows are sorted by the exporters,
/// so equal states serialize identically.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedState {
    pub engine_version: u8,
    pub treasury: AccountId,
    pub admins: Vec<AccountId>,
    pub paused: bool,
    pub revenue_split_percent: u8,
    pub default_distribution: Distribution,
    pub games: Vec<Game>,
    pub items: Vec<Item>,
    pub ownership: Vec<OwnershipRow>,
    pub consumables: Vec<ConsumableRow>,
    pub tournaments: Vec<Tournament>,
    pub events: Vec<SealedEvent>,
}

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, String> {
        fs::create_dir_all(&data_dir).map_err(|e| format!("{}", e))?;
        Ok(Self {
            path: data_dir.as_ref().join("custody_snapshot.json"),
        })
    }

    pub fn load(&self) -> Result<Option<PersistedState>, String> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path).map_err(|e| format!("{}", e))?;
        let state =
            serde_json::from_slice::<PersistedState>(&data).map_err(|e| format!("{}", e))?;
        Ok(Some(state))
    }

    pub fn save(&self, state: &PersistedState) -> Result<(), String> {
        let data = serde_json::to_vec_pretty(state).map_err(|e| format!("{}", e))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data).map_err(|e| format!("{}", e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| format!("{}", e))?;
        Ok(())
    }
}
