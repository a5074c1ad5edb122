//! Runtime configuration for the ledger core.
//!
//! Owns the `CoreConfig` data structure plus disk persistence helpers.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, Result};

const TMP_SUFFIX: &str = "tmp";

/// Tunable limits for ledger operations and the scheduled jobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    /// Soft floor an account balance may reach through debit expense
    /// creation. Checked only at expense-creation time, not globally.
    pub overdraft_floor: f64,
    /// Maximum write operations committed per batch by the scheduled jobs.
    /// Kept under the store's 500-operation hard ceiling.
    pub batch_size: usize,
    /// Attempts before a conflicting store transaction gives up.
    pub max_transaction_retries: u32,
    /// Base directory for the JSON storage backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            overdraft_floor: -10_000.0,
            batch_size: 400,
            max_transaction_retries: 5,
            data_dir: None,
        }
    }
}

impl CoreConfig {
    /// Resolves the directory that holds the config file and ledger data.
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ledger_core")
        })
    }

    /// Loads the config from `path`, falling back to defaults when absent.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let data = fs::read_to_string(path)?;
            serde_json::from_str(&data).map_err(|err| CoreError::Config(err.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// Persists the config as pretty JSON with an atomic tempfile rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| CoreError::Config(err.to_string()))?;
        write_atomic(path, &json)
    }
}

pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".");
    os.push(TMP_SUFFIX);
    PathBuf::from(os)
}
