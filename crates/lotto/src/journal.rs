//! On-disk record of the most recent lottery deployment per network, so
//! `start`/`enter`/`end` can find the instance across separate harness runs
//! on persistent networks. Dev ledgers keep their own in-process registry
//! and never touch this.

use std::{fs, path::PathBuf};

use alloy_primitives::Address;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// One JSON file per network under the journal directory.
pub struct Deployments {
    dir: PathBuf,
}

impl Default for Deployments {
    fn default() -> Self {
        Self::new("deployments")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    lottery: Address,
}

impl Deployments {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, network: &str) -> PathBuf {
        self.dir.join(format!("{network}.json"))
    }

    /// Records `lottery` as the most recent deployment on `network`,
    /// replacing any previous record.
    pub fn record(&self, network: &str, lottery: Address) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .wrap_err_with(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path(network);
        fs::write(&path, serde_json::to_vec_pretty(&Record { lottery })?)
            .wrap_err_with(|| format!("failed to write {}", path.display()))?;
        debug!(target: "lotto", path = %path.display(), %lottery, "recorded deployment");
        Ok(())
    }

    /// The most recently recorded deployment on `network`, if any.
    pub fn latest(&self, network: &str) -> Result<Option<Address>> {
        let path = self.path(network);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read(&path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let record: Record = serde_json::from_slice(&raw)?;
        Ok(Some(record.lottery))
    }
}
