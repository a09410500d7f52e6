//! Snapshot Repository - JSON persistence for the reputation state
//!
//! The whole state is written to a temporary sibling file and renamed into
//! place, so a crash mid-write leaves the previous snapshot intact.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::reputation::{Principal, ReputationState};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    saved_at: chrono::DateTime<chrono::Utc>,
    state: ReputationState,
}

pub struct SnapshotRepository {
    path: PathBuf,
    /// Serializes writers so an older snapshot never overwrites a newer one
    write_lock: Mutex<()>,
}

impl SnapshotRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hold this while capturing and saving state
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Load the stored state, or `None` if no snapshot exists yet
    pub async fn load(&self) -> Result<Option<ReputationState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No reputation snapshot found, starting empty");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read snapshot {}", self.path.display())
                })
            }
        };

        let file: SnapshotFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("Invalid snapshot {}", self.path.display()))?;

        if file.version != SNAPSHOT_VERSION {
            return Err(anyhow::anyhow!(
                "Unsupported snapshot version {} (expected {})",
                file.version,
                SNAPSHOT_VERSION
            ));
        }

        info!(
            path = %self.path.display(),
            saved_at = %file.saved_at.to_rfc3339(),
            users = file.state.reputations().len(),
            attestations = file.state.attestations().len(),
            "Loaded reputation snapshot"
        );

        Ok(Some(file.state))
    }

    /// Load the stored state for `administrator`, or start empty.
    ///
    /// A snapshot created under a different administrator is rejected.
    pub async fn load_or_new(&self, administrator: &Principal) -> Result<ReputationState> {
        match self.load().await? {
            Some(state) if state.administrator() != administrator => Err(anyhow::anyhow!(
                "Snapshot {} belongs to administrator {}, configured administrator is {}",
                self.path.display(),
                state.administrator(),
                administrator
            )),
            Some(state) => Ok(state),
            None => Ok(ReputationState::new(administrator.clone())),
        }
    }

    pub async fn save(&self, state: &ReputationState) -> Result<()> {
        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            saved_at: chrono::Utc::now(),
            state: state.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file).context("Failed to encode snapshot")?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create snapshot directory {}", parent.display())
                })?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to move snapshot into {}", self.path.display()))?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }
}
