//! Backup rotation: prune, write, and recover from quota exhaustion.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::context::{resolve_key, OrganizationProvider};
use crate::errors::{Error, Result};
use crate::snapshot::SnapshotService;
use crate::storage::{LocalStore, StoreError};

/// Base key (namespaced on use) under which backups are rotated.
pub const AUTO_BACKUP_KEY_BASE: &str = "auto_backup";

/// Default number of backups kept at any time.
pub const DEFAULT_BACKUP_RETENTION: usize = 2;

/// Default cadence of the backup scheduler.
pub const DEFAULT_BACKUP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Rotation settings.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Maximum number of coexisting backups (at least 1).
    pub retention: usize,
    /// Scheduler cadence.
    pub interval: Duration,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_BACKUP_RETENTION,
            interval: DEFAULT_BACKUP_INTERVAL,
        }
    }
}

/// One persisted backup, newest-first in listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: usize,
}

/// Creates, lists, restores, and prunes rotated backups.
pub struct BackupManager {
    store: Arc<dyn LocalStore>,
    organizations: Arc<dyn OrganizationProvider>,
    snapshots: SnapshotService,
    config: BackupConfig,
}

impl BackupManager {
    pub fn new(
        store: Arc<dyn LocalStore>,
        organizations: Arc<dyn OrganizationProvider>,
        config: BackupConfig,
    ) -> Self {
        Self {
            snapshots: SnapshotService::new(store.clone(), organizations.clone()),
            store,
            organizations,
            config,
        }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Snapshot service bound to the same store and organization context.
    pub fn snapshots(&self) -> &SnapshotService {
        &self.snapshots
    }

    fn key_prefix(&self) -> String {
        format!(
            "{}_",
            resolve_key(self.organizations.as_ref(), AUTO_BACKUP_KEY_BASE)
        )
    }

    /// Existing backup keys with their creation timestamps, newest first.
    fn existing_backups(&self) -> Result<Vec<(String, i64)>> {
        let prefix = self.key_prefix();
        let mut backups: Vec<(String, i64)> = self
            .store
            .list_keys()?
            .into_iter()
            .filter_map(|key| {
                let millis = key.strip_prefix(&prefix)?.parse::<i64>().ok()?;
                Some((key, millis))
            })
            .collect();
        backups.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(backups)
    }

    /// Run one backup cycle stamped with the current time.
    pub fn run_cycle(&self) -> Result<BackupInfo> {
        self.run_cycle_at(Utc::now())
    }

    /// Run one backup cycle: prune to `retention - 1`, then write a snapshot
    /// under a key stamped with `now`.
    ///
    /// A quota rejection triggers the aggressive path: every existing backup
    /// is deleted and the write retried exactly once. Only the retry's
    /// failure surfaces to the caller.
    pub fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<BackupInfo> {
        let keep = self.config.retention.max(1) - 1;
        for (key, _) in self.existing_backups()?.iter().skip(keep) {
            debug!("Pruning backup {}", key);
            self.store.remove(key)?;
        }

        let payload = serde_json::to_string(&self.snapshots.export_snapshot_at(now))?;
        let key = format!("{}{}", self.key_prefix(), now.timestamp_millis());
        let info = BackupInfo {
            key: key.clone(),
            created_at: now,
            size_bytes: payload.len(),
        };

        match self.store.set(&key, &payload) {
            Ok(()) => {
                info!("Backup written under {} ({} bytes)", key, payload.len());
                Ok(info)
            }
            Err(StoreError::QuotaExceeded) => {
                warn!("Backup write hit the storage quota, clearing all backups before retry");
                self.delete_all_backups()?;
                match self.store.set(&key, &payload) {
                    Ok(()) => {
                        info!("Backup retry succeeded under {}", key);
                        Ok(info)
                    }
                    Err(err) => {
                        error!("Backup retry failed: {}", err);
                        Err(Error::backup(format!(
                            "write failed twice despite clearing backups: {}",
                            err
                        )))
                    }
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// All backups, newest first, with derived sizes.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        let mut listed = Vec::new();
        for (key, millis) in self.existing_backups()? {
            let Some(blob) = self.store.get(&key)? else {
                continue;
            };
            let Some(created_at) = Utc.timestamp_millis_opt(millis).single() else {
                continue;
            };
            listed.push(BackupInfo {
                key,
                created_at,
                size_bytes: blob.len(),
            });
        }
        Ok(listed)
    }

    /// Restore one backup through the snapshot import path.
    ///
    /// A missing key or a rejected bundle is reported as `false`, not an
    /// error; only store backend failures propagate.
    pub fn restore(&self, key: &str) -> Result<bool> {
        let Some(blob) = self.store.get(key)? else {
            warn!("Backup {} not found", key);
            return Ok(false);
        };
        match self.snapshots.import_snapshot(&blob) {
            Ok(written) => Ok(written),
            Err(err) => {
                error!("Backup {} could not be restored: {}", key, err);
                Ok(false)
            }
        }
    }

    /// Delete every backup. Returns how many were removed.
    pub fn cleanup_all(&self) -> Result<usize> {
        self.delete_all_backups()
    }

    fn delete_all_backups(&self) -> Result<usize> {
        let backups = self.existing_backups()?;
        let count = backups.len();
        for (key, _) in backups {
            self.store.remove(&key)?;
        }
        Ok(count)
    }
}
