//! Recurring backup scheduling.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::backup::BackupManager;

/// Fires a backup cycle on a fixed interval.
///
/// The first scheduled cycle is deferred by one full interval; startup never
/// pays for a backup. Cycle failures are logged and swallowed so the loop
/// keeps firing; a caller who wants the error runs
/// [`BackupManager::run_cycle`] directly.
pub struct BackupScheduler {
    manager: Arc<BackupManager>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BackupScheduler {
    pub fn new(manager: Arc<BackupManager>) -> Self {
        Self {
            manager,
            task: Mutex::new(None),
        }
    }

    /// Start the recurring cycle. Idempotent: a live task is left untouched.
    pub async fn start(&self) {
        let mut guard = self.task.lock().await;
        if let Some(handle) = guard.as_ref() {
            if !handle.is_finished() {
                debug!("Backup scheduler already running");
                return;
            }
            guard.take();
        }

        let manager = Arc::clone(&self.manager);
        let interval = manager.config().interval;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(err) = manager.run_cycle() {
                    warn!("Scheduled backup cycle failed: {}", err);
                }
            }
        });
        *guard = Some(handle);
    }

    /// Stop the recurring cycle if one is scheduled.
    pub async fn stop(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
        }
    }

    /// Whether a scheduled task is currently live.
    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupConfig;
    use crate::context::{StoreOrganizationProvider, CURRENT_ORGANIZATION_KEY};
    use crate::storage::{LocalStore, MemoryStore};
    use std::time::Duration;

    fn scheduler_with_interval(interval: Duration) -> (Arc<BackupManager>, BackupScheduler) {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        store
            .set(CURRENT_ORGANIZATION_KEY, r#"{"id":"org-1","name":"Acme"}"#)
            .unwrap();
        let provider = Arc::new(StoreOrganizationProvider::new(store.clone()));
        let manager = Arc::new(BackupManager::new(
            store,
            provider,
            BackupConfig {
                retention: 2,
                interval,
            },
        ));
        (manager.clone(), BackupScheduler::new(manager))
    }

    #[tokio::test]
    async fn first_cycle_is_deferred_by_one_interval() {
        let (manager, scheduler) = scheduler_with_interval(Duration::from_millis(200));
        scheduler.start().await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(manager.list_backups().unwrap().is_empty());

        scheduler.stop().await;
    }

    #[tokio::test]
    async fn scheduled_cycles_fire_until_stopped() {
        let (manager, scheduler) = scheduler_with_interval(Duration::from_millis(30));
        scheduler.start().await;

        tokio::time::sleep(Duration::from_millis(140)).await;
        scheduler.stop().await;
        assert!(!manager.list_backups().unwrap().is_empty());
        assert!(!scheduler.is_running().await);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let (_, scheduler) = scheduler_with_interval(Duration::from_secs(3600));
        scheduler.start().await;
        scheduler.start().await;
        assert!(scheduler.is_running().await);

        scheduler.stop().await;
        assert!(!scheduler.is_running().await);
    }
}
