//! Dependency-ordered push orchestration with partial-failure reporting.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use tokio::sync::Mutex;

use loanbook_core::collections::CollectionStore;
use loanbook_core::context::OrganizationProvider;
use loanbook_core::merge::merge_by_key;
use loanbook_core::records::record_id;
use loanbook_core::registry::EntityType;
use loanbook_core::storage::LocalStore;

use crate::error::{Result, SyncError};
use crate::report::{EntityTypeReport, LocalDataCounts, SyncFailure, SyncReport};
use crate::writer::RemoteEntityWriter;

/// Placeholder identifier recorded for records that carry no string id.
const UNIDENTIFIED_RECORD: &str = "<missing id>";

/// Drives per-entity-type, per-record synchronization against the remote
/// store.
///
/// Entity types are pushed strictly in [`EntityType::SYNC_ORDER`], records
/// within a type strictly in collection order, each call awaited before the
/// next, so a referenced entity always reaches the remote store before its
/// dependents. Individual failures never abort the batch.
pub struct SyncOrchestrator {
    collections: CollectionStore,
    writers: HashMap<EntityType, Arc<dyn RemoteEntityWriter>>,
    in_flight: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn LocalStore>,
        organizations: Arc<dyn OrganizationProvider>,
        writers: Vec<Arc<dyn RemoteEntityWriter>>,
    ) -> Self {
        Self {
            collections: CollectionStore::new(store, organizations),
            writers: writers
                .into_iter()
                .map(|writer| (writer.entity(), writer))
                .collect(),
            in_flight: Mutex::new(()),
        }
    }

    /// True when any residual legacy collection still holds records.
    pub fn check_sync_needed(&self) -> bool {
        EntityType::SYNC_ORDER
            .iter()
            .any(|entity| !self.collections.read_legacy(entity.collection()).is_empty())
    }

    /// Record counts of the namespaced working collections.
    pub fn local_data_counts(&self) -> LocalDataCounts {
        LocalDataCounts {
            clients: self.collections.read(EntityType::Client.collection()).len(),
            loans: self.collections.read(EntityType::Loan.collection()).len(),
            loan_products: self
                .collections
                .read(EntityType::LoanProduct.collection())
                .len(),
        }
    }

    /// Push the working dataset to the remote store.
    ///
    /// Each working collection is first merged with its residual legacy
    /// counterpart (working copy wins on id collision). A trigger that
    /// arrives while a run is in flight is rejected with
    /// [`SyncError::InFlight`] instead of interleaving two runs.
    pub async fn ensure_sync(
        &self,
        clients: &[Value],
        loans: &[Value],
        loan_products: &[Value],
    ) -> Result<SyncReport> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Sync requested while a run is in flight, dropping the trigger");
            return Err(SyncError::InFlight);
        };

        let working: HashMap<EntityType, &[Value]> = HashMap::from([
            (EntityType::Client, clients),
            (EntityType::LoanProduct, loan_products),
            (EntityType::Loan, loans),
        ]);

        let mut report = SyncReport::default();
        for entity in EntityType::SYNC_ORDER {
            let writer = self
                .writers
                .get(&entity)
                .ok_or(SyncError::MissingWriter(entity.collection()))?;

            let legacy = self.collections.read_legacy(entity.collection());
            let records = merge_by_key(working[&entity], &legacy, "id");

            let mut synced = 0;
            let mut failed = 0;
            for record in &records {
                let record_id = record_id(record).unwrap_or(UNIDENTIFIED_RECORD).to_string();
                match writer.create_or_update(record).await {
                    Ok(true) => synced += 1,
                    Ok(false) => {
                        failed += 1;
                        report.failures.push(SyncFailure {
                            entity,
                            record_id,
                            message: "remote store rejected the record".to_string(),
                        });
                    }
                    Err(message) => {
                        failed += 1;
                        report.failures.push(SyncFailure {
                            entity,
                            record_id,
                            message,
                        });
                    }
                }
            }

            if failed == 0 && !legacy.is_empty() {
                // Everything the legacy copy held is now remote; drop it so
                // the next run has nothing left to reconcile.
                if let Err(err) = self.collections.clear_legacy(entity.collection()) {
                    warn!(
                        "Failed to clear legacy collection '{}': {}",
                        entity.collection(),
                        err
                    );
                }
            }

            report.total_records += records.len();
            report.success_count += synced;
            report.error_count += failed;
            report.breakdown.push(EntityTypeReport {
                entity,
                total: records.len(),
                synced,
                failed,
            });
        }

        report.success = report.error_count == 0;
        info!(
            "Sync finished: {}/{} records pushed, {} failed",
            report.success_count, report.total_records, report.error_count
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use loanbook_core::context::{StoreOrganizationProvider, CURRENT_ORGANIZATION_KEY};
    use loanbook_core::storage::MemoryStore;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Scripted writer: records every call, fails configured ids.
    struct ScriptedWriter {
        entity: EntityType,
        reject_ids: HashSet<String>,
        error_ids: HashSet<String>,
        delay: Option<Duration>,
        calls: Arc<StdMutex<Vec<(EntityType, String)>>>,
    }

    impl ScriptedWriter {
        fn new(entity: EntityType, calls: Arc<StdMutex<Vec<(EntityType, String)>>>) -> Self {
            Self {
                entity,
                reject_ids: HashSet::new(),
                error_ids: HashSet::new(),
                delay: None,
                calls,
            }
        }
    }

    #[async_trait]
    impl RemoteEntityWriter for ScriptedWriter {
        fn entity(&self) -> EntityType {
            self.entity
        }

        async fn create_or_update(&self, record: &Value) -> std::result::Result<bool, String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let id = record_id(record).unwrap_or("?").to_string();
            self.calls.lock().unwrap().push((self.entity, id.clone()));
            if self.error_ids.contains(&id) {
                return Err(format!("remote create failed for {}", id));
            }
            Ok(!self.reject_ids.contains(&id))
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        calls: Arc<StdMutex<Vec<(EntityType, String)>>>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            store
                .set(CURRENT_ORGANIZATION_KEY, r#"{"id":"org-1","name":"Acme"}"#)
                .unwrap();
            Self {
                store,
                calls: Arc::new(StdMutex::new(Vec::new())),
            }
        }

        fn orchestrator_with(
            &self,
            configure: impl Fn(&mut ScriptedWriter),
        ) -> SyncOrchestrator {
            let writers = EntityType::SYNC_ORDER
                .iter()
                .map(|entity| {
                    let mut writer = ScriptedWriter::new(*entity, self.calls.clone());
                    configure(&mut writer);
                    Arc::new(writer) as Arc<dyn RemoteEntityWriter>
                })
                .collect();
            let provider = Arc::new(StoreOrganizationProvider::new(self.store.clone()));
            SyncOrchestrator::new(self.store.clone(), provider, writers)
        }

        fn orchestrator(&self) -> SyncOrchestrator {
            self.orchestrator_with(|_| {})
        }
    }

    fn clients3() -> Vec<Value> {
        vec![
            json!({"id": "CL001", "name": "Ade"}),
            json!({"id": "CL002", "name": "Jane"}),
            json!({"id": "CL003", "name": "Wanjiru"}),
        ]
    }

    #[tokio::test]
    async fn partial_failure_is_aggregated_not_fatal() {
        let harness = Harness::new();
        let orchestrator = harness.orchestrator_with(|writer| {
            if writer.entity == EntityType::Client {
                writer.error_ids.insert("CL002".to_string());
            }
        });

        let report = orchestrator
            .ensure_sync(&clients3(), &[], &[])
            .await
            .unwrap();

        assert!(!report.success);
        assert_eq!(report.total_records, 3);
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].record_id, "CL002");
        // Iteration continued past the failure.
        assert_eq!(harness.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn falsy_results_count_as_failures_too() {
        let harness = Harness::new();
        let orchestrator = harness.orchestrator_with(|writer| {
            if writer.entity == EntityType::Client {
                writer.reject_ids.insert("CL001".to_string());
            }
        });

        let report = orchestrator
            .ensure_sync(&clients3(), &[], &[])
            .await
            .unwrap();
        assert_eq!(report.error_count, 1);
        assert_eq!(report.failures[0].message, "remote store rejected the record");
    }

    #[tokio::test]
    async fn entity_types_push_in_dependency_order() {
        let harness = Harness::new();
        let orchestrator = harness.orchestrator();

        let clients = vec![json!({"id": "CL001"})];
        let products = vec![json!({"id": "LP001"})];
        let loans = vec![json!({"id": "LN001", "clientId": "CL001"})];
        orchestrator
            .ensure_sync(&clients, &loans, &products)
            .await
            .unwrap();

        let calls = harness.calls.lock().unwrap();
        let entities: Vec<EntityType> = calls.iter().map(|(entity, _)| *entity).collect();
        assert_eq!(
            entities,
            vec![EntityType::Client, EntityType::LoanProduct, EntityType::Loan]
        );
    }

    #[tokio::test]
    async fn residual_legacy_records_are_merged_and_cleared() {
        let harness = Harness::new();
        let legacy_id = uuid::Uuid::new_v4().to_string();
        harness
            .store
            .set(
                "clients",
                &format!(
                    r#"[{{"id":"CL001","name":"stale"}},{{"id":"{}","name":"legacy-only"}}]"#,
                    legacy_id
                ),
            )
            .unwrap();
        let orchestrator = harness.orchestrator();
        assert!(orchestrator.check_sync_needed());

        let working = vec![json!({"id": "CL001", "name": "fresh"})];
        let report = orchestrator.ensure_sync(&working, &[], &[]).await.unwrap();

        // CL001 pushed once (working copy wins), the legacy-only record is
        // picked up from the bare key.
        assert_eq!(report.total_records, 2);
        let calls = harness.calls.lock().unwrap();
        let ids: Vec<&str> = calls.iter().map(|(_, id)| id.as_str()).collect();
        assert_eq!(ids, vec!["CL001", legacy_id.as_str()]);
        drop(calls);

        assert_eq!(harness.store.get("clients").unwrap(), None);
        assert!(!orchestrator.check_sync_needed());
    }

    #[tokio::test]
    async fn failed_type_keeps_its_legacy_copy_for_the_next_run() {
        let harness = Harness::new();
        harness
            .store
            .set("clients", r#"[{"id":"CL009"}]"#)
            .unwrap();
        let orchestrator = harness.orchestrator_with(|writer| {
            if writer.entity == EntityType::Client {
                writer.error_ids.insert("CL009".to_string());
            }
        });

        let report = orchestrator.ensure_sync(&[], &[], &[]).await.unwrap();
        assert!(!report.success);
        assert!(orchestrator.check_sync_needed());
    }

    #[tokio::test]
    async fn overlapping_trigger_is_rejected() {
        let harness = Harness::new();
        let orchestrator = Arc::new(harness.orchestrator_with(|writer| {
            writer.delay = Some(Duration::from_millis(150));
        }));

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let clients = vec![json!({"id": "CL001"})];
                orchestrator.ensure_sync(&clients, &[], &[]).await
            })
        };

        tokio::time::sleep(Duration::from_millis(40)).await;
        let second = orchestrator.ensure_sync(&[], &[], &[]).await;
        assert!(matches!(second, Err(SyncError::InFlight)));

        let report = first.await.unwrap().unwrap();
        assert!(report.success);
        assert_eq!(report.total_records, 1);
    }

    #[tokio::test]
    async fn local_data_counts_read_the_working_store() {
        let harness = Harness::new();
        harness
            .store
            .set("org-1_clients", r#"[{"id":"CL001"},{"id":"CL002"}]"#)
            .unwrap();
        harness
            .store
            .set("org-1_loans", r#"[{"id":"LN001"}]"#)
            .unwrap();
        let orchestrator = harness.orchestrator();

        let counts = orchestrator.local_data_counts();
        assert_eq!(counts.clients, 2);
        assert_eq!(counts.loans, 1);
        assert_eq!(counts.loan_products, 0);
    }

    #[tokio::test]
    async fn empty_dataset_syncs_successfully_with_zero_effect() {
        let harness = Harness::new();
        let orchestrator = harness.orchestrator();
        let report = orchestrator.ensure_sync(&[], &[], &[]).await.unwrap();
        assert!(report.success);
        assert_eq!(report.total_records, 0);
        assert_eq!(report.breakdown.len(), 3);
    }
}
