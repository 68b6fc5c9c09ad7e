//! Snapshot bundle model and the export/import codec.
//!
//! A snapshot is a versioned bundle covering every registry collection.
//! Export is tolerant per collection; import is all-or-nothing on shape so a
//! bad file can never partially overwrite local data.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collections::CollectionStore;
use crate::context::{resolve_key, Organization, OrganizationProvider};
use crate::errors::{Error, Result};
use crate::registry::COLLECTIONS;
use crate::storage::LocalStore;

/// Data-format version written into every exported bundle.
pub const SNAPSHOT_SCHEMA_VERSION: i64 = 2;

/// Base key (namespaced on use) for the stored data-format version tag.
pub const DATA_VERSION_KEY: &str = "data_version";

/// Format tag of the bulk-import export variant.
pub const MIGRATION_EXPORT_FORMAT: &str = "bulk-import/v1";

fn default_schema_version() -> i64 {
    SNAPSHOT_SCHEMA_VERSION
}

/// Versioned full-dataset bundle.
///
/// The collection-name set is always exactly the registry, regardless of
/// what existed in storage at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub exported_at: String,
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(default = "default_schema_version")]
    pub schema_version: i64,
    pub collections: BTreeMap<String, Vec<Value>>,
}

/// A serialized file offered to the user for download.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDownload {
    pub filename: String,
    pub contents: String,
}

/// Snapshot export/import over the namespaced collection store.
pub struct SnapshotService {
    collections: CollectionStore,
    organizations: Arc<dyn OrganizationProvider>,
    store: Arc<dyn LocalStore>,
}

impl SnapshotService {
    pub fn new(store: Arc<dyn LocalStore>, organizations: Arc<dyn OrganizationProvider>) -> Self {
        Self {
            collections: CollectionStore::new(store.clone(), organizations.clone()),
            organizations,
            store,
        }
    }

    /// Access to the underlying collection store.
    pub fn collections(&self) -> &CollectionStore {
        &self.collections
    }

    /// Export a snapshot stamped with the given time.
    ///
    /// A corrupt collection degrades to an empty list and never aborts the
    /// export of the others.
    pub fn export_snapshot_at(&self, now: DateTime<Utc>) -> Snapshot {
        let mut collections = BTreeMap::new();
        for name in COLLECTIONS {
            collections.insert(name.to_string(), self.collections.read(name));
        }
        Snapshot {
            exported_at: now.to_rfc3339(),
            organization: self.organizations.current_organization(),
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            collections,
        }
    }

    /// Export a snapshot stamped with the current time.
    pub fn export_snapshot(&self) -> Snapshot {
        self.export_snapshot_at(Utc::now())
    }

    /// Serialize the full dataset to text.
    pub fn export_all_data(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_snapshot())?)
    }

    /// Import a serialized bundle, overwriting each registry collection it
    /// carries. Collections absent from the bundle are left untouched.
    ///
    /// Fails without writing anything when the bundle lacks a `collections`
    /// container or a present registry collection is not a list. Returns
    /// whether at least one collection was written.
    pub fn import_snapshot(&self, text: &str) -> Result<bool> {
        let bundle: Value = serde_json::from_str(text)?;
        let container = bundle
            .get("collections")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::invalid_snapshot("bundle has no collections container"))?;

        // Validate every present registry collection before the first write.
        for name in COLLECTIONS {
            if let Some(rows) = container.get(name) {
                if !rows.is_array() {
                    return Err(Error::invalid_snapshot(format!(
                        "collection '{}' is not a list",
                        name
                    )));
                }
            }
        }

        let mut written = false;
        for name in COLLECTIONS {
            let Some(rows) = container.get(name) else {
                continue;
            };
            let payload = serde_json::to_string(rows)?;
            self.store.set(&self.collections.key_for(name), &payload)?;
            written = true;
        }

        if let Some(version) = bundle.get("schemaVersion").and_then(Value::as_i64) {
            let key = resolve_key(self.organizations.as_ref(), DATA_VERSION_KEY);
            self.store.set(&key, &version.to_string())?;
        }

        info!("Imported snapshot (wrote data: {})", written);
        Ok(written)
    }

    /// Boundary variant of [`import_snapshot`]: failures are logged and
    /// reported as `false` instead of propagating.
    ///
    /// [`import_snapshot`]: Self::import_snapshot
    pub fn import_backup(&self, text: &str) -> bool {
        match self.import_snapshot(text) {
            Ok(written) => written,
            Err(err) => {
                warn!("Backup import rejected: {}", err);
                false
            }
        }
    }

    /// Serialize the dataset for download. The filename embeds the
    /// organization name and the export timestamp.
    pub fn backup_download(&self) -> Result<SnapshotDownload> {
        let now = Utc::now();
        let snapshot = self.export_snapshot_at(now);
        let organization = snapshot
            .organization
            .as_ref()
            .map(|organization| organization.name.as_str())
            .unwrap_or("loanbook");
        Ok(SnapshotDownload {
            filename: format!(
                "{}_backup_{}.json",
                slugify(organization),
                now.format("%Y-%m-%d_%H-%M-%S")
            ),
            contents: serde_json::to_string_pretty(&snapshot)?,
        })
    }

    /// Alternate flat export intended for bulk import into the remote store:
    /// one `table → rows` entry per registry collection that has rows.
    pub fn migration_export(&self) -> Result<SnapshotDownload> {
        let now = Utc::now();
        let mut tables = serde_json::Map::new();
        for name in COLLECTIONS {
            let rows = self.collections.read(name);
            if !rows.is_empty() {
                tables.insert(name.to_string(), Value::Array(rows));
            }
        }
        let organization = self.organizations.current_organization();
        let name = organization
            .as_ref()
            .map(|organization| organization.name.clone())
            .unwrap_or_else(|| "loanbook".to_string());
        let bundle = serde_json::json!({
            "format": MIGRATION_EXPORT_FORMAT,
            "generatedAt": now.to_rfc3339(),
            "organization": organization,
            "tables": tables,
        });
        Ok(SnapshotDownload {
            filename: format!("{}_bulk_import_{}.json", slugify(&name), now.format("%Y-%m-%d")),
            contents: serde_json::to_string_pretty(&bundle)?,
        })
    }
}

/// Lowercase `name` and collapse anything non-alphanumeric into single dashes.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
