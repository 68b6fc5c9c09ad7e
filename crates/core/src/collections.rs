//! Read/write access to collection payloads in the local store.

use std::sync::Arc;

use log::warn;
use serde_json::Value;

use crate::context::{resolve_key, OrganizationProvider};
use crate::errors::Result;
use crate::storage::LocalStore;

/// Collection payload access, namespaced to the active organization.
///
/// Collections written before organization namespacing existed live under
/// their bare registry names; those are the residual legacy source read by
/// the sync orchestrator.
pub struct CollectionStore {
    store: Arc<dyn LocalStore>,
    organizations: Arc<dyn OrganizationProvider>,
}

impl CollectionStore {
    pub fn new(store: Arc<dyn LocalStore>, organizations: Arc<dyn OrganizationProvider>) -> Self {
        Self {
            store,
            organizations,
        }
    }

    /// Namespaced storage key for a collection.
    pub fn key_for(&self, name: &str) -> String {
        resolve_key(self.organizations.as_ref(), name)
    }

    /// Read the working copy of a collection.
    ///
    /// Missing, unreadable, or corrupt payloads degrade to an empty list so
    /// one bad collection never takes down a whole-dataset operation.
    pub fn read(&self, name: &str) -> Vec<Value> {
        self.read_key(&self.key_for(name), name)
    }

    /// Read the residual legacy (pre-namespacing) copy of a collection.
    pub fn read_legacy(&self, name: &str) -> Vec<Value> {
        self.read_key(name, name)
    }

    /// Overwrite the working copy of a collection.
    pub fn write(&self, name: &str, rows: &[Value]) -> Result<()> {
        let payload = serde_json::to_string(rows)?;
        self.store.set(&self.key_for(name), &payload)?;
        Ok(())
    }

    /// Drop the residual legacy copy of a collection.
    pub fn clear_legacy(&self, name: &str) -> Result<()> {
        self.store.remove(name)?;
        Ok(())
    }

    fn read_key(&self, key: &str, name: &str) -> Vec<Value> {
        let raw = match self.store.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!("Failed to read collection '{}': {}", name, err);
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(rows) => rows,
            Err(err) => {
                warn!("Collection '{}' is corrupt, treating it as empty: {}", name, err);
                Vec::new()
            }
        }
    }
}
