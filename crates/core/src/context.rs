//! Organization context and storage-key namespacing.

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::storage::LocalStore;

/// Storage key holding the active organization document.
pub const CURRENT_ORGANIZATION_KEY: &str = "current_organization";

/// Namespace used when no organization context is available.
pub const DEFAULT_NAMESPACE: &str = "default";

/// The active tenant. Read-only within the persistence engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Provider of the active organization context.
pub trait OrganizationProvider: Send + Sync {
    fn current_organization(&self) -> Option<Organization>;
}

/// Reads the organization document from the local store.
///
/// Missing or unparsable documents resolve to `None`; a parse failure is
/// logged and treated the same as having no organization.
pub struct StoreOrganizationProvider {
    store: Arc<dyn LocalStore>,
}

impl StoreOrganizationProvider {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }
}

impl OrganizationProvider for StoreOrganizationProvider {
    fn current_organization(&self) -> Option<Organization> {
        let raw = match self.store.get(CURRENT_ORGANIZATION_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(err) => {
                warn!("Failed to read organization context: {}", err);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(organization) => Some(organization),
            Err(err) => {
                warn!(
                    "Stored organization context is unparsable, using the default namespace: {}",
                    err
                );
                None
            }
        }
    }
}

/// Derive the storage key for `base` scoped to the active organization.
///
/// Falls back to [`DEFAULT_NAMESPACE`] when no organization is available.
pub fn resolve_key(provider: &dyn OrganizationProvider, base: &str) -> String {
    let namespace = provider
        .current_organization()
        .map(|organization| organization.id)
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    format!("{}_{}", namespace, base)
}
