//! Collection registry and remotely synced entity types.

use serde::{Deserialize, Serialize};

/// Canonical list of local collections covered by snapshots and backups.
///
/// Every snapshot operation iterates exactly this list, never whatever keys
/// happen to exist in storage.
pub const COLLECTIONS: [&str; 8] = [
    "clients",
    "loans",
    "loan_products",
    "repayments",
    "savings_accounts",
    "expenses",
    "guarantors",
    "payees",
];

/// Entity types pushed to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Client,
    LoanProduct,
    Loan,
}

impl EntityType {
    /// Remote push order: loans reference clients and loan products, so both
    /// referenced types go first.
    pub const SYNC_ORDER: [EntityType; 3] = [
        EntityType::Client,
        EntityType::LoanProduct,
        EntityType::Loan,
    ];

    /// Registry collection backing this entity type.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityType::Client => "clients",
            EntityType::LoanProduct => "loan_products",
            EntityType::Loan => "loans",
        }
    }

    /// Canonical identifier prefix for records of this type.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityType::Client => "CL",
            EntityType::LoanProduct => "LP",
            EntityType::Loan => "LN",
        }
    }
}
