use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CustomerId = String;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub customer_id: CustomerId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_date: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        customer_id: CustomerId,
        draft: CustomerDraft,
        created_date: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id,
            name: draft.name,
            email: draft.email,
            phone: draft.phone,
            created_date,
        }
    }
}

/// Source of fresh customer identifiers. Every call must return an id never
/// returned before by the same generator.
pub trait CustomerIdGenerator: Send + Sync {
    fn next_id(&self) -> CustomerId;
}

/// `CUST001`, `CUST002`, ... from an atomic counter.
#[derive(Debug)]
pub struct SequentialCustomerIds {
    next: AtomicU64,
}

impl SequentialCustomerIds {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialCustomerIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl CustomerIdGenerator for SequentialCustomerIds {
    fn next_id(&self) -> CustomerId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("CUST{n:03}")
    }
}
