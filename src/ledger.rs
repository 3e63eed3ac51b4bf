use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::AccountNo;

pub type TransactionId = u64;

/// Type tag of a ledger record. Always rendered uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Credit => f.write_str("CREDIT"),
            TransactionKind::Debit => f.write_str("DEBIT"),
        }
    }
}

/// A balance change that has not been appended to the ledger yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub account_no: AccountNo,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Stamps the entry with the current time.
    pub fn new(account_no: AccountNo, kind: TransactionKind, amount: Decimal) -> Self {
        Self::at(account_no, kind, amount, Utc::now())
    }

    pub fn at(
        account_no: AccountNo,
        kind: TransactionKind,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            account_no,
            kind,
            amount,
            created_at,
        }
    }

    /// Turns the entry into an immutable record once the store assigned `txn_id`.
    pub fn into_record(self, txn_id: TransactionId) -> TransactionRecord {
        TransactionRecord {
            txn_id,
            account_no: self.account_no,
            txn_type: self.kind,
            amount: self.amount,
            txn_date: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub txn_id: TransactionId,
    pub account_no: AccountNo,
    pub txn_type: TransactionKind,
    pub amount: Decimal,
    #[serde(with = "txn_date_format")]
    pub txn_date: DateTime<Utc>,
}

pub(crate) mod txn_date_format {
    use chrono::{DateTime, Utc};
    use serde::Serializer;

    pub const FORMAT: &str = "%d-%m-%Y %H:%M:%S";

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&date.format(FORMAT))
    }
}
