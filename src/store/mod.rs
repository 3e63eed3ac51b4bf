use thiserror::Error;

use crate::{
    account::{Account, AccountNo, AccountType, NewAccount},
    customer::Customer,
    ledger::{LedgerEntry, TransactionRecord},
};

pub mod in_memory_store;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Timed out waiting for the account to become available")]
    Busy,
    #[error("Account {account_no} was modified concurrently")]
    Conflict { account_no: AccountNo },
    #[error("Account {account_no} does not exist in the store")]
    MissingAccount { account_no: AccountNo },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether repeating the same operation later may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, StoreError::Busy | StoreError::Conflict { .. })
    }
}

pub trait AccountStore: Send + Sync {
    fn get_account(&self, account_no: AccountNo) -> Result<Option<Account>, StoreError>;

    /// Overwrites an existing account. Balance changes go through
    /// [`UnitOfWork::commit`] instead.
    fn save_account(&self, account: Account) -> Result<Account, StoreError>;

    /// Stores a freshly registered account under the next account number.
    fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    fn exists_by_id(&self, account_no: AccountNo) -> Result<bool, StoreError>;

    fn exists_by_national_id(&self, national_id: &str) -> Result<bool, StoreError>;

    fn exists_by_phone(&self, phone: &str) -> Result<bool, StoreError>;

    fn exists_by_customer_and_type(
        &self,
        customer_id: &str,
        account_type: AccountType,
    ) -> Result<bool, StoreError>;
}

pub trait LedgerStore: Send + Sync {
    fn append(&self, entry: LedgerEntry) -> Result<TransactionRecord, StoreError>;

    /// Records of one account, in the order they were appended.
    fn find_by_account(
        &self,
        account_no: AccountNo,
    ) -> Result<Vec<TransactionRecord>, StoreError>;
}

pub trait CustomerStore: Send + Sync {
    fn insert_customer(&self, customer: Customer) -> Result<Customer, StoreError>;

    fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, StoreError>;
}

/// Account updates and ledger entries of a single engine operation.
#[derive(Debug, Default, Clone)]
pub struct Changeset {
    pub accounts: Vec<Account>,
    pub entries: Vec<LedgerEntry>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(mut self, account: Account) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn record(mut self, entry: LedgerEntry) -> Self {
        self.entries.push(entry);
        self
    }
}

pub trait UnitOfWork: Send + Sync {
    /// Applies every account update and appends every ledger entry, or
    /// nothing at all. Each account must still carry the `version` it was
    /// read with; otherwise the commit fails with [`StoreError::Conflict`].
    fn commit(&self, changes: Changeset) -> Result<Vec<TransactionRecord>, StoreError>;
}

/// Everything the engine and the registration flows need from storage.
pub trait Store: AccountStore + LedgerStore + CustomerStore + UnitOfWork {}

impl<T> Store for T where T: AccountStore + LedgerStore + CustomerStore + UnitOfWork {}
