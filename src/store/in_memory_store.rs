use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tracing::debug;

use crate::{
    account::{Account, AccountNo, AccountType, NewAccount},
    customer::{Customer, CustomerId},
    ledger::{LedgerEntry, TransactionId, TransactionRecord},
};

use super::{AccountStore, Changeset, CustomerStore, LedgerStore, StoreError, UnitOfWork};

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<AccountNo, Account>,
    ledger: BTreeMap<AccountNo, Vec<TransactionRecord>>,
    customers: HashMap<CustomerId, Customer>,
    last_account_no: AccountNo,
    last_txn_id: TransactionId,
}

impl Tables {
    fn append(&mut self, entry: LedgerEntry) -> TransactionRecord {
        self.last_txn_id += 1;
        let record = entry.into_record(self.last_txn_id);
        self.ledger
            .entry(record.account_no)
            .or_default()
            .push(record.clone());
        record
    }
}

/// Keeps all tables behind a single lock, so a [`Changeset`] becomes visible
/// all at once.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Unavailable("in-memory tables are poisoned".to_string())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(poisoned)
    }
}

impl AccountStore for InMemoryStore {
    fn get_account(&self, account_no: AccountNo) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&account_no).cloned())
    }

    fn save_account(&self, mut account: Account) -> Result<Account, StoreError> {
        let mut tables = self.write()?;
        let Some(stored) = tables.accounts.get_mut(&account.account_no) else {
            return Err(StoreError::MissingAccount {
                account_no: account.account_no,
            });
        };
        account.version = stored.version + 1;
        *stored = account.clone();
        Ok(account)
    }

    fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.write()?;
        tables.last_account_no += 1;
        let account = account.open(tables.last_account_no);
        tables.accounts.insert(account.account_no, account.clone());
        debug!(account_no = account.account_no, "account inserted");
        Ok(account)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.read()?.accounts.values().cloned().collect())
    }

    fn exists_by_id(&self, account_no: AccountNo) -> Result<bool, StoreError> {
        Ok(self.read()?.accounts.contains_key(&account_no))
    }

    fn exists_by_national_id(&self, national_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .accounts
            .values()
            .any(|acc| acc.national_id == national_id))
    }

    fn exists_by_phone(&self, phone: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.accounts.values().any(|acc| acc.phone == phone))
    }

    fn exists_by_customer_and_type(
        &self,
        customer_id: &str,
        account_type: AccountType,
    ) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .accounts
            .values()
            .any(|acc| acc.customer_id == customer_id && acc.account_type == account_type))
    }
}

impl LedgerStore for InMemoryStore {
    fn append(&self, entry: LedgerEntry) -> Result<TransactionRecord, StoreError> {
        Ok(self.write()?.append(entry))
    }

    fn find_by_account(
        &self,
        account_no: AccountNo,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        Ok(self
            .read()?
            .ledger
            .get(&account_no)
            .cloned()
            .unwrap_or_default())
    }
}

impl CustomerStore for InMemoryStore {
    fn insert_customer(&self, customer: Customer) -> Result<Customer, StoreError> {
        self.write()?
            .customers
            .insert(customer.customer_id.clone(), customer.clone());
        Ok(customer)
    }

    fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, StoreError> {
        Ok(self.read()?.customers.get(customer_id).cloned())
    }
}

impl UnitOfWork for InMemoryStore {
    fn commit(&self, changes: Changeset) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut tables = self.write()?;

        // verify everything before touching anything
        let mut seen = HashSet::new();
        for account in &changes.accounts {
            let Some(stored) = tables.accounts.get(&account.account_no) else {
                return Err(StoreError::MissingAccount {
                    account_no: account.account_no,
                });
            };
            if stored.version != account.version || !seen.insert(account.account_no) {
                return Err(StoreError::Conflict {
                    account_no: account.account_no,
                });
            }
        }

        for mut account in changes.accounts {
            account.version += 1;
            tables.accounts.insert(account.account_no, account);
        }
        let records = changes
            .entries
            .into_iter()
            .map(|entry| tables.append(entry))
            .collect();
        Ok(records)
    }
}
