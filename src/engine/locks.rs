use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tracing::debug;

use crate::{account::AccountNo, store::StoreError};

/// Serializes engine operations per account.
///
/// An operation names every account it is about to touch and gets all of
/// them at once, or none. Operations over disjoint accounts never wait for
/// each other, and two transfers moving money in opposite directions between
/// the same pair of accounts cannot deadlock.
///
/// Requests are served in arrival order per account: a request does not take
/// an account that an older, still waiting request also needs. A transfer
/// waiting for two accounts is therefore not overtaken by a stream of single
/// account operations.
#[derive(Debug)]
pub struct AccountLocks {
    table: Mutex<LockTable>,
    released: Condvar,
    timeout: Duration,
}

#[derive(Debug, Default)]
struct LockTable {
    held: BTreeSet<AccountNo>,
    // ticket -> accounts of a request that has not acquired yet
    waiting: BTreeMap<u64, Vec<AccountNo>>,
    next_ticket: u64,
}

impl LockTable {
    fn blocked(&self, ticket: u64, accounts: &[AccountNo]) -> bool {
        accounts.iter().any(|no| self.held.contains(no))
            || self
                .waiting
                .range(..ticket)
                .any(|(_, older)| older.iter().any(|no| accounts.binary_search(no).is_ok()))
    }
}

/// Releases its accounts when dropped.
#[derive(Debug)]
pub struct AccountsGuard<'a> {
    locks: &'a AccountLocks,
    accounts: Vec<AccountNo>,
}

impl AccountLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
            timeout,
        }
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits until none of `accounts` is held or claimed by an older request,
    /// up to the configured timeout.
    pub fn lock(&self, accounts: &[AccountNo]) -> Result<AccountsGuard<'_>, StoreError> {
        let mut accounts = accounts.to_vec();
        accounts.sort_unstable();
        accounts.dedup();

        let mut table = self.table();
        let ticket = table.next_ticket;
        table.next_ticket += 1;
        table.waiting.insert(ticket, accounts.clone());

        let (mut table, _) = self
            .released
            .wait_timeout_while(table, self.timeout, |table| {
                table.blocked(ticket, &accounts)
            })
            .unwrap_or_else(PoisonError::into_inner);
        table.waiting.remove(&ticket);

        if table.blocked(ticket, &accounts) {
            drop(table);
            // younger requests may have been queued behind this one
            self.released.notify_all();
            debug!(?accounts, "gave up waiting for account locks");
            return Err(StoreError::Busy);
        }
        table.held.extend(accounts.iter().copied());
        Ok(AccountsGuard {
            locks: self,
            accounts,
        })
    }
}

impl Drop for AccountsGuard<'_> {
    fn drop(&mut self) {
        let mut table = self.locks.table();
        for no in &self.accounts {
            table.held.remove(no);
        }
        drop(table);
        self.locks.released.notify_all();
    }
}
