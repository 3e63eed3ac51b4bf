//! Credit, debit and transfer over the account and ledger stores.
//!
//! Every operation follows the same shape: validate the input, lock the
//! accounts it touches, read them, apply the change to local copies and hand
//! the copies together with their ledger entries to [`UnitOfWork::commit`].
//! Nothing is written before all checks passed, and the commit either
//! applies the whole [`Changeset`] or nothing.

use std::{sync::Arc, time::Duration};

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    account::{Account, AccountError, AccountNo},
    ledger::{LedgerEntry, TransactionKind, TransactionRecord},
    store::{Changeset, Store, StoreError},
    validation::{Operation, ValidationError, validate_account_number, validate_amount},
};

pub mod locks;

use locks::AccountLocks;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum BankError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    AccountNotFound(String),
    #[error("Insufficient balance. Available: {available:.2}, Requested: {requested:.2}")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },
    #[error("{0}")]
    DuplicateResource(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BankError {
    pub fn account_not_found(account_no: AccountNo) -> Self {
        Self::AccountNotFound(format!(
            "Account not found with account number: {account_no}"
        ))
    }
}

impl From<AccountError> for BankError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InsufficientBalance {
                available,
                requested,
            } => Self::InsufficientBalance {
                available,
                requested,
            },
            err @ AccountError::BelowMinimumReserve { .. } => {
                Self::Validation(ValidationError::new(err.to_string()))
            }
        }
    }
}

/// Outcome of a credit or a debit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub message: String,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferConfirmation {
    pub message: String,
    pub source_balance: Decimal,
    pub destination_balance: Decimal,
}

pub struct TransactionEngine {
    store: Arc<dyn Store>,
    locks: AccountLocks,
}

impl TransactionEngine {
    pub fn new(store: Arc<dyn Store>, lock_timeout: Duration) -> Self {
        Self {
            store,
            locks: AccountLocks::new(lock_timeout),
        }
    }

    fn load(
        &self,
        account_no: AccountNo,
        not_found: impl FnOnce() -> BankError,
    ) -> Result<Account, BankError> {
        self.store.get_account(account_no)?.ok_or_else(not_found)
    }

    #[instrument(skip(self))]
    pub fn credit(
        &self,
        account_no: AccountNo,
        amount: Decimal,
    ) -> Result<Confirmation, BankError> {
        self.try_credit(account_no, amount)
            .inspect_err(|err| warn!(%err, "credit rejected"))
    }

    fn try_credit(
        &self,
        account_no: AccountNo,
        amount: Decimal,
    ) -> Result<Confirmation, BankError> {
        let account_no = validate_account_number(Some(account_no))?;
        let amount = validate_amount(Some(amount), Operation::Credit)?;

        let _guard = self.locks.lock(&[account_no])?;
        let mut account = self.load(account_no, || BankError::account_not_found(account_no))?;
        account.credit(amount);
        let balance = account.balance();

        self.store.commit(
            Changeset::new()
                .update(account)
                .record(LedgerEntry::new(account_no, TransactionKind::Credit, amount)),
        )?;
        info!(account_no, %amount, %balance, "account credited");

        Ok(Confirmation {
            message: format!("{amount:.2} credited successfully. New balance: {balance:.2}"),
            balance,
        })
    }

    #[instrument(skip(self))]
    pub fn debit(
        &self,
        account_no: AccountNo,
        amount: Decimal,
    ) -> Result<Confirmation, BankError> {
        self.try_debit(account_no, amount)
            .inspect_err(|err| warn!(%err, "debit rejected"))
    }

    fn try_debit(
        &self,
        account_no: AccountNo,
        amount: Decimal,
    ) -> Result<Confirmation, BankError> {
        let account_no = validate_account_number(Some(account_no))?;
        let amount = validate_amount(Some(amount), Operation::Debit)?;

        let _guard = self.locks.lock(&[account_no])?;
        let mut account = self.load(account_no, || BankError::account_not_found(account_no))?;
        account.debit(amount, Operation::Debit)?;
        let balance = account.balance();

        self.store.commit(
            Changeset::new()
                .update(account)
                .record(LedgerEntry::new(account_no, TransactionKind::Debit, amount)),
        )?;
        info!(account_no, %amount, %balance, "account debited");

        Ok(Confirmation {
            message: format!("{amount:.2} debited successfully. New balance: {balance:.2}"),
            balance,
        })
    }

    #[instrument(skip(self))]
    pub fn transfer(
        &self,
        from: AccountNo,
        to: AccountNo,
        amount: Decimal,
    ) -> Result<TransferConfirmation, BankError> {
        self.try_transfer(from, to, amount)
            .inspect_err(|err| warn!(%err, "transfer rejected"))
    }

    fn try_transfer(
        &self,
        from: AccountNo,
        to: AccountNo,
        amount: Decimal,
    ) -> Result<TransferConfirmation, BankError> {
        let from = validate_account_number(Some(from))?;
        let to = validate_account_number(Some(to))?;
        let amount = validate_amount(Some(amount), Operation::Transfer)?;
        if from == to {
            return Err(ValidationError::new("Cannot transfer to the same account").into());
        }

        let _guard = self.locks.lock(&[from, to])?;
        let mut source = self.load(from, || {
            BankError::AccountNotFound(format!("Source account not found: {from}"))
        })?;
        let mut destination = self.load(to, || {
            BankError::AccountNotFound(format!("Destination account not found: {to}"))
        })?;

        source.debit(amount, Operation::Transfer)?;
        destination.credit(amount);

        let message = format!(
            "{amount:.2} transferred successfully from {} to {}",
            source.customer_name, destination.customer_name
        );
        let source_balance = source.balance();
        let destination_balance = destination.balance();

        self.store.commit(
            Changeset::new()
                .update(source)
                .update(destination)
                .record(LedgerEntry::new(from, TransactionKind::Debit, amount))
                .record(LedgerEntry::new(to, TransactionKind::Credit, amount)),
        )?;
        info!(from, to, %amount, "transfer committed");

        Ok(TransferConfirmation {
            message,
            source_balance,
            destination_balance,
        })
    }

    /// Ledger records of the account, in store order.
    #[instrument(skip(self))]
    pub fn statement(&self, account_no: AccountNo) -> Result<Vec<TransactionRecord>, BankError> {
        let account_no = validate_account_number(Some(account_no))?;
        if !self.store.exists_by_id(account_no)? {
            return Err(BankError::account_not_found(account_no));
        }
        Ok(self.store.find_by_account(account_no)?)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        account::{AccountType, NewAccount},
        store::{AccountStore, LedgerStore, in_memory_store::InMemoryStore},
    };

    use super::*;

    fn open(store: &InMemoryStore, customer: &str, account_type: AccountType) -> AccountNo {
        let n = store.list_accounts().unwrap().len();
        store
            .insert_account(NewAccount {
                customer_id: customer.to_string(),
                customer_name: format!("Holder {}", customer.trim_start_matches("CUST")),
                national_id: format!("2345678901{n:02}"),
                phone: format!("98765432{n:02}"),
                account_type,
            })
            .unwrap()
            .account_no
    }

    fn engine() -> (TransactionEngine, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let engine = TransactionEngine::new(store.clone(), Duration::from_millis(100));
        (engine, store)
    }

    #[test]
    fn savings_scenario() {
        let (engine, store) = engine();
        let acc = open(&store, "CUST001", AccountType::Savings);

        let ok = engine.credit(acc, dec!(1000.00)).unwrap();
        assert_eq!(ok.balance, dec!(1000.00));
        assert_eq!(
            ok.message,
            "1000.00 credited successfully. New balance: 1000.00"
        );

        let err = engine.debit(acc, dec!(1500.00)).unwrap_err();
        assert!(matches!(err, BankError::InsufficientBalance { .. }));
        assert_eq!(
            err.to_string(),
            "Insufficient balance. Available: 1000.00, Requested: 1500.00"
        );

        let err = engine.debit(acc, dec!(600.00)).unwrap_err();
        assert!(matches!(err, BankError::Validation(_)));
        assert!(err.to_string().contains("Maximum withdrawable amount: 500.00"));

        let ok = engine.debit(acc, dec!(400.00)).unwrap();
        assert_eq!(ok.balance, dec!(600.00));
        assert_eq!(ok.message, "400.00 debited successfully. New balance: 600.00");

        let statement = engine.statement(acc).unwrap();
        let summary: Vec<_> = statement.iter().map(|r| (r.txn_type, r.amount)).collect();
        assert_eq!(
            summary,
            vec![
                (TransactionKind::Credit, dec!(1000.00)),
                (TransactionKind::Debit, dec!(400.00)),
            ]
        );
    }

    #[test]
    fn current_account_has_no_reserve() {
        let (engine, store) = engine();
        let acc = open(&store, "CUST001", AccountType::Current);
        engine.credit(acc, dec!(250)).unwrap();
        let ok = engine.debit(acc, dec!(250)).unwrap();
        assert_eq!(ok.balance, Decimal::ZERO);
    }

    #[test]
    fn rejects_bad_input_before_touching_store() {
        let (engine, store) = engine();
        let acc = open(&store, "CUST001", AccountType::Current);

        let err = engine.credit(0, dec!(10)).unwrap_err();
        assert_eq!(err.to_string(), "Account number must be positive");

        let err = engine.credit(acc, dec!(100.123)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Amount cannot have more than 2 decimal places"
        );

        let err = engine.debit(99, dec!(10)).unwrap_err();
        assert!(matches!(err, BankError::AccountNotFound(_)));
        assert_eq!(
            err.to_string(),
            "Account not found with account number: 99"
        );

        assert!(matches!(
            engine.statement(99).unwrap_err(),
            BankError::AccountNotFound(_)
        ));
        assert!(store.find_by_account(acc).unwrap().is_empty());
    }

    #[test]
    fn transfer_moves_money_and_records_both_sides() {
        let (engine, store) = engine();
        let a = open(&store, "CUST001", AccountType::Savings);
        let b = open(&store, "CUST002", AccountType::Current);
        engine.credit(a, dec!(2000)).unwrap();

        let ok = engine.transfer(a, b, dec!(1200.50)).unwrap();
        assert_eq!(
            ok.message,
            "1200.50 transferred successfully from Holder 001 to Holder 002"
        );
        assert_eq!(ok.source_balance, dec!(799.50));
        assert_eq!(ok.destination_balance, dec!(1200.50));

        let a_statement = engine.statement(a).unwrap();
        assert_eq!(a_statement.len(), 2);
        assert_eq!(a_statement[1].txn_type, TransactionKind::Debit);
        let b_statement = engine.statement(b).unwrap();
        assert_eq!(b_statement.len(), 1);
        assert_eq!(b_statement[0].txn_type, TransactionKind::Credit);
        assert_eq!(b_statement[0].amount, dec!(1200.50));
    }

    #[test]
    fn transfer_rules() {
        let (engine, store) = engine();
        let a = open(&store, "CUST001", AccountType::Savings);
        let b = open(&store, "CUST002", AccountType::Savings);
        engine.credit(a, dec!(1000)).unwrap();

        let err = engine.transfer(a, a, dec!(100)).unwrap_err();
        assert_eq!(err.to_string(), "Cannot transfer to the same account");

        let err = engine.transfer(a, 77, dec!(100)).unwrap_err();
        assert_eq!(err.to_string(), "Destination account not found: 77");
        let err = engine.transfer(77, a, dec!(100)).unwrap_err();
        assert_eq!(err.to_string(), "Source account not found: 77");

        let err = engine.transfer(a, b, dec!(501)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot transfer. Savings account must maintain minimum balance of 500.00. Maximum transferable amount: 500.00"
        );
        let err = engine.transfer(b, a, dec!(1)).unwrap_err();
        assert!(matches!(err, BankError::InsufficientBalance { .. }));

        // nothing moved
        assert_eq!(store.get_account(a).unwrap().unwrap().balance(), dec!(1000));
        assert_eq!(store.get_account(b).unwrap().unwrap().balance(), dec!(0));
        assert!(engine.statement(b).unwrap().is_empty());
    }

    #[test]
    fn busy_account_is_retriable() {
        let (engine, store) = engine();
        let acc = open(&store, "CUST001", AccountType::Current);
        let _held = engine.locks.lock(&[acc]).unwrap();

        let err = engine.credit(acc, dec!(10)).unwrap_err();
        assert!(matches!(err, BankError::Store(StoreError::Busy)));
        assert_eq!(store.get_account(acc).unwrap().unwrap().balance(), dec!(0));
    }
}
