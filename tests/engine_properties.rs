use std::{sync::Arc, thread, time::Duration};

use bank_teller::{
    account::{Account, AccountDraft, AccountNo, AccountType, NewAccount},
    customer::Customer,
    engine::{BankError, TransactionEngine},
    ledger::{LedgerEntry, TransactionKind, TransactionRecord},
    registration::AccountRegistry,
    store::{
        AccountStore, Changeset, CustomerStore, LedgerStore, Store, StoreError, UnitOfWork,
        in_memory_store::InMemoryStore,
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct Bank {
    engine: TransactionEngine,
    registry: AccountRegistry,
}

impl Bank {
    fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        Self {
            engine: TransactionEngine::new(store.clone(), Duration::from_secs(5)),
            registry: AccountRegistry::new(store),
        }
    }

    fn open(&self, n: u32, kind: &str, deposit: Decimal) -> AccountNo {
        let acc = self
            .registry
            .create_account(AccountDraft {
                customer_id: Some(format!("CUST{n:03}")),
                customer_name: Some("Kiran Shah".to_string()),
                national_id: Some(format!("23456789{n:04}")),
                phone: Some(format!("98765{n:05}")),
                account_type: Some(kind.to_string()),
            })
            .unwrap();
        if deposit > Decimal::ZERO {
            self.engine.credit(acc.account_no, deposit).unwrap();
        }
        acc.account_no
    }

    fn balance(&self, account_no: AccountNo) -> Decimal {
        self.registry.balance(account_no).unwrap()
    }
}

#[test]
fn racing_debits_spend_funds_once() {
    let bank = Bank::new();
    let acc = bank.open(1, "Current", dec!(100.00));

    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| bank.engine.debit(acc, dec!(100.00))))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|err| matches!(err, BankError::InsufficientBalance { .. }))
    );
    assert_eq!(bank.balance(acc), dec!(0.00));
    assert_eq!(bank.engine.statement(acc).unwrap().len(), 2);
}

#[test]
fn opposite_transfers_finish_and_conserve_total() {
    let bank = Bank::new();
    let a = bank.open(1, "Current", dec!(1000.00));
    let b = bank.open(2, "Current", dec!(1000.00));

    thread::scope(|s| {
        for i in 0..8 {
            let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
            let engine = &bank.engine;
            s.spawn(move || {
                for _ in 0..50 {
                    engine.transfer(from, to, dec!(1.25)).unwrap();
                }
            });
        }
    });

    assert_eq!(bank.balance(a) + bank.balance(b), dec!(2000.00));
    assert_eq!(bank.balance(a), dec!(1000.00));
    // initial credit plus one record per transfer leg
    assert_eq!(bank.engine.statement(a).unwrap().len(), 1 + 400);
}

#[test]
fn credit_then_debit_restores_balance() {
    let bank = Bank::new();
    let acc = bank.open(1, "Savings", dec!(750.00));

    bank.engine.credit(acc, dec!(333.33)).unwrap();
    bank.engine.debit(acc, dec!(333.33)).unwrap();
    assert_eq!(bank.balance(acc), dec!(750.00));
}

#[test]
fn savings_reserve_holds_under_any_debit() {
    let bank = Bank::new();
    let acc = bank.open(1, "Savings", dec!(1000.00));

    for amount in [dec!(600.00), dec!(500.01), dec!(1000.00), dec!(2000.00)] {
        assert!(bank.engine.debit(acc, amount).is_err());
        assert!(bank.balance(acc) >= dec!(500.00));
    }
    bank.engine.debit(acc, dec!(500.00)).unwrap();
    assert_eq!(bank.balance(acc), dec!(500.00));

    let other = bank.open(2, "Current", Decimal::ZERO);
    let err = bank.engine.transfer(acc, other, dec!(1.00)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot transfer. Savings account must maintain minimum balance of 500.00. Maximum transferable amount: 0.00"
    );
}

#[test]
fn statement_lists_each_movement() {
    let bank = Bank::new();
    let acc = bank.open(1, "Current", Decimal::ZERO);
    let moves = [
        (TransactionKind::Credit, dec!(10.00)),
        (TransactionKind::Credit, dec!(20.50)),
        (TransactionKind::Debit, dec!(5.25)),
        (TransactionKind::Credit, dec!(1.00)),
        (TransactionKind::Debit, dec!(26.25)),
    ];
    for (kind, amount) in moves {
        match kind {
            TransactionKind::Credit => bank.engine.credit(acc, amount).map(|_| ()),
            TransactionKind::Debit => bank.engine.debit(acc, amount).map(|_| ()),
        }
        .unwrap();
    }

    let statement = bank.engine.statement(acc).unwrap();
    let recorded: Vec<(TransactionKind, Decimal)> =
        statement.iter().map(|r| (r.txn_type, r.amount)).collect();
    assert_eq!(recorded, moves);
    assert!(statement.windows(2).all(|w| w[0].txn_id < w[1].txn_id));
    assert_eq!(bank.balance(acc), dec!(0.00));
}

/// Delegates everything to an in-memory store but refuses to commit.
struct FailingCommits {
    inner: Arc<InMemoryStore>,
}

impl AccountStore for FailingCommits {
    fn get_account(&self, account_no: AccountNo) -> Result<Option<Account>, StoreError> {
        self.inner.get_account(account_no)
    }

    fn save_account(&self, account: Account) -> Result<Account, StoreError> {
        self.inner.save_account(account)
    }

    fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.inner.insert_account(account)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.inner.list_accounts()
    }

    fn exists_by_id(&self, account_no: AccountNo) -> Result<bool, StoreError> {
        self.inner.exists_by_id(account_no)
    }

    fn exists_by_national_id(&self, national_id: &str) -> Result<bool, StoreError> {
        self.inner.exists_by_national_id(national_id)
    }

    fn exists_by_phone(&self, phone: &str) -> Result<bool, StoreError> {
        self.inner.exists_by_phone(phone)
    }

    fn exists_by_customer_and_type(
        &self,
        customer_id: &str,
        account_type: AccountType,
    ) -> Result<bool, StoreError> {
        self.inner.exists_by_customer_and_type(customer_id, account_type)
    }
}

impl LedgerStore for FailingCommits {
    fn append(&self, entry: LedgerEntry) -> Result<TransactionRecord, StoreError> {
        self.inner.append(entry)
    }

    fn find_by_account(
        &self,
        account_no: AccountNo,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        self.inner.find_by_account(account_no)
    }
}

impl CustomerStore for FailingCommits {
    fn insert_customer(&self, customer: Customer) -> Result<Customer, StoreError> {
        self.inner.insert_customer(customer)
    }

    fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, StoreError> {
        self.inner.get_customer(customer_id)
    }
}

impl UnitOfWork for FailingCommits {
    fn commit(&self, _changes: Changeset) -> Result<Vec<TransactionRecord>, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }
}

#[test]
fn failed_commit_leaves_no_trace() {
    let inner = Arc::new(InMemoryStore::new());
    let seeding = TransactionEngine::new(inner.clone(), Duration::from_secs(1));
    let mut funded = Vec::new();
    for (n, kind) in [(1, AccountType::Current), (2, AccountType::Savings)] {
        let acc = inner
            .insert_account(NewAccount {
                customer_id: format!("CUST{n:03}"),
                customer_name: "Kiran Shah".to_string(),
                national_id: format!("23456789{n:04}"),
                phone: format!("98765{n:05}"),
                account_type: kind,
            })
            .unwrap();
        seeding.credit(acc.account_no, dec!(1000.00)).unwrap();
        funded.push(acc.account_no);
    }
    let (a, b) = (funded[0], funded[1]);

    let store: Arc<dyn Store> = Arc::new(FailingCommits { inner });
    let engine = TransactionEngine::new(store.clone(), Duration::from_secs(1));

    let err = engine.transfer(a, b, dec!(250.00)).unwrap_err();
    assert!(matches!(err, BankError::Store(StoreError::Unavailable(_))));
    assert!(engine.credit(a, dec!(1.00)).is_err());
    assert!(engine.debit(b, dec!(1.00)).is_err());

    for no in [a, b] {
        let acc = store.get_account(no).unwrap().unwrap();
        assert_eq!(acc.balance(), dec!(1000.00));
        // only the seeding credit is on record
        assert_eq!(engine.statement(no).unwrap().len(), 1);
    }
}
