use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::{
    account::{Account, AccountDraft, AccountNo, NewAccount},
    customer::{Customer, CustomerDraft, CustomerIdGenerator},
    engine::BankError,
    store::Store,
    validation::{
        validate_account_number, validate_account_type, validate_customer_id,
        validate_customer_name, validate_national_id, validate_phone,
    },
};

/// Opens accounts and answers read-only account queries.
pub struct AccountRegistry {
    store: Arc<dyn Store>,
    // uniqueness checks and the insert that follows them must not interleave
    opening: Mutex<()>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            opening: Mutex::new(()),
        }
    }

    #[instrument(skip_all)]
    pub fn create_account(&self, draft: AccountDraft) -> Result<Account, BankError> {
        let account = Self::validate(draft)?;

        let _opening = self.opening.lock().unwrap_or_else(PoisonError::into_inner);
        self.ensure_unique(&account).inspect_err(|err| {
            warn!(%err, customer_id = %account.customer_id, "account rejected")
        })?;

        let account = self.store.insert_account(account)?;
        info!(
            account_no = account.account_no,
            customer_id = %account.customer_id,
            account_type = %account.account_type,
            "account opened"
        );
        Ok(account)
    }

    fn validate(draft: AccountDraft) -> Result<NewAccount, BankError> {
        Ok(NewAccount {
            customer_id: validate_customer_id(draft.customer_id.as_deref())?,
            customer_name: validate_customer_name(draft.customer_name.as_deref())?,
            national_id: validate_national_id(draft.national_id.as_deref())?,
            phone: validate_phone(draft.phone.as_deref())?,
            account_type: validate_account_type(draft.account_type.as_deref())?,
        })
    }

    fn ensure_unique(&self, account: &NewAccount) -> Result<(), BankError> {
        if self.store.exists_by_national_id(&account.national_id)? {
            return Err(BankError::DuplicateResource(
                "An account with this Aadhar number already exists".to_string(),
            ));
        }
        if self.store.exists_by_phone(&account.phone)? {
            return Err(BankError::DuplicateResource(
                "An account with this phone number already exists".to_string(),
            ));
        }
        if self
            .store
            .exists_by_customer_and_type(&account.customer_id, account.account_type)?
        {
            let kind = account.account_type;
            return Err(BankError::DuplicateResource(format!(
                "Customer already has a {kind} account. Only one {kind} account per customer is allowed."
            )));
        }
        Ok(())
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>, BankError> {
        Ok(self.store.list_accounts()?)
    }

    pub fn get_account(&self, account_no: AccountNo) -> Result<Account, BankError> {
        let account_no = validate_account_number(Some(account_no))?;
        self.store
            .get_account(account_no)?
            .ok_or_else(|| BankError::account_not_found(account_no))
    }

    pub fn balance(&self, account_no: AccountNo) -> Result<Decimal, BankError> {
        self.get_account(account_no).map(|acc| acc.balance())
    }
}

/// Registers customers under identifiers drawn from an injected generator.
pub struct CustomerRegistry {
    store: Arc<dyn Store>,
    ids: Arc<dyn CustomerIdGenerator>,
}

impl CustomerRegistry {
    pub fn new(store: Arc<dyn Store>, ids: Arc<dyn CustomerIdGenerator>) -> Self {
        Self { store, ids }
    }

    #[instrument(skip_all)]
    pub fn create_customer(&self, draft: CustomerDraft) -> Result<Customer, BankError> {
        let customer = Customer::new(self.ids.next_id(), draft, Utc::now());
        let customer = self.store.insert_customer(customer)?;
        info!(customer_id = %customer.customer_id, "customer registered");
        Ok(customer)
    }
}
