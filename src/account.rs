use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::{MONEY_SCALE, Operation};

pub type AccountNo = i64;

/// Balance a Savings account has to keep after any withdrawal or outgoing transfer.
pub const SAVINGS_MINIMUM_RESERVE: Decimal = Decimal::from_parts(50_000, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    Savings,
    Current,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "Savings",
            AccountType::Current => "Current",
        }
    }

    /// Minimum balance that must stay on the account after money leaves it.
    pub fn minimum_reserve(&self) -> Decimal {
        match self {
            AccountType::Savings => SAVINGS_MINIMUM_RESERVE,
            AccountType::Current => Decimal::ZERO,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown account type `{0}`")]
pub struct UnknownAccountType(String);

impl FromStr for AccountType {
    type Err = UnknownAccountType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Savings" => Ok(AccountType::Savings),
            "Current" => Ok(AccountType::Current),
            other => Err(UnknownAccountType(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("Insufficient balance. Available: {available:.2}, Requested: {requested:.2}")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },
    #[error(
        "Cannot {verb}. Savings account must maintain minimum balance of {reserve:.2}. Maximum {verb}able amount: {maximum:.2}",
        verb = .operation.withdrawal_verb()
    )]
    BelowMinimumReserve {
        operation: Operation,
        reserve: Decimal,
        maximum: Decimal,
    },
}

/// Raw account registration request, exactly as received.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDraft {
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    #[serde(alias = "aadhar")]
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub account_type: Option<String>,
}

/// Validated and normalized registration data, waiting for an account number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub customer_id: String,
    pub customer_name: String,
    pub national_id: String,
    pub phone: String,
    pub account_type: AccountType,
}

impl NewAccount {
    /// Materializes the account under `account_no` with an empty balance.
    pub fn open(self, account_no: AccountNo) -> Account {
        Account {
            account_no,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            national_id: self.national_id,
            phone: self.phone,
            account_type: self.account_type,
            balance: Decimal::new(0, MONEY_SCALE),
            version: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_no: AccountNo,
    pub customer_id: String,
    pub customer_name: String,
    pub national_id: String,
    pub phone: String,
    pub account_type: AccountType,
    balance: Decimal,
    /// Bumped by the store on every committed change.
    #[serde(skip)]
    pub version: u64,
}

impl Account {
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// The most that can currently leave the account, never negative.
    pub fn withdrawable(&self) -> Decimal {
        let mut max = (self.balance - self.account_type.minimum_reserve()).max(Decimal::ZERO);
        max.rescale(MONEY_SCALE);
        max
    }

    pub(crate) fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
        self.balance.rescale(MONEY_SCALE);
    }

    /// Takes `amount` off the balance, unless that overdraws the account or
    /// breaks the minimum reserve of its type. The balance is untouched on error.
    pub(crate) fn debit(
        &mut self,
        amount: Decimal,
        operation: Operation,
    ) -> Result<(), AccountError> {
        if self.balance < amount {
            return Err(AccountError::InsufficientBalance {
                available: self.balance,
                requested: amount,
            });
        }
        let reserve = self.account_type.minimum_reserve();
        if self.balance - amount < reserve {
            return Err(AccountError::BelowMinimumReserve {
                operation,
                reserve,
                maximum: self.withdrawable(),
            });
        }
        self.balance -= amount;
        self.balance.rescale(MONEY_SCALE);
        Ok(())
    }
}
