use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::{AccountNo, AccountType};

/// Smallest amount a single credit, debit or transfer may move.
pub const MIN_TRANSACTION_AMOUNT: Decimal = Decimal::from_parts(100, 0, 0, false, 2);
/// Largest amount a single credit, debit or transfer may move (one crore).
pub const MAX_TRANSACTION_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 2);
/// Monetary values never carry more fractional digits than this.
pub const MONEY_SCALE: u32 = 2;

const NATIONAL_ID_DECOYS: [&str; 2] = ["123456789012", "012345678901"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Money movement the amount is validated for. Only used to phrase messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Credit,
    Debit,
    Transfer,
}

impl Operation {
    /// How the operation reads when money leaves an account.
    pub fn withdrawal_verb(&self) -> &'static str {
        match self {
            Operation::Transfer => "transfer",
            Operation::Credit | Operation::Debit => "withdraw",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Credit => "Credit",
            Operation::Debit => "Debit",
            Operation::Transfer => "Transfer",
        };
        f.write_str(name)
    }
}

pub fn validate_account_number(
    account_no: Option<AccountNo>,
) -> Result<AccountNo, ValidationError> {
    match account_no {
        None => Err(ValidationError::new("Account number is required")),
        Some(no) if no <= 0 => Err(ValidationError::new("Account number must be positive")),
        Some(no) => Ok(no),
    }
}

/// Checks range and precision of `amount` and returns it rescaled to two
/// fractional digits.
pub fn validate_amount(
    amount: Option<Decimal>,
    operation: Operation,
) -> Result<Decimal, ValidationError> {
    let Some(amount) = amount else {
        return Err(ValidationError::new(format!(
            "{operation} amount is required"
        )));
    };
    if amount <= Decimal::ZERO {
        return Err(ValidationError::new(format!(
            "{operation} amount must be positive"
        )));
    }
    let op = operation.to_string().to_lowercase();
    if amount < MIN_TRANSACTION_AMOUNT {
        return Err(ValidationError::new(format!(
            "Minimum {op} amount is {MIN_TRANSACTION_AMOUNT:.2}"
        )));
    }
    if amount > MAX_TRANSACTION_AMOUNT {
        return Err(ValidationError::new(format!(
            "Maximum {op} amount is {MAX_TRANSACTION_AMOUNT:.2} (1 Crore)"
        )));
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(ValidationError::new(
            "Amount cannot have more than 2 decimal places",
        ));
    }
    let mut amount = amount;
    amount.rescale(MONEY_SCALE);
    Ok(amount)
}

/// Parses an account number taken from a request path.
pub fn parse_account_number(raw: &str) -> Result<AccountNo, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return validate_account_number(None);
    }
    let no = raw
        .parse::<AccountNo>()
        .map_err(|_| ValidationError::new(format!("Invalid account number: '{raw}'")))?;
    validate_account_number(Some(no))
}

/// Parses an amount taken from a request path: an optional sign, digits and
/// an optional fraction. Precision is checked on the text, trailing zeros of
/// the fraction aside; range is left to [`validate_amount`].
pub fn parse_amount(raw: &str, operation: Operation) -> Result<Decimal, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return validate_amount(None, operation);
    }
    let invalid = || {
        let op = operation.to_string().to_lowercase();
        ValidationError::new(format!("Invalid {op} amount: '{raw}'"))
    };

    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let is_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) if is_digits(fraction) => (whole, fraction),
        Some(_) => return Err(invalid()),
        None => (unsigned, ""),
    };
    if !is_digits(whole) {
        return Err(invalid());
    }
    let significant = fraction.trim_end_matches('0');
    if significant.len() > MONEY_SCALE as usize {
        return Err(ValidationError::new(
            "Amount cannot have more than 2 decimal places",
        ));
    }

    let sign = if raw.starts_with('-') { "-" } else { "" };
    let text = if significant.is_empty() {
        format!("{sign}{whole}")
    } else {
        format!("{sign}{whole}.{significant}")
    };
    Decimal::from_str_exact(&text).map_err(|_| invalid())
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::new(format!("{what} is required"))),
    }
}

fn all_same(digits: &str) -> bool {
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    }
}

fn leading_digit_in(value: &str, low: char, high: char) -> bool {
    value.chars().next().is_some_and(|c| (low..=high).contains(&c))
}

/// `CUST` followed by at least three digits, any case. Returns the uppercased id.
pub fn validate_customer_id(customer_id: Option<&str>) -> Result<String, ValidationError> {
    let customer_id = required(customer_id, "Customer ID")?.to_uppercase();
    let valid = customer_id.strip_prefix("CUST").is_some_and(|digits| {
        digits.len() >= 3 && digits.chars().all(|c| c.is_ascii_digit())
    });
    if !valid {
        return Err(ValidationError::new(
            "Customer ID must be in format CUST followed by numbers (e.g., CUST001)",
        ));
    }
    Ok(customer_id)
}

pub fn validate_customer_name(name: Option<&str>) -> Result<String, ValidationError> {
    let name = required(name, "Customer name")?;
    let len = name.chars().count();
    let letters_and_spaces = name
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_ascii_whitespace());
    if !(2..=100).contains(&len) || !letters_and_spaces {
        return Err(ValidationError::new(
            "Customer name must contain only letters and spaces (2-100 characters)",
        ));
    }
    Ok(name.to_owned())
}

/// 12 digit national identity (Aadhar) number.
pub fn validate_national_id(national_id: Option<&str>) -> Result<String, ValidationError> {
    let national_id = required(national_id, "Aadhar number")?;
    if national_id.len() != 12
        || !national_id.chars().all(|c| c.is_ascii_digit())
        || !leading_digit_in(national_id, '2', '9')
    {
        return Err(ValidationError::new(
            "Aadhar number must be exactly 12 digits",
        ));
    }
    if all_same(national_id) {
        return Err(ValidationError::new(
            "Invalid Aadhar number: Cannot contain all same digits",
        ));
    }
    if NATIONAL_ID_DECOYS.contains(&national_id) {
        return Err(ValidationError::new(
            "Invalid Aadhar number: Sequential numbers not allowed",
        ));
    }
    Ok(national_id.to_owned())
}

pub fn validate_phone(phone: Option<&str>) -> Result<String, ValidationError> {
    let phone = required(phone, "Phone number")?;
    if phone.len() != 10
        || !phone.chars().all(|c| c.is_ascii_digit())
        || !leading_digit_in(phone, '6', '9')
    {
        return Err(ValidationError::new(
            "Phone number must be 10 digits starting with 6, 7, 8, or 9",
        ));
    }
    if all_same(phone) {
        return Err(ValidationError::new(
            "Invalid phone number: Cannot contain all same digits",
        ));
    }
    Ok(phone.to_owned())
}

pub fn validate_account_type(account_type: Option<&str>) -> Result<AccountType, ValidationError> {
    let account_type = required(account_type, "Account type")?;
    account_type
        .parse()
        .map_err(|_| ValidationError::new("Account type must be 'Savings' or 'Current'"))
}
