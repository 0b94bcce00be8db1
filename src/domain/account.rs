use crate::error::TransferError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-chosen account identifier. Always positive.
pub type AccountId = u64;

/// Surrogate key assigned by the store when an account row is created.
pub type AccountKey = u64;

/// Number of fractional digits carried by every balance and amount.
pub const MONEY_SCALE: u32 = 4;

/// Represents a monetary value with 4 decimal places precision.
///
/// This is a wrapper around `rust_decimal::Decimal` to enforce domain-specific rules
/// and provide type safety for financial calculations.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// Represents a positive monetary amount moved by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, TransferError> {
        if value <= Decimal::ZERO {
            return Err(TransferError::InvalidRequest(
                "Amount must be positive".to_string(),
            ));
        }
        if value.normalize().scale() > MONEY_SCALE {
            return Err(TransferError::InvalidRequest(format!(
                "Amount supports at most {MONEY_SCALE} decimal places"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = TransferError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Boundary policy shared by the precondition check and the store's debit
    /// guard: an exact-balance transfer is allowed and leaves the account at zero.
    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.0
    }

    /// `None` when the result does not fit in a `Decimal`.
    pub fn checked_add(self, amount: Amount) -> Option<Self> {
        self.0.checked_add(amount.0).map(Self)
    }

    pub fn checked_sub(self, amount: Amount) -> Option<Self> {
        self.0.checked_sub(amount.0).map(Self)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// An account row as held by the store.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    /// Internal surrogate key.
    pub id: AccountKey,
    /// The externally assigned account number.
    pub account_id: AccountId,
    pub balance: Balance,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountKey, account_id: AccountId, balance: Balance) -> Self {
        let now = Utc::now();
        Self {
            id,
            account_id,
            balance,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the conditional debit. Returns `false` and leaves the balance
    /// untouched when the guard does not hold.
    pub fn debit_if_sufficient(&mut self, amount: Amount) -> Result<bool, TransferError> {
        if !self.balance.covers(amount) {
            return Ok(false);
        }
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(TransferError::BalanceOverflow {
                account_id: self.account_id,
            })?;
        self.updated_at = Utc::now();
        Ok(true)
    }

    /// Fails with `BalanceOverflow`, balance untouched, when the sum does not fit.
    pub fn credit(&mut self, amount: Amount) -> Result<(), TransferError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(TransferError::BalanceOverflow {
                account_id: self.account_id,
            })?;
        self.updated_at = Utc::now();
        Ok(())
    }
}
