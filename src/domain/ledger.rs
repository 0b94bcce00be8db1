use super::account::{Account, AccountId, Amount, Balance};
use crate::error::TransferError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Surrogate key assigned by the store on first save.
pub type LedgerId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    InProgress,
    Completed,
    Failed,
}

impl LedgerStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LedgerStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::InProgress => "IN_PROGRESS",
            LedgerStatus::Completed => "COMPLETED",
            LedgerStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LegSide {
    Debit,
    Credit,
}

/// One side of a transfer.
///
/// Exactly one of `debit` and `credit` is set. `end_balance` stays empty until the
/// leg's balance mutation has been applied.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LedgerEntry {
    pub id: Option<LedgerId>,
    pub transfer_id: Uuid,
    pub account_id: AccountId,
    pub debit: Option<Amount>,
    pub credit: Option<Amount>,
    pub start_balance: Balance,
    pub end_balance: Option<Balance>,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Opens the debit leg against `account`, snapshotting its current balance.
    pub fn debit(transfer_id: Uuid, account: &Account, amount: Amount) -> Self {
        Self::open(transfer_id, account, Some(amount), None)
    }

    /// Opens the credit leg against `account`, snapshotting its current balance.
    pub fn credit(transfer_id: Uuid, account: &Account, amount: Amount) -> Self {
        Self::open(transfer_id, account, None, Some(amount))
    }

    fn open(
        transfer_id: Uuid,
        account: &Account,
        debit: Option<Amount>,
        credit: Option<Amount>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            transfer_id,
            account_id: account.account_id,
            debit,
            credit,
            start_balance: account.balance,
            end_balance: None,
            status: LedgerStatus::InProgress,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn side(&self) -> LegSide {
        if self.debit.is_some() {
            LegSide::Debit
        } else {
            LegSide::Credit
        }
    }

    pub fn amount(&self) -> Option<Amount> {
        self.debit.or(self.credit)
    }

    /// Records the authoritative balance after the mutation and closes the leg.
    pub fn complete(&mut self, end_balance: Balance) -> Result<(), TransferError> {
        self.transition(LedgerStatus::Completed)?;
        self.end_balance = Some(end_balance);
        Ok(())
    }

    /// Closes the leg without a resulting balance.
    pub fn fail(&mut self) -> Result<(), TransferError> {
        self.transition(LedgerStatus::Failed)
    }

    fn transition(&mut self, to: LedgerStatus) -> Result<(), TransferError> {
        if self.status.is_terminal() {
            return Err(TransferError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(balance: rust_decimal::Decimal) -> Account {
        Account::new(7, 1001, Balance::new(balance))
    }

    #[test]
    fn test_debit_leg_snapshot() {
        let transfer_id = Uuid::new_v4();
        let amount = Amount::new(dec!(100)).unwrap();
        let entry = LedgerEntry::debit(transfer_id, &account(dec!(1000)), amount);

        assert_eq!(entry.id, None);
        assert_eq!(entry.transfer_id, transfer_id);
        assert_eq!(entry.account_id, 1001);
        assert_eq!(entry.debit, Some(amount));
        assert_eq!(entry.credit, None);
        assert_eq!(entry.side(), LegSide::Debit);
        assert_eq!(entry.start_balance, Balance::new(dec!(1000)));
        assert_eq!(entry.end_balance, None);
        assert_eq!(entry.status, LedgerStatus::InProgress);
    }

    #[test]
    fn test_credit_leg_side() {
        let amount = Amount::new(dec!(5)).unwrap();
        let entry = LedgerEntry::credit(Uuid::new_v4(), &account(dec!(0)), amount);
        assert_eq!(entry.side(), LegSide::Credit);
        assert_eq!(entry.amount(), Some(amount));
        assert_eq!(entry.debit, None);
    }

    #[test]
    fn test_complete_sets_end_balance() {
        let amount = Amount::new(dec!(100)).unwrap();
        let mut entry = LedgerEntry::debit(Uuid::new_v4(), &account(dec!(1000)), amount);

        entry.complete(Balance::new(dec!(900))).unwrap();
        assert_eq!(entry.status, LedgerStatus::Completed);
        assert_eq!(entry.end_balance, Some(Balance::new(dec!(900))));
    }

    #[test]
    fn test_terminal_states_are_final() {
        let amount = Amount::new(dec!(1)).unwrap();
        let mut entry = LedgerEntry::debit(Uuid::new_v4(), &account(dec!(0)), amount);

        entry.fail().unwrap();
        assert_eq!(entry.end_balance, None);
        assert!(matches!(
            entry.complete(Balance::ZERO),
            Err(TransferError::InvalidTransition {
                from: LedgerStatus::Failed,
                to: LedgerStatus::Completed
            })
        ));
        assert!(entry.fail().is_err());
        assert_eq!(entry.status, LedgerStatus::Failed);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&LedgerStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        let status: LedgerStatus = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(status, LedgerStatus::Completed);
    }
}
