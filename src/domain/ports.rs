use super::account::{Account, AccountId, AccountKey, Amount, Balance};
use super::ledger::LedgerEntry;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Account operations available inside a unit of work.
///
/// The two mutations report the number of affected rows (0 or 1) instead of an
/// error, so a guard that does not hold is an ordinary outcome for the caller.
#[async_trait]
pub trait AccountStore: Send {
    async fn find_by_account_id(&mut self, account_id: AccountId) -> Result<Option<Account>>;
    async fn find_by_id(&mut self, id: AccountKey) -> Result<Option<Account>>;
    /// Decrements the balance only if it covers `amount`, evaluated atomically.
    async fn debit_if_sufficient(&mut self, id: AccountKey, amount: Amount) -> Result<u64>;
    /// Increments the balance; 0 only when the row does not exist. Fails with
    /// `BalanceOverflow` when the new balance does not fit.
    async fn credit_unconditional(&mut self, id: AccountKey, amount: Amount) -> Result<u64>;
}

#[async_trait]
pub trait LedgerStore: Send {
    /// Inserts when `entry.id` is empty, otherwise updates the existing row.
    async fn save(&mut self, entry: LedgerEntry) -> Result<LedgerEntry>;
}

/// An all-or-nothing scope over account and ledger writes.
///
/// Dropping a unit without calling `commit` discards its writes.
#[async_trait]
pub trait UnitOfWork: AccountStore + LedgerStore {
    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Shared handle to the durable store.
///
/// Reads through this trait observe committed data only.
#[async_trait]
pub trait Database: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
    async fn find_account(&self, account_id: AccountId) -> Result<Option<Account>>;
    /// Creates an account row; `InvalidRequest` when `account_id` is taken.
    async fn create_account(&self, account_id: AccountId, balance: Balance) -> Result<Account>;
    async fn accounts(&self) -> Result<Vec<Account>>;
    /// The committed audit trail, ordered by ledger id.
    async fn ledger_entries(&self) -> Result<Vec<LedgerEntry>>;
}

pub type DatabaseRef = Arc<dyn Database>;
