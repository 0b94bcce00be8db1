#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Barrier;
use transfer_ledger::domain::account::{Account, AccountId, AccountKey, Amount, Balance};
use transfer_ledger::domain::ledger::LedgerEntry;
use transfer_ledger::domain::ports::{AccountStore, Database, LedgerStore, UnitOfWork};
use transfer_ledger::error::{Result, TransferError};
use transfer_ledger::infrastructure::in_memory::InMemoryDatabase;

pub async fn seeded_database(accounts: &[(AccountId, Decimal)]) -> Arc<InMemoryDatabase> {
    let db = Arc::new(InMemoryDatabase::new());
    for (account_id, balance) in accounts {
        db.create_account(*account_id, Balance::new(*balance))
            .await
            .unwrap();
    }
    db
}

pub async fn balance_of(db: &dyn Database, account_id: AccountId) -> Balance {
    db.find_account(account_id).await.unwrap().unwrap().balance
}

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

/// Holds every `begin` until `parties` callers have arrived, so all of them have
/// finished their precondition reads before any unit of work starts.
pub struct GatedDatabase {
    inner: Arc<dyn Database>,
    barrier: Barrier,
}

impl GatedDatabase {
    pub fn new(inner: Arc<dyn Database>, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl Database for GatedDatabase {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        self.barrier.wait().await;
        self.inner.begin().await
    }

    async fn find_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        self.inner.find_account(account_id).await
    }

    async fn create_account(&self, account_id: AccountId, balance: Balance) -> Result<Account> {
        self.inner.create_account(account_id, balance).await
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        self.inner.accounts().await
    }

    async fn ledger_entries(&self) -> Result<Vec<LedgerEntry>> {
        self.inner.ledger_entries().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fault {
    /// The credit finds no destination row.
    CreditMissesRow,
    /// The n-th ledger save (1-based) fails with a store error.
    SaveFails(usize),
    /// Commit fails after every step succeeded.
    CommitFails,
}

/// Injects one fault into every unit of work it hands out.
pub struct FaultyDatabase {
    inner: Arc<dyn Database>,
    fault: Fault,
}

impl FaultyDatabase {
    pub fn new(inner: Arc<dyn Database>, fault: Fault) -> Self {
        Self { inner, fault }
    }
}

#[async_trait]
impl Database for FaultyDatabase {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(FaultyUnit {
            inner: self.inner.begin().await?,
            fault: self.fault,
            saves: 0,
        }))
    }

    async fn find_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        self.inner.find_account(account_id).await
    }

    async fn create_account(&self, account_id: AccountId, balance: Balance) -> Result<Account> {
        self.inner.create_account(account_id, balance).await
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        self.inner.accounts().await
    }

    async fn ledger_entries(&self) -> Result<Vec<LedgerEntry>> {
        self.inner.ledger_entries().await
    }
}

struct FaultyUnit {
    inner: Box<dyn UnitOfWork>,
    fault: Fault,
    saves: usize,
}

fn injected() -> TransferError {
    TransferError::InternalError(Box::new(std::io::Error::other("injected fault")))
}

#[async_trait]
impl AccountStore for FaultyUnit {
    async fn find_by_account_id(&mut self, account_id: AccountId) -> Result<Option<Account>> {
        self.inner.find_by_account_id(account_id).await
    }

    async fn find_by_id(&mut self, id: AccountKey) -> Result<Option<Account>> {
        self.inner.find_by_id(id).await
    }

    async fn debit_if_sufficient(&mut self, id: AccountKey, amount: Amount) -> Result<u64> {
        self.inner.debit_if_sufficient(id, amount).await
    }

    async fn credit_unconditional(&mut self, id: AccountKey, amount: Amount) -> Result<u64> {
        if self.fault == Fault::CreditMissesRow {
            return Ok(0);
        }
        self.inner.credit_unconditional(id, amount).await
    }
}

#[async_trait]
impl LedgerStore for FaultyUnit {
    async fn save(&mut self, entry: LedgerEntry) -> Result<LedgerEntry> {
        self.saves += 1;
        if self.fault == Fault::SaveFails(self.saves) {
            return Err(injected());
        }
        self.inner.save(entry).await
    }
}

#[async_trait]
impl UnitOfWork for FaultyUnit {
    async fn commit(self: Box<Self>) -> Result<()> {
        let unit = *self;
        if unit.fault == Fault::CommitFails {
            unit.inner.rollback().await?;
            return Err(injected());
        }
        unit.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

pub fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes `rows` transfers that bounce `amount` between accounts 1 and 2.
pub fn generate_transfers_csv(path: &Path, rows: usize, amount: &str) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["source", "destination", "amount"])?;

    for i in 0..rows {
        let (source, destination) = if i % 2 == 0 { ("1", "2") } else { ("2", "1") };
        wtr.write_record([source, destination, amount])?;
    }

    wtr.flush()?;
    Ok(())
}
