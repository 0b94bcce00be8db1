use crate::domain::account::{Account, AccountId, AccountKey, Amount, Balance};
use crate::domain::ledger::{LedgerEntry, LedgerId};
use crate::domain::ports::{AccountStore, Database, LedgerStore, UnitOfWork};
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Column Family for account rows, keyed by surrogate key.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family mapping external account ids to surrogate keys.
pub const CF_ACCOUNT_IDS: &str = "account_ids";
/// Column Family for ledger entries, keyed by ledger id.
pub const CF_LEDGER: &str = "ledger";
/// Column Family holding the id sequences.
pub const CF_SEQUENCES: &str = "sequences";

const SEQ_ACCOUNTS: &[u8] = b"accounts";
const SEQ_LEDGER: &[u8] = b"ledger";

fn column<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| TransferError::internal(format!("{name} column family not found")))
}

fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| TransferError::internal("Malformed 8-byte key"))?;
    Ok(u64::from_be_bytes(raw))
}

fn scan<T: DeserializeOwned>(db: &DB, name: &str) -> Result<Vec<T>> {
    let cf = column(db, name)?;
    let mut rows = Vec::new();
    for item in db.iterator_cf(cf, IteratorMode::Start) {
        let (_key, value) = item?;
        rows.push(serde_json::from_slice(&value)?);
    }
    Ok(rows)
}

/// A persistent database backed by RocksDB.
///
/// Rows are JSON documents in separate Column Families. A unit of work holds the
/// single writer slot, stages its puts in memory (reading its own writes first),
/// and applies them with one atomic `WriteBatch` on commit.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBDatabase {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBDatabase {
    /// Opens or creates a RocksDB instance at the specified path, creating the
    /// column families on first use.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ACCOUNTS, CF_ACCOUNT_IDS, CF_LEDGER, CF_SEQUENCES]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    async fn unit(&self) -> RocksDBUnitOfWork {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        RocksDBUnitOfWork {
            db: Arc::clone(&self.db),
            staged: BTreeMap::new(),
            _writer: writer,
        }
    }
}

#[async_trait]
impl Database for RocksDBDatabase {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(self.unit().await))
    }

    async fn find_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        let ids = column(&self.db, CF_ACCOUNT_IDS)?;
        let Some(key) = self.db.get_cf(ids, account_id.to_be_bytes())? else {
            return Ok(None);
        };
        let accounts = column(&self.db, CF_ACCOUNTS)?;
        match self.db.get_cf(accounts, &key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn create_account(&self, account_id: AccountId, balance: Balance) -> Result<Account> {
        let mut unit = self.unit().await;
        let account = unit.insert_account(account_id, balance)?;
        unit.write()?;
        Ok(account)
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        let mut accounts: Vec<Account> = scan(&self.db, CF_ACCOUNTS)?;
        accounts.sort_by_key(|a| a.account_id);
        Ok(accounts)
    }

    async fn ledger_entries(&self) -> Result<Vec<LedgerEntry>> {
        // Big-endian keys iterate in id order.
        scan(&self.db, CF_LEDGER)
    }
}

pub struct RocksDBUnitOfWork {
    db: Arc<DB>,
    staged: BTreeMap<(&'static str, Vec<u8>), Vec<u8>>,
    _writer: OwnedMutexGuard<()>,
}

impl RocksDBUnitOfWork {
    fn read(&self, cf: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.staged.get(&(cf, key.to_vec())) {
            return Ok(Some(value.clone()));
        }
        Ok(self.db.get_cf(column(&self.db, cf)?, key)?)
    }

    fn read_json<T: DeserializeOwned>(&self, cf: &'static str, key: &[u8]) -> Result<Option<T>> {
        match self.read(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn stage_json<T: Serialize>(&mut self, cf: &'static str, key: Vec<u8>, value: &T) -> Result<()> {
        self.staged.insert((cf, key), serde_json::to_vec(value)?);
        Ok(())
    }

    fn next_id(&mut self, sequence: &'static [u8]) -> Result<u64> {
        let current = match self.read(CF_SEQUENCES, sequence)? {
            Some(bytes) => decode_u64(&bytes)?,
            None => 0,
        };
        let next = current + 1;
        self.staged
            .insert((CF_SEQUENCES, sequence.to_vec()), next.to_be_bytes().to_vec());
        Ok(next)
    }

    fn account(&self, id: AccountKey) -> Result<Option<Account>> {
        self.read_json(CF_ACCOUNTS, &id.to_be_bytes())
    }

    fn put_account(&mut self, account: &Account) -> Result<()> {
        self.stage_json(CF_ACCOUNTS, account.id.to_be_bytes().to_vec(), account)
    }

    fn insert_account(&mut self, account_id: AccountId, balance: Balance) -> Result<Account> {
        if self.read(CF_ACCOUNT_IDS, &account_id.to_be_bytes())?.is_some() {
            return Err(TransferError::InvalidRequest(
                "Account already exists".to_string(),
            ));
        }
        let account = Account::new(self.next_id(SEQ_ACCOUNTS)?, account_id, balance);
        self.staged.insert(
            (CF_ACCOUNT_IDS, account_id.to_be_bytes().to_vec()),
            account.id.to_be_bytes().to_vec(),
        );
        self.put_account(&account)?;
        Ok(account)
    }

    fn write(self) -> Result<()> {
        let mut batch = WriteBatch::default();
        for ((cf, key), value) in &self.staged {
            batch.put_cf(column(&self.db, cf)?, key, value);
        }
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for RocksDBUnitOfWork {
    async fn find_by_account_id(&mut self, account_id: AccountId) -> Result<Option<Account>> {
        match self.read(CF_ACCOUNT_IDS, &account_id.to_be_bytes())? {
            Some(key) => self.account(decode_u64(&key)?),
            None => Ok(None),
        }
    }

    async fn find_by_id(&mut self, id: AccountKey) -> Result<Option<Account>> {
        self.account(id)
    }

    async fn debit_if_sufficient(&mut self, id: AccountKey, amount: Amount) -> Result<u64> {
        let Some(mut account) = self.account(id)? else {
            return Ok(0);
        };
        if !account.debit_if_sufficient(amount)? {
            return Ok(0);
        }
        self.put_account(&account)?;
        Ok(1)
    }

    async fn credit_unconditional(&mut self, id: AccountKey, amount: Amount) -> Result<u64> {
        let Some(mut account) = self.account(id)? else {
            return Ok(0);
        };
        account.credit(amount)?;
        self.put_account(&account)?;
        Ok(1)
    }
}

#[async_trait]
impl LedgerStore for RocksDBUnitOfWork {
    async fn save(&mut self, mut entry: LedgerEntry) -> Result<LedgerEntry> {
        let id: LedgerId = match entry.id {
            Some(id) => {
                if self.read(CF_LEDGER, &id.to_be_bytes())?.is_none() {
                    return Err(TransferError::internal(format!(
                        "Ledger entry {id} not found"
                    )));
                }
                id
            }
            None => self.next_id(SEQ_LEDGER)?,
        };
        entry.id = Some(id);
        self.stage_json(CF_LEDGER, id.to_be_bytes().to_vec(), &entry)?;
        Ok(entry)
    }
}

#[async_trait]
impl UnitOfWork for RocksDBUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        (*self).write()
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
