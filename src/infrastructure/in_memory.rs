use crate::domain::account::{Account, AccountId, AccountKey, Amount, Balance};
use crate::domain::ledger::{LedgerEntry, LedgerId};
use crate::domain::ports::{AccountStore, Database, LedgerStore, UnitOfWork};
use crate::error::{Result, TransferError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<AccountKey, Account>,
    account_ids: HashMap<AccountId, AccountKey>,
    ledger: BTreeMap<LedgerId, LedgerEntry>,
    next_account_key: AccountKey,
    next_ledger_id: LedgerId,
}

impl Tables {
    fn insert_account(&mut self, account_id: AccountId, balance: Balance) -> Result<Account> {
        if self.account_ids.contains_key(&account_id) {
            return Err(TransferError::InvalidRequest(
                "Account already exists".to_string(),
            ));
        }
        self.next_account_key += 1;
        let account = Account::new(self.next_account_key, account_id, balance);
        self.account_ids.insert(account_id, account.id);
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn find_by_account_id(&self, account_id: AccountId) -> Option<Account> {
        self.account_ids
            .get(&account_id)
            .and_then(|id| self.accounts.get(id))
            .cloned()
    }
}

/// A thread-safe in-memory database.
///
/// Committed rows live behind an `RwLock`. A unit of work takes the single writer
/// slot and stages its rows on the side until commit, so readers never observe
/// uncommitted rows and two units never interleave.
#[derive(Default, Clone)]
pub struct InMemoryDatabase {
    committed: Arc<RwLock<Tables>>,
    writer: Arc<Mutex<()>>,
}

impl InMemoryDatabase {
    /// Creates a new, empty in-memory database.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for InMemoryDatabase {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        let next_ledger_id = self.committed.read().await.next_ledger_id;
        Ok(Box::new(InMemoryUnitOfWork {
            committed: Arc::clone(&self.committed),
            accounts: HashMap::new(),
            ledger: BTreeMap::new(),
            next_ledger_id,
            _writer: writer,
        }))
    }

    async fn find_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        let tables = self.committed.read().await;
        Ok(tables.find_by_account_id(account_id))
    }

    async fn create_account(&self, account_id: AccountId, balance: Balance) -> Result<Account> {
        let _writer = self.writer.lock().await;
        let mut tables = self.committed.write().await;
        tables.insert_account(account_id, balance)
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        let tables = self.committed.read().await;
        let mut accounts: Vec<Account> = tables.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.account_id);
        Ok(accounts)
    }

    async fn ledger_entries(&self) -> Result<Vec<LedgerEntry>> {
        let tables = self.committed.read().await;
        Ok(tables.ledger.values().cloned().collect())
    }
}

pub struct InMemoryUnitOfWork {
    committed: Arc<RwLock<Tables>>,
    accounts: HashMap<AccountKey, Account>,
    ledger: BTreeMap<LedgerId, LedgerEntry>,
    next_ledger_id: LedgerId,
    _writer: OwnedMutexGuard<()>,
}

impl InMemoryUnitOfWork {
    /// Staged row first, then the committed one.
    async fn account(&self, id: AccountKey) -> Option<Account> {
        if let Some(account) = self.accounts.get(&id) {
            return Some(account.clone());
        }
        self.committed.read().await.accounts.get(&id).cloned()
    }
}

#[async_trait]
impl AccountStore for InMemoryUnitOfWork {
    async fn find_by_account_id(&mut self, account_id: AccountId) -> Result<Option<Account>> {
        let key = self.committed.read().await.account_ids.get(&account_id).copied();
        Ok(match key {
            Some(id) => self.account(id).await,
            None => None,
        })
    }

    async fn find_by_id(&mut self, id: AccountKey) -> Result<Option<Account>> {
        Ok(self.account(id).await)
    }

    async fn debit_if_sufficient(&mut self, id: AccountKey, amount: Amount) -> Result<u64> {
        let Some(mut account) = self.account(id).await else {
            return Ok(0);
        };
        if !account.debit_if_sufficient(amount)? {
            return Ok(0);
        }
        self.accounts.insert(id, account);
        Ok(1)
    }

    async fn credit_unconditional(&mut self, id: AccountKey, amount: Amount) -> Result<u64> {
        let Some(mut account) = self.account(id).await else {
            return Ok(0);
        };
        account.credit(amount)?;
        self.accounts.insert(id, account);
        Ok(1)
    }
}

#[async_trait]
impl LedgerStore for InMemoryUnitOfWork {
    async fn save(&mut self, mut entry: LedgerEntry) -> Result<LedgerEntry> {
        let id = match entry.id {
            Some(id) => {
                let known = self.ledger.contains_key(&id)
                    || self.committed.read().await.ledger.contains_key(&id);
                if !known {
                    return Err(TransferError::internal(format!(
                        "Ledger entry {id} not found"
                    )));
                }
                id
            }
            None => {
                self.next_ledger_id += 1;
                self.next_ledger_id
            }
        };
        entry.id = Some(id);
        self.ledger.insert(id, entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryUnitOfWork {
            committed,
            accounts,
            ledger,
            next_ledger_id,
            _writer,
        } = *self;
        let mut tables = committed.write().await;
        tables.accounts.extend(accounts);
        tables.ledger.extend(ledger);
        tables.next_ledger_id = next_ledger_id;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
