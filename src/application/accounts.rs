use crate::domain::account::{AccountId, AccountKey, Balance, MONEY_SCALE};
use crate::domain::ports::DatabaseRef;
use crate::error::{Result, TransferError};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountInfo {
    pub account_id: AccountId,
    pub balance: Balance,
}

/// Account opening and lookup. Balances are never changed here after creation.
pub struct AccountService {
    database: DatabaseRef,
}

impl AccountService {
    pub fn new(database: DatabaseRef) -> Self {
        Self { database }
    }

    /// Opens an account and returns its surrogate key.
    pub async fn create_account(
        &self,
        account_id: AccountId,
        initial_balance: Decimal,
    ) -> Result<AccountKey> {
        if account_id == 0 {
            return Err(TransferError::InvalidRequest(
                "Account id must be positive".to_string(),
            ));
        }
        if initial_balance < Decimal::ZERO || initial_balance.normalize().scale() > MONEY_SCALE {
            return Err(TransferError::InvalidRequest(format!(
                "Initial balance must be non-negative with at most {MONEY_SCALE} decimal places"
            )));
        }

        let account = self
            .database
            .create_account(account_id, Balance::new(initial_balance))
            .await
            .inspect_err(|e| warn!(account_id, error = %e, "Account not created"))?;
        info!(account_id, "Account created");
        Ok(account.id)
    }

    pub async fn get_account(&self, account_id: AccountId) -> Result<AccountInfo> {
        match self.database.find_account(account_id).await? {
            Some(account) => Ok(AccountInfo {
                account_id: account.account_id,
                balance: account.balance,
            }),
            None => {
                warn!(account_id, "Account not found");
                Err(TransferError::NotFound("Account not found".to_string()))
            }
        }
    }
}
