use crate::domain::account::{AccountId, Balance};
use crate::domain::ledger::LedgerStatus;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Insufficient funds: account {account_id} holds {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Balance,
        requested: Decimal,
    },
    #[error("Balance overflow on account {account_id}")]
    BalanceOverflow { account_id: AccountId },
    #[error("Transfer failed")]
    TransferFailed,
    #[error("Ledger entry cannot move from {from} to {to}")]
    InvalidTransition { from: LedgerStatus, to: LedgerStatus },
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

impl TransferError {
    /// True for the failures detected before any unit of work is opened.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidRequest(_)
                | TransferError::NotFound(_)
                | TransferError::InsufficientFunds { .. }
        )
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        TransferError::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_pre_unit_failures_are_preconditions() {
        assert!(TransferError::InvalidRequest("same account".into()).is_precondition());
        assert!(TransferError::NotFound("Source account not found".into()).is_precondition());
        assert!(
            TransferError::InsufficientFunds {
                account_id: 1,
                balance: Balance::new(dec!(5)),
                requested: dec!(10),
            }
            .is_precondition()
        );

        assert!(!TransferError::TransferFailed.is_precondition());
        assert!(!TransferError::BalanceOverflow { account_id: 1 }.is_precondition());
        assert!(!TransferError::internal("store down").is_precondition());
    }
}
