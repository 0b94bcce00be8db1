use crate::domain::account::{Account, AccountId, AccountKey, Amount, Balance};
use crate::domain::ledger::LedgerEntry;
use crate::domain::ports::{DatabaseRef, UnitOfWork};
use crate::error::{Result, TransferError};
use tracing::{Span, error, info, instrument, warn};
use uuid::Uuid;

/// Outcome of a committed transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferResult {
    pub transfer_id: Uuid,
    pub source_account_id: AccountId,
    pub destination_account_id: AccountId,
    /// The amount debited from the source.
    pub amount: Amount,
    /// The source's balance right after the debit, as read inside the unit of work.
    pub updated_balance: Balance,
}

enum UnitOutcome {
    Completed(TransferResult),
    Aborted,
}

/// Moves funds between two accounts.
///
/// `TransferEngine` holds no locks of its own. Preconditions are checked against
/// committed data; the mutations then run inside one unit of work where the
/// store's conditional debit is the only overdraft guard. A precondition read that
/// went stale before the unit started surfaces as `TransferFailed`.
pub struct TransferEngine {
    database: DatabaseRef,
}

impl TransferEngine {
    /// Creates a new `TransferEngine` over a shared database handle.
    pub fn new(database: DatabaseRef) -> Self {
        Self { database }
    }

    /// Executes one transfer of `amount` from `source_account_id` to
    /// `destination_account_id`.
    ///
    /// Fails with `InvalidRequest`, `NotFound` or `InsufficientFunds` before any
    /// write, and with `TransferFailed` once the unit of work has been opened, in
    /// which case every write of the unit has been rolled back.
    #[instrument(skip(self), fields(transfer_id = tracing::field::Empty))]
    pub async fn execute(
        &self,
        source_account_id: AccountId,
        destination_account_id: AccountId,
        amount: Amount,
    ) -> Result<TransferResult> {
        let (source, destination) = self
            .check_preconditions(source_account_id, destination_account_id, amount)
            .await?;

        let transfer_id = Uuid::new_v4();
        Span::current().record("transfer_id", tracing::field::display(transfer_id));

        let mut uow = self.database.begin().await.map_err(|e| {
            error!(error = %e, "Could not open unit of work");
            TransferError::TransferFailed
        })?;

        match Self::apply(uow.as_mut(), transfer_id, &source, &destination, amount).await {
            Ok(UnitOutcome::Completed(result)) => {
                uow.commit().await.map_err(|e| {
                    error!(error = %e, "Commit failed");
                    TransferError::TransferFailed
                })?;
                info!(
                    source = source_account_id,
                    destination = destination_account_id,
                    updated_balance = %result.updated_balance,
                    "Transfer completed"
                );
                Ok(result)
            }
            Ok(UnitOutcome::Aborted) => {
                Self::roll_back(uow).await;
                Err(TransferError::TransferFailed)
            }
            Err(e) => {
                error!(error = %e, "Transfer aborted by store error");
                Self::roll_back(uow).await;
                Err(TransferError::TransferFailed)
            }
        }
    }

    async fn check_preconditions(
        &self,
        source_account_id: AccountId,
        destination_account_id: AccountId,
        amount: Amount,
    ) -> Result<(Account, Account)> {
        if source_account_id == 0 || destination_account_id == 0 {
            warn!("Account ids must be positive");
            return Err(TransferError::InvalidRequest(
                "Account ids must be positive".to_string(),
            ));
        }
        if source_account_id == destination_account_id {
            warn!(
                account_id = source_account_id,
                "Source and destination accounts cannot be the same"
            );
            return Err(TransferError::InvalidRequest(
                "Source and destination accounts cannot be the same".to_string(),
            ));
        }

        let Some(source) = self.database.find_account(source_account_id).await? else {
            warn!(account_id = source_account_id, "Source account not found");
            return Err(TransferError::NotFound(
                "Source account not found".to_string(),
            ));
        };
        if !source.balance.covers(amount) {
            warn!(
                account_id = source_account_id,
                balance = %source.balance,
                "Insufficient funds"
            );
            return Err(TransferError::InsufficientFunds {
                account_id: source_account_id,
                balance: source.balance,
                requested: amount.value(),
            });
        }

        let Some(destination) = self.database.find_account(destination_account_id).await? else {
            warn!(
                account_id = destination_account_id,
                "Destination account not found"
            );
            return Err(TransferError::NotFound(
                "Destination account not found".to_string(),
            ));
        };

        Ok((source, destination))
    }

    /// Runs both legs inside `uow`. Neither commits nor rolls back.
    async fn apply(
        uow: &mut dyn UnitOfWork,
        transfer_id: Uuid,
        source: &Account,
        destination: &Account,
        amount: Amount,
    ) -> Result<UnitOutcome> {
        let mut debit = uow
            .save(LedgerEntry::debit(transfer_id, source, amount))
            .await?;
        info!(ledger_id = ?debit.id, "Debit entry created");

        if uow.debit_if_sufficient(source.id, amount).await? == 0 {
            // The balance moved after the precondition read.
            error!(
                account_id = source.account_id,
                "Debit rejected by balance guard"
            );
            debit.fail()?;
            uow.save(debit).await?;
            return Ok(UnitOutcome::Aborted);
        }
        let source_after = Self::reload(uow, source.id).await?;
        debit.complete(source_after.balance)?;
        let debit = uow.save(debit).await?;
        info!(ledger_id = ?debit.id, end_balance = %source_after.balance, "Debit entry completed");

        let mut credit = uow
            .save(LedgerEntry::credit(transfer_id, destination, amount))
            .await?;
        info!(ledger_id = ?credit.id, "Credit entry created");

        if uow.credit_unconditional(destination.id, amount).await? == 0 {
            error!(
                account_id = destination.account_id,
                "Credit found no destination row"
            );
            credit.fail()?;
            uow.save(credit).await?;
            return Ok(UnitOutcome::Aborted);
        }
        let destination_after = Self::reload(uow, destination.id).await?;
        credit.complete(destination_after.balance)?;
        let credit = uow.save(credit).await?;
        info!(ledger_id = ?credit.id, end_balance = %destination_after.balance, "Credit entry completed");

        Ok(UnitOutcome::Completed(TransferResult {
            transfer_id,
            source_account_id: source.account_id,
            destination_account_id: destination.account_id,
            amount,
            updated_balance: source_after.balance,
        }))
    }

    async fn reload(uow: &mut dyn UnitOfWork, id: AccountKey) -> Result<Account> {
        uow.find_by_id(id)
            .await?
            .ok_or_else(|| TransferError::internal(format!("Account row {id} vanished")))
    }

    async fn roll_back(uow: Box<dyn UnitOfWork>) {
        if let Err(e) = uow.rollback().await {
            error!(error = %e, "Rollback failed");
        }
    }
}
