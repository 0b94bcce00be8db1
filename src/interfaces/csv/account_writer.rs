use crate::domain::account::{Account, AccountId};
use crate::domain::ledger::{LedgerEntry, LedgerId};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct AccountRow {
    account_id: AccountId,
    balance: String,
}

#[derive(Serialize)]
struct LedgerRow {
    id: Option<LedgerId>,
    transfer_id: String,
    account_id: AccountId,
    debit: Option<String>,
    credit: Option<String>,
    start_balance: String,
    end_balance: Option<String>,
    status: &'static str,
    created_at: String,
    updated_at: String,
}

impl From<&LedgerEntry> for LedgerRow {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id,
            transfer_id: entry.transfer_id.to_string(),
            account_id: entry.account_id,
            debit: entry.debit.map(|a| a.to_string()),
            credit: entry.credit.map(|a| a.to_string()),
            start_balance: entry.start_balance.to_string(),
            end_balance: entry.end_balance.map(|b| b.to_string()),
            status: entry.status.as_str(),
            created_at: entry.created_at.to_rfc3339(),
            updated_at: entry.updated_at.to_rfc3339(),
        }
    }
}

/// Writes account balances as `account_id,balance` CSV, with trailing zeros trimmed.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_accounts(&mut self, accounts: Vec<Account>) -> Result<()> {
        if accounts.is_empty() {
            self.writer.write_record(["account_id", "balance"])?;
        }
        for account in accounts {
            self.writer.serialize(AccountRow {
                account_id: account.account_id,
                balance: account.balance.to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes the ledger audit trail, one row per leg.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_entries(&mut self, entries: &[LedgerEntry]) -> Result<()> {
        for entry in entries {
            self.writer.serialize(LedgerRow::from(entry))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Amount, Balance};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_write_accounts() {
        let accounts = vec![
            Account::new(1, 1, Balance::new(dec!(900.0000))),
            Account::new(2, 2, Balance::new(dec!(600.5))),
        ];
        let mut out = Vec::new();
        AccountWriter::new(&mut out)
            .write_accounts(accounts)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "account_id,balance\n1,900\n2,600.5\n");
    }

    #[test]
    fn test_write_no_accounts_still_has_header() {
        let mut out = Vec::new();
        AccountWriter::new(&mut out).write_accounts(Vec::new()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "account_id,balance\n");
    }

    #[test]
    fn test_write_ledger_entries() {
        let account = Account::new(1, 10, Balance::new(dec!(100)));
        let transfer_id = Uuid::new_v4();
        let mut entry = LedgerEntry::debit(transfer_id, &account, Amount::new(dec!(40)).unwrap());
        entry.id = Some(1);
        entry.complete(Balance::new(dec!(60))).unwrap();

        let mut out = Vec::new();
        LedgerWriter::new(&mut out).write_entries(&[entry]).unwrap();

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,transfer_id,account_id,debit,credit,start_balance,end_balance,status,created_at,updated_at"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with(&format!("1,{transfer_id},10,40,,100,60,COMPLETED,")));
    }
}
