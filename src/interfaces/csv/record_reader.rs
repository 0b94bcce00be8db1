use crate::domain::account::AccountId;
use crate::error::{Result, TransferError};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::io::Read;

/// One row of the accounts file: `account_id, balance`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct AccountSeed {
    pub account_id: AccountId,
    pub balance: Decimal,
}

/// One row of the transfers file: `source, destination, amount`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct TransferRequest {
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Decimal,
}

/// Reads typed records from a CSV source.
///
/// This reader wraps `csv::Reader` and handles whitespace trimming and flexible
/// record lengths automatically.
pub struct RecordReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RecordReader<R> {
    /// Creates a new `RecordReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes records, so large
    /// files are streamed rather than loaded whole.
    pub fn records<T: DeserializeOwned>(self) -> impl Iterator<Item = Result<T>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(TransferError::from))
    }
}
