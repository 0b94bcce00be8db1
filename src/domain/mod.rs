//! Domain model: accounts, ledger entries and the storage ports the engine
//! depends on.

pub mod account;
pub mod ledger;
pub mod ports;
