//! Funds transfers between accounts with a paired, permanent ledger.
//!
//! The [`TransferEngine`](application::engine::TransferEngine) validates a
//! transfer against committed balances, then debits the source and credits the
//! destination inside one unit of work, writing one ledger entry per leg. Either
//! both legs commit or nothing does.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod logging;
