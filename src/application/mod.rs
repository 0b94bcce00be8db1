//! Application layer containing the core business logic orchestration.
//!
//! `TransferEngine` is the entry point for moving funds; `AccountService` opens
//! and looks up accounts. Both share one `Database` handle and hold no state of
//! their own, so they can be used from many tasks at once.

pub mod accounts;
pub mod engine;
