//! cia-accounts - account management for the CIA commit notification service.
//!
//! Users register IRC bots on channels, choose what each bot announces, and
//! browse the requests the bot server is currently serving. Every change to a
//! bot is recorded in a changeset ledger and pushed to the bot server.

pub mod accounts;
pub mod botserver;
pub mod cache;
pub mod channel;
pub mod cloud;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod http;
pub mod metrics;
pub mod registry;

pub use accounts::{Accounts, AddBotOutcome};
pub use error::{AccountError, AccountResult, FieldErrors};
