//! Bot repository.
//!
//! A bot is one channel on one network, plus the filter that decides what
//! gets announced there.

pub mod models;
pub mod queries;

pub use models::Bot;
pub use queries::BotRepository;
