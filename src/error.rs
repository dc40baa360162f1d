//! Unified error handling for the account service.
//!
//! Workflows return [`AccountError`]. A claim that collides with another
//! user's ownership is not an error: it comes back as an outcome
//! (see [`crate::accounts::AddBotOutcome`]).

use crate::botserver::BotServerError;
use crate::db::DbError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Field errors (form validation)
// ============================================================================

/// Validation messages keyed by input field, in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Account Errors (workflow results)
// ============================================================================

/// Errors returned by account workflows.
#[derive(Debug, Error)]
pub enum AccountError {
    /// User input was malformed. Nothing was written.
    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    /// The bot server call failed.
    #[error(transparent)]
    Transport(#[from] BotServerError),

    #[error("no bot server is configured")]
    BotServerUnavailable,

    #[error(transparent)]
    Database(#[from] DbError),
}

impl AccountError {
    /// Validation failure on a single field.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Transport(_) => "transport",
            Self::BotServerUnavailable => "bot_server_unavailable",
            Self::Database(_) => "database",
        }
    }
}

/// Result type for account workflows.
pub type AccountResult<T> = Result<T, AccountError>;
