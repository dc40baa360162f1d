//! # cia-ruleset
//!
//! The filter language CIA bots use to decide which commit messages they
//! announce in their channel.
//!
//! ## Features
//!
//! - Case-insensitive keywords, `#` comments, free-form whitespace
//! - Predicates over message fields (`project`, `branch`, `author`, ...)
//! - `is` / `matches` / `contains` comparisons, combined with `and`, `or`, `not`
//! - Canonical serialization: re-parsing the output of [`Ruleset`]'s `Display`
//!   always yields the same ruleset
//!
//! ## Quick Start
//!
//! ```rust
//! use cia_ruleset::{Field, Message, Ruleset};
//!
//! let ruleset: Ruleset = r#"
//!     ## only the stable branches of cia itself
//!     project is "cia" and (branch is "main" or branch matches "release-*")
//! "#
//! .parse()
//! .expect("valid ruleset");
//!
//! assert_eq!(
//!     ruleset.to_string(),
//!     r#"project is "cia" and (branch is "main" or branch matches "release-*")"#
//! );
//!
//! let msg = Message::new()
//!     .with(Field::Project, "CIA")
//!     .with(Field::Branch, "release-2.0");
//! assert!(ruleset.matches(&msg));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod ast;
pub mod error;
pub mod eval;
mod glob;
mod lex;
mod parse;

pub use ast::{Expr, Field, Op};
pub use error::{ParseError, ParseErrorKind};
pub use eval::{Fields, Message};

use std::fmt;
use std::str::FromStr;

/// A parsed, validated ruleset.
///
/// Rulesets are always held in canonical form, so two rulesets compare equal
/// exactly when their serializations do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruleset {
    expr: Expr,
}

impl Ruleset {
    /// Parse ruleset source text.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        parse::parse(source).map(|expr| Self { expr })
    }

    /// Wrap an expression, normalizing it into canonical shape.
    pub fn from_expr(expr: Expr) -> Self {
        Self {
            expr: expr.normalize(),
        }
    }

    /// A ruleset that lets every message through.
    pub fn allow_all() -> Self {
        Self { expr: Expr::All }
    }

    /// The root expression.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate the ruleset against a message.
    pub fn matches<F: Fields + ?Sized>(&self, message: &F) -> bool {
        self.expr.evaluate(message)
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.fmt(f)
    }
}

impl FromStr for Ruleset {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
