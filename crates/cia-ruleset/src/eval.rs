//! Ruleset evaluation against commit messages.

use std::collections::BTreeMap;

use crate::ast::{Expr, Field, Op};
use crate::glob::glob_matches;

/// Field access for anything a ruleset can be evaluated against.
pub trait Fields {
    /// Value of `field`, or `None` when the message does not carry it.
    fn field(&self, field: Field) -> Option<&str>;
}

/// A plain commit message: a map from field to text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: BTreeMap<Field, String>,
}

impl Message {
    /// An empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }
}

impl Fields for Message {
    fn field(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }
}

impl Fields for BTreeMap<Field, String> {
    fn field(&self, field: Field) -> Option<&str> {
        self.get(&field).map(String::as_str)
    }
}

fn compare(op: Op, pattern: &str, value: &str) -> bool {
    match op {
        Op::Is => value.to_lowercase() == pattern.to_lowercase(),
        Op::Matches => glob_matches(pattern, value),
        Op::Contains => value.to_lowercase().contains(&pattern.to_lowercase()),
    }
}

impl Expr {
    /// Evaluate this expression against a message.
    ///
    /// A predicate on a field the message lacks is false. `files` holds one
    /// path per line and a predicate on it holds if any line satisfies it.
    pub fn evaluate<F: Fields + ?Sized>(&self, message: &F) -> bool {
        match self {
            Expr::All => true,
            Expr::None => false,
            Expr::Predicate { field, op, value } => match message.field(*field) {
                Some(text) if *field == Field::Files => {
                    text.lines().any(|line| compare(*op, value, line))
                }
                Some(text) => compare(*op, value, text),
                None => false,
            },
            Expr::Not(inner) => !inner.evaluate(message),
            Expr::And(children) => children.iter().all(|c| c.evaluate(message)),
            Expr::Or(children) => children.iter().any(|c| c.evaluate(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ruleset;

    fn commit() -> Message {
        Message::new()
            .with(Field::Project, "CIA")
            .with(Field::Branch, "trunk")
            .with(Field::Author, "micah")
            .with(Field::Log, "Fix the bot cloud sizing")
            .with(Field::Files, "apps/accounts/bots.py\ntemplates/bot_cloud.html")
    }

    fn eval(src: &str) -> bool {
        Ruleset::parse(src).unwrap().matches(&commit())
    }

    #[test]
    fn test_predicates() {
        assert!(eval(r#"project is "cia""#));
        assert!(!eval(r#"project is "ci""#));
        assert!(eval(r#"log contains "BOT CLOUD""#));
        assert!(eval(r#"author matches "mi*""#));
        assert!(!eval(r#"module is "web""#));
    }

    #[test]
    fn test_files_match_any_line() {
        assert!(eval(r#"files matches "templates/*""#));
        assert!(eval(r#"files is "apps/accounts/bots.py""#));
        assert!(!eval(r#"files matches "*.rs""#));
    }

    #[test]
    fn test_connectives() {
        assert!(eval(r#"project is "cia" and not branch is "stable""#));
        assert!(eval(r#"none or author is "micah""#));
        assert!(!eval(r#"all and none"#));
        assert!(eval(r#"not (project is "other" or branch is "other")"#));
    }
}
