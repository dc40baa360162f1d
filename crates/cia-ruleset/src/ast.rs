//! Ruleset syntax tree and its canonical serialization.

use std::fmt;

/// A commit message field a predicate can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// Project name.
    Project,
    /// Module (sub-project) name.
    Module,
    /// Branch the commit landed on.
    Branch,
    /// Commit author.
    Author,
    /// Revision identifier.
    Revision,
    /// Commit log message.
    Log,
    /// Changed file paths, one per line.
    Files,
    /// Link to the commit.
    Url,
}

impl Field {
    /// Every field, in declaration order.
    pub const ALL: [Field; 8] = [
        Field::Project,
        Field::Module,
        Field::Branch,
        Field::Author,
        Field::Revision,
        Field::Log,
        Field::Files,
        Field::Url,
    ];

    /// Keyword used in ruleset source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Project => "project",
            Field::Module => "module",
            Field::Branch => "branch",
            Field::Author => "author",
            Field::Revision => "revision",
            Field::Log => "log",
            Field::Files => "files",
            Field::Url => "url",
        }
    }

    /// Look up a field by its (case-insensitive) name.
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison applied by a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Case-insensitive equality.
    Is,
    /// Case-insensitive glob (`*`, `?`).
    Matches,
    /// Case-insensitive substring.
    Contains,
}

impl Op {
    /// Keyword used in ruleset source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Is => "is",
            Op::Matches => "matches",
            Op::Contains => "contains",
        }
    }

    /// Look up an operator by its (case-insensitive) name.
    pub fn from_name(name: &str) -> Option<Op> {
        [Op::Is, Op::Matches, Op::Contains]
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ruleset expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Matches every message.
    All,
    /// Matches no message.
    None,
    /// `field op "value"`.
    Predicate {
        /// Field under test.
        field: Field,
        /// Comparison.
        op: Op,
        /// Literal compared against.
        value: String,
    },
    /// Negation.
    Not(Box<Expr>),
    /// Conjunction of two or more expressions.
    And(Vec<Expr>),
    /// Disjunction of two or more expressions.
    Or(Vec<Expr>),
}

impl Expr {
    /// Build a predicate.
    pub fn predicate(field: Field, op: Op, value: impl Into<String>) -> Expr {
        Expr::Predicate {
            field,
            op,
            value: value.into(),
        }
    }

    /// Negate an expression.
    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Expr) -> Expr {
        Expr::Not(Box::new(inner))
    }

    /// Conjunction, with nested conjunctions flattened.
    ///
    /// An empty list is [`Expr::All`]; a single element is returned as is.
    pub fn and(children: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Expr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::All,
            1 => flat.remove(0),
            _ => Expr::And(flat),
        }
    }

    /// Disjunction, with nested disjunctions flattened.
    ///
    /// An empty list is [`Expr::None`]; a single element is returned as is.
    pub fn or(children: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Expr::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::None,
            1 => flat.remove(0),
            _ => Expr::Or(flat),
        }
    }

    /// Rebuild the tree through the flattening constructors.
    pub fn normalize(self) -> Expr {
        match self {
            Expr::Not(inner) => Expr::not(inner.normalize()),
            Expr::And(children) => Expr::and(children.into_iter().map(Expr::normalize).collect()),
            Expr::Or(children) => Expr::or(children.into_iter().map(Expr::normalize).collect()),
            leaf => leaf,
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Expr::And(_) | Expr::Or(_))
    }
}

/// Writes a string literal with `"` and `\` escaped.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                other => write!(f, "{}", other)?,
            }
        }
        f.write_str("\"")
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    children: &[Expr],
    sep: &str,
    wrap: fn(&Expr) -> bool,
) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if wrap(child) {
            write!(f, "({})", child)?;
        } else {
            write!(f, "{}", child)?;
        }
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::All => f.write_str("all"),
            Expr::None => f.write_str("none"),
            Expr::Predicate { field, op, value } => {
                write!(f, "{} {} {}", field, op, Quoted(value))
            }
            Expr::Not(inner) if inner.is_compound() => write!(f, "not ({})", inner),
            Expr::Not(inner) => write!(f, "not {}", inner),
            // `and` binds tighter than `or`, so only nested disjunctions need
            // parentheses inside a conjunction.
            Expr::And(children) => write_joined(f, children, " and ", Expr::is_compound),
            Expr::Or(children) => {
                write_joined(f, children, " or ", |c| matches!(c, Expr::Or(_)))
            }
        }
    }
}
