//! Per-bot message filters.
//!
//! A bot either forwards everything, forwards an explicit list of projects,
//! or evaluates a custom ruleset. Whatever the mode, the filter compiles to a
//! single [`Ruleset`] for the bot server.

use cia_ruleset::{Expr, Field, Op, ParseErrorKind, Ruleset};

/// How a bot decides which messages to announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Every message.
    #[default]
    AllowAll,
    /// Messages from the projects in the bot's project list.
    ProjectList,
    /// Messages accepted by the bot's custom ruleset.
    Custom,
}

impl FilterMode {
    pub const ALL: [FilterMode; 3] = [
        FilterMode::AllowAll,
        FilterMode::ProjectList,
        FilterMode::Custom,
    ];

    /// Stored integer code.
    pub fn code(self) -> i64 {
        match self {
            FilterMode::AllowAll => 0,
            FilterMode::ProjectList => 1,
            FilterMode::Custom => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }

    /// Choice label shown next to the radio button.
    pub fn label(self) -> &'static str {
        match self {
            FilterMode::AllowAll => "Show all messages",
            FilterMode::ProjectList => "Show messages from these projects",
            FilterMode::Custom => "Use a custom ruleset",
        }
    }
}

/// Trim each line of a project list, drop blank lines, rejoin with `\n`.
pub fn normalize_project_list(raw: &str) -> String {
    projects(raw).collect::<Vec<_>>().join("\n")
}

/// Non-blank, trimmed entries of a project list.
pub fn projects(list: &str) -> impl Iterator<Item = &str> {
    list.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Validate ruleset source and return its canonical text.
///
/// Blank source (or source with nothing but comments) is accepted as `""`
/// only when `allow_empty` is set. The error string is meant for the user.
pub fn validate_ruleset(source: &str, allow_empty: bool) -> Result<String, String> {
    if allow_empty && source.trim().is_empty() {
        return Ok(String::new());
    }
    match Ruleset::parse(source) {
        Ok(ruleset) => Ok(ruleset.to_string()),
        Err(e) if allow_empty && e.kind == ParseErrorKind::Empty => Ok(String::new()),
        Err(e) => Err(e.to_string()),
    }
}

/// The ruleset a bot with this filter configuration runs.
///
/// An empty project list forwards nothing; a custom ruleset that no longer
/// parses is reported as an error rather than silently widened.
pub fn compile_filter(
    mode: FilterMode,
    project_list: &str,
    custom_ruleset: &str,
) -> Result<Ruleset, cia_ruleset::ParseError> {
    match mode {
        FilterMode::AllowAll => Ok(Ruleset::allow_all()),
        FilterMode::ProjectList => Ok(Ruleset::from_expr(Expr::or(
            projects(project_list)
                .map(|p| Expr::predicate(Field::Project, Op::Is, p))
                .collect(),
        ))),
        FilterMode::Custom => Ruleset::parse(custom_ruleset),
    }
}
