//! Bot database models.

use std::borrow::Cow;

use cia_ruleset::{ParseError, Ruleset};

use crate::channel::get_channel_from_location;
use crate::db::{Asset, AssetKind, FieldValue, Network};
use crate::filter::{FilterMode, compile_filter};

/// A bot on an IRC channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bot {
    pub id: i64,
    pub network_id: i64,
    /// Channel name without the leading `#`.
    pub location: String,
    pub filter_mode: FilterMode,
    /// Newline-separated project names.
    pub project_list: String,
    /// Canonical ruleset text, or empty.
    pub custom_ruleset: String,
    pub show_project_names: bool,
    pub created_at: i64,
}

impl Bot {
    /// Channel name as users type it.
    pub fn channel(&self) -> Cow<'_, str> {
        get_channel_from_location(&self.location)
    }

    /// Full address of the bot, e.g. `irc://irc.example.org/cia`.
    pub fn uri(&self, network: &Network) -> String {
        format!("{}{}", network.uri, self.location)
    }

    /// The ruleset this bot's filter compiles to.
    pub fn effective_ruleset(&self) -> Result<Ruleset, ParseError> {
        compile_filter(self.filter_mode, &self.project_list, &self.custom_ruleset)
    }
}

impl Asset for Bot {
    const KIND: AssetKind = AssetKind::Bot;
    const TABLE: &'static str = "bots";

    fn id(&self) -> i64 {
        self.id
    }

    fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("network_id", FieldValue::Int(self.network_id)),
            ("location", FieldValue::Text(self.location.clone())),
            ("filter_mode", FieldValue::Int(self.filter_mode.code())),
            ("project_list", FieldValue::Text(self.project_list.clone())),
            ("custom_ruleset", FieldValue::Text(self.custom_ruleset.clone())),
            ("show_project_names", FieldValue::Bool(self.show_project_names)),
        ]
    }
}
