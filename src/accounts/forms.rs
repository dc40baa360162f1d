//! Typed validators for account forms.
//!
//! Each validator checks every field, collecting all messages, and only
//! returns a cleaned value when the whole input is acceptable. Nothing here
//! touches the database.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::channel::validate_channel;
use crate::db::FieldValue;
use crate::error::FieldErrors;
use crate::filter::{FilterMode, normalize_project_list, validate_ruleset};
use crate::registry::NetworkSelection;

/// Network choice meaning "the network is described in `netname`/`server`".
pub const OTHER_NETWORK: &str = "_other";

const REQUIRED: &str = "This field is required.";
const MAX_NETNAME_LEN: usize = 200;
const MAX_SERVER_LEN: usize = 120;

static SERVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,6}(:\d+)?$").expect("server regex is valid")
});

fn too_long(max: usize) -> String {
    format!("Ensure this value has at most {} characters.", max)
}

/// Raw add-bot submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddBotInput {
    /// Network ID, or [`OTHER_NETWORK`].
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub channel: String,
    /// Name of a new network.
    #[serde(default)]
    pub netname: String,
    /// `host[:port]` of a new network.
    #[serde(default)]
    pub server: String,
}

/// A validated add-bot request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddBot {
    pub network: NetworkSelection,
    pub channel: String,
}

impl AddBotInput {
    pub fn is_other_network(&self) -> bool {
        self.network == OTHER_NETWORK
    }
}

/// Check the add-bot form, and the new-network fields when the user picked
/// [`OTHER_NETWORK`].
pub fn validate_add_bot(input: &AddBotInput) -> Result<AddBot, FieldErrors> {
    let mut errors = FieldErrors::new();

    let channel = input.channel.trim();
    if let Err(message) = validate_channel(channel) {
        errors.add("channel", message);
    }

    let network = if input.is_other_network() {
        validate_new_network(input, &mut errors)
    } else if input.network.trim().is_empty() {
        errors.add("network", REQUIRED);
        None
    } else {
        match input.network.trim().parse::<i64>() {
            Ok(id) => Some(NetworkSelection::Existing(id)),
            Err(_) => {
                errors.add("network", "Select a network.");
                None
            }
        }
    };

    match network {
        Some(network) if errors.is_empty() => Ok(AddBot {
            network,
            channel: channel.to_string(),
        }),
        _ => Err(errors),
    }
}

fn validate_new_network(input: &AddBotInput, errors: &mut FieldErrors) -> Option<NetworkSelection> {
    let before = errors.clone();

    let netname = input.netname.trim();
    if netname.is_empty() {
        errors.add("netname", REQUIRED);
    } else if netname.chars().count() > MAX_NETNAME_LEN {
        errors.add("netname", too_long(MAX_NETNAME_LEN));
    }

    let server = input.server.trim();
    if server.is_empty() {
        errors.add("server", REQUIRED);
    } else if server.len() > MAX_SERVER_LEN {
        errors.add("server", too_long(MAX_SERVER_LEN));
    } else if !SERVER_RE.is_match(server) {
        errors.add("server", "Must be a valid hostname with optional port.");
    }

    (*errors == before).then(|| NetworkSelection::Other {
        server: server.to_string(),
        description: netname.to_string(),
    })
}

/// Raw bot-settings submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditBotInput {
    /// [`FilterMode`] code.
    pub filter_mode: Option<i64>,
    #[serde(default)]
    pub project_list: String,
    #[serde(default)]
    pub custom_ruleset: String,
    /// An unchecked box is simply absent, which means false.
    #[serde(default)]
    pub show_project_names: bool,
}

/// Validated bot settings, ready for a changeset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSettings {
    pub filter_mode: FilterMode,
    /// Normalized project list.
    pub project_list: String,
    /// Canonical ruleset text, or empty.
    pub custom_ruleset: String,
    pub show_project_names: bool,
}

impl BotSettings {
    /// Field values in the bot's column names.
    pub fn into_fields(self) -> [(&'static str, FieldValue); 4] {
        [
            ("filter_mode", FieldValue::Int(self.filter_mode.code())),
            ("project_list", FieldValue::Text(self.project_list)),
            ("custom_ruleset", FieldValue::Text(self.custom_ruleset)),
            ("show_project_names", FieldValue::Bool(self.show_project_names)),
        ]
    }
}

/// Check the bot settings form.
///
/// The project list is required in project-list mode. The custom ruleset
/// must always parse when present, and may be empty only outside custom mode.
pub fn validate_edit_bot(input: &EditBotInput) -> Result<BotSettings, FieldErrors> {
    let mut errors = FieldErrors::new();

    let filter_mode = match input.filter_mode {
        None => {
            errors.add("filter_mode", REQUIRED);
            None
        }
        Some(code) => {
            let mode = FilterMode::from_code(code);
            if mode.is_none() {
                errors.add(
                    "filter_mode",
                    "Select a valid choice. That choice is not one of the available choices.",
                );
            }
            mode
        }
    };

    let project_list = normalize_project_list(&input.project_list);
    if filter_mode == Some(FilterMode::ProjectList) && project_list.is_empty() {
        errors.add("project_list", "Please enter at least one project.");
    }

    let allow_empty = filter_mode != Some(FilterMode::Custom);
    let custom_ruleset = match validate_ruleset(&input.custom_ruleset, allow_empty) {
        Ok(canonical) => canonical,
        Err(message) => {
            errors.add("custom_ruleset", message);
            String::new()
        }
    };

    match filter_mode {
        Some(filter_mode) if errors.is_empty() => Ok(BotSettings {
            filter_mode,
            project_list,
            custom_ruleset,
            show_project_names: input.show_project_names,
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(network: &str, channel: &str, netname: &str, server: &str) -> AddBotInput {
        AddBotInput {
            network: network.to_string(),
            channel: channel.to_string(),
            netname: netname.to_string(),
            server: server.to_string(),
        }
    }

    #[test]
    fn test_add_bot_existing_network() {
        let valid = validate_add_bot(&add("3", "#cia", "", "")).unwrap();
        assert_eq!(valid.network, NetworkSelection::Existing(3));
        assert_eq!(valid.channel, "#cia");
    }

    #[test]
    fn test_add_bot_other_network() {
        let valid = validate_add_bot(&add(OTHER_NETWORK, "cia", "Example", "irc.example.org:6667")).unwrap();
        assert_eq!(
            valid.network,
            NetworkSelection::Other {
                server: "irc.example.org:6667".to_string(),
                description: "Example".to_string(),
            }
        );
    }

    #[test]
    fn test_add_bot_reports_every_field() {
        let errors = validate_add_bot(&add(OTHER_NETWORK, "bad channel", "", "not a host")).unwrap_err();
        assert_eq!(errors.get("channel"), Some(&["Must be a valid IRC channel name.".to_string()][..]));
        assert_eq!(errors.get("netname"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(
            errors.get("server"),
            Some(&["Must be a valid hostname with optional port.".to_string()][..])
        );

        let errors = validate_add_bot(&add("freenode", "", "", "")).unwrap_err();
        assert!(errors.get("network").is_some());
        assert_eq!(errors.get("channel"), Some(&[REQUIRED.to_string()][..]));
        assert!(errors.get("server").is_none());
    }

    #[test]
    fn test_add_bot_length_limits() {
        let long_name = "n".repeat(201);
        let errors = validate_add_bot(&add(OTHER_NETWORK, "cia", &long_name, "irc.example.org")).unwrap_err();
        assert_eq!(errors.get("netname"), Some(&[too_long(200)][..]));

        let long_server = format!("{}.example.org", "a".repeat(120));
        let errors = validate_add_bot(&add(OTHER_NETWORK, "cia", "x", &long_server)).unwrap_err();
        assert_eq!(errors.get("server"), Some(&[too_long(120)][..]));
    }

    fn edit(mode: Option<i64>, projects: &str, ruleset: &str) -> EditBotInput {
        EditBotInput {
            filter_mode: mode,
            project_list: projects.to_string(),
            custom_ruleset: ruleset.to_string(),
            show_project_names: false,
        }
    }

    #[test]
    fn test_edit_bot_project_list() {
        let settings = validate_edit_bot(&edit(Some(1), " cia \n\n kde ", "")).unwrap();
        assert_eq!(settings.filter_mode, FilterMode::ProjectList);
        assert_eq!(settings.project_list, "cia\nkde");

        let errors = validate_edit_bot(&edit(Some(1), "\n  \n", "")).unwrap_err();
        assert_eq!(
            errors.get("project_list"),
            Some(&["Please enter at least one project.".to_string()][..])
        );
    }

    #[test]
    fn test_edit_bot_custom_ruleset() {
        let errors = validate_edit_bot(&edit(Some(2), "", "")).unwrap_err();
        assert!(errors.get("custom_ruleset").is_some());

        let settings = validate_edit_bot(&edit(Some(0), "", "")).unwrap();
        assert_eq!(settings.custom_ruleset, "");

        let settings = validate_edit_bot(&edit(Some(2), "", "AUTHOR IS \"micah\"")).unwrap();
        assert_eq!(settings.custom_ruleset, r#"author is "micah""#);

        // A broken ruleset is never stored, even when unused.
        let errors = validate_edit_bot(&edit(Some(0), "", "author is")).unwrap_err();
        assert!(errors.get("custom_ruleset").is_some());
    }

    #[test]
    fn test_edit_bot_filter_mode() {
        assert!(validate_edit_bot(&edit(None, "", "")).unwrap_err().get("filter_mode").is_some());
        assert!(validate_edit_bot(&edit(Some(7), "", "")).unwrap_err().get("filter_mode").is_some());
    }

    #[test]
    fn test_edit_bot_checkbox_defaults_off() {
        let input: EditBotInput = serde_json::from_str(r#"{"filter_mode": 0}"#).unwrap();
        assert!(!input.show_project_names);
        let fields = validate_edit_bot(&input).unwrap().into_fields();
        assert_eq!(fields[3], ("show_project_names", FieldValue::Bool(false)));
    }
}
