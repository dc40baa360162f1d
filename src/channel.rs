//! IRC channel name conventions.
//!
//! The bot server's `irc://` URIs carry an implicit `#` in front of the
//! channel, so one channel has two spellings: `#cia` and `cia`. Stored bot
//! locations always use the short spelling. A channel whose literal name starts
//! with `##` keeps its markers, since stripping one would name a different
//! channel.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Channel prefix implied by `irc://` locations.
pub const CHANNEL_MARKER: char = '#';

/// Longest channel name accepted from users.
pub const MAX_CHANNEL_LEN: usize = 63;

/// No whitespace, control characters, commas or percent signs.
static CHANNEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s\x00-\x1f,%]+$").expect("channel regex is valid"));

/// Display form of a stored location: add a single `#` if none is present,
/// leave an existing prefix intact.
pub fn get_channel_from_location(location: &str) -> Cow<'_, str> {
    if location.starts_with(CHANNEL_MARKER) {
        Cow::Borrowed(location)
    } else {
        Cow::Owned(format!("{}{}", CHANNEL_MARKER, location))
    }
}

/// Storage form of a channel: strip exactly one leading `#`, unless the name
/// starts with `##`.
pub fn normalize_channel_to_location(channel: &str) -> &str {
    match channel.strip_prefix(CHANNEL_MARKER) {
        Some(rest) if !rest.starts_with(CHANNEL_MARKER) => rest,
        _ => channel,
    }
}

/// Check a user-supplied channel name, returning the message to show on failure.
pub fn validate_channel(channel: &str) -> Result<(), &'static str> {
    if channel.is_empty() {
        return Err("This field is required.");
    }
    if channel.chars().count() > MAX_CHANNEL_LEN {
        return Err("Ensure this value has at most 63 characters.");
    }
    if !CHANNEL_RE.is_match(channel) {
        return Err("Must be a valid IRC channel name.");
    }
    Ok(())
}
