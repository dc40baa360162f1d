//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::net::SocketAddr;

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

pub fn default_database_path() -> String {
    "data/cia.db".to_string()
}

// =============================================================================
// Auth Defaults
// =============================================================================

pub fn default_user_header() -> String {
    "X-Remote-User".to_string()
}

pub fn default_login_url() -> String {
    "/account/login/".to_string()
}

// =============================================================================
// Bot Server / Cache Defaults
// =============================================================================

pub fn default_bot_server_timeout() -> u64 {
    10
}

/// One hour, matching the page cache lifetime.
pub fn default_bot_cloud_ttl() -> u64 {
    60 * 60
}
