//! Integration test common infrastructure.
//!
//! Provides an in-process bot server and a helper for spawning the HTTP
//! service on an ephemeral port.

pub mod mock;
pub mod server;

#[allow(unused_imports)]
pub use mock::MockBotServer;
#[allow(unused_imports)]
pub use server::TestServer;
