//! certflow — approval-gated Jenkins triggers for SSL renewals.
//!
//! A single-use, time-bounded token gates one privileged action: triggering
//! the downstream Jenkins deploy job. The binary in `main.rs` wires these
//! modules together; they are exported here so integration tests in
//! `tests/` can build the router directly.

pub mod api;
pub mod certcheck;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod store;
pub mod trigger;

use store::sqlite::SqliteStore;
use trigger::jenkins::JenkinsClient;

/// Shared application state passed to handlers.
pub struct AppState {
    pub db: SqliteStore,
    pub jenkins: JenkinsClient,
    pub config: config::Config,
}
