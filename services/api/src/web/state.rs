//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use mystery_core::{AttemptService, CaseService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Read-only after initialization; all mutation goes through the
/// store behind the services.
#[derive(Clone)]
pub struct AppState {
    pub cases: CaseService,
    pub attempts: AttemptService,
    pub config: Arc<Config>,
}
