//! Application State
//!
//! Shared state accessible by all API handlers.

use crate::config::ApiConfig;
use crate::query::QueryDispatcher;
use crate::source::Session;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Runs queries against the configured source
    pub dispatcher: Arc<QueryDispatcher>,
    /// The one logged-in session; holding the lock serializes queries
    pub session: Arc<Mutex<Session>>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(dispatcher: Arc<QueryDispatcher>, session: Session, config: ApiConfig) -> Self {
        Self {
            dispatcher,
            session: Arc::new(Mutex::new(session)),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
