use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::services::{DataProvider, SessionStore};

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    provider: Arc<DataProvider>,
    sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: Config, provider: DataProvider) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config: Arc::new(config),
            provider: Arc::new(provider),
            sessions: Arc::new(SessionStore::new()),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &DataProvider {
        &self.provider
    }

    pub fn provider_arc(&self) -> Arc<DataProvider> {
        Arc::clone(&self.provider)
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn sessions_arc(&self) -> Arc<SessionStore> {
        Arc::clone(&self.sessions)
    }

    pub fn jwt_secret(&self) -> Option<&str> {
        self.config.jwt_secret.as_deref()
    }
}
