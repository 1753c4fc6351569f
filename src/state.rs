// src/state.rs

use crate::config::Config;
use crate::session::SessionRegistry;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    pub config: Config,
}

impl FromRef<AppState> for SessionRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
