// API module - HTTP endpoints

pub mod health;
pub mod status;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::services::status_registry::StatusRegistry;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub registry: StatusRegistry,
    pub pool: PgPool,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
