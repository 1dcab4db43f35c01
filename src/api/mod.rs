// API module - HTTP endpoints

pub mod audit;
pub mod caller;
pub mod cards;
pub mod health;
pub mod verification;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;
use crate::services::notifier::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub notifier: Notifier,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
