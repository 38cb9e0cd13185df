use std::sync::Arc;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: the pool is reference counted and the config sits
/// behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool for the shared database (queue, state, ledger).
    pub pool: visage_db::DbPool,
    pub config: Arc<ServerConfig>,
}
