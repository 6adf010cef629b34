use std::sync::Arc;

use cpeevent_db::Database;

use crate::credentials::TokenService;
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
}

impl AppStateInner {
    pub fn new(db: Database, tokens: TokenService) -> AppState {
        Arc::new(Self { db, tokens })
    }
}

/// Run blocking DB work off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state)).await?
}
