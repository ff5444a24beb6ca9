pub mod health;
pub mod models;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /models/create                 fit and store a model (POST)
/// /models/{model}/update         extend and refit a model (PUT)
/// /models/{model}/predict        next arrival window (GET)
/// /models/missing_data           overdue sources (GET)
/// ```
pub fn api_routes(config: &ServerConfig) -> Router<AppState> {
    Router::new().nest("/models", models::router(config.max_upload_bytes))
}
