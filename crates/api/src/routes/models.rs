//! Route definitions for the `/models` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::models;
use crate::state::AppState;

/// Routes mounted at `/models`.
///
/// ```text
/// POST   /create              -> create_model   (multipart `dataset`)
/// PUT    /{model}/update      -> update_model   (multipart `dataset`)
/// GET    /{model}/predict     -> predict
/// GET    /missing_data        -> missing_data
/// ```
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/create", post(models::create_model))
        .route("/{model}/update", put(models::update_model))
        .route("/{model}/predict", get(models::predict))
        .route("/missing_data", get(models::missing_data))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
