use std::sync::Arc;

use sources_core::model::SeasonalTrendModel;
use sources_pipeline::artifact::ArtifactStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Prediction registry pool.
    pub pool: sources_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Per-source model artifacts under `config.data_dir`.
    pub artifacts: Arc<ArtifactStore>,
    /// Forecasting model used for create and update.
    pub model: Arc<SeasonalTrendModel>,
}

impl AppState {
    pub fn new(pool: sources_db::DbPool, config: ServerConfig) -> Self {
        let artifacts = Arc::new(ArtifactStore::new(config.data_dir.clone()));
        Self {
            pool,
            config: Arc::new(config),
            artifacts,
            model: Arc::new(SeasonalTrendModel::default()),
        }
    }
}
