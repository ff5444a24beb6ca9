//! Handlers for the `/models` resource.
//!
//! Fitting is CPU-bound, so model creation, update and prediction run on the
//! blocking thread pool.

use std::path::Path;

use axum::extract::{Multipart, Path as UrlPath, State};
use axum::Json;
use sources_core::error::CoreError;
use sources_core::events::read_events;
use sources_core::forecast::ForecastResult;
use sources_core::grouping::prepare_single;
use sources_core::model::{ForecastModel, TrendFit};
use sources_core::naming::source_name_from_filename;
use sources_core::series::{DerivedSeries, SeriesError};
use sources_core::types::now_local;
use sources_db::models::source::{SourcePrediction, UpsertSourcePrediction};
use sources_db::repositories::SourceRepo;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the uploaded dataset.
const DATASET_FIELD: &str = "dataset";

/// POST /api/v1/models/create
///
/// Fits a new model on the uploaded dataset and stores it under the file
/// name's stem, replacing any existing model of that name.
pub async fn create_model(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<String> {
    let (filename, data) = read_dataset_upload(multipart).await?;
    let source = source_name_from_filename(&filename)?;
    store_upload(&state.config.datasets_dir(), &filename, &data).await?;

    let series = series_from_upload(&data)?;
    let artifacts = state.artifacts.clone();
    let model = state.model.clone();
    let name = source.clone();
    tokio::task::spawn_blocking(move || artifacts.create(model.as_ref(), &name, &series))
        .await
        .map_err(|e| AppError::InternalError(format!("Model creation task failed: {e}")))??;

    tracing::info!(source = %source, filename = %filename, "Model created");
    Ok(format!("Model created for {filename}"))
}

/// PUT /api/v1/models/{model}/update
///
/// Extends the stored model's history with the uploaded dataset and refits,
/// starting from the stored parameters.
pub async fn update_model(
    State(state): State<AppState>,
    UrlPath(source): UrlPath<String>,
    multipart: Multipart,
) -> AppResult<String> {
    let (filename, data) = read_dataset_upload(multipart).await?;
    sources_core::naming::validate_upload_filename(&filename)?;
    store_upload(&state.config.updates_dir(), &filename, &data).await?;

    let series = series_from_upload(&data)?;
    let artifacts = state.artifacts.clone();
    let model = state.model.clone();
    let name = source.clone();
    tokio::task::spawn_blocking(move || artifacts.update(model.as_ref(), &name, &series))
        .await
        .map_err(|e| AppError::InternalError(format!("Model update task failed: {e}")))??;

    tracing::info!(source = %source, filename = %filename, "Model updated");
    Ok(format!("Model updated for {filename}"))
}

/// GET /api/v1/models/{model}/predict
///
/// Forecasts the next arrival from the stored model and records it in the
/// registry. A registry failure is logged and does not fail the request.
pub async fn predict(
    State(state): State<AppState>,
    UrlPath(source): UrlPath<String>,
) -> AppResult<Json<ForecastResult>> {
    let artifacts = state.artifacts.clone();
    let model = state.model.clone();
    let name = source.clone();
    let forecast = tokio::task::spawn_blocking(move || -> AppResult<ForecastResult> {
        let fitted: TrendFit = artifacts.load(&name)?;
        let point = model.forecast(&fitted)?;
        Ok(ForecastResult::from_point(&point)?)
    })
    .await
    .map_err(|e| AppError::InternalError(format!("Prediction task failed: {e}")))??;

    let input = UpsertSourcePrediction::from_forecast(source.clone(), &forecast);
    if let Err(e) = SourceRepo::upsert(&state.pool, &input).await {
        tracing::warn!(source = %source, error = %e, "Failed to record prediction");
    }

    Ok(Json(forecast))
}

/// GET /api/v1/models/missing_data
///
/// Sources whose recorded predicted arrival is already in the past.
pub async fn missing_data(State(state): State<AppState>) -> AppResult<Json<Vec<SourcePrediction>>> {
    let stale = SourceRepo::find_stale(&state.pool, now_local()).await?;
    Ok(Json(stale))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pull the `dataset` file field out of a multipart body.
async fn read_dataset_upload(mut multipart: Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(DATASET_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Dataset upload must have a file name".into()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok((filename, data.to_vec()));
    }
    Err(AppError::BadRequest(format!(
        "Missing required '{DATASET_FIELD}' field"
    )))
}

/// Keep a copy of the uploaded dataset. The file name is already validated.
async fn store_upload(dir: &Path, filename: &str, data: &[u8]) -> AppResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    tokio::fs::write(dir.join(filename), data)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    Ok(())
}

/// Parse an uploaded dataset as a single group and derive its series.
fn series_from_upload(data: &[u8]) -> AppResult<DerivedSeries> {
    let records = prepare_single(read_events(data)?);
    DerivedSeries::from_events(&records).map_err(|e| match e {
        SeriesError::Empty => AppError::BadRequest("Dataset contains no completed events".into()),
        SeriesError::MissingEpoch { .. } => CoreError::Validation(e.to_string()).into(),
    })
}
