//! One batch run: read → group → forecast → persist → aggregate.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use sources_core::events::read_events_from_path;
use sources_core::grouping::{filter_eligible, prepare};
use sources_core::model::SeasonalTrendModel;
use sources_core::types::now_local;
use sources_db::models::source::UpsertSourcePrediction;
use sources_db::repositories::SourceRepo;
use sources_pipeline::aggregate::{aggregate, BatchReport};
use sources_pipeline::artifact::ArtifactStore;
use sources_pipeline::group::GroupOutcome;

use crate::config::BatchConfig;
use crate::orchestrator::forecast_groups;
use crate::pool::WorkerPool;

/// Run the batch described by `config`.
///
/// Only an unreadable dataset (or one missing required columns) fails the
/// run. Per-group failures end up as diagnostics in the report, and
/// persistence failures are logged and skipped.
pub async fn run_batch(config: &BatchConfig) -> anyhow::Result<BatchReport> {
    let dataset = config.dataset.clone();
    let records = tokio::task::spawn_blocking(move || read_events_from_path(&dataset))
        .await
        .context("Dataset reader task failed")?
        .with_context(|| format!("Failed to load dataset {}", config.dataset.display()))?;
    tracing::info!(records = records.len(), "Dataset loaded");

    let groups = filter_eligible(prepare(records), config.min_group_size);

    let model = Arc::new(SeasonalTrendModel::default());
    let pool = WorkerPool::new(config.workers);
    let outcomes = forecast_groups(groups, model, config.pipeline_options(), &pool).await;

    if let Some(models_dir) = &config.models_dir {
        save_models(models_dir, &outcomes).await;
    }
    if let Some(database_url) = &config.database_url {
        if let Err(e) = record_predictions(database_url, &outcomes).await {
            tracing::warn!(error = %e, "Registry unavailable, forecasts not recorded");
        }
    }

    let report = aggregate(&outcomes, now_local());
    tracing::info!(
        total = report.total(),
        healthy = report.healthy.len(),
        diagnostics = report.diagnostics.len(),
        "Batch complete"
    );
    Ok(report)
}

async fn save_models<F>(models_dir: &Path, outcomes: &[GroupOutcome<F>])
where
    F: serde::Serialize + Clone + Send + 'static,
{
    let store = ArtifactStore::new(models_dir);
    let fitted: Vec<(String, F)> = outcomes
        .iter()
        .filter_map(|o| o.fitted.clone().map(|f| (o.source.clone(), f)))
        .collect();

    let saved = tokio::task::spawn_blocking(move || {
        let mut saved = 0usize;
        for (source, fitted) in &fitted {
            match store.save(source, fitted) {
                Ok(_) => saved += 1,
                Err(e) => tracing::warn!(source = %source, error = %e, "Failed to save model"),
            }
        }
        saved
    })
    .await;

    match saved {
        Ok(saved) => tracing::info!(saved, dir = %models_dir.display(), "Models saved"),
        Err(e) => tracing::warn!(error = %e, "Model saving task failed"),
    }
}

async fn record_predictions<F>(
    database_url: &str,
    outcomes: &[GroupOutcome<F>],
) -> anyhow::Result<()> {
    let pool = sources_db::create_pool(database_url)
        .await
        .context("Failed to connect to registry")?;
    sources_db::run_migrations(&pool)
        .await
        .context("Failed to run registry migrations")?;

    let mut recorded = 0usize;
    for outcome in outcomes {
        let Some(forecast) = &outcome.forecast else {
            continue;
        };
        let input = UpsertSourcePrediction::from_forecast(outcome.source.clone(), forecast);
        match SourceRepo::upsert(&pool, &input).await {
            Ok(_) => recorded += 1,
            Err(e) => tracing::warn!(source = %outcome.source, error = %e, "Failed to record forecast"),
        }
    }
    tracing::info!(recorded, "Forecasts recorded");
    pool.close().await;
    Ok(())
}
