//! Fan-out of the per-group pipeline across the worker pool.

use std::sync::Arc;

use sources_core::grouping::Groups;
use sources_core::model::ForecastModel;
use sources_pipeline::group::{run_group, GroupOutcome, PipelineOptions};

use crate::pool::WorkerPool;

/// Forecast every group concurrently.
///
/// Returns one outcome per submitted group, in completion order. A group
/// whose task panics gets an absent outcome; its siblings are unaffected.
pub async fn forecast_groups<M: ForecastModel>(
    groups: Groups,
    model: Arc<M>,
    options: PipelineOptions,
    pool: &WorkerPool,
) -> Vec<GroupOutcome<M::Fitted>> {
    let tasks: Vec<_> = groups.into_iter().collect();
    tracing::info!(
        groups = tasks.len(),
        workers = pool.size(),
        model = model.name(),
        "Forecasting groups"
    );

    let results = pool
        .run(tasks, move |source, records| {
            run_group(model.as_ref(), source, &records, &options)
        })
        .await;

    results
        .into_iter()
        .map(|result| match result.outcome {
            Ok(outcome) => outcome,
            Err(failure) => {
                tracing::warn!(source = %result.key, error = %failure, "Group task failed");
                GroupOutcome::failed(result.key, failure.to_string())
            }
        })
        .collect()
}
