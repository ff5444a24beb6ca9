use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::Parser;
use sources_core::grouping::DEFAULT_MIN_GROUP_SIZE;
use sources_pipeline::group::{PipelineOptions, DEFAULT_CV_HORIZON_FRACTION};

use crate::pool::DEFAULT_WORKER_COUNT;

/// Batch forecasting job configuration.
///
/// Every flag can also be supplied through the environment (or `.env`):
///
/// | Env Var          | Default |
/// |------------------|---------|
/// | `DATASET_PATH`   | -       |
/// | `MIN_GROUP_SIZE` | `5000`  |
/// | `WORKER_COUNT`   | `20`    |
/// | `CROSS_VALIDATE` | `false` |
/// | `DEBUG`          | `false` |
/// | `MODELS_DIR`     | unset   |
/// | `DATABASE_URL`   | unset   |
#[derive(Debug, Clone, Parser)]
#[command(name = "sources-worker")]
#[command(about = "Forecast the next arrival of every source in an event log", long_about = None)]
pub struct BatchConfig {
    /// CSV event log to forecast from
    #[arg(env = "DATASET_PATH")]
    pub dataset: PathBuf,

    /// Groups must have more than this many completed events
    #[arg(long, env = "MIN_GROUP_SIZE", default_value_t = DEFAULT_MIN_GROUP_SIZE)]
    pub min_group_size: usize,

    /// Number of groups fitted concurrently
    #[arg(long, env = "WORKER_COUNT", default_value_t = DEFAULT_WORKER_COUNT)]
    pub workers: usize,

    /// Report a cross-validation metric per source
    #[arg(long, env = "CROSS_VALIDATE", value_parser = BoolishValueParser::new())]
    pub cross_validate: bool,

    /// Hold-out size as a fraction of each series, in (0, 1]
    #[arg(long, default_value_t = DEFAULT_CV_HORIZON_FRACTION, value_parser = parse_fraction)]
    pub cv_horizon_fraction: f64,

    /// Show model diagnostics and log every forecast
    #[arg(long, env = "DEBUG", value_parser = BoolishValueParser::new())]
    pub debug: bool,

    /// Save each fitted model into this directory
    #[arg(long, env = "MODELS_DIR")]
    pub models_dir: Option<PathBuf>,

    /// Upsert each forecast into this registry (e.g. `sqlite://sources.db`)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

impl BatchConfig {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            cross_validate: self.cross_validate,
            cv_horizon_fraction: self.cv_horizon_fraction,
            debug: self.debug,
        }
    }
}

fn parse_fraction(value: &str) -> Result<f64, String> {
    let fraction: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if fraction > 0.0 && fraction <= 1.0 {
        Ok(fraction)
    } else {
        Err(format!("expected a fraction in (0, 1], got {value}"))
    }
}
