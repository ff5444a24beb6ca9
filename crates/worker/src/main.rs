use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sources_worker::batch::run_batch;
use sources_worker::config::BatchConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = BatchConfig::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sources_worker=info,sources_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(
        dataset = %config.dataset.display(),
        workers = config.workers,
        min_group_size = config.min_group_size,
        "Worker starting"
    );

    let report = run_batch(&config).await?;

    for diagnostic in &report.diagnostics {
        eprintln!("{diagnostic}");
    }
    if config.cross_validate {
        for (source, mape) in &report.validation {
            println!("{source}\t{mape:.4}");
        }
    }

    tracing::info!(
        healthy = report.healthy.len(),
        issues = report.diagnostics.len(),
        "Worker finished"
    );
    Ok(())
}
