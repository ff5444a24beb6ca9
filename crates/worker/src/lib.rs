//! Batch forecasting job: a bounded worker pool fans the per-group pipeline
//! out over every eligible source in an event log.

pub mod batch;
pub mod config;
pub mod orchestrator;
pub mod pool;
