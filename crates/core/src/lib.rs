//! Domain logic for per-source arrival forecasting.
//!
//! Everything in this crate is synchronous and free of I/O other than
//! reading CSV from a caller-supplied reader, so the worker and the API
//! can share it without pulling in a runtime.

pub mod error;
pub mod events;
pub mod forecast;
pub mod grouping;
pub mod metrics;
pub mod model;
pub mod naming;
pub mod quiet;
pub mod series;
pub mod types;
