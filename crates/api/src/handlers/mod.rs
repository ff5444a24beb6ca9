//! Request handlers.
//!
//! Handlers delegate to the artifact store in `sources_pipeline` and the
//! registry repository in `sources_db`, mapping errors via
//! [`AppError`](crate::error::AppError).

pub mod models;
