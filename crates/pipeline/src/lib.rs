//! Forecast pipeline stages shared by the batch worker and the API:
//! running one group, aggregating a batch, and persisting fitted models.

pub mod aggregate;
pub mod artifact;
pub mod group;
pub mod locks;

pub use aggregate::{aggregate, BatchReport, Diagnostic};
pub use artifact::{ArtifactError, ArtifactStore};
pub use group::{run_group, GroupOutcome, PipelineOptions};
