//! Durable per-source model artifacts.
//!
//! Each source has at most one artifact, a JSON file named
//! `<source>_serialized_model.json` in the models directory:
//!
//! ```json
//! { "format_version": 1, "source": "billing", "saved_at": "2024-01-01 00:00:00", "model": { ... } }
//! ```
//!
//! Files are replaced atomically (temp file in the same directory, flushed to
//! disk, then renamed), so a reader sees either the previous artifact or the
//! new one.
//! Writers for the same source are serialized in-process; `update` holds the
//! lock across load, fit and save so concurrent updates cannot lose data.

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sources_core::error::CoreError;
use sources_core::model::{ForecastModel, ModelError};
use sources_core::naming::validate_source_name;
use sources_core::series::DerivedSeries;
use sources_core::types::{now_local, timestamp_format, Timestamp};

use crate::locks::KeyedLocks;

/// Version of the artifact envelope written by this crate.
pub const FORMAT_VERSION: u32 = 1;

/// File name suffix appended to the source name.
pub const ARTIFACT_SUFFIX: &str = "_serialized_model.json";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("No model artifact for source '{name}'")]
    NotFound { name: String },

    #[error(transparent)]
    InvalidName(#[from] CoreError),

    #[error("I/O error on {}: {error}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("Corrupt model artifact for source '{name}': {error}")]
    Decode {
        name: String,
        #[source]
        error: serde_json::Error,
    },

    #[error("Model artifact for source '{name}' has unsupported format version {version}")]
    UnsupportedVersion { name: String, version: u32 },

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Serialize, Deserialize)]
struct ArtifactFile<F> {
    format_version: u32,
    source: String,
    #[serde(with = "timestamp_format")]
    saved_at: Timestamp,
    model: F,
}

/// Filesystem-backed store of fitted models, one file per source.
#[derive(Debug)]
pub struct ArtifactStore {
    models_dir: PathBuf,
    locks: KeyedLocks,
}

impl ArtifactStore {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            locks: KeyedLocks::new(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Location of `source`'s artifact. Fails for names that are not safe
    /// file stems.
    pub fn path_for(&self, source: &str) -> Result<PathBuf, ArtifactError> {
        validate_source_name(source)?;
        Ok(self.models_dir.join(format!("{source}{ARTIFACT_SUFFIX}")))
    }

    /// Fit a fresh model on `series` and persist it, replacing any existing
    /// artifact for `source`.
    pub fn create<M: ForecastModel>(
        &self,
        model: &M,
        source: &str,
        series: &DerivedSeries,
    ) -> Result<M::Fitted, ArtifactError> {
        let path = self.path_for(source)?;
        self.locks.with_lock(source, || {
            let fitted = model.fit(series, None)?;
            self.write(&path, source, &fitted)?;
            tracing::info!(source, model = model.name(), points = series.len(), "Model artifact created");
            Ok(fitted)
        })
    }

    /// Persist an already fitted model.
    pub fn save<F: Serialize>(&self, source: &str, fitted: &F) -> Result<PathBuf, ArtifactError> {
        let path = self.path_for(source)?;
        self.locks
            .with_lock(source, || self.write(&path, source, fitted))?;
        Ok(path)
    }

    /// Load the fitted model for `source`.
    ///
    /// Returns [`ArtifactError::NotFound`] when no artifact exists, as
    /// opposed to [`ArtifactError::Decode`] for an unreadable one.
    pub fn load<F: DeserializeOwned>(&self, source: &str) -> Result<F, ArtifactError> {
        let path = self.path_for(source)?;
        self.read(&path, source)
    }

    /// Refit `source`'s model on its stored history merged with
    /// `new_series`, seeding the fit with the stored parameters, and persist
    /// the result. New events may overlap or precede the stored ones.
    pub fn update<M: ForecastModel>(
        &self,
        model: &M,
        source: &str,
        new_series: &DerivedSeries,
    ) -> Result<M::Fitted, ArtifactError> {
        let path = self.path_for(source)?;
        self.locks.with_lock(source, || {
            let prior: M::Fitted = self.read(&path, source)?;
            let combined = model.history(&prior).concat(new_series);
            let fitted = model.fit(&combined, Some(&prior))?;
            self.write(&path, source, &fitted)?;
            tracing::info!(
                source,
                model = model.name(),
                points = combined.len(),
                "Model artifact updated"
            );
            Ok(fitted)
        })
    }

    fn read<F: DeserializeOwned>(&self, path: &Path, source: &str) -> Result<F, ArtifactError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ArtifactError::NotFound {
                    name: source.to_string(),
                })
            }
            Err(error) => {
                return Err(ArtifactError::Io {
                    path: path.to_path_buf(),
                    error,
                })
            }
        };

        let file: ArtifactFile<F> =
            serde_json::from_slice(&bytes).map_err(|error| ArtifactError::Decode {
                name: source.to_string(),
                error,
            })?;
        if file.format_version != FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                name: source.to_string(),
                version: file.format_version,
            });
        }
        Ok(file.model)
    }

    /// Must be called with the source's lock held.
    fn write<F: Serialize>(&self, path: &Path, source: &str, fitted: &F) -> Result<(), ArtifactError> {
        let io_err = |error| ArtifactError::Io {
            path: path.to_path_buf(),
            error,
        };

        std::fs::create_dir_all(&self.models_dir).map_err(io_err)?;

        let file = ArtifactFile {
            format_version: FORMAT_VERSION,
            source: source.to_string(),
            saved_at: now_local(),
            model: fitted,
        };
        let body = serde_json::to_vec(&file).map_err(|error| ArtifactError::Decode {
            name: source.to_string(),
            error,
        })?;

        let tmp = self
            .models_dir
            .join(format!(".{source}{ARTIFACT_SUFFIX}.{}.tmp", std::process::id()));
        let written = File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(&body)?;
                file.sync_all()
            })
            .and_then(|()| std::fs::rename(&tmp, path));
        if let Err(error) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(error));
        }
        tracing::debug!(source, path = %path.display(), bytes = body.len(), "Artifact written");
        Ok(())
    }
}
