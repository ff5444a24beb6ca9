//! Repository for the `Sources` table (prediction registry).

use sqlx::SqlitePool;
use sources_core::types::{truncate_to_seconds, Timestamp};

use crate::models::source::{SourcePrediction, UpsertSourcePrediction};

/// Column list for `Sources` queries.
const COLUMNS: &str = "name, lower_bound, predicted, upper_bound";

/// Provides data access for the latest forecast of each source.
pub struct SourceRepo;

impl SourceRepo {
    /// Insert or replace the forecast for `input.name`.
    ///
    /// Runs as one transaction: readers observe either the previous row or
    /// the complete new one. On failure the transaction is rolled back when
    /// dropped and the previous row stays intact.
    pub async fn upsert(
        pool: &SqlitePool,
        input: &UpsertSourcePrediction,
    ) -> Result<SourcePrediction, sqlx::Error> {
        let query = format!(
            "INSERT INTO Sources (name, lower_bound, predicted, upper_bound) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (name) DO UPDATE SET \
                 lower_bound = excluded.lower_bound, \
                 predicted = excluded.predicted, \
                 upper_bound = excluded.upper_bound \
             RETURNING {COLUMNS}"
        );

        let mut tx = pool.begin().await?;
        let row = sqlx::query_as::<_, SourcePrediction>(&query)
            .bind(&input.name)
            .bind(input.lower_bound)
            .bind(input.predicted)
            .bind(input.upper_bound)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(source = %row.name, predicted = %row.predicted, "Registry row upserted");
        Ok(row)
    }

    /// Sources whose predicted arrival is strictly before `now`.
    pub async fn find_stale(
        pool: &SqlitePool,
        now: Timestamp,
    ) -> Result<Vec<SourcePrediction>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM Sources WHERE predicted < ?1 ORDER BY predicted, name"
        );
        sqlx::query_as::<_, SourcePrediction>(&query)
            .bind(truncate_to_seconds(now))
            .fetch_all(pool)
            .await
    }
}
