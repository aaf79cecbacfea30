use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use super::rsvp_repository::{format_timestamp, parse_timestamp};
use super::{BackendError, BackendResult};
use crate::domain::rsvp::GenderPrediction;
use crate::domain::summary::PredictionsSummary;

const SUMMARY_ROW_ID: i64 = 1;

#[derive(Clone)]
pub struct SummaryRepository {
    pool: Arc<SqlitePool>,
}

impl SummaryRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub async fn get(&self) -> BackendResult<Option<PredictionsSummary>> {
        let row = sqlx::query(
            "SELECT boy_count, girl_count, updated_at FROM predictions_summary WHERE id = ?",
        )
        .bind(SUMMARY_ROW_ID)
        .fetch_optional(&*self.pool)
        .await?;

        row.as_ref().map(row_to_summary).transpose()
    }

    /// Single-statement upsert, so concurrent votes never overwrite each other.
    /// The statement is drained so the write is committed before returning.
    pub async fn increment(
        &self,
        prediction: GenderPrediction,
        at: DateTime<Utc>,
    ) -> BackendResult<PredictionsSummary> {
        let (boy, girl) = match prediction {
            GenderPrediction::Boy => (1_i64, 0_i64),
            GenderPrediction::Girl => (0_i64, 1_i64),
        };

        let rows = sqlx::query(
            r#"
            INSERT INTO predictions_summary (id, boy_count, girl_count, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                boy_count = boy_count + excluded.boy_count,
                girl_count = girl_count + excluded.girl_count,
                updated_at = excluded.updated_at
            RETURNING boy_count, girl_count, updated_at
            "#,
        )
        .bind(SUMMARY_ROW_ID)
        .bind(boy)
        .bind(girl)
        .bind(format_timestamp(at))
        .fetch_all(&*self.pool)
        .await?;

        let row = rows
            .first()
            .ok_or_else(|| BackendError::Rejected("summary upsert returned no row".to_string()))?;
        row_to_summary(row)
    }
}

fn row_to_summary(row: &SqliteRow) -> BackendResult<PredictionsSummary> {
    Ok(PredictionsSummary {
        boy_count: to_count(row.try_get("boy_count")?)?,
        girl_count: to_count(row.try_get("girl_count")?)?,
        updated_at: Some(parse_timestamp(&row.try_get::<String, _>("updated_at")?)?),
    })
}

fn to_count(raw: i64) -> BackendResult<u64> {
    u64::try_from(raw)
        .map_err(|_| BackendError::Rejected(format!("negative prediction count {}", raw)))
}
