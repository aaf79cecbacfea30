pub mod change_feed;
pub mod database;
pub mod rsvp_repository;
pub mod summary_repository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::rsvp::{Attendance, GenderPrediction, RsvpFields, RsvpId, RsvpRecord};
use crate::domain::summary::PredictionsSummary;
use change_feed::{ChangeEvent, ChangeFeed, ChangeHandler, Subscription};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Record {0} not found")]
    NotFound(RsvpId),

    #[error("Backend rejected the operation: {0}")]
    Rejected(String),
}

impl BackendError {
    /// Connectivity failures, the only kind that may be retried elsewhere.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BackendError::Unavailable(_))
    }
}

// SQLite primary result codes for a busy, locked or failing database file
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;
const SQLITE_IOERR: i64 = 10;

/// Extended codes carry the primary code in their low byte.
fn is_transient_database_error(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .and_then(|code| code.parse::<i64>().ok())
        .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED | SQLITE_IOERR))
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        if is_transient_database_error(&err) {
            return BackendError::Unavailable(err.to_string());
        }
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => BackendError::Unavailable(err.to_string()),
            other => BackendError::Rejected(other.to_string()),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Server-side query over the response table, ordered by creation time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RsvpQuery {
    pub order: SortOrder,
    pub attendance: Option<Attendance>,
    pub gender_prediction: Option<GenderPrediction>,
    pub limit: Option<u32>,
}

/// Narrow interface to the hosted data store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    async fn insert_rsvp(
        &self,
        fields: &RsvpFields,
        created_at: DateTime<Utc>,
    ) -> BackendResult<RsvpRecord>;

    /// Replaces every editable field of an existing response.
    async fn update_rsvp(
        &self,
        id: RsvpId,
        fields: &RsvpFields,
        updated_at: DateTime<Utc>,
    ) -> BackendResult<RsvpRecord>;

    async fn delete_rsvp(&self, id: RsvpId) -> BackendResult<()>;

    async fn query_rsvps(&self, query: &RsvpQuery) -> BackendResult<Vec<RsvpRecord>>;

    async fn fetch_summary(&self) -> BackendResult<Option<PredictionsSummary>>;

    /// Atomically adds one vote and returns the summary after the change.
    async fn increment_prediction(
        &self,
        prediction: GenderPrediction,
        at: DateTime<Utc>,
    ) -> BackendResult<PredictionsSummary>;

    fn subscribe_changes(&self, handler: ChangeHandler) -> Subscription;
}

#[derive(Clone)]
pub struct Repository {
    pub pool: Arc<SqlitePool>,
    pub rsvps: rsvp_repository::RsvpRepository,
    pub summary: summary_repository::SummaryRepository,
    pub changes: ChangeFeed,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        let pool = Arc::new(pool);
        Self {
            rsvps: rsvp_repository::RsvpRepository::new(pool.clone()),
            summary: summary_repository::SummaryRepository::new(pool.clone()),
            changes: ChangeFeed::default(),
            pool,
        }
    }
}

#[async_trait]
impl BackendAdapter for Repository {
    async fn insert_rsvp(
        &self,
        fields: &RsvpFields,
        created_at: DateTime<Utc>,
    ) -> BackendResult<RsvpRecord> {
        let record = self.rsvps.create(fields, created_at).await?;
        self.changes.publish(ChangeEvent::inserted(record.id));
        Ok(record)
    }

    async fn update_rsvp(
        &self,
        id: RsvpId,
        fields: &RsvpFields,
        updated_at: DateTime<Utc>,
    ) -> BackendResult<RsvpRecord> {
        let record = self.rsvps.update(id, fields, updated_at).await?;
        self.changes.publish(ChangeEvent::updated(id));
        Ok(record)
    }

    async fn delete_rsvp(&self, id: RsvpId) -> BackendResult<()> {
        self.rsvps.delete(id).await?;
        self.changes.publish(ChangeEvent::deleted(id));
        Ok(())
    }

    async fn query_rsvps(&self, query: &RsvpQuery) -> BackendResult<Vec<RsvpRecord>> {
        self.rsvps.list(query).await
    }

    async fn fetch_summary(&self) -> BackendResult<Option<PredictionsSummary>> {
        self.summary.get().await
    }

    async fn increment_prediction(
        &self,
        prediction: GenderPrediction,
        at: DateTime<Utc>,
    ) -> BackendResult<PredictionsSummary> {
        self.summary.increment(prediction, at).await
    }

    fn subscribe_changes(&self, handler: ChangeHandler) -> Subscription {
        self.changes.subscribe(handler)
    }
}
