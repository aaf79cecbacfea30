use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::domain::rsvp::GenderPrediction;
use crate::domain::summary::PredictionsSummary;
use crate::repository::BackendAdapter;
use crate::services::error_handling::RsvpError;

/// Maintains the cumulative boy/girl counters.
pub struct SummaryAggregator {
    backend: Arc<dyn BackendAdapter>,
}

impl SummaryAggregator {
    pub fn new(backend: Arc<dyn BackendAdapter>) -> Self {
        Self { backend }
    }

    /// Adds one vote. The backend applies it as a single atomic upsert.
    pub async fn increment(
        &self,
        prediction: GenderPrediction,
    ) -> Result<PredictionsSummary, RsvpError> {
        let summary = self
            .backend
            .increment_prediction(prediction, Utc::now())
            .await
            .map_err(RsvpError::Aggregation)?;

        debug!(
            prediction = %prediction,
            boy_count = summary.boy_count,
            girl_count = summary.girl_count,
            "Predictions summary updated"
        );
        Ok(summary)
    }

    /// Current counters, zeroed before the first vote.
    pub async fn current(&self) -> Result<PredictionsSummary, RsvpError> {
        let summary = self.backend.fetch_summary().await.map_err(RsvpError::from_backend)?;
        Ok(summary.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{BackendError, MockBackendAdapter};

    #[tokio::test]
    async fn test_current_defaults_to_zero() {
        let mut backend = MockBackendAdapter::new();
        backend.expect_fetch_summary().returning(|| Ok(None));

        let aggregator = SummaryAggregator::new(Arc::new(backend));
        let summary = aggregator.current().await.unwrap();
        assert_eq!(summary.total(), 0);
        assert!(summary.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_increment_failure_is_aggregation_error() {
        let mut backend = MockBackendAdapter::new();
        backend
            .expect_increment_prediction()
            .times(1)
            .returning(|_, _| Err(BackendError::Unavailable("database is locked".into())));

        let aggregator = SummaryAggregator::new(Arc::new(backend));
        let err = aggregator.increment(GenderPrediction::Boy).await.unwrap_err();
        assert!(matches!(err, RsvpError::Aggregation(_)));
    }
}
