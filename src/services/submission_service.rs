use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::rsvp::{RsvpInput, RsvpRecord};
use crate::repository::BackendAdapter;
use crate::services::error_handling::{LogHelper, RsvpError};
use crate::services::fallback_store::LocalFallbackStore;
use crate::services::summary_aggregator::SummaryAggregator;
use crate::services::validation::Validator;

/// Where an accepted response ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredIn {
    Backend,
    Fallback,
}

impl StoredIn {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredIn::Backend => "backend",
            StoredIn::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub record: RsvpRecord,
    pub stored_in: StoredIn,
}

pub struct SubmissionClient {
    backend: Option<Arc<dyn BackendAdapter>>,
    fallback: LocalFallbackStore,
    aggregator: Option<Arc<SummaryAggregator>>,
    validator: Validator,
}

impl SubmissionClient {
    pub fn new(
        backend: Option<Arc<dyn BackendAdapter>>,
        fallback: LocalFallbackStore,
        aggregator: Option<Arc<SummaryAggregator>>,
        validator: Validator,
    ) -> Self {
        Self {
            backend,
            fallback,
            aggregator,
            validator,
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub async fn submit(&self, raw: RsvpInput) -> Result<Submission, RsvpError> {
        let mut input = raw;
        input.apply_attendance_rules(&self.validator.rules().attending_only);

        let fields = self.validator.normalize(&input).map_err(|errors| {
            LogHelper::log_validation_failure(&errors);
            RsvpError::Validation(errors)
        })?;

        let Some(backend) = &self.backend else {
            debug!("No backend configured");
            let record = self.fallback.append(fields).await?;
            LogHelper::log_submission(&record, StoredIn::Fallback.as_str());
            return Ok(Submission {
                record,
                stored_in: StoredIn::Fallback,
            });
        };

        let record = match backend.insert_rsvp(&fields, Utc::now()).await {
            Ok(record) => record,
            Err(err) if err.is_unavailable() => {
                LogHelper::log_fallback(&err.to_string());
                let record = self.fallback.append(fields).await?;
                LogHelper::log_submission(&record, StoredIn::Fallback.as_str());
                return Ok(Submission {
                    record,
                    stored_in: StoredIn::Fallback,
                });
            }
            Err(err) => return Err(RsvpError::Backend(err)),
        };

        LogHelper::log_submission(&record, StoredIn::Backend.as_str());

        // Best effort, the response is already stored
        if let Some(aggregator) = &self.aggregator {
            if let Err(err) = aggregator.increment(record.gender_prediction).await {
                warn!(rsvp_id = record.id, error = %err, "Predictions summary not updated");
            }
        }

        Ok(Submission {
            record,
            stored_in: StoredIn::Backend,
        })
    }
}
