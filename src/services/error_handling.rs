use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::rsvp::{RsvpField, RsvpId, RsvpRecord};
use crate::repository::BackendError;
use crate::services::fallback_store::FallbackError;

/// Per-field validation messages, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<RsvpField, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first message recorded for a field.
    pub fn insert(&mut self, field: RsvpField, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: RsvpField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: RsvpField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RsvpField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.values().cloned().collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Update => f.write_str("update"),
            MutationKind::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RsvpError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend error: {0}")]
    Backend(#[source] BackendError),

    #[error("Failed to save RSVP locally: {0}")]
    Fallback(#[from] FallbackError),

    #[error("Failed to update predictions summary: {0}")]
    Aggregation(#[source] BackendError),

    #[error("Guest {id} {operation} failed: {source}")]
    Mutation {
        operation: MutationKind,
        id: RsvpId,
        #[source]
        source: BackendError,
    },
}

impl RsvpError {
    /// Backend failure on a read or insert, keeping unavailability distinct.
    pub fn from_backend(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(reason) => RsvpError::BackendUnavailable(reason),
            other => RsvpError::Backend(other),
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            RsvpError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Structured logging helpers
pub struct LogHelper;

impl LogHelper {
    pub fn log_submission(record: &RsvpRecord, destination: &str) {
        info!(
            rsvp_id = record.id,
            destination = %destination,
            attendance = %record.attendance,
            prediction = %record.gender_prediction,
            attendee_count = record.attendee_count,
            "RSVP stored"
        );
    }

    pub fn log_validation_failure(errors: &FieldErrors) {
        for (field, reason) in errors.iter() {
            warn!(field = %field, reason = %reason, "Validation failed");
        }
    }

    pub fn log_fallback(reason: &str) {
        warn!(reason = %reason, "Backend unreachable, storing RSVP locally");
    }

    pub fn log_mutation(operation: MutationKind, id: RsvpId, success: bool) {
        if success {
            info!(rsvp_id = id, operation = %operation, "Guest record changed");
        } else {
            error!(rsvp_id = id, operation = %operation, "Guest record change failed");
        }
    }

    pub fn log_error_with_context(context: &str, error: &RsvpError) {
        let mut chain = Vec::new();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        error!(
            context = %context,
            error = %error,
            error_chain = ?chain,
            "Error occurred"
        );
    }
}

/// Messages safe to show to guests and the admin operator.
pub struct UserErrorFormatter;

impl UserErrorFormatter {
    pub const SUBMIT_SUCCESS: &'static str =
        "Thank you! Your RSVP has been submitted successfully. We can't wait to celebrate with you!";

    pub fn format_for_ui(error: &RsvpError) -> String {
        match error {
            RsvpError::Validation(errors) => {
                format!("Please fix the highlighted fields: {}", errors.messages().join(", "))
            }
            RsvpError::BackendUnavailable(_) | RsvpError::Fallback(_) => {
                "Failed to submit RSVP. Please try again.".to_string()
            }
            RsvpError::Backend(err) | RsvpError::Aggregation(err) => err.to_string(),
            RsvpError::Mutation { operation, source, .. } => match operation {
                MutationKind::Update => format!("Error updating guest: {}", source),
                MutationKind::Delete => format!("Error deleting guest: {}", source),
            },
        }
    }
}
