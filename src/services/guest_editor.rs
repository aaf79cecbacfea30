use chrono::Utc;
use std::sync::Arc;
use tracing::warn;

use crate::domain::rsvp::{RsvpFields, RsvpId, RsvpRecord};
use crate::repository::BackendAdapter;
use crate::services::admin_sync::AdminSyncView;
use crate::services::error_handling::{LogHelper, MutationKind, RsvpError};
use crate::services::validation::Validator;

/// Admin edits and deletions. The view is reloaded after every attempt,
/// successful or not; the cached records are never patched locally.
pub struct GuestRecordEditor {
    backend: Arc<dyn BackendAdapter>,
    view: Arc<AdminSyncView>,
    validator: Validator,
}

impl GuestRecordEditor {
    pub fn new(
        backend: Arc<dyn BackendAdapter>,
        view: Arc<AdminSyncView>,
        validator: Validator,
    ) -> Self {
        Self {
            backend,
            view,
            validator,
        }
    }

    /// Replaces every editable field of the record.
    pub async fn update(&self, id: RsvpId, fields: RsvpFields) -> Result<RsvpRecord, RsvpError> {
        let fields = self.validator.validate_fields(&fields).map_err(RsvpError::Validation)?;

        let result = self
            .backend
            .update_rsvp(id, &fields, Utc::now())
            .await
            .map_err(|source| RsvpError::Mutation {
                operation: MutationKind::Update,
                id,
                source,
            });
        LogHelper::log_mutation(MutationKind::Update, id, result.is_ok());

        self.reload().await;
        result
    }

    pub async fn delete(&self, id: RsvpId) -> Result<(), RsvpError> {
        let result = self
            .backend
            .delete_rsvp(id)
            .await
            .map_err(|source| RsvpError::Mutation {
                operation: MutationKind::Delete,
                id,
                source,
            });
        LogHelper::log_mutation(MutationKind::Delete, id, result.is_ok());

        self.reload().await;
        result
    }

    async fn reload(&self) {
        if let Err(err) = self.view.load_all().await {
            warn!(error = %err, "Reload after guest change failed");
        }
    }
}
