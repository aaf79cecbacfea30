// Test helpers for integration testing

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::rsvp::{Attendance, GenderPrediction, RsvpFields, RsvpInput};
use crate::repository::database::init_test_database;
use crate::repository::{BackendError, Repository};
use crate::server::state::AppState;

pub const TEST_ADMIN_PASSWORD: &str = "letmein";

/// In-memory database plus a scratch directory for the fallback file.
pub struct TestContext {
    pub repository: Arc<Repository>,
    pub scratch: PathBuf,
}

impl TestContext {
    pub async fn new_for_test(scratch: &Path) -> Result<Self, BackendError> {
        let pool = init_test_database().await?;
        Ok(Self {
            repository: Arc::new(Repository::new(pool)),
            scratch: scratch.to_path_buf(),
        })
    }

    pub fn fallback_path(&self) -> PathBuf {
        self.scratch.join("fallback.json")
    }

    /// Defaults pointed at the scratch directory.
    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        config.database.path = self.scratch.join("unused.db").to_string_lossy().into_owned();
        config.fallback.path = self.fallback_path();
        config.admin.password = Some(TEST_ADMIN_PASSWORD.to_string());
        config
    }

    pub async fn app_state(&self) -> Arc<AppState> {
        self.app_state_with(self.config()).await
    }

    pub async fn app_state_with(&self, config: AppConfig) -> Arc<AppState> {
        AppState::with_repository(config, (*self.repository).clone()).await
    }
}

pub fn guest_input(
    name: &str,
    email: &str,
    count: u8,
    attendance: Attendance,
    prediction: GenderPrediction,
) -> RsvpInput {
    RsvpInput {
        guest_name: name.to_string(),
        email: email.to_string(),
        attendee_count: count.to_string(),
        attendance: attendance.as_str().to_string(),
        gender_prediction: prediction.as_str().to_string(),
        ..Default::default()
    }
}

pub fn guest_fields(
    name: &str,
    count: u8,
    attendance: Attendance,
    prediction: GenderPrediction,
) -> RsvpFields {
    RsvpFields {
        guest_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: None,
        attendee_count: count,
        attendance,
        gender_prediction: prediction,
        dietary_restrictions: None,
        special_message: None,
    }
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - chrono::Duration::days(days)
}
