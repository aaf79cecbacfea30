use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::repository::change_feed::Subscription;
use crate::repository::database::init_database;
use crate::repository::{BackendAdapter, BackendError, Repository};
use crate::services::{
    AdminSyncView, ExportService, GuestRecordEditor, LocalFallbackStore, RateLimiter,
    SubmissionClient, SummaryAggregator, Validator,
};

pub struct AppState {
    pub config: AppConfig,
    pub repository: Arc<Repository>,
    pub submissions: SubmissionClient,
    pub aggregator: Arc<SummaryAggregator>,
    pub admin_view: Arc<AdminSyncView>,
    pub editor: GuestRecordEditor,
    pub exports: ExportService,
    pub rate_limiter: RateLimiter,
    _changes: Subscription,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Arc<Self>, BackendError> {
        info!(path = %config.database.path, "Opening database");
        let pool = init_database(&config.database.path).await?;
        Ok(Self::with_repository(config, Repository::new(pool)).await)
    }

    /// Wires every service around an existing repository and loads the admin
    /// view once. Must run inside a tokio runtime.
    pub async fn with_repository(config: AppConfig, repository: Repository) -> Arc<Self> {
        let repository = Arc::new(repository);
        let backend: Arc<dyn BackendAdapter> = repository.clone();
        let validator = Validator::new(config.form.rules());

        let aggregator = Arc::new(SummaryAggregator::new(backend.clone()));
        let submissions = SubmissionClient::new(
            Some(backend.clone()),
            LocalFallbackStore::new(config.fallback.path.clone(), config.fallback.key.clone()),
            Some(aggregator.clone()),
            validator.clone(),
        );

        let admin_view = Arc::new(AdminSyncView::new(backend.clone()));
        if let Err(err) = admin_view.load_all().await {
            warn!(error = %err, "Initial admin view load failed");
        }
        let changes = admin_view.subscribe_to_changes();

        let editor = GuestRecordEditor::new(backend, admin_view.clone(), validator);
        let exports = ExportService::new(admin_view.clone());
        let rate_limiter =
            RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window());

        Arc::new(Self {
            config,
            repository,
            submissions,
            aggregator,
            admin_view,
            editor,
            exports,
            rate_limiter,
            _changes: changes,
        })
    }

    /// Constant-time comparison against the configured admin secret.
    pub fn admin_authorized(&self, supplied: Option<&str>) -> bool {
        match (self.config.admin.password.as_deref(), supplied) {
            (Some(expected), Some(supplied)) => {
                expected.len() == supplied.len()
                    && expected
                        .bytes()
                        .zip(supplied.bytes())
                        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                        == 0
            }
            _ => false,
        }
    }
}
