pub mod admin_sync;
pub mod error_handling;
pub mod export_service;
pub mod fallback_store;
pub mod guest_editor;
pub mod rate_limiter;
pub mod submission_service;
pub mod summary_aggregator;
pub mod validation;

pub use admin_sync::{AdminSnapshot, AdminSyncView, FilterCriteria, FilteredView};
pub use error_handling::{FieldErrors, RsvpError};
pub use export_service::ExportService;
pub use fallback_store::LocalFallbackStore;
pub use guest_editor::GuestRecordEditor;
pub use rate_limiter::RateLimiter;
pub use submission_service::{StoredIn, Submission, SubmissionClient};
pub use summary_aggregator::SummaryAggregator;
pub use validation::{FormRules, Validator};
