use reveal::domain::rsvp::{Attendance, GenderPrediction, RsvpField, RsvpInput};
use reveal::repository::database::init_database;
use reveal::repository::{BackendAdapter, Repository};
use reveal::services::fallback_store::DEFAULT_STORAGE_KEY;
use reveal::services::validation::{EMAIL_MESSAGE, REQUIRED_MESSAGE};
use reveal::services::{
    AdminSyncView, FormRules, GuestRecordEditor, LocalFallbackStore, RsvpError, StoredIn,
    SubmissionClient, SummaryAggregator, Validator,
};
use reveal::test_helpers::{TestContext, guest_input};
use sqlx::Connection;
use sqlx::sqlite::SqliteConnection;
use std::sync::Arc;
use tempfile::TempDir;

struct Flow {
    ctx: TestContext,
    client: SubmissionClient,
    aggregator: Arc<SummaryAggregator>,
    fallback: LocalFallbackStore,
}

async fn flow(dir: &TempDir, rules: FormRules) -> Flow {
    let ctx = TestContext::new_for_test(dir.path()).await.unwrap();
    let backend: Arc<dyn BackendAdapter> = ctx.repository.clone();
    let aggregator = Arc::new(SummaryAggregator::new(backend.clone()));
    let fallback = LocalFallbackStore::new(ctx.fallback_path(), DEFAULT_STORAGE_KEY);
    let client = SubmissionClient::new(
        Some(backend),
        fallback.clone(),
        Some(aggregator.clone()),
        Validator::new(rules),
    );
    Flow {
        ctx,
        client,
        aggregator,
        fallback,
    }
}

#[tokio::test]
async fn test_bad_email_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let flow = flow(&dir, FormRules::default()).await;

    let input = guest_input("Al", "bad-email", 2, Attendance::Coming, GenderPrediction::Boy);
    let err = flow.client.submit(input).await.unwrap_err();

    let errors = err.field_errors().unwrap();
    assert_eq!(errors.get(RsvpField::Email), Some(EMAIL_MESSAGE));
    assert_eq!(flow.ctx.repository.rsvps.count().await.unwrap(), 0);
    assert!(flow.fallback.all().await.unwrap().is_empty());
    assert_eq!(flow.aggregator.current().await.unwrap().total(), 0);
}

#[tokio::test]
async fn test_valid_submission_persists_and_counts_prediction() {
    let dir = TempDir::new().unwrap();
    let flow = flow(&dir, FormRules::default()).await;

    let input = guest_input("Alice Tan", "a@b.com", 3, Attendance::Coming, GenderPrediction::Girl);
    let submission = flow.client.submit(input).await.unwrap();

    assert_eq!(submission.stored_in, StoredIn::Backend);
    let stored = flow.ctx.repository.rsvps.get(submission.record.id).await.unwrap().unwrap();
    assert_eq!(stored.guest_name, "Alice Tan");
    assert_eq!(stored.attendee_count, 3);

    let summary = flow.aggregator.current().await.unwrap();
    assert_eq!(summary.girl_count, 1);
    assert_eq!(summary.boy_count, 0);
}

#[tokio::test]
async fn test_resubmission_is_not_deduplicated() {
    let dir = TempDir::new().unwrap();
    let flow = flow(&dir, FormRules::default()).await;

    for _ in 0..2 {
        let input = guest_input("Alice Tan", "a@b.com", 1, Attendance::Coming, GenderPrediction::Boy);
        flow.client.submit(input).await.unwrap();
    }

    assert_eq!(flow.ctx.repository.rsvps.count().await.unwrap(), 2);
    assert_eq!(flow.aggregator.current().await.unwrap().boy_count, 2);
}

#[tokio::test]
async fn test_unreachable_backend_lands_in_fallback() {
    let dir = TempDir::new().unwrap();
    let flow = flow(&dir, FormRules::default()).await;
    flow.ctx.repository.pool.close().await;

    let input = guest_input("Bea Santos", "bea@example.com", 2, Attendance::Coming, GenderPrediction::Boy);
    let submission = flow.client.submit(input).await.unwrap();

    assert_eq!(submission.stored_in, StoredIn::Fallback);
    let local = flow.fallback.all().await.unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0], submission.record);
    assert_eq!(local[0].email, "bea@example.com");
}

#[tokio::test]
async fn test_locked_database_lands_in_fallback() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("reveal.db");
    let db_path = db_path.to_str().unwrap();
    let pool = init_database(db_path).await.unwrap();
    let backend: Arc<dyn BackendAdapter> = Arc::new(Repository::new(pool));
    let fallback = LocalFallbackStore::new(dir.path().join("fallback.json"), DEFAULT_STORAGE_KEY);
    let client = SubmissionClient::new(Some(backend), fallback.clone(), None, Validator::default());

    // Another writer holds the file until the busy timeout expires
    let mut holder = SqliteConnection::connect(&format!("sqlite://{}", db_path)).await.unwrap();
    sqlx::query("BEGIN EXCLUSIVE").execute(&mut holder).await.unwrap();

    let input = guest_input("Bea Santos", "bea@example.com", 2, Attendance::Coming, GenderPrediction::Boy);
    let submission = client.submit(input).await.unwrap();

    assert_eq!(submission.stored_in, StoredIn::Fallback);
    let local = fallback.all().await.unwrap();
    assert_eq!(local.len(), 1);
    assert_eq!(local[0].guest_name, "Bea Santos");

    sqlx::query("ROLLBACK").execute(&mut holder).await.unwrap();
}

#[tokio::test]
async fn test_declined_guest_skips_required_dietary_field() {
    let dir = TempDir::new().unwrap();
    let flow = flow(&dir, FormRules::new(true)).await;

    let attending = guest_input("Chen Wei", "chen@example.com", 1, Attendance::Coming, GenderPrediction::Boy);
    let err = flow.client.submit(attending).await.unwrap_err();
    assert_eq!(
        err.field_errors().and_then(|e| e.get(RsvpField::DietaryRestrictions)),
        Some(REQUIRED_MESSAGE)
    );

    let declined = RsvpInput {
        dietary_restrictions: "   ".to_string(),
        ..guest_input("Chen Wei", "chen@example.com", 1, Attendance::NotComing, GenderPrediction::Boy)
    };
    let submission = flow.client.submit(declined).await.unwrap();
    assert_eq!(submission.record.attendance, Attendance::NotComing);
}

#[tokio::test]
async fn test_delete_is_reflected_in_reloaded_stats() {
    let dir = TempDir::new().unwrap();
    let flow = flow(&dir, FormRules::default()).await;
    let backend: Arc<dyn BackendAdapter> = flow.ctx.repository.clone();
    let view = Arc::new(AdminSyncView::new(backend.clone()));
    let editor = GuestRecordEditor::new(backend, view.clone(), Validator::default());

    let keep = flow
        .client
        .submit(guest_input("Alice Tan", "a@b.com", 3, Attendance::Coming, GenderPrediction::Girl))
        .await
        .unwrap();
    let remove = flow
        .client
        .submit(guest_input("Bea Santos", "bea@example.com", 4, Attendance::Coming, GenderPrediction::Boy))
        .await
        .unwrap();

    view.load_all().await.unwrap();
    let before = view.snapshot().stats.clone();
    assert_eq!(before.total_rsvps, 2);
    assert_eq!(before.total_attendees, 7);
    assert_eq!(before.timeline.last().map(|d| d.count), Some(2));

    editor.delete(remove.record.id).await.unwrap();

    let after = view.snapshot();
    assert_eq!(after.records.len(), 1);
    assert_eq!(after.records[0].id, keep.record.id);
    assert_eq!(after.stats.total_rsvps, 1);
    assert_eq!(after.stats.total_attendees, 3);
    assert_eq!(after.stats.boy_predictions, 0);
    assert_eq!(after.stats.girl_predictions, 1);
    assert_eq!(after.stats.timeline.last().map(|d| d.count), Some(1));

    // Cumulative counters are never decremented
    assert_eq!(flow.aggregator.current().await.unwrap().total(), 2);
}

#[tokio::test]
async fn test_editing_unknown_guest_is_a_mutation_error() {
    let dir = TempDir::new().unwrap();
    let flow = flow(&dir, FormRules::default()).await;
    let backend: Arc<dyn BackendAdapter> = flow.ctx.repository.clone();
    let view = Arc::new(AdminSyncView::new(backend.clone()));
    let editor = GuestRecordEditor::new(backend, view.clone(), Validator::default());

    let fields = reveal::test_helpers::guest_fields("Nobody", 1, Attendance::Coming, GenderPrediction::Boy);
    let err = editor.update(12345, fields).await.unwrap_err();

    assert!(matches!(err, RsvpError::Mutation { id: 12345, .. }));
    assert_eq!(view.load_count(), 1);
}
