#[cfg(test)]
mod rsvp_repository_tests {
    use chrono::{Duration, Utc};
    use reveal::domain::rsvp::{Attendance, GenderPrediction};
    use reveal::repository::change_feed::{ChangeEvent, ChangeKind};
    use reveal::repository::database::init_test_database;
    use reveal::repository::{BackendAdapter, BackendError, Repository, RsvpQuery, SortOrder};
    use reveal::test_helpers::guest_fields;
    use std::sync::{Arc, Mutex};

    async fn setup_test_repository() -> Arc<Repository> {
        let pool = init_test_database().await.unwrap();
        Arc::new(Repository::new(pool))
    }

    #[tokio::test]
    async fn test_create_and_retrieve_rsvp() {
        let repo = setup_test_repository().await;
        let mut fields = guest_fields("Alice Tan", 3, Attendance::Coming, GenderPrediction::Girl);
        fields.phone = Some("+65 9123 4567".to_string());
        fields.special_message = Some("Can't wait!".to_string());

        let created = repo.rsvps.create(&fields, Utc::now()).await.unwrap();
        assert!(created.id > 0);
        assert!(created.updated_at.is_none());

        let retrieved = repo.rsvps.get(created.id).await.unwrap().unwrap();
        assert_eq!(retrieved, created);
        assert_eq!(retrieved.fields(), fields);
    }

    #[tokio::test]
    async fn test_update_replaces_every_field() {
        let repo = setup_test_repository().await;
        let mut fields = guest_fields("Bea Santos", 2, Attendance::Coming, GenderPrediction::Boy);
        fields.dietary_restrictions = Some("Vegetarian".to_string());
        let created = repo.rsvps.create(&fields, Utc::now()).await.unwrap();

        let replacement = guest_fields("Bea S.", 1, Attendance::NotComing, GenderPrediction::Girl);
        let edited_at = Utc::now() + Duration::minutes(1);
        let updated = repo.rsvps.update(created.id, &replacement, edited_at).await.unwrap();

        assert_eq!(updated.fields(), replacement);
        assert!(updated.dietary_restrictions.is_none());
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_records_are_not_found() {
        let repo = setup_test_repository().await;
        let fields = guest_fields("Ghost", 1, Attendance::Coming, GenderPrediction::Boy);

        assert!(repo.rsvps.get(404).await.unwrap().is_none());
        assert!(matches!(repo.rsvps.delete(404).await, Err(BackendError::NotFound(404))));
        assert!(matches!(
            repo.rsvps.update(404, &fields, Utc::now()).await,
            Err(BackendError::NotFound(404))
        ));
    }

    #[tokio::test]
    async fn test_list_orders_by_creation_time() {
        let repo = setup_test_repository().await;
        let now = Utc::now();

        for (offset, name) in [(3, "Oldest"), (1, "Newest"), (2, "Middle")] {
            let fields = guest_fields(name, 1, Attendance::Coming, GenderPrediction::Boy);
            repo.rsvps.create(&fields, now - Duration::hours(offset)).await.unwrap();
        }

        let newest_first = repo.rsvps.list(&RsvpQuery::default()).await.unwrap();
        let names: Vec<_> = newest_first.iter().map(|r| r.guest_name.as_str()).collect();
        assert_eq!(names, vec!["Newest", "Middle", "Oldest"]);

        let oldest_first = repo
            .rsvps
            .list(&RsvpQuery {
                order: SortOrder::Ascending,
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = oldest_first.iter().map(|r| r.guest_name.as_str()).collect();
        assert_eq!(names, vec!["Oldest", "Middle"]);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = setup_test_repository().await;
        let now = Utc::now();
        let guests = [
            ("Alice", Attendance::Coming, GenderPrediction::Girl),
            ("Bea", Attendance::NotComing, GenderPrediction::Girl),
            ("Chen", Attendance::Coming, GenderPrediction::Boy),
        ];
        for (name, attendance, prediction) in guests {
            repo.rsvps
                .create(&guest_fields(name, 1, attendance, prediction), now)
                .await
                .unwrap();
        }

        let coming_girls = repo
            .rsvps
            .list(&RsvpQuery {
                attendance: Some(Attendance::Coming),
                gender_prediction: Some(GenderPrediction::Girl),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(coming_girls.len(), 1);
        assert_eq!(coming_girls[0].guest_name, "Alice");
        assert_eq!(repo.rsvps.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_null_attendee_count_reads_as_one() {
        let repo = setup_test_repository().await;
        sqlx::query(
            "INSERT INTO rsvp_responses (guest_name, email, attendance, gender_prediction, created_at)
             VALUES ('Legacy', 'legacy@example.com', 'coming', 'boy', '2025-08-01T10:00:00.000000Z')",
        )
        .execute(&*repo.pool)
        .await
        .unwrap();

        let records = repo.rsvps.list(&RsvpQuery::default()).await.unwrap();
        assert_eq!(records[0].attendee_count, 1);
    }

    #[tokio::test]
    async fn test_out_of_range_count_rejected_by_schema() {
        let repo = setup_test_repository().await;
        let fields = guest_fields("Crowd", 11, Attendance::Coming, GenderPrediction::Boy);
        let err = repo.insert_rsvp(&fields, Utc::now()).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_adapter_publishes_changes() {
        let repo = setup_test_repository().await;
        let seen: Arc<Mutex<Vec<ChangeEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = repo.subscribe_changes(Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        let fields = guest_fields("Dana", 2, Attendance::Coming, GenderPrediction::Boy);
        let record = repo.insert_rsvp(&fields, Utc::now()).await.unwrap();
        repo.update_rsvp(record.id, &fields, Utc::now()).await.unwrap();
        repo.delete_rsvp(record.id).await.unwrap();

        // Failed mutations publish nothing
        assert!(repo.delete_rsvp(record.id).await.is_err());

        for _ in 0..100 {
            if seen.lock().unwrap().len() >= 3 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let kinds: Vec<ChangeKind> = seen.lock().unwrap().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]);
    }
}
