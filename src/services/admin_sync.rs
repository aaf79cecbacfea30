use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::domain::rsvp::{Attendance, GenderPrediction, RsvpRecord};
use crate::domain::stats::DashboardStats;
use crate::repository::change_feed::{ChangeEvent, Subscription};
use crate::repository::{BackendAdapter, RsvpQuery, SortOrder};
use crate::services::error_handling::RsvpError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub attendance: Option<Attendance>,
    pub gender_prediction: Option<GenderPrediction>,
    pub search: Option<String>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.attendance.is_none()
            && self.gender_prediction.is_none()
            && self.search_term().is_none()
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, record: &RsvpRecord) -> bool {
        if self.attendance.is_some_and(|a| a != record.attendance) {
            return false;
        }
        if self.gender_prediction.is_some_and(|g| g != record.gender_prediction) {
            return false;
        }
        match self.search_term() {
            Some(term) => {
                record.guest_name.to_lowercase().contains(&term)
                    || record.email.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

/// Keeps the input order.
pub fn filter_records(records: &[RsvpRecord], criteria: &FilterCriteria) -> Vec<RsvpRecord> {
    records.iter().filter(|r| criteria.matches(r)).cloned().collect()
}

/// Last full load of the response table, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminSnapshot {
    pub records: Vec<RsvpRecord>,
    pub stats: DashboardStats,
    pub loaded_at: DateTime<Utc>,
}

impl AdminSnapshot {
    pub fn build(records: Vec<RsvpRecord>, loaded_at: DateTime<Utc>) -> Self {
        let stats = DashboardStats::compute(&records, loaded_at.date_naive());
        Self {
            records,
            stats,
            loaded_at,
        }
    }

    pub fn empty() -> Self {
        Self::build(Vec::new(), Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredView {
    pub records: Vec<RsvpRecord>,
    pub stats: DashboardStats,
}

/// Admin dashboard state: a cached snapshot rebuilt wholesale on every load.
///
/// Loads are not serialized against each other. When a change notification
/// and a manual reload overlap, whichever finishes last is what the view
/// shows.
pub struct AdminSyncView {
    backend: Arc<dyn BackendAdapter>,
    snapshot: RwLock<Arc<AdminSnapshot>>,
    loads: AtomicU64,
}

impl AdminSyncView {
    pub fn new(backend: Arc<dyn BackendAdapter>) -> Self {
        Self {
            backend,
            snapshot: RwLock::new(Arc::new(AdminSnapshot::empty())),
            loads: AtomicU64::new(0),
        }
    }

    pub async fn load_all(&self) -> Result<Vec<RsvpRecord>, RsvpError> {
        let query = RsvpQuery {
            order: SortOrder::Descending,
            ..Default::default()
        };
        let records = self.backend.query_rsvps(&query).await.map_err(RsvpError::from_backend)?;

        let snapshot = Arc::new(AdminSnapshot::build(records.clone(), Utc::now()));
        debug!(
            records = snapshot.stats.total_rsvps,
            attendees = snapshot.stats.total_attendees,
            "Admin view reloaded"
        );
        *self.snapshot.write() = snapshot;
        self.loads.fetch_add(1, Ordering::SeqCst);

        Ok(records)
    }

    pub fn snapshot(&self) -> Arc<AdminSnapshot> {
        self.snapshot.read().clone()
    }

    /// Number of completed loads.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    /// Filters the cached records without touching the backend.
    pub fn filter(&self, criteria: &FilterCriteria) -> FilteredView {
        let snapshot = self.snapshot();
        if criteria.is_empty() {
            return FilteredView {
                records: snapshot.records.clone(),
                stats: snapshot.stats.clone(),
            };
        }

        let records = filter_records(&snapshot.records, criteria);
        let stats = DashboardStats::compute(&records, snapshot.loaded_at.date_naive());
        FilteredView { records, stats }
    }

    /// Reloads on every change to the response table until the returned
    /// handle is cancelled or dropped.
    pub fn subscribe_to_changes(self: &Arc<Self>) -> Subscription {
        let view: Weak<Self> = Arc::downgrade(self);

        let subscription = self.backend.subscribe_changes(Arc::new(move |event: ChangeEvent| {
            let Some(view) = view.upgrade() else {
                return;
            };
            debug!(kind = ?event.kind, record = ?event.id, "Reloading admin view after change");
            tokio::spawn(async move {
                if let Err(err) = view.load_all().await {
                    warn!(error = %err, "Admin view reload failed");
                }
            });
        }));

        info!(subscription = %subscription.id(), "Admin view listening for changes");
        subscription
    }
}
