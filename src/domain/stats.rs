use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::rsvp::{Attendance, GenderPrediction, RsvpRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Derived dashboard numbers, always recomputed from a full record set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_rsvps: usize,
    pub total_attendees: u64,
    pub boy_predictions: usize,
    pub girl_predictions: usize,
    pub coming: usize,
    pub not_coming: usize,
    /// Submissions per UTC day, oldest first, ending with `today`.
    pub timeline: Vec<DailyCount>,
}

impl DashboardStats {
    pub const TIMELINE_DAYS: i64 = 7;

    pub fn compute(records: &[RsvpRecord], today: NaiveDate) -> Self {
        let mut stats = DashboardStats {
            total_rsvps: records.len(),
            timeline: Self::empty_timeline(today),
            ..Default::default()
        };

        for record in records {
            stats.total_attendees += u64::from(record.attendee_count.max(1));

            match record.gender_prediction {
                GenderPrediction::Boy => stats.boy_predictions += 1,
                GenderPrediction::Girl => stats.girl_predictions += 1,
            }
            match record.attendance {
                Attendance::Coming => stats.coming += 1,
                Attendance::NotComing => stats.not_coming += 1,
            }

            let day = record.created_at.date_naive();
            if let Some(slot) = stats.timeline.iter_mut().find(|d| d.date == day) {
                slot.count += 1;
            }
        }

        stats
    }

    fn empty_timeline(today: NaiveDate) -> Vec<DailyCount> {
        (0..Self::TIMELINE_DAYS)
            .rev()
            .map(|days_ago| DailyCount {
                date: today - Duration::days(days_ago),
                count: 0,
            })
            .collect()
    }
}
