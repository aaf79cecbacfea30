use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::rsvp::GenderPrediction;

/// Cumulative prediction counters. Only ever incremented, deletions and
/// edits of individual responses leave it untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PredictionsSummary {
    pub boy_count: u64,
    pub girl_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl PredictionsSummary {
    pub fn total(&self) -> u64 {
        self.boy_count + self.girl_count
    }

    pub fn count_for(&self, prediction: GenderPrediction) -> u64 {
        match prediction {
            GenderPrediction::Boy => self.boy_count,
            GenderPrediction::Girl => self.girl_count,
        }
    }

    /// Share of boy predictions in percent, `None` before the first vote.
    pub fn boy_percentage(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(self.boy_count as f64 * 100.0 / total as f64)
        }
    }
}
