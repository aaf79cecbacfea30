use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::Writer;
use std::sync::Arc;

use crate::domain::rsvp::RsvpRecord;
use crate::services::admin_sync::{AdminSyncView, FilterCriteria};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportedGuest {
    pub id: i64,
    pub guest_name: String,
    pub email: String,
    pub phone: String,
    pub attendee_count: u8,
    pub attendance: String,
    pub gender_prediction: String,
    pub dietary_restrictions: String,
    pub special_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&RsvpRecord> for ExportedGuest {
    fn from(record: &RsvpRecord) -> Self {
        ExportedGuest {
            id: record.id,
            guest_name: record.guest_name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone().unwrap_or_default(),
            attendee_count: record.attendee_count,
            attendance: record.attendance.label().to_string(),
            gender_prediction: record.gender_prediction.label().to_string(),
            dietary_restrictions: record.dietary_restrictions.clone().unwrap_or_default(),
            special_message: record.special_message.clone().unwrap_or_default(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Guest list downloads, taken from the admin view's cached records.
pub struct ExportService {
    view: Arc<AdminSyncView>,
}

impl ExportService {
    pub fn new(view: Arc<AdminSyncView>) -> Self {
        Self { view }
    }

    /// Export guests to JSON format
    pub fn export_to_json(&self, criteria: &FilterCriteria) -> Result<String> {
        let records = self.view.filter(criteria).records;
        records_to_json(&records)
    }

    /// Export guests to CSV format
    pub fn export_to_csv(&self, criteria: &FilterCriteria) -> Result<String> {
        let records = self.view.filter(criteria).records;
        records_to_csv(&records)
    }
}

pub fn records_to_json(records: &[RsvpRecord]) -> Result<String> {
    let exported: Vec<ExportedGuest> = records.iter().map(Into::into).collect();
    let json = serde_json::to_string_pretty(&exported)?;
    Ok(json)
}

pub fn records_to_csv(records: &[RsvpRecord]) -> Result<String> {
    let mut wtr = Writer::from_writer(vec![]);

    wtr.write_record([
        "ID",
        "Name",
        "Email",
        "Phone",
        "Guests",
        "Attendance",
        "Prediction",
        "Dietary Restrictions",
        "Message",
        "Submitted At",
        "Updated At",
    ])?;

    for record in records {
        let guest = ExportedGuest::from(record);
        wtr.write_record(&[
            guest.id.to_string(),
            guest.guest_name,
            guest.email,
            guest.phone,
            guest.attendee_count.to_string(),
            guest.attendance,
            guest.gender_prediction,
            guest.dietary_restrictions,
            guest.special_message,
            guest.created_at.to_rfc3339(),
            guest.updated_at.map(|dt| dt.to_rfc3339()).unwrap_or_default(),
        ])?;
    }

    let data = wtr.into_inner().context("Failed to flush CSV writer")?;
    let csv = String::from_utf8(data).context("CSV output was not valid UTF-8")?;
    Ok(csv)
}
