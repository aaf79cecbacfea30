use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type RsvpId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Attendance {
    Coming,
    NotComing,
}

impl Attendance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attendance::Coming => "coming",
            Attendance::NotComing => "notComing",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Attendance::Coming => "Coming",
            Attendance::NotComing => "Not Coming",
        }
    }
}

impl FromStr for Attendance {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "coming" => Ok(Attendance::Coming),
            "notComing" => Ok(Attendance::NotComing),
            other => Err(ParseEnumError {
                kind: "attendance",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GenderPrediction {
    Boy,
    Girl,
}

impl GenderPrediction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenderPrediction::Boy => "boy",
            GenderPrediction::Girl => "girl",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GenderPrediction::Boy => "Boy",
            GenderPrediction::Girl => "Girl",
        }
    }
}

impl FromStr for GenderPrediction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "boy" => Ok(GenderPrediction::Boy),
            "girl" => Ok(GenderPrediction::Girl),
            other => Err(ParseEnumError {
                kind: "gender prediction",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for GenderPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Form fields a guest can fill in, in display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RsvpField {
    GuestName,
    Email,
    Phone,
    AttendeeCount,
    Attendance,
    GenderPrediction,
    DietaryRestrictions,
    SpecialMessage,
}

impl RsvpField {
    pub const ALL: [RsvpField; 8] = [
        RsvpField::GuestName,
        RsvpField::Email,
        RsvpField::Phone,
        RsvpField::AttendeeCount,
        RsvpField::Attendance,
        RsvpField::GenderPrediction,
        RsvpField::DietaryRestrictions,
        RsvpField::SpecialMessage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpField::GuestName => "guest_name",
            RsvpField::Email => "email",
            RsvpField::Phone => "phone",
            RsvpField::AttendeeCount => "attendee_count",
            RsvpField::Attendance => "attendance",
            RsvpField::GenderPrediction => "gender_prediction",
            RsvpField::DietaryRestrictions => "dietary_restrictions",
            RsvpField::SpecialMessage => "special_message",
        }
    }
}

impl fmt::Display for RsvpField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw, unvalidated submission as it arrives from the form or a JSON body.
///
/// Every field is kept as text; numbers and nulls sent by JSON clients are
/// accepted and turned into their string form so validation sees exactly
/// what the guest typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RsvpInput {
    #[serde(alias = "guestName", deserialize_with = "lenient_text")]
    pub guest_name: String,
    #[serde(deserialize_with = "lenient_text")]
    pub email: String,
    #[serde(deserialize_with = "lenient_text")]
    pub phone: String,
    #[serde(alias = "attendeeCount", deserialize_with = "lenient_text")]
    pub attendee_count: String,
    #[serde(deserialize_with = "lenient_text")]
    pub attendance: String,
    #[serde(alias = "genderPrediction", deserialize_with = "lenient_text")]
    pub gender_prediction: String,
    #[serde(alias = "dietaryRestrictions", deserialize_with = "lenient_text")]
    pub dietary_restrictions: String,
    #[serde(alias = "specialMessage", deserialize_with = "lenient_text")]
    pub special_message: String,
}

impl RsvpInput {
    pub fn get(&self, field: RsvpField) -> &str {
        match field {
            RsvpField::GuestName => &self.guest_name,
            RsvpField::Email => &self.email,
            RsvpField::Phone => &self.phone,
            RsvpField::AttendeeCount => &self.attendee_count,
            RsvpField::Attendance => &self.attendance,
            RsvpField::GenderPrediction => &self.gender_prediction,
            RsvpField::DietaryRestrictions => &self.dietary_restrictions,
            RsvpField::SpecialMessage => &self.special_message,
        }
    }

    pub fn clear(&mut self, field: RsvpField) {
        let slot = match field {
            RsvpField::GuestName => &mut self.guest_name,
            RsvpField::Email => &mut self.email,
            RsvpField::Phone => &mut self.phone,
            RsvpField::AttendeeCount => &mut self.attendee_count,
            RsvpField::Attendance => &mut self.attendance,
            RsvpField::GenderPrediction => &mut self.gender_prediction,
            RsvpField::DietaryRestrictions => &mut self.dietary_restrictions,
            RsvpField::SpecialMessage => &mut self.special_message,
        };
        slot.clear();
    }

    /// Attendance as chosen, if it parses.
    pub fn attendance(&self) -> Option<Attendance> {
        self.attendance.parse().ok()
    }

    /// Blanks fields that only apply to attending guests when the guest
    /// declined. Runs before validation.
    pub fn apply_attendance_rules(&mut self, attending_only: &[RsvpField]) {
        if self.attendance() == Some(Attendance::NotComing) {
            for field in attending_only {
                self.clear(*field);
            }
        }
    }
}

impl From<&RsvpFields> for RsvpInput {
    fn from(fields: &RsvpFields) -> Self {
        Self {
            guest_name: fields.guest_name.clone(),
            email: fields.email.clone(),
            phone: fields.phone.clone().unwrap_or_default(),
            attendee_count: fields.attendee_count.to_string(),
            attendance: fields.attendance.as_str().to_string(),
            gender_prediction: fields.gender_prediction.as_str().to_string(),
            dietary_restrictions: fields.dietary_restrictions.clone().unwrap_or_default(),
            special_message: fields.special_message.clone().unwrap_or_default(),
        }
    }
}

impl From<&RsvpRecord> for RsvpInput {
    fn from(record: &RsvpRecord) -> Self {
        Self::from(&record.fields())
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    })
}

/// Every editable field of a guest response, already validated and normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RsvpFields {
    pub guest_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub attendee_count: u8,
    pub attendance: Attendance,
    pub gender_prediction: GenderPrediction,
    pub dietary_restrictions: Option<String>,
    pub special_message: Option<String>,
}

impl RsvpFields {
    pub fn into_record(self, id: RsvpId, created_at: DateTime<Utc>) -> RsvpRecord {
        RsvpRecord {
            id,
            guest_name: self.guest_name,
            email: self.email,
            phone: self.phone,
            attendee_count: self.attendee_count,
            attendance: self.attendance,
            gender_prediction: self.gender_prediction,
            dietary_restrictions: self.dietary_restrictions,
            special_message: self.special_message,
            created_at,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RsvpRecord {
    pub id: RsvpId,
    pub guest_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub attendee_count: u8,
    pub attendance: Attendance,
    pub gender_prediction: GenderPrediction,
    pub dietary_restrictions: Option<String>,
    pub special_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RsvpRecord {
    pub fn fields(&self) -> RsvpFields {
        RsvpFields {
            guest_name: self.guest_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            attendee_count: self.attendee_count,
            attendance: self.attendance,
            gender_prediction: self.gender_prediction,
            dietary_restrictions: self.dietary_restrictions.clone(),
            special_message: self.special_message.clone(),
        }
    }

    /// Full replace of every editable field. Id and creation time are kept.
    pub fn replace_fields(&mut self, fields: RsvpFields, updated_at: DateTime<Utc>) {
        self.guest_name = fields.guest_name;
        self.email = fields.email;
        self.phone = fields.phone;
        self.attendee_count = fields.attendee_count;
        self.attendance = fields.attendance;
        self.gender_prediction = fields.gender_prediction;
        self.dietary_restrictions = fields.dietary_restrictions;
        self.special_message = fields.special_message;
        self.updated_at = Some(updated_at);
    }
}
