use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::domain::rsvp::{Attendance, GenderPrediction, RsvpField, RsvpFields, RsvpInput};
use crate::services::error_handling::FieldErrors;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+]?[1-9][0-9]{0,15}$").expect("valid phone pattern"));

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const NAME_MESSAGE: &str = "Name must be at least 2 characters long";
pub const EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const PHONE_MESSAGE: &str = "Please enter a valid phone number";
pub const ATTENDEE_COUNT_MESSAGE: &str = "Please enter a number between 1 and 10";
pub const ATTENDANCE_MESSAGE: &str = "Please choose whether you are coming";
pub const PREDICTION_MESSAGE: &str = "Gender prediction must be either \"boy\" or \"girl\"";

/// Size limits for guest input
pub struct SizeLimits;

impl SizeLimits {
    pub const MIN_NAME_CHARS: usize = 2;
    pub const MIN_ATTENDEES: u8 = 1;
    pub const MAX_ATTENDEES: u8 = 10;
}

/// Which fields the form requires, and which only matter for guests who attend.
#[derive(Debug, Clone, PartialEq)]
pub struct FormRules {
    pub required: Vec<RsvpField>,
    pub attending_only: Vec<RsvpField>,
}

impl FormRules {
    pub fn new(require_dietary_when_attending: bool) -> Self {
        let mut required = vec![
            RsvpField::GuestName,
            RsvpField::Email,
            RsvpField::AttendeeCount,
            RsvpField::Attendance,
            RsvpField::GenderPrediction,
        ];
        if require_dietary_when_attending {
            required.push(RsvpField::DietaryRestrictions);
        }

        Self {
            required,
            attending_only: vec![RsvpField::DietaryRestrictions],
        }
    }

    pub fn is_required(&self, field: RsvpField, attendance: Option<Attendance>) -> bool {
        if attendance == Some(Attendance::NotComing) && self.attending_only.contains(&field) {
            return false;
        }
        self.required.contains(&field)
    }
}

impl Default for FormRules {
    fn default() -> Self {
        Self::new(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldCheck {
    pub valid: bool,
    pub message: Option<String>,
}

impl FieldCheck {
    fn ok() -> Self {
        Self { valid: true, message: None }
    }

    fn fail(message: &str) -> Self {
        Self {
            valid: false,
            message: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormValidation {
    pub valid: bool,
    pub errors: BTreeMap<RsvpField, String>,
}

impl FormValidation {
    pub fn into_field_errors(self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, message) in self.errors {
            errors.insert(field, message);
        }
        errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: FormRules,
}

impl Validator {
    pub fn new(rules: FormRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &FormRules {
        &self.rules
    }

    /// Checks one field as if the guest were attending.
    pub fn validate_field(&self, field: RsvpField, raw: &str) -> FieldCheck {
        self.check(field, raw, None)
    }

    pub fn validate_form(&self, input: &RsvpInput) -> FormValidation {
        let attendance = input.attendance();
        let errors: BTreeMap<RsvpField, String> = RsvpField::ALL
            .iter()
            .filter_map(|field| {
                let check = self.check(*field, input.get(*field), attendance);
                check.message.map(|message| (*field, message))
            })
            .collect();

        FormValidation {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Validates and converts raw input into stored field values.
    pub fn normalize(&self, input: &RsvpInput) -> Result<RsvpFields, FieldErrors> {
        let validation = self.validate_form(input);
        if !validation.valid {
            return Err(validation.into_field_errors());
        }

        let parse_failure = |field: RsvpField, message: &str| {
            let mut errors = FieldErrors::new();
            errors.insert(field, message);
            errors
        };

        Ok(RsvpFields {
            guest_name: input.guest_name.trim().to_string(),
            email: input.email.trim().to_string(),
            phone: optional_text(&input.phone),
            attendee_count: parse_attendee_count(&input.attendee_count)
                .ok_or_else(|| parse_failure(RsvpField::AttendeeCount, ATTENDEE_COUNT_MESSAGE))?,
            attendance: input
                .attendance
                .parse()
                .map_err(|_| parse_failure(RsvpField::Attendance, ATTENDANCE_MESSAGE))?,
            gender_prediction: input
                .gender_prediction
                .parse()
                .map_err(|_| parse_failure(RsvpField::GenderPrediction, PREDICTION_MESSAGE))?,
            dietary_restrictions: optional_text(&input.dietary_restrictions),
            special_message: optional_text(&input.special_message),
        })
    }

    /// Re-validates an already typed replacement, as sent by the admin editor.
    pub fn validate_fields(&self, fields: &RsvpFields) -> Result<RsvpFields, FieldErrors> {
        self.normalize(&RsvpInput::from(fields))
    }

    fn check(&self, field: RsvpField, raw: &str, attendance: Option<Attendance>) -> FieldCheck {
        let value = raw.trim();

        if value.is_empty() {
            return if self.rules.is_required(field, attendance) {
                FieldCheck::fail(REQUIRED_MESSAGE)
            } else {
                FieldCheck::ok()
            };
        }

        match field {
            RsvpField::GuestName if value.chars().count() < SizeLimits::MIN_NAME_CHARS => {
                FieldCheck::fail(NAME_MESSAGE)
            }
            RsvpField::Email if !EMAIL_PATTERN.is_match(value) => FieldCheck::fail(EMAIL_MESSAGE),
            RsvpField::Phone if !PHONE_PATTERN.is_match(&strip_phone_punctuation(value)) => {
                FieldCheck::fail(PHONE_MESSAGE)
            }
            RsvpField::AttendeeCount if parse_attendee_count(value).is_none() => {
                FieldCheck::fail(ATTENDEE_COUNT_MESSAGE)
            }
            RsvpField::Attendance if value.parse::<Attendance>().is_err() => {
                FieldCheck::fail(ATTENDANCE_MESSAGE)
            }
            RsvpField::GenderPrediction if value.parse::<GenderPrediction>().is_err() => {
                FieldCheck::fail(PREDICTION_MESSAGE)
            }
            _ => FieldCheck::ok(),
        }
    }
}

fn strip_phone_punctuation(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '-'))
        .collect()
}

fn parse_attendee_count(raw: &str) -> Option<u8> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .filter(|count| (SizeLimits::MIN_ATTENDEES..=SizeLimits::MAX_ATTENDEES).contains(count))
}

fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
