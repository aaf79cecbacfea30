use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Public details of the party, shown next to the RSVP form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventDetails {
    pub title: String,
    pub hosts: String,
    pub starts_at: DateTime<FixedOffset>,
    pub venue_name: String,
    pub venue_address: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
}

impl Default for EventDetails {
    fn default() -> Self {
        let starts_at = FixedOffset::east_opt(0)
            .and_then(|utc| utc.with_ymd_and_hms(2025, 9, 13, 11, 0, 0).single())
            .unwrap_or_else(|| Utc::now().fixed_offset());
        Self {
            title: "Gender Reveal Party".to_string(),
            hosts: "Jay & Ynn".to_string(),
            starts_at,
            venue_name: "Your Venue Name".to_string(),
            venue_address: "123 Main Street, City, State 12345".to_string(),
            contact_name: "Contact Person".to_string(),
            contact_email: "contact@example.com".to_string(),
            contact_phone: None,
        }
    }
}

impl EventDetails {
    pub fn countdown(&self, now: DateTime<Utc>) -> Countdown {
        Countdown::until(self.starts_at.with_timezone(&Utc), now)
    }
}

/// Time left until the reveal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub total_seconds: i64,
    pub passed: bool,
    /// Less than a day to go.
    pub urgent: bool,
}

impl Countdown {
    const URGENT_WINDOW_SECS: i64 = 24 * 60 * 60;

    pub fn until(event_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining = (event_at - now).num_seconds();
        if remaining <= 0 {
            return Countdown {
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
                total_seconds: 0,
                passed: true,
                urgent: false,
            };
        }

        Countdown {
            days: remaining / 86_400,
            hours: (remaining % 86_400) / 3_600,
            minutes: (remaining % 3_600) / 60,
            seconds: remaining % 60,
            total_seconds: remaining,
            passed: false,
            urgent: remaining < Self::URGENT_WINDOW_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_countdown_breakdown() {
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap();
        let event = now
            + Duration::days(12)
            + Duration::hours(3)
            + Duration::minutes(4)
            + Duration::seconds(5);

        let countdown = Countdown::until(event, now);

        assert_eq!(countdown.days, 12);
        assert_eq!(countdown.hours, 3);
        assert_eq!(countdown.minutes, 4);
        assert_eq!(countdown.seconds, 5);
        assert!(!countdown.passed);
        assert!(!countdown.urgent);
    }

    #[test]
    fn test_countdown_urgent_under_a_day() {
        let now = Utc::now();
        let countdown = Countdown::until(now + Duration::hours(23), now);
        assert!(countdown.urgent);
        assert_eq!(countdown.days, 0);
        assert_eq!(countdown.hours, 23);
    }

    #[test]
    fn test_countdown_passed() {
        let now = Utc::now();
        let countdown = Countdown::until(now - Duration::minutes(1), now);
        assert!(countdown.passed);
        assert_eq!(countdown.total_seconds, 0);

        let exactly_now = Countdown::until(now, now);
        assert!(exactly_now.passed);
    }

    #[test]
    fn test_default_event_date() {
        let event = EventDetails::default();
        assert_eq!(event.starts_at.to_rfc3339(), "2025-09-13T11:00:00+00:00");
    }
}
