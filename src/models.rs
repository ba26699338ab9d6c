//! Core data structures for the examwatch monitor

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an exam slot as reported by the portal.
///
/// The portal is only contractually known to emit `active` and `completed`;
/// any other value is carried through verbatim so it survives a round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventStatus {
    Active,
    Completed,
    Other(String),
}

impl EventStatus {
    /// Get string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for EventStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => Self::Active,
            "completed" => Self::Completed,
            _ => Self::Other(s),
        }
    }
}

impl From<EventStatus> for String {
    fn from(status: EventStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Nested attendance counter as the portal serializes it (`_count`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceCount {
    #[serde(rename = "eventAttendances")]
    pub event_attendances: u32,
}

/// One exam slot record from the portal's events endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamSlot {
    /// Scheduled start of the exam (UTC)
    pub date: DateTime<Utc>,

    #[serde(rename = "eventStatus")]
    pub event_status: EventStatus,

    /// Seat capacity of the slot
    #[serde(rename = "maxAttendance")]
    pub max_attendance: u32,

    #[serde(rename = "_count")]
    pub count: AttendanceCount,
}

impl ExamSlot {
    /// Number of registrations currently recorded for this slot.
    pub fn attendance_count(&self) -> u32 {
        self.count.event_attendances
    }

    /// Remaining free seats, floored at zero when the portal reports an
    /// over-subscribed slot.
    pub fn free_capacity(&self) -> u32 {
        self.max_attendance.saturating_sub(self.attendance_count())
    }

    /// A slot can still be booked iff it is active and has seats left.
    pub fn is_available(&self) -> bool {
        self.event_status == EventStatus::Active && self.attendance_count() < self.max_attendance
    }
}

/// Query window for the events endpoint: `[start, start + months]`.
///
/// Not persisted; recomputed from "now" at the start of every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ExamWindow {
    /// Build a window starting at the given instant and reaching
    /// `months` calendar months ahead.
    pub fn starting_at(start: DateTime<Utc>, months: u32) -> Self {
        let end = start
            .checked_add_months(Months::new(months))
            .unwrap_or(start);
        Self { start, end }
    }

    /// Build a window starting now.
    pub fn from_now(months: u32) -> Self {
        Self::starting_at(Utc::now(), months)
    }

    /// `startDate` query parameter: millisecond UTC with trailing `Z`.
    pub fn start_param(&self) -> String {
        format_param(self.start)
    }

    /// `endDate` query parameter, same format as [`Self::start_param`].
    pub fn end_param(&self) -> String {
        format_param(self.end)
    }
}

fn format_param(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slot(status: EventStatus, max: u32, count: u32) -> ExamSlot {
        ExamSlot {
            date: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
            event_status: status,
            max_attendance: max,
            count: AttendanceCount {
                event_attendances: count,
            },
        }
    }

    #[test]
    fn test_event_status_round_trip() {
        assert_eq!(EventStatus::from("active".to_string()), EventStatus::Active);
        assert_eq!(
            EventStatus::from("completed".to_string()),
            EventStatus::Completed
        );

        let odd = EventStatus::from("draft".to_string());
        assert_eq!(odd, EventStatus::Other("draft".to_string()));
        assert_eq!(String::from(odd), "draft");
    }

    #[test]
    fn test_availability_predicate() {
        assert!(slot(EventStatus::Active, 10, 5).is_available());
        assert!(!slot(EventStatus::Active, 10, 10).is_available());
        assert!(!slot(EventStatus::Completed, 10, 5).is_available());
        assert!(!slot(EventStatus::Other("draft".into()), 10, 5).is_available());
    }

    #[test]
    fn test_free_capacity_floors_at_zero() {
        assert_eq!(slot(EventStatus::Active, 10, 3).free_capacity(), 7);
        // Over-subscribed slots must be tolerated, never underflow
        assert_eq!(slot(EventStatus::Active, 10, 12).free_capacity(), 0);
    }

    #[test]
    fn test_slot_deserializes_portal_shape() {
        let json = r#"{
            "date": "2025-03-01T10:00:00.000Z",
            "eventStatus": "active",
            "maxAttendance": 12,
            "_count": { "eventAttendances": 7 }
        }"#;

        let slot: ExamSlot = serde_json::from_str(json).unwrap();
        assert_eq!(slot.event_status, EventStatus::Active);
        assert_eq!(slot.max_attendance, 12);
        assert_eq!(slot.attendance_count(), 7);
        assert_eq!(slot.free_capacity(), 5);
    }

    #[test]
    fn test_window_params_millisecond_format() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let window = ExamWindow::starting_at(start, 1);

        assert_eq!(window.start_param(), "2025-03-01T10:00:00.000Z");
        assert_eq!(window.end_param(), "2025-04-01T10:00:00.000Z");
    }
}
