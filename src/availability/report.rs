//! Availability analysis and report building
//!
//! Turns the raw slot list into the human-readable summary that goes into
//! the notification mail and extracts the subset of slots that can still be
//! booked. Output is deterministic: slots are sorted stably by date, ties
//! keep their input order, and the free-capacity section is a filtered view
//! of that same ordering.

use crate::models::{EventStatus, ExamSlot};

/// Report line shown for a completed slot.
const MARKER_COMPLETED: &str = "✓";
/// Report line shown for every other slot status.
const MARKER_PENDING: &str = "⌛";

/// The per-cycle report: summary lines plus an optional free-capacity
/// section. Built once per cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    summary_lines: Vec<String>,
    free_slot_lines: Vec<String>,
}

impl Report {
    /// Summary without the free-capacity section.
    pub fn summary(&self) -> String {
        self.summary_lines.join("\n")
    }

    /// Full body as mailed: the summary plus, when any slot is free, the
    /// `Szabad helyek:` section.
    pub fn with_free_slots(&self) -> String {
        if self.free_slot_lines.is_empty() {
            return self.summary();
        }

        let mut lines = self.summary_lines.clone();
        lines.push(String::new());
        lines.push("Szabad helyek:".to_string());
        lines.extend(self.free_slot_lines.iter().cloned());
        lines.join("\n")
    }

    pub fn summary_lines(&self) -> &[String] {
        &self.summary_lines
    }

    pub fn free_slot_lines(&self) -> &[String] {
        &self.free_slot_lines
    }
}

/// Result of analyzing one fetched slot list.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub report: Report,
    /// Slots that can still be booked, in report (ascending date) order.
    pub available: Vec<ExamSlot>,
}

impl Analysis {
    pub fn has_availability(&self) -> bool {
        !self.available.is_empty()
    }
}

/// Stateless analyzer over a fetched slot list.
pub struct AvailabilityAnalyzer;

impl AvailabilityAnalyzer {
    /// Build the report and the available subset for `slots`.
    pub fn analyze(slots: &[ExamSlot]) -> Analysis {
        let active = slots
            .iter()
            .filter(|s| s.event_status == EventStatus::Active)
            .count();
        let total_capacity: u64 = slots.iter().map(|s| u64::from(s.max_attendance)).sum();
        let total_attendance: u64 = slots.iter().map(|s| u64::from(s.attendance_count())).sum();

        let mut sorted: Vec<&ExamSlot> = slots.iter().collect();
        // Stable sort: equal dates keep their input order.
        sorted.sort_by_key(|s| s.date);

        let mut summary_lines = vec![
            format!("Aktív vizsgák: {active}"),
            format!("Összes férőhely: {total_capacity}"),
            format!("Összes jelentkező: {total_attendance}"),
            String::new(),
            "Vizsgaidőpontok:".to_string(),
        ];
        for slot in &sorted {
            let marker = if slot.event_status == EventStatus::Completed {
                MARKER_COMPLETED
            } else {
                MARKER_PENDING
            };
            summary_lines.push(format!(
                "{marker} {} - Jelentkezők: {}/{}",
                slot.date.format("%Y-%m-%d %H:%M"),
                slot.attendance_count(),
                slot.max_attendance,
            ));
        }

        // The available subset is a filtered view of the sorted sequence,
        // not an independently re-sorted list.
        let available: Vec<ExamSlot> = sorted
            .iter()
            .filter(|s| s.is_available())
            .map(|s| (*s).clone())
            .collect();

        let free_slot_lines = available
            .iter()
            .map(|slot| {
                format!(
                    "{} - {} szabad hely",
                    slot.date.format("%Y-%m-%d %H:%M"),
                    slot.free_capacity(),
                )
            })
            .collect();

        Analysis {
            report: Report {
                summary_lines,
                free_slot_lines,
            },
            available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceCount;
    use chrono::{TimeZone, Utc};

    fn slot(day: u32, status: EventStatus, max: u32, count: u32) -> ExamSlot {
        ExamSlot {
            date: Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap(),
            event_status: status,
            max_attendance: max,
            count: AttendanceCount {
                event_attendances: count,
            },
        }
    }

    #[test]
    fn test_summary_counts() {
        let slots = vec![
            slot(2, EventStatus::Active, 10, 4),
            slot(1, EventStatus::Completed, 8, 8),
            slot(3, EventStatus::Other("draft".into()), 6, 0),
        ];

        let analysis = AvailabilityAnalyzer::analyze(&slots);
        let lines = analysis.report.summary_lines();
        assert_eq!(lines[0], "Aktív vizsgák: 1");
        assert_eq!(lines[1], "Összes férőhely: 24");
        assert_eq!(lines[2], "Összes jelentkező: 12");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "Vizsgaidőpontok:");
    }

    #[test]
    fn test_slots_listed_ascending_by_date_with_markers() {
        let slots = vec![
            slot(2, EventStatus::Active, 10, 4),
            slot(1, EventStatus::Completed, 8, 8),
        ];

        let analysis = AvailabilityAnalyzer::analyze(&slots);
        let lines = analysis.report.summary_lines();
        assert_eq!(lines[5], "✓ 2025-03-01 10:00 - Jelentkezők: 8/8");
        assert_eq!(lines[6], "⌛ 2025-03-02 10:00 - Jelentkezők: 4/10");
    }

    #[test]
    fn test_free_section_only_when_available() {
        let full = vec![slot(1, EventStatus::Active, 10, 10)];
        let analysis = AvailabilityAnalyzer::analyze(&full);
        assert!(!analysis.has_availability());
        assert_eq!(analysis.report.with_free_slots(), analysis.report.summary());

        let open = vec![slot(1, EventStatus::Active, 10, 3)];
        let analysis = AvailabilityAnalyzer::analyze(&open);
        assert!(analysis.has_availability());
        let body = analysis.report.with_free_slots();
        assert!(body.contains("Szabad helyek:"));
        assert!(body.contains("2025-03-01 10:00 - 7 szabad hely"));
    }

    #[test]
    fn test_available_subset_follows_report_order() {
        let slots = vec![
            slot(5, EventStatus::Active, 10, 1),
            slot(2, EventStatus::Active, 10, 1),
            slot(4, EventStatus::Completed, 10, 1),
        ];

        let analysis = AvailabilityAnalyzer::analyze(&slots);
        let dates: Vec<u32> = analysis
            .available
            .iter()
            .map(|s| s.date.format("%d").to_string().parse().unwrap())
            .collect();
        assert_eq!(dates, vec![2, 5]);
    }

    #[test]
    fn test_date_ties_keep_input_order() {
        let mut first = slot(1, EventStatus::Active, 10, 1);
        first.max_attendance = 11; // make the two distinguishable
        let second = slot(1, EventStatus::Active, 10, 1);

        let analysis = AvailabilityAnalyzer::analyze(&[first.clone(), second.clone()]);
        assert_eq!(analysis.available[0].max_attendance, 11);
        assert_eq!(analysis.available[1].max_attendance, 10);

        // Reversed input reverses the tie order
        let analysis = AvailabilityAnalyzer::analyze(&[second, first]);
        assert_eq!(analysis.available[0].max_attendance, 10);
        assert_eq!(analysis.available[1].max_attendance, 11);
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let slots = vec![
            slot(3, EventStatus::Active, 9, 2),
            slot(1, EventStatus::Completed, 5, 5),
            slot(2, EventStatus::Active, 7, 7),
        ];

        let first = AvailabilityAnalyzer::analyze(&slots);
        let second = AvailabilityAnalyzer::analyze(&slots);
        assert_eq!(first.report, second.report);
    }
}
