//! File-level throttle state tests: interop with hand-written timestamp
//! files and overwrite semantics of the store.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use examwatch::throttle::{
    CorruptStatePolicy, NotificationThrottle, ThrottleState, ThrottleStore, TIMESTAMP_FORMAT,
};
use tempfile::tempdir;

fn noon(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

#[test]
fn test_reads_file_written_by_previous_deployment() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("timestamp.txt");
    std::fs::write(&path, "2025-04-10 12:00:00").unwrap();

    let store = ThrottleStore::new(&path);
    assert_eq!(store.load().unwrap(), ThrottleState::Present(noon(10)));
}

#[test]
fn test_tolerates_trailing_newline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("timestamp.txt");
    std::fs::write(&path, "2025-04-10 12:00:00\n").unwrap();

    let store = ThrottleStore::new(&path);
    assert_eq!(store.load().unwrap(), ThrottleState::Present(noon(10)));
}

#[test]
fn test_save_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let store = ThrottleStore::new(dir.path().join("timestamp.txt"));

    store.save(noon(10)).unwrap();
    assert_eq!(store.load().unwrap(), ThrottleState::Present(noon(10)));

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(raw, noon(10).format(TIMESTAMP_FORMAT).to_string());
}

#[test]
fn test_save_overwrites_rather_than_appends() {
    let dir = tempdir().unwrap();
    let store = ThrottleStore::new(dir.path().join("timestamp.txt"));

    store.save(noon(10)).unwrap();
    store.save(noon(20)).unwrap();

    assert_eq!(store.load().unwrap(), ThrottleState::Present(noon(20)));
    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(raw.lines().count(), 1);
}

#[test]
fn test_garbage_file_is_corrupt_not_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("timestamp.txt");
    std::fs::write(&path, "2025-99-99 not a time").unwrap();

    let store = ThrottleStore::new(&path);
    assert!(matches!(store.load().unwrap(), ThrottleState::Corrupt(_)));
}

#[test]
fn test_iso8601_variant_is_rejected() {
    // A 'T' separator would mean some other writer touched the file
    let dir = tempdir().unwrap();
    let path = dir.path().join("timestamp.txt");
    std::fs::write(&path, "2025-04-10T12:00:00").unwrap();

    let store = ThrottleStore::new(&path);
    assert!(matches!(store.load().unwrap(), ThrottleState::Corrupt(_)));
}

#[test]
fn test_corrupt_file_recovers_after_overwrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("timestamp.txt");
    std::fs::write(&path, "garbage").unwrap();

    let store = ThrottleStore::new(&path);
    let throttle = NotificationThrottle::new(store.clone(), 3, CorruptStatePolicy::TreatAsAbsent);

    // Lenient policy permits the send, and marking repairs the file
    assert!(throttle.should_notify(noon(10)).unwrap());
    throttle.mark_notified(noon(10)).unwrap();
    assert_eq!(store.load().unwrap(), ThrottleState::Present(noon(10)));

    // From here the normal window applies again
    let throttle = NotificationThrottle::new(store, 3, CorruptStatePolicy::Fail);
    assert!(!throttle.should_notify(noon(12)).unwrap());
    assert!(throttle
        .should_notify(noon(13) + TimeDelta::seconds(1))
        .unwrap());
}
