//! Notification throttling
//!
//! A single timestamp file is the only cross-cycle state: the moment the
//! last availability notification went out. Reading it yields an explicit
//! tri-state ([`ThrottleState`]) so corrupt state is a deliberate decision,
//! not an implicit crash or an implicit reset.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk timestamp format, e.g. `2025-03-01 10:15:00`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What the persisted timestamp file currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrottleState {
    /// No notification has ever been sent
    Absent,
    /// Last successful notification instant
    Present(NaiveDateTime),
    /// The file exists but does not parse; payload describes why
    Corrupt(String),
}

/// How a corrupt timestamp file is treated by [`NotificationThrottle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptStatePolicy {
    /// Corrupt state is fatal for the cycle
    #[default]
    Fail,
    /// Log and act as if no notification was ever sent
    TreatAsAbsent,
}

/// Errors that can occur while reading or writing throttle state
#[derive(Debug, thiserror::Error)]
pub enum ThrottleError {
    #[error("failed to read throttle state {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write throttle state {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt throttle state in {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// File-backed store for the last-sent timestamp. Overwrites on save,
/// never appends.
#[derive(Debug, Clone)]
pub struct ThrottleStore {
    path: PathBuf,
}

impl ThrottleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current state. I/O failure on an existing file is an error;
    /// a missing file is simply [`ThrottleState::Absent`].
    pub fn load(&self) -> Result<ThrottleState, ThrottleError> {
        if !self.path.exists() {
            return Ok(ThrottleState::Absent);
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| ThrottleError::Read {
            path: self.path.clone(),
            source,
        })?;

        let trimmed = raw.trim();
        match NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT) {
            Ok(timestamp) => Ok(ThrottleState::Present(timestamp)),
            Err(e) => Ok(ThrottleState::Corrupt(format!("{trimmed:?}: {e}"))),
        }
    }

    /// Persist `sent_at`, replacing any previous value.
    pub fn save(&self, sent_at: NaiveDateTime) -> Result<(), ThrottleError> {
        fs::write(&self.path, sent_at.format(TIMESTAMP_FORMAT).to_string()).map_err(|source| {
            ThrottleError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        tracing::debug!(path = %self.path.display(), "throttle timestamp persisted");
        Ok(())
    }
}

/// Decides whether enough time has elapsed since the last notification.
#[derive(Debug, Clone)]
pub struct NotificationThrottle {
    store: ThrottleStore,
    resend_days: u32,
    corrupt_policy: CorruptStatePolicy,
}

impl NotificationThrottle {
    pub fn new(store: ThrottleStore, resend_days: u32, corrupt_policy: CorruptStatePolicy) -> Self {
        Self {
            store,
            resend_days,
            corrupt_policy,
        }
    }

    /// Permit a notification iff no prior timestamp exists, or `now` is
    /// strictly after `last_sent + resend_days`.
    pub fn should_notify(&self, now: NaiveDateTime) -> Result<bool, ThrottleError> {
        match self.store.load()? {
            ThrottleState::Absent => Ok(true),
            ThrottleState::Present(last_sent) => {
                Ok(now > last_sent + TimeDelta::days(i64::from(self.resend_days)))
            }
            ThrottleState::Corrupt(reason) => match self.corrupt_policy {
                CorruptStatePolicy::Fail => Err(ThrottleError::Corrupt {
                    path: self.store.path().to_path_buf(),
                    reason,
                }),
                CorruptStatePolicy::TreatAsAbsent => {
                    tracing::warn!(
                        path = %self.store.path().display(),
                        reason = %reason,
                        "corrupt throttle state treated as absent"
                    );
                    Ok(true)
                }
            },
        }
    }

    /// Record a sent notification. The only write path to the state file.
    pub fn mark_notified(&self, sent_at: NaiveDateTime) -> Result<(), ThrottleError> {
        self.store.save(sent_at)
    }
}
