//! examwatch - exam-slot availability watcher
//!
//! Periodically logs in to the university Certiport portal with a scripted
//! browser session, pulls upcoming exam slots over a configurable look-ahead
//! window, and mails a summary whenever a slot with free capacity shows up,
//! at most once per cool-down window.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`session`] - Scripted login state machine over a browser capability
//! - [`availability`] - Slot retrieval, analysis and report building
//! - [`throttle`] - Notification cool-down backed by a timestamp file
//! - [`notify`] - Mail formatting and best-effort SMTP delivery
//! - [`monitor`] - Cycle orchestration and the schedule loop
//! - [`models`] - Core data structures and types
//!
//! # Example
//!
//! ```no_run
//! use examwatch::config::Config;
//! use examwatch::monitor::Monitor;
//! use examwatch::notify::SmtpMailer;
//! use examwatch::session::WebDriverFactory;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let factory = WebDriverFactory::new(&config.portal.webdriver_url);
//!     let mailer = SmtpMailer::new(
//!         &config.email.smtp_server,
//!         config.email.smtp_port,
//!         &config.email.service_address,
//!         &config.email.app_password,
//!     )?;
//!     let monitor = Monitor::new(config, factory, mailer)?;
//!     monitor.run().await;
//!     Ok(())
//! }
//! ```

pub mod availability;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod session;
pub mod throttle;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::availability::{Analysis, AvailabilityAnalyzer, AvailabilityFetcher, Report};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::{EventStatus, ExamSlot, ExamWindow};
    pub use crate::monitor::{CycleOutcome, Monitor};
    pub use crate::notify::{Mailer, Notifier, SmtpMailer};
    pub use crate::session::{BrowserDriver, DriverFactory, SessionAuthenticator};
    pub use crate::throttle::{NotificationThrottle, ThrottleState, ThrottleStore};
}

// Direct re-exports for convenience
pub use models::{EventStatus, ExamSlot, ExamWindow};
