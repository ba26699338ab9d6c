//! Configuration management for the examwatch monitor
//!
//! Configuration is loaded once at process start into an immutable [`Config`]
//! that is passed into the monitor and its collaborators; nothing reads the
//! environment after startup. Sources: environment variables (optionally via
//! a `.env` file) or a TOML file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::throttle::CorruptStatePolicy;

/// Deployment environment; controls log verbosity and the startup notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Prod,
    Dev,
}

impl Environment {
    fn parse(value: &str) -> Self {
        if value == "prod" {
            Self::Prod
        } else {
            Self::Dev
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment environment
    pub environment: Environment,

    /// Portal access configuration
    pub portal: PortalConfig,

    /// Cycle cadence and throttle configuration
    pub schedule: ScheduleConfig,

    /// Outbound mail configuration
    pub email: EmailConfig,
}

/// Portal access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Portal base URL
    pub base_url: String,

    /// chromedriver endpoint used for the scripted login
    pub webdriver_url: String,

    /// Portal login name (Neptun)
    pub username: String,

    /// Portal password
    pub password: String,

    /// Per-transition wait bound in the login flow, seconds
    pub wait_timeout_secs: u64,

    /// Availability request timeout, seconds
    pub request_timeout_secs: u64,
}

/// Cycle cadence and throttle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Cycle period in minutes
    pub run_minutes: u64,

    /// Look-ahead window length in calendar months
    pub months_ahead: u32,

    /// Minimum days between two notifications
    pub resend_days: u32,

    /// Path of the last-sent timestamp file
    pub timestamp_file: PathBuf,

    /// Treatment of an unparseable timestamp file
    pub corrupt_state_policy: CorruptStatePolicy,
}

/// Outbound mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_server: String,

    /// SMTP relay port (implicit TLS)
    pub smtp_port: u16,

    /// Sender / login address of the service
    pub service_address: String,

    /// App password for the service address
    pub app_password: String,

    /// Notification recipients
    pub recipients: Vec<String>,

    /// Persist the throttle timestamp even when delivery failed
    /// (fire-and-forget delivery)
    pub mark_on_failure: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let environment =
            Environment::parse(&std::env::var("ENV").unwrap_or_else(|_| String::from("prod")));

        let base_url = std::env::var("PORTAL_BASE_URL")
            .unwrap_or_else(|_| String::from("https://icert.inf.unideb.hu"));
        let webdriver_url = std::env::var("WEBDRIVER_URL")
            .unwrap_or_else(|_| String::from("http://localhost:9515"));
        let username = std::env::var("NEPTUN_USERNAME").unwrap_or_default();
        let password = std::env::var("NEPTUN_PASSWORD").unwrap_or_default();

        let run_minutes = env_parsed("RUN_MINUTES", 1);
        let months_ahead = env_parsed("MONTH_TO_CHECK", 1);
        let resend_days = env_parsed("RESEND_IN_DAYS", 3);
        let timestamp_file = std::env::var("TIMESTAMP_FILE")
            .unwrap_or_else(|_| String::from("timestamp.txt"))
            .into();
        let corrupt_state_policy = match std::env::var("CORRUPT_STATE_POLICY").as_deref() {
            Ok("treat_as_absent") => CorruptStatePolicy::TreatAsAbsent,
            _ => CorruptStatePolicy::Fail,
        };

        let smtp_server =
            std::env::var("SMTP_SERVER").unwrap_or_else(|_| String::from("smtp.gmail.com"));
        let smtp_port = env_parsed("SMTP_PORT", 465);
        let service_address = std::env::var("SERVICE_EMAIL").unwrap_or_default();
        let app_password = std::env::var("EMAIL_APP_PASSWORD").unwrap_or_default();
        let recipients = std::env::var("EMAIL_LIST")
            .map(|list| parse_recipients(&list))
            .unwrap_or_default();
        let mark_on_failure = std::env::var("MARK_ON_FAILURE")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Ok(Self {
            environment,
            portal: PortalConfig {
                base_url,
                webdriver_url,
                username,
                password,
                wait_timeout_secs: env_parsed("WAIT_TIMEOUT_SECS", 10),
                request_timeout_secs: env_parsed("REQUEST_TIMEOUT_SECS", 30),
            },
            schedule: ScheduleConfig {
                run_minutes,
                months_ahead,
                resend_days,
                timestamp_file,
                corrupt_state_policy,
            },
            email: EmailConfig {
                smtp_server,
                smtp_port,
                service_address,
                app_password,
                recipients,
                mark_on_failure,
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.portal.base_url.is_empty() {
            anyhow::bail!("portal.base_url must not be empty");
        }

        if self.portal.username.is_empty() || self.portal.password.is_empty() {
            anyhow::bail!("portal credentials (NEPTUN_USERNAME / NEPTUN_PASSWORD) must be set");
        }

        if self.schedule.run_minutes == 0 {
            anyhow::bail!("run_minutes must be greater than 0");
        }

        if self.schedule.months_ahead == 0 {
            anyhow::bail!("months_ahead must be greater than 0");
        }

        Ok(())
    }

    /// Additional checks for the watch/check commands, which need a working
    /// mail path on top of [`Self::validate`].
    pub fn validate_for_notification(&self) -> Result<()> {
        self.validate()?;

        if self.email.service_address.is_empty() {
            anyhow::bail!("email.service_address (SERVICE_EMAIL) must be set");
        }

        if self.email.recipients.is_empty() {
            anyhow::bail!("email.recipients (EMAIL_LIST) must not be empty");
        }

        Ok(())
    }

    #[must_use]
    pub fn is_prod(&self) -> bool {
        self.environment == Environment::Prod
    }

    /// Get the login wait bound as Duration
    #[must_use]
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.portal.wait_timeout_secs)
    }

    /// Get the availability request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.portal.request_timeout_secs)
    }

    /// Get the cycle period as Duration
    #[must_use]
    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs(self.schedule.run_minutes * 60)
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for Environment {
    fn default() -> Self {
        Self::Prod
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Prod,
            portal: PortalConfig::default(),
            schedule: ScheduleConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://icert.inf.unideb.hu"),
            webdriver_url: String::from("http://localhost:9515"),
            username: String::new(),
            password: String::new(),
            wait_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            run_minutes: 1,
            months_ahead: 1,
            resend_days: 3,
            timestamp_file: PathBuf::from("timestamp.txt"),
            corrupt_state_policy: CorruptStatePolicy::Fail,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: String::from("smtp.gmail.com"),
            smtp_port: 465,
            service_address: String::new(),
            app_password: String::new(),
            recipients: Vec::new(),
            mark_on_failure: false,
        }
    }
}
