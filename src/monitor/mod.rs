//! Cycle orchestration
//!
//! One cycle = authenticate → fetch → analyze → (maybe) notify → persist.
//! Cycles run strictly one at a time: the schedule loop awaits the cycle
//! before taking the next tick, so the throttle file has exactly one
//! reader/writer at any moment.
//!
//! Any stage error ends the cycle; it is logged at the cycle boundary and
//! the process keeps running. The browser is torn down on every exit path.

use chrono::Local;
use tokio::time::MissedTickBehavior;

use crate::availability::{Analysis, AvailabilityAnalyzer, AvailabilityFetcher};
use crate::config::Config;
use crate::error::Result;
use crate::models::ExamWindow;
use crate::notify::{Mailer, Notifier};
use crate::session::{BrowserDriver, Credentials, DriverFactory, SessionAuthenticator};
use crate::throttle::{NotificationThrottle, ThrottleStore};

/// How a completed (non-errored) cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No slot has free capacity; nothing to announce
    NoAvailability,
    /// Free slots exist but the resend window has not elapsed
    Throttled,
    /// Notification delivered and the throttle timestamp persisted
    Notified,
    /// Free slots exist, throttle permitted, but delivery failed
    SendFailed,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAvailability => "no_availability",
            Self::Throttled => "throttled",
            Self::Notified => "notified",
            Self::SendFailed => "send_failed",
        }
    }
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Composes the pipeline components and drives them on a fixed cadence.
pub struct Monitor<F, M> {
    config: Config,
    factory: F,
    authenticator: SessionAuthenticator,
    fetcher: AvailabilityFetcher,
    throttle: NotificationThrottle,
    notifier: Notifier<M>,
}

impl<F, M> Monitor<F, M>
where
    F: DriverFactory,
    M: Mailer,
{
    pub fn new(config: Config, factory: F, mailer: M) -> Result<Self> {
        let authenticator =
            SessionAuthenticator::new(config.portal.base_url.clone(), config.wait_timeout());
        let fetcher = AvailabilityFetcher::new(&config.portal.base_url, config.request_timeout())?;
        let throttle = NotificationThrottle::new(
            ThrottleStore::new(&config.schedule.timestamp_file),
            config.schedule.resend_days,
            config.schedule.corrupt_state_policy,
        );
        let notifier = Notifier::new(mailer, config.email.recipients.clone());

        Ok(Self {
            config,
            factory,
            authenticator,
            fetcher,
            throttle,
            notifier,
        })
    }

    /// Run one full cycle. Driver teardown is guaranteed regardless of how
    /// the cycle body ends.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let driver = self.factory.launch().await?;
        let outcome = self.cycle_body(&driver).await;
        if let Err(e) = driver.quit().await {
            tracing::warn!(error = %e, "browser teardown failed");
        }
        outcome
    }

    /// Authenticate and fetch the current report without any notification
    /// side effects (the `report` command).
    pub async fn collect(&self) -> Result<Analysis> {
        let driver = self.factory.launch().await?;
        let analysis = self.collect_body(&driver).await;
        if let Err(e) = driver.quit().await {
            tracing::warn!(error = %e, "browser teardown failed");
        }
        analysis
    }

    async fn collect_body<D: BrowserDriver>(&self, driver: &D) -> Result<Analysis> {
        let credentials = Credentials::new(
            self.config.portal.username.clone(),
            self.config.portal.password.clone(),
        );

        let cookies = self.authenticator.login(driver, &credentials).await?;
        tracing::info!("session acquired, downloading exam data");

        let window = ExamWindow::from_now(self.config.schedule.months_ahead);
        let slots = self.fetcher.fetch(&cookies, &window).await?;
        tracing::info!(slots = slots.len(), "analyzing exam data");

        Ok(AvailabilityAnalyzer::analyze(&slots))
    }

    async fn cycle_body<D: BrowserDriver>(&self, driver: &D) -> Result<CycleOutcome> {
        let analysis = self.collect_body(driver).await?;

        if !analysis.has_availability() {
            tracing::info!("no free slots, no notification");
            return Ok(CycleOutcome::NoAvailability);
        }
        tracing::info!(available = analysis.available.len(), "free exam slots found");

        // The timestamp file stores naive local time; compare in kind.
        let now = Local::now().naive_local();
        if !self.throttle.should_notify(now)? {
            tracing::info!("inside the resend window, notification suppressed");
            return Ok(CycleOutcome::Throttled);
        }

        let delivery = self.notifier.notify(&analysis.report.with_free_slots()).await;
        tracing::info!(delivery = %delivery, "notification attempted");

        if delivery.success || self.config.email.mark_on_failure {
            self.throttle.mark_notified(now)?;
        }

        Ok(if delivery.success {
            CycleOutcome::Notified
        } else {
            CycleOutcome::SendFailed
        })
    }

    /// Announce process start to the service address (prod only).
    pub async fn send_startup_notice(&self) {
        if !self.config.is_prod() {
            return;
        }

        let body = format!(
            "A rendszer elindult!\n\n\
             Environment: prod\n\
             Minutes timing: {}\n\
             Resend every nth day: {}\n\
             Service email: {}\n\
             Month to check: {}\n\
             Recipients: {}",
            self.config.schedule.run_minutes,
            self.config.schedule.resend_days,
            self.config.email.service_address,
            self.config.schedule.months_ahead,
            self.config.email.recipients.join(", "),
        );
        let admin = vec![self.config.email.service_address.clone()];
        let delivery = self.notifier.notify_to(&body, &admin).await;
        tracing::info!(delivery = %delivery, "startup notice attempted");
    }

    /// Run cycles on the configured cadence until the process is stopped.
    ///
    /// The first cycle starts immediately. A cycle that overruns the period
    /// delays the next tick instead of overlapping it.
    pub async fn run(&self) {
        self.send_startup_notice().await;

        let mut interval = tokio::time::interval(self.config.cycle_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.run_cycle().await {
                Ok(outcome) => tracing::info!(outcome = %outcome, "cycle finished"),
                Err(e) => tracing::error!(error = %e, "cycle aborted"),
            }
        }
    }
}
