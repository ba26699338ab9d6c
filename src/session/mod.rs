//! Authenticated-session acquisition
//!
//! The portal has no token endpoint; the only way in is the interactive SSO
//! login. This module drives that flow as an explicit state machine over a
//! narrow [`BrowserDriver`] capability trait, so the underlying browser
//! automation can be swapped or mocked in tests.
//!
//! # Login state machine
//!
//! ```text
//! Start ──navigate──▶ LandingLoaded ──click submitB──▶ LoginFormSubmitted
//!   ──type credentials──▶ CredentialsEntered ──click login──▶ LoggedIn
//!   ──click Exams──▶ ExamsSectionOpened (terminal, cookies harvested)
//! ```
//!
//! Each transition is gated by one bounded `wait_for`; a wait that never
//! observes its element is fatal for the cycle and is not retried here.

pub mod webdriver;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

pub use webdriver::{WebDriverClient, WebDriverFactory};

/// Cookie set harvested from a logged-in browser, keyed by cookie name.
pub type SessionCookies = HashMap<String, String>;

/// Element locator understood by [`BrowserDriver`] implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Match on the element's `name` attribute
    Name(String),
    /// Match on an XPath expression
    XPath(String),
}

impl Selector {
    pub fn name(value: impl Into<String>) -> Self {
        Self::Name(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::XPath(value.into())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(v) => write!(f, "name={v}"),
            Self::XPath(v) => write!(f, "xpath={v}"),
        }
    }
}

/// Errors surfaced by a browser driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// HTTP transport to the automation endpoint failed
    #[error("WebDriver transport failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The automation endpoint answered, but not with what we expected
    #[error("WebDriver protocol error: {0}")]
    Protocol(String),

    /// The awaited element never appeared within the bound
    #[error("element {selector} not present after {waited:?}")]
    WaitTimeout {
        selector: String,
        waited: Duration,
    },
}

/// Minimal browser capability needed for the login flow: navigate, wait for
/// a named element, interact with it, and read cookies back.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Block until `selector` is present, bounded by `timeout`.
    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), DriverError>;

    async fn click(&self, selector: &Selector) -> Result<(), DriverError>;

    async fn type_text(&self, selector: &Selector, text: &str) -> Result<(), DriverError>;

    /// Cookies of the current browsing context.
    async fn cookies(&self) -> Result<SessionCookies, DriverError>;

    /// Tear down the underlying browser. Must be called on every exit path.
    async fn quit(&self) -> Result<(), DriverError>;
}

/// Launches a fresh [`BrowserDriver`] for each monitoring cycle.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    type Driver: BrowserDriver;

    async fn launch(&self) -> Result<Self::Driver, DriverError>;
}

/// States of the login flow, in order. Terminal state is
/// [`LoginStep::ExamsSectionOpened`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    Start,
    LandingLoaded,
    LoginFormSubmitted,
    CredentialsEntered,
    LoggedIn,
    ExamsSectionOpened,
}

impl LoginStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::LandingLoaded => "landing_loaded",
            Self::LoginFormSubmitted => "login_form_submitted",
            Self::CredentialsEntered => "credentials_entered",
            Self::LoggedIn => "logged_in",
            Self::ExamsSectionOpened => "exams_section_opened",
        }
    }
}

impl std::fmt::Display for LoginStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authentication failure: the transition towards `step` did not complete.
#[derive(Debug, thiserror::Error)]
#[error("login failed entering {step}: {source}")]
pub struct AuthError {
    pub step: LoginStep,
    #[source]
    pub source: DriverError,
}

impl AuthError {
    fn entering(step: LoginStep, source: DriverError) -> Self {
        Self { step, source }
    }
}

/// Portal credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Drives the scripted login against the portal and yields the session
/// cookie set on success.
#[derive(Debug, Clone)]
pub struct SessionAuthenticator {
    portal_url: String,
    wait_timeout: Duration,
}

impl SessionAuthenticator {
    pub fn new(portal_url: impl Into<String>, wait_timeout: Duration) -> Self {
        let portal_url = portal_url.into().trim_end_matches('/').to_string();
        Self {
            portal_url,
            wait_timeout,
        }
    }

    /// Walk the state machine to the terminal state and read the cookies.
    ///
    /// Any wait timeout or driver failure aborts the flow with an
    /// [`AuthError`] naming the transition that failed; the caller owns the
    /// driver and is responsible for quitting it afterwards.
    pub async fn login<D>(
        &self,
        driver: &D,
        credentials: &Credentials,
    ) -> Result<SessionCookies, AuthError>
    where
        D: BrowserDriver + ?Sized,
    {
        let wait = self.wait_timeout;

        // Start -> LandingLoaded
        tracing::debug!(step = %LoginStep::LandingLoaded, "opening portal landing page");
        driver
            .navigate(&format!("{}/home", self.portal_url))
            .await
            .map_err(|e| AuthError::entering(LoginStep::LandingLoaded, e))?;

        // LandingLoaded -> LoginFormSubmitted
        let submit = Selector::name("submitB");
        tracing::debug!(step = %LoginStep::LoginFormSubmitted, "requesting login form");
        self.wait_and(driver, &submit, wait, LoginStep::LoginFormSubmitted)
            .await?;
        driver
            .click(&submit)
            .await
            .map_err(|e| AuthError::entering(LoginStep::LoginFormSubmitted, e))?;

        // LoginFormSubmitted -> CredentialsEntered
        tracing::debug!(step = %LoginStep::CredentialsEntered, "entering credentials");
        let username = Selector::name("username");
        self.wait_and(driver, &username, wait, LoginStep::CredentialsEntered)
            .await?;
        driver
            .type_text(&username, &credentials.username)
            .await
            .map_err(|e| AuthError::entering(LoginStep::CredentialsEntered, e))?;

        let password = Selector::name("password");
        self.wait_and(driver, &password, wait, LoginStep::CredentialsEntered)
            .await?;
        driver
            .type_text(&password, &credentials.password)
            .await
            .map_err(|e| AuthError::entering(LoginStep::CredentialsEntered, e))?;

        // CredentialsEntered -> LoggedIn
        tracing::debug!(step = %LoginStep::LoggedIn, "submitting login");
        let login = Selector::name("login");
        self.wait_and(driver, &login, wait, LoginStep::LoggedIn).await?;
        driver
            .click(&login)
            .await
            .map_err(|e| AuthError::entering(LoginStep::LoggedIn, e))?;

        // LoggedIn -> ExamsSectionOpened; the Exams entry only renders once
        // the SSO round-trip has landed us back in the portal.
        tracing::debug!(step = %LoginStep::ExamsSectionOpened, "opening exams section");
        let exams = Selector::xpath(r#"//span[text()="Exams"]"#);
        self.wait_and(driver, &exams, wait, LoginStep::ExamsSectionOpened)
            .await?;
        driver
            .click(&exams)
            .await
            .map_err(|e| AuthError::entering(LoginStep::ExamsSectionOpened, e))?;

        driver
            .cookies()
            .await
            .map_err(|e| AuthError::entering(LoginStep::ExamsSectionOpened, e))
    }

    async fn wait_and<D>(
        &self,
        driver: &D,
        selector: &Selector,
        timeout: Duration,
        step: LoginStep,
    ) -> Result<(), AuthError>
    where
        D: BrowserDriver + ?Sized,
    {
        driver
            .wait_for(selector, timeout)
            .await
            .map_err(|e| AuthError::entering(step, e))
    }
}
