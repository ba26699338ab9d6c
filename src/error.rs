//! Unified error handling for the examwatch crate
//!
//! Each pipeline stage has its own thiserror enum next to its module; this
//! module folds them into a single [`Error`] so the monitor can compose
//! stages with `?` and catch everything once at the cycle boundary.

use thiserror::Error;

pub use crate::availability::FetchError;
pub use crate::notify::NotifyError;
pub use crate::session::{AuthError, DriverError};
pub use crate::throttle::ThrottleError;

/// Unified error type for the examwatch crate
#[derive(Error, Debug)]
pub enum Error {
    /// Login flow failed before the terminal state
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Browser automation failed outside the login flow (launch, teardown)
    #[error("browser driver error: {0}")]
    Driver(#[from] DriverError),

    /// Availability retrieval failed
    #[error("availability fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Throttle state could not be read or written
    #[error("throttle state error: {0}")]
    Throttle(#[from] ThrottleError),

    /// Mail transport setup failed (delivery failures are non-fatal and do
    /// not surface here)
    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LoginStep;
    use std::time::Duration;

    #[test]
    fn test_auth_error_conversion() {
        let auth = AuthError {
            step: LoginStep::LoggedIn,
            source: DriverError::WaitTimeout {
                selector: "name=login".to_string(),
                waited: Duration::from_secs(10),
            },
        };
        let unified: Error = auth.into();
        assert!(matches!(unified, Error::Auth(_)));
        assert!(unified.to_string().contains("logged_in"));
    }

    #[test]
    fn test_fetch_error_conversion() {
        let unified: Error = FetchError::Status(502).into();
        assert!(matches!(unified, Error::Fetch(_)));
        assert!(unified.to_string().contains("502"));
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing credentials");
        assert!(err.to_string().contains("missing credentials"));
    }
}
