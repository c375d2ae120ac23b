use std::path::PathBuf;
use std::time::Duration;

use crate::locator::LocatorChain;
use crate::session::RoleId;

/// Everything the harness can fail with.
///
/// No variant is recovered from locally: each one propagates to the calling
/// scenario and fails it. Rejections by the application itself are not here,
/// they surface as [`crate::submit::SubmitOutcome::ValidationError`].
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Login as '{role}' did not land on {expected} (current url: {actual})")]
    Authentication {
        role: RoleId,
        expected: String,
        actual: String,
    },
    #[error(
        "Navigation to '{destination}' did not reach {expected} (current url: {actual})"
    )]
    NavigationTimeout {
        destination: String,
        expected: String,
        actual: String,
    },
    #[error(
        "Upload of '{file}' expected {expected} delete controls, found {actual}"
    )]
    UploadCountMismatch {
        file: String,
        expected: usize,
        actual: usize,
    },
    #[error("Fixture not found: {}", .0.display())]
    MissingFixture(PathBuf),
    #[error("Field '{field}' kept value '{value}' after its parent changed")]
    StaleDependentField { field: String, value: String },
    #[error("No element matched any of {chain}")]
    ElementNotFound { chain: LocatorChain },
    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },
    #[error("Submission produced more than one outcome: {0}")]
    AmbiguousOutcome(String),
    #[error("Unexpected state: {0}")]
    UnexpectedState(String),
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),
    #[error("Serial suite stopped: step '{failed_step}' failed earlier")]
    SerialSuitePoisoned { failed_step: String },
    #[error("WebDriver error")]
    WebDriver(#[from] fantoccini::error::CmdError),
    #[error("Could not start WebDriver session")]
    NewSession(#[from] fantoccini::error::NewSessionError),
    #[error("IO error")]
    Io(#[from] std::io::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
