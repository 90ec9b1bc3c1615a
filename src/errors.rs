use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutofillError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser not launched")]
    BrowserNotLaunched,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Profile configuration error: {0}")]
    ProfileError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Browser error: {0}")]
    BrowserError(String),
}

pub type Result<T> = std::result::Result<T, AutofillError>;

// headless_chrome surfaces its failures as anyhow errors
impl From<anyhow::Error> for AutofillError {
    fn from(err: anyhow::Error) -> Self {
        AutofillError::BrowserError(err.to_string())
    }
}
