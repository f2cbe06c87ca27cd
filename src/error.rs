use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("login element not found: {0}")]
    ElementNotFound(String),
    #[error("browser command failed: {0}")]
    Browser(String),
    #[error("could not start browser session: {0}")]
    Session(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("calendar request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("calendar endpoint returned {0}")]
    Status(StatusCode),
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("calendar entry {index} has no `{field}` string field")]
    MissingField { index: usize, field: &'static str },
    #[error("calendar response is not a list of entries")]
    NotAList,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("notification endpoint returned {0}")]
    Status(StatusCode),
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Login(#[from] LoginError),
    #[error("bad calendar data for {person}: {source}")]
    Extract {
        person: String,
        #[source]
        source: ExtractError,
    },
    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("bad room pattern: {0}")]
    Pattern(#[from] regex::Error),
}
