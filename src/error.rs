use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key in its query string.
        let e = e.without_url();
        if e.is_timeout() {
            AppError::Transport(format!("request timed out: {e}"))
        } else if e.is_decode() {
            AppError::MalformedResponse(format!("response body is not JSON: {e}"))
        } else {
            AppError::Transport(e.to_string())
        }
    }
}

impl AppError {
    /// Errors that end the whole run rather than a single ticker.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_) | AppError::Migration(_))
    }

    /// Short label used in log fields and the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Transport(_) => "transport",
            AppError::Upstream(_) => "upstream",
            AppError::MalformedResponse(_) => "malformed_response",
            AppError::Validation(_) => "validation",
            AppError::Storage(_) => "storage",
            AppError::Migration(_) => "migration",
            AppError::Csv(_) => "csv",
            AppError::Io(_) => "io",
        }
    }

    /// True when the driver rejected a write because the primary key is taken.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Storage(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}
