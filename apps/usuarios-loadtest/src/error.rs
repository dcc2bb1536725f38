use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("invalid duration '{0}' (expected e.g. 30s, 1m, 1m30s, 500ms)")]
    InvalidDuration(String),

    #[error("invalid stage '{0}' (expected <duration>:<target>, e.g. 30s:10)")]
    InvalidStage(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("metrics collector stopped unexpectedly: {0}")]
    Collector(#[from] tokio::task::JoinError),
}

pub type LoadTestResult<T> = Result<T, LoadTestError>;
