use thiserror::Error;

/// Fatal at startup: missing settings, unsupported selectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

impl ConfigError {
    pub fn missing(key: &str) -> Self {
        ConfigError(format!("missing required setting {}", key))
    }
}

/// History reconciliation failure for container-scoped runs. Fatal for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("history returned {actual} successful queries, expected {expected}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("query text mismatch at position {position}: expected '{expected}', found '{actual}'")]
    TextMismatch {
        position: usize,
        expected: String,
        actual: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("no result files for {system} in {dir}")]
    NoFiles { system: String, dir: String },

    #[error("query labels differ between {first} and {other}")]
    LabelMismatch { first: String, other: String },

    #[error("{file} has no '{column}' column")]
    MissingColumn { file: String, column: String },

    #[error("{file}: cannot parse '{value}' as a number")]
    BadNumber { file: String, value: String },
}

/// Best-effort cleanup failure. Logged, never returned to a caller.
#[derive(Debug, Error)]
#[error("cleanup failed ({what}): {source}")]
pub struct CleanupError {
    pub what: &'static str,
    #[source]
    pub source: anyhow::Error,
}

impl CleanupError {
    pub fn new(what: &'static str, source: anyhow::Error) -> Self {
        Self { what, source }
    }
}

/// Sink for [`CleanupError`]. Emits a structured warning and drops the error.
pub fn log_cleanup_failure(err: CleanupError) {
    tracing::warn!(
        event = "quarry.cleanup.failed",
        what = err.what,
        error = %err.source,
        "{}", err
    );
}

/// Walks an anyhow chain looking for a [`ConfigError`].
pub fn as_config_error(err: &anyhow::Error) -> Option<&ConfigError> {
    err.chain().find_map(|e| e.downcast_ref::<ConfigError>())
}
