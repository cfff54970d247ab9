use thiserror::Error;

/// Errors surfaced to the command line.
///
/// The store itself never fails: lookup misses are no-ops and scope questions
/// come back as pending decisions. These variants cover argument parsing and
/// the persistence boundary.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid time '{0}', expected HH:MM (24-hour)")]
    InvalidTime(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("week offset {0} is outside the supported calendar")]
    OffsetOutOfRange(i64),

    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    #[error("task '{id}' not found on {location}")]
    TaskNotFound { id: String, location: String },

    #[error("'{0}' matches more than one item, use a longer id")]
    AmbiguousId(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
