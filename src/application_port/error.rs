/// Shared failure taxonomy for every coordination operation. Precondition
/// violations are returned synchronously as one of these; asynchronous
/// delivery faults never surface here (the notifier retries and
/// dead-letters internally).
#[derive(Debug, thiserror::Error)]
pub enum CoordError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("invalid cursor")]
    BadCursor,
    #[error("store error: {0}")]
    Store(String),
}

impl CoordError {
    pub fn store<E: std::fmt::Display>(context: &str, e: E) -> Self {
        CoordError::Store(format!("{context}: {e}"))
    }
}
