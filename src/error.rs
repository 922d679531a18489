use thiserror::Error;

/// Failures that decide how a run continues.
///
/// They travel inside `anyhow::Error` across module boundaries and are
/// recovered with `downcast_ref` where the caller needs to tell them apart.
#[derive(Debug, Error)]
pub enum Error {
    /// Request failure, timeout or a body that is not the expected JSON.
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// The API answered with `"ok": false`.
    #[error("{location}: API returned not ok ({message})")]
    ApiNotOk { location: String, message: String },

    /// The history file exists but cannot be interpreted.
    #[error("history file {path} is malformed at record {record}: {reason}")]
    MalformedHistory {
        path: String,
        record: usize,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
