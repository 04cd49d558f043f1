use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by credential loading, source construction and polling.
///
/// Per-credential variants never escape a scrape: the collector logs them and
/// moves on to the next credential.
#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("unknown kind: {0}")]
    UnknownCredentialKind(String),

    #[error("credential {name}: missing field `{field}`")]
    InvalidCredential { name: String, field: &'static str },

    #[error("credential {name}: cannot build rate limit source: {reason}")]
    SourceConstructionFailed { name: String, reason: String },

    #[error("credential {name}: rate limit query failed ({code}): {message}")]
    RemoteQueryFailed {
        name: String,
        code: String,
        message: String,
    },

    #[error("credential file {}: {reason}", path.display())]
    CredentialFile { path: PathBuf, reason: String },

    #[error(transparent)]
    Metrics(#[from] prometheus::Error),

    #[error("metrics encoding failed: {0}")]
    Encode(String),
}

impl ExporterError {
    pub(crate) fn construction(name: &str, reason: impl ToString) -> Self {
        Self::SourceConstructionFailed {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn remote(name: &str, code: &str, message: impl ToString) -> Self {
        Self::RemoteQueryFailed {
            name: name.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}
