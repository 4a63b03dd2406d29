use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP response; the upstream body is kept verbatim.
    #[error("{context}: upstream returned {status}: {body}")]
    Status {
        context: &'static str,
        status: u16,
        body: String,
    },

    #[error("'{name}' not found")]
    NotFound { name: String },

    #[error("command not found: {0}")]
    CliNotFound(PathBuf),

    #[error("command `{command}` exited with code {code}: {stderr}")]
    CliFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("command `{command}` timed out after {timeout:?}")]
    CliTimeout { command: String, timeout: Duration },

    #[error("invalid JSON from upstream: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the upstream said the thing we asked about does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::Status { status: 404, .. }
        )
    }
}
