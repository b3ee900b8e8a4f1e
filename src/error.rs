//! Error types for the generation pipeline.
//!
//! Composition itself never fails. Errors come from request validation, from
//! cookbooks whose overall shape cannot be read, and from the two external
//! adapters (rendering and publication).

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required request field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The request body could not be parsed.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    /// The cookbook has a shape the composer cannot handle, e.g. a
    /// collection that is not a list.
    #[error("composition failed: {0}")]
    Composition(String),

    /// The rendering engine failed.
    #[error("rendering failed: {0}")]
    Render(#[from] RenderError),

    /// Upload or signed-URL issuance failed.
    #[error("publication failed: {0}")]
    Publish(#[from] StorageError),
}

impl Error {
    /// Whether the caller is at fault (reported as 400 rather than 500).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::MissingField(_) | Error::InvalidRequest(_))
    }

    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

/// Rendering adapter error.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No usable browser binary was found.
    #[error("no Chrome/Chromium executable found (set CHROME_PATH or pass --chrome)")]
    EngineNotFound,

    /// The requested engine name is not one this build provides.
    #[error("unknown engine '{0}' (expected 'draft' or 'chrome')")]
    UnknownEngine(String),

    /// The engine process could not be started.
    #[error("failed to launch {engine}: {source}")]
    Launch {
        engine: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The engine did not finish in time and was killed.
    #[error("rendering timed out after {0:?}")]
    Timeout(Duration),

    /// The engine exited unsuccessfully.
    #[error("engine exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    /// The engine reported success but produced no PDF.
    #[error("engine produced no output at {0}")]
    EmptyOutput(PathBuf),

    /// I/O error while staging input or collecting output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF assembly failed inside the draft engine.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// A font face could not be read or parsed.
    #[error("font error: {0}")]
    Font(String),
}

/// Publication adapter error.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The storage service returned an error status.
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },

    /// Network failure, timeout, or malformed response.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] ureq::Error),

    /// The object exists and overwriting was not allowed.
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// The object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
