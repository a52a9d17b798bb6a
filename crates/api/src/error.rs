//! Error types for the Survox client.

use std::fmt;
use std::path::PathBuf;

/// HTTP method label carried by request errors.
///
/// `Download` is logged separately from `Get` so streamed transfers are
/// easy to tell apart in request traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Download,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Download => "DOWNLOAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed HTTP exchange: what was sent and what came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub method: Method,
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error[{}] - {} {} - {}",
            self.status, self.method, self.url, self.body
        )
    }
}

/// Errors from the Survox client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration, field value, or caller precondition.
    #[error("Error[0] - {0}")]
    Runtime(String),

    #[error("Error[0] - missing required parameter - {0}")]
    MissingParameter(&'static str),

    #[error("{0}")]
    RequestFailed(Box<RequestFailure>),

    /// HTTP 404. Also a request failure, see [`Error::is_request_failed`].
    #[error("{0}")]
    NotFound(Box<RequestFailure>),

    #[error("upload failed: {0}")]
    Upload(Box<RequestFailure>),

    #[error("Unable to download file: {0}")]
    DownloadFailed(Box<RequestFailure>),

    #[error("No such file: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn runtime(text: impl Into<String>) -> Self {
        Error::Runtime(text.into())
    }

    /// `true` for caller-fixable errors that never reached the wire.
    pub fn is_runtime(&self) -> bool {
        matches!(self, Error::Runtime(_) | Error::MissingParameter(_))
    }

    /// `true` for any non-success exchange, 404 included.
    pub fn is_request_failed(&self) -> bool {
        matches!(self, Error::RequestFailed(_) | Error::NotFound(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// The failed exchange, for request, upload, and download errors.
    pub fn request_failure(&self) -> Option<&RequestFailure> {
        match self {
            Error::RequestFailed(f)
            | Error::NotFound(f)
            | Error::Upload(f)
            | Error::DownloadFailed(f) => Some(f),
            _ => None,
        }
    }

    /// HTTP status of the failed exchange, if there was one.
    pub fn status_code(&self) -> Option<u16> {
        self.request_failure().map(|f| f.status)
    }
}
