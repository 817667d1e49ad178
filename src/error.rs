use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to one of the upstream catalogs.
///
/// "Nothing found" is never an error: adapters report it as an empty
/// list or `None`, so callers can tell a quiet upstream from a broken one.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{upstream} request failed: {source}")]
    Request {
        upstream: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{upstream} returned {status}")]
    Status {
        upstream: &'static str,
        status: StatusCode,
    },

    #[error("{upstream} returned an unexpected payload: {source}")]
    Decode {
        upstream: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {upstream} endpoint: {source}")]
    Url {
        upstream: &'static str,
        #[source]
        source: url::ParseError,
    },
}

impl UpstreamError {
    pub fn upstream(&self) -> &'static str {
        match self {
            UpstreamError::Request { upstream, .. }
            | UpstreamError::Status { upstream, .. }
            | UpstreamError::Decode { upstream, .. }
            | UpstreamError::Url { upstream, .. } => upstream,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Request { .. } => "request",
            UpstreamError::Status { .. } => "status",
            UpstreamError::Decode { .. } => "decode",
            UpstreamError::Url { .. } => "url",
        }
    }
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;
