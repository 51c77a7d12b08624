//! Transport-level failures.
//!
//! [`TransportError`] is what a [`Transport`](super::Transport) returns when no
//! HTTP response could be obtained at all. HTTP status codes are never turned
//! into a `TransportError`; judging them is the codec's job.

use std::fmt;

use thiserror::Error;

/// Underlying cause of a transport failure, the moral equivalent of a socket
/// or curl error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// DNS, TCP or TLS connection could not be established.
    Connect,
    /// The request or connection timed out.
    Timeout,
    /// Building or sending the request failed.
    Request,
    /// The response body could not be read.
    Body,
    /// Too many redirects or a redirect loop.
    Redirect,
    /// A file to be attached could not be read from disk.
    LocalFile,
    Other,
}

impl TransportErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Redirect => "redirect",
            TransportErrorKind::LocalFile => "local_file",
            TransportErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A request that never produced a usable HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    /// Status line, if one arrived before the failure (e.g. body read error).
    pub status: Option<u16>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_redirect() {
            TransportErrorKind::Redirect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else if err.is_request() || err.is_builder() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        Self {
            kind,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
