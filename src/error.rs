use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::tms::{HttpMethod, JobId, JobState, Operation, TransportError};

/// Everything that can abort an export or import run.
///
/// All variants are fatal to the current invocation; nothing here is retried
/// automatically.
#[derive(Debug, Error)]
pub enum TmsError {
    #[error("{} failed, transport error ({source}): {context}", .context.operation.label())]
    Transport {
        context: Box<RequestContext>,
        #[source]
        source: TransportError,
    },

    #[error("{} failed, {failure}: {context}", .context.operation.label())]
    Protocol {
        context: Box<RequestContext>,
        failure: ProtocolFailure,
    },

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionFailure),

    #[error("Job {job_id} not done after {waited_secs}s (last state: {last_state})")]
    DeadlineExceeded {
        job_id: JobId,
        last_state: JobState,
        waited_secs: u64,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Translation store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`TmsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Precondition,
    Deadline,
    Config,
    Local,
}

impl TmsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TmsError::Transport { .. } => ErrorKind::Transport,
            TmsError::Protocol { .. } => ErrorKind::Protocol,
            TmsError::Precondition(_) => ErrorKind::Precondition,
            TmsError::DeadlineExceeded { .. } => ErrorKind::Deadline,
            TmsError::Config(_) => ErrorKind::Config,
            TmsError::Store(_) | TmsError::Io(_) => ErrorKind::Local,
        }
    }

    /// Request diagnostics, for transport and protocol errors.
    pub fn context(&self) -> Option<&RequestContext> {
        match self {
            TmsError::Transport { context, .. } | TmsError::Protocol { context, .. } => {
                Some(&**context)
            }
            _ => None,
        }
    }
}

/// Why a response that did arrive was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolFailure {
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("response has no `{0}`")]
    MissingField(&'static str),

    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

/// Local staging file was not where the pipeline expected it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionFailure {
    #[error("export file was not produced: {}", .path.display())]
    FileNotProduced { path: PathBuf },

    #[error("import file already exists: {}", .path.display())]
    FileAlreadyExists { path: PathBuf },
}

/// Diagnostics describing the request behind a transport or protocol error.
///
/// Header values are stored masked so the context can be logged as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub operation: Operation,
    pub endpoint: String,
    pub method: HttpMethod,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub http_status: Option<u16>,
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, " params [{}]", params.join(", "))?;
        }
        if !self.headers.is_empty() {
            let headers: Vec<String> = self
                .headers
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect();
            write!(f, " headers [{}]", headers.join(", "))?;
        }
        if let Some(status) = self.http_status {
            write!(f, " (HTTP {status})")?;
        }
        Ok(())
    }
}

/// Keeps the first four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if visible.chars().count() == secret.chars().count() {
        "***".to_string()
    } else {
        format!("{visible}***")
    }
}
