//! In-memory doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::poller::Sleeper;
use crate::tms::{
    EndpointSet, Transport, TransportError, TransportErrorKind, TransportRequest,
    TransportResponse,
};

pub fn endpoints() -> EndpointSet {
    EndpointSet {
        import_request: "/api/import/request".into(),
        import_state: "/api/import/state".into(),
        import_download: "/api/import/download".into(),
        export_upload: "/api/export/upload".into(),
        export_state: "/api/export/state".into(),
    }
}

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(TransportResponse {
            status,
            body: body.as_bytes().to_vec(),
        }));
        self
    }

    /// Queues a poll reply with the given raw state id.
    pub fn state(self, raw: i64) -> Self {
        self.reply(200, &format!(r#"{{"data":{{"id":1,"state":{{"id":{raw}}}}}}}"#))
    }

    pub fn fail(self, kind: TransportErrorKind, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError::new(kind, message)));
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Paths of all requests made so far, without host or query.
    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(TransportError::new(
                TransportErrorKind::Other,
                "no scripted reply left",
            ))
        })
    }
}

/// Records requested sleeps and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.slept().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}
