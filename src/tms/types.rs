//! Wire types for the TMS job API.
//!
//! Every JSON response is wrapped in a `{ "data": { ... } }` envelope. Only the
//! two fields the job protocol reads are modelled: `data.id` (the job id handed
//! back on submission) and `data.state.id` (the raw job state on poll).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier the TMS assigns to a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-side state of a job.
///
/// `Waiting` and `Reserved` are non-terminal, `Done` is terminal. Integers the
/// TMS does not document are kept in `Unknown` and never count as done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Waiting,
    Reserved,
    Done,
    Unknown(i64),
}

impl JobState {
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => JobState::Waiting,
            2 => JobState::Reserved,
            3 => JobState::Done,
            other => JobState::Unknown(other),
        }
    }

    pub fn raw(&self) -> i64 {
        match self {
            JobState::Waiting => 1,
            JobState::Reserved => 2,
            JobState::Done => 3,
            JobState::Unknown(raw) => *raw,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, JobState::Done)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Waiting => write!(f, "WAITING"),
            JobState::Reserved => write!(f, "RESERVED"),
            JobState::Done => write!(f, "DONE"),
            JobState::Unknown(raw) => write!(f, "UNKNOWN({raw})"),
        }
    }
}

/// Which pipeline a job belongs to. Selects the state endpoint to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Export,
    Import,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Export => write!(f, "export"),
            Direction::Import => write!(f, "import"),
        }
    }
}

/// Top-level response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Option<EnvelopeData>,
}

/// Payload inside `data`. Both fields are optional on the wire; which one is
/// required depends on the operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeData {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub state: Option<StateRef>,
}

/// `data.state` object; only its numeric `id` is read.
#[derive(Debug, Clone, Deserialize)]
pub struct StateRef {
    #[serde(default)]
    pub id: Option<i64>,
}

impl Envelope {
    /// `data.id`, if present.
    pub fn job_id(&self) -> Option<JobId> {
        self.data.as_ref().and_then(|d| d.id).map(JobId)
    }

    /// `data.state.id`, if present.
    pub fn state_id(&self) -> Option<i64> {
        self.data
            .as_ref()
            .and_then(|d| d.state.as_ref())
            .and_then(|s| s.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_state_maps_documented_integers() {
        assert_eq!(JobState::from_raw(1), JobState::Waiting);
        assert_eq!(JobState::from_raw(2), JobState::Reserved);
        assert_eq!(JobState::from_raw(3), JobState::Done);
    }

    #[test]
    fn unrecognized_state_is_never_done() {
        for raw in [0, 4, 99, -1] {
            let state = JobState::from_raw(raw);
            assert_eq!(state, JobState::Unknown(raw));
            assert_ne!(state, JobState::Done);
            assert!(!state.is_done());
            assert_eq!(state.raw(), raw);
        }
    }

    #[test]
    fn job_state_display() {
        assert_eq!(JobState::Waiting.to_string(), "WAITING");
        assert_eq!(JobState::Done.to_string(), "DONE");
        assert_eq!(JobState::Unknown(99).to_string(), "UNKNOWN(99)");
    }

    #[test]
    fn envelope_reads_submission_id() {
        let env: Envelope = serde_json::from_str(r#"{"data":{"id":42}}"#).unwrap();
        assert_eq!(env.job_id(), Some(JobId(42)));
        assert_eq!(env.state_id(), None);
    }

    #[test]
    fn envelope_reads_nested_state() {
        let env: Envelope =
            serde_json::from_str(r#"{"data":{"id":7,"state":{"id":2,"name":"reserved"}}}"#)
                .unwrap();
        assert_eq!(env.state_id(), Some(2));
    }

    #[test]
    fn envelope_tolerates_missing_data() {
        let env: Envelope = serde_json::from_str(r#"{"errors":["nope"]}"#).unwrap();
        assert_eq!(env.job_id(), None);
        assert_eq!(env.state_id(), None);

        let env: Envelope = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert_eq!(env.job_id(), None);
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Direction::Import).unwrap(), r#""import""#);
        assert_eq!(Direction::Export.to_string(), "export");
    }
}
