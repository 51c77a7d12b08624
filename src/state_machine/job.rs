use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::PollPhase;
use crate::error::TmsError;
use crate::tms::{Direction, JobId, JobState};

/// How a poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// The TMS reported `Done`.
    Completed,
    /// The deadline elapsed first; the job may still finish remotely.
    TimedOut { last_state: JobState },
}

impl std::fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollOutcome::Completed => write!(f, "completed"),
            PollOutcome::TimedOut { last_state } => {
                write!(f, "timed out (last state: {last_state})")
            }
        }
    }
}

/// Poll cadence and patience, shared by both pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    check_interval: Duration,
    max_execution_time: Duration,
}

pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_MAX_EXECUTION_TIME_SECS: u64 = 900;

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            max_execution_time: Duration::from_secs(DEFAULT_MAX_EXECUTION_TIME_SECS),
        }
    }
}

impl PollPolicy {
    /// A zero interval is rejected: waited time would never grow.
    pub fn new(check_interval: Duration, max_execution_time: Duration) -> Result<Self, TmsError> {
        if check_interval.is_zero() {
            return Err(TmsError::Config(
                "check interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            check_interval,
            max_execution_time,
        })
    }

    pub fn from_secs(check_interval: u64, max_execution_time: u64) -> Result<Self, TmsError> {
        Self::new(
            Duration::from_secs(check_interval),
            Duration::from_secs(max_execution_time),
        )
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn max_execution_time(&self) -> Duration {
        self.max_execution_time
    }
}

/// A single remote job tracked by one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub direction: Direction,
    pub phase: PollPhase,
    pub state_history: Vec<JobState>,
    pub polls: u32,
    /// Sum of check intervals slept so far.
    pub waited: Duration,
}

impl Job {
    pub fn submitted(id: JobId, direction: Direction) -> Self {
        Self {
            id,
            direction,
            phase: PollPhase::Submitted,
            state_history: Vec::new(),
            polls: 0,
            waited: Duration::ZERO,
        }
    }

    pub fn last_state(&self) -> Option<JobState> {
        self.state_history.last().copied()
    }

    pub fn outcome(&self) -> Option<PollOutcome> {
        match self.phase {
            PollPhase::Terminal(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Summary of one export or import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub run_id: Uuid,
    pub direction: Direction,
    pub job_id: JobId,
    pub outcome: PollOutcome,
    pub polls: u32,
    pub state_history: Vec<JobState>,
    pub waited_secs: u64,
    /// Translation entries handed to or taken from the local store.
    pub entries: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl JobReport {
    /// Build a report from a job whose poll loop ended with `outcome`.
    pub fn from_job(
        job: &Job,
        outcome: PollOutcome,
        entries: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            direction: job.direction,
            job_id: job.id,
            outcome,
            polls: job.polls,
            state_history: job.state_history.clone(),
            waited_secs: job.waited.as_secs(),
            entries,
            started_at,
            completed_at: now,
            duration_ms: (now - started_at).num_milliseconds(),
        }
    }

    pub fn completed(&self) -> bool {
        self.outcome == PollOutcome::Completed
    }
}
