use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::job::{Job, PollOutcome, PollPolicy};
use crate::tms::JobState;

/// Lifecycle of a tracked job on the client side.
///
/// Each job flows through: SUBMITTED → POLLING → TERMINAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollPhase {
    /// Job id received, not polled yet.
    Submitted,
    /// At least one non-terminal state observed.
    Polling { last_state: JobState },
    /// Loop finished, either on `Done` or on the deadline.
    Terminal(PollOutcome),
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollPhase::Submitted => write!(f, "SUBMITTED"),
            PollPhase::Polling { .. } => write!(f, "POLLING"),
            PollPhase::Terminal(_) => write!(f, "TERMINAL"),
        }
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// A poll returned this state.
    Observed(JobState),
    /// The requested sleep has elapsed.
    Slept,
}

/// What the driver should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Ask the TMS for the job state.
    Poll,
    /// Suspend for the given interval, then report `Slept`.
    Sleep(Duration),
    /// Stop polling.
    Finish(PollOutcome),
}

/// Drives a `Job` through the poll lifecycle.
pub struct StateMachine;

impl StateMachine {
    /// Compute the next transition for `job` given `event`.
    ///
    /// - An observed `Done` ends the loop with `Completed`.
    /// - Any other observed state asks for a sleep of one check interval.
    /// - After a sleep the interval is added to the waited time; once that
    ///   reaches the deadline the loop ends with `TimedOut` carrying the last
    ///   observed state, otherwise the driver polls again.
    /// - `Terminal` is absorbing.
    pub fn next(job: &mut Job, event: PollEvent, policy: &PollPolicy) -> Transition {
        match (job.phase, event) {
            (PollPhase::Terminal(outcome), _) => Transition::Finish(outcome),
            (_, PollEvent::Observed(state)) => {
                job.polls += 1;
                job.state_history.push(state);
                if state.is_done() {
                    job.phase = PollPhase::Terminal(PollOutcome::Completed);
                    Transition::Finish(PollOutcome::Completed)
                } else {
                    job.phase = PollPhase::Polling { last_state: state };
                    Transition::Sleep(policy.check_interval())
                }
            }
            (PollPhase::Submitted, PollEvent::Slept) => Transition::Poll,
            (PollPhase::Polling { last_state }, PollEvent::Slept) => {
                job.waited += policy.check_interval();
                if job.waited >= policy.max_execution_time() {
                    let outcome = PollOutcome::TimedOut { last_state };
                    job.phase = PollPhase::Terminal(outcome);
                    Transition::Finish(outcome)
                } else {
                    Transition::Poll
                }
            }
        }
    }
}
