mod job;
mod state;

pub use job::{
    DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_MAX_EXECUTION_TIME_SECS, Job, JobReport, PollOutcome,
    PollPolicy,
};
pub use state::{PollEvent, PollPhase, StateMachine, Transition};
