//! Poll-until-terminal driver.
//!
//! [`await_done`] feeds poll results and elapsed sleeps into the
//! [`StateMachine`] until it finishes. Sleeping goes through [`Sleeper`] so
//! tests can run whole poll sequences without waiting.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::error::TmsError;
use crate::state_machine::{Job, PollEvent, PollOutcome, PollPolicy, StateMachine, Transition};
use crate::tms::{Direction, JobId, JobState};

/// Suspends the poll loop between checks.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleep on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Poll job `id` until it is done or the policy's deadline has elapsed.
///
/// At least one poll is always made. A deadline hit is not an error: the
/// outcome is `TimedOut` with the last observed state.
/// Errors from `poll` abort the loop immediately.
pub async fn await_done<F, Fut, S>(
    id: JobId,
    direction: Direction,
    policy: &PollPolicy,
    sleeper: &S,
    mut poll: F,
) -> Result<(Job, PollOutcome), TmsError>
where
    F: FnMut(JobId) -> Fut,
    Fut: Future<Output = Result<JobState, TmsError>>,
    S: Sleeper + ?Sized,
{
    let mut job = Job::submitted(id, direction);
    let mut transition = Transition::Poll;

    loop {
        let event = match transition {
            Transition::Poll => {
                let state = poll(id).await?;
                debug!(
                    "{direction} job {id}: {state} (waited {}s)",
                    job.waited.as_secs()
                );
                PollEvent::Observed(state)
            }
            Transition::Sleep(duration) => {
                sleeper.sleep(duration).await;
                PollEvent::Slept
            }
            Transition::Finish(outcome) => {
                if let PollOutcome::TimedOut { last_state } = outcome {
                    warn!(
                        "{direction} job {id} still {last_state} after {}s, giving up",
                        job.waited.as_secs()
                    );
                }
                return Ok((job, outcome));
            }
        };
        transition = StateMachine::next(&mut job, event, policy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use crate::error::ErrorKind;
    use crate::state_machine::PollPhase;
    use crate::testing::RecordingSleeper;

    /// Poll function replaying `states`, repeating the last one forever.
    fn script(states: Vec<JobState>) -> (RefCell<VecDeque<JobState>>, RefCell<u32>) {
        (RefCell::new(states.into()), RefCell::new(0))
    }

    async fn run(
        states: Vec<JobState>,
        interval: u64,
        deadline: u64,
    ) -> (Job, RecordingSleeper, u32) {
        let (queue, calls) = script(states);
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy::from_secs(interval, deadline).unwrap();

        let (job, outcome) = await_done(JobId(42), Direction::Import, &policy, &sleeper, |_| {
            *calls.borrow_mut() += 1;
            let mut queue = queue.borrow_mut();
            let state = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                *queue.front().unwrap()
            };
            async move { Ok(state) }
        })
        .await
        .unwrap();
        assert_eq!(job.outcome(), Some(outcome));

        let calls = *calls.borrow();
        (job, sleeper, calls)
    }

    #[tokio::test]
    async fn done_within_deadline_sleeps_once_per_non_terminal_poll() {
        let (job, sleeper, calls) = run(
            vec![JobState::Waiting, JobState::Reserved, JobState::Done],
            5,
            900,
        )
        .await;

        assert_eq!(job.outcome(), Some(PollOutcome::Completed));
        assert_eq!(calls, 3);
        assert_eq!(sleeper.slept(), vec![Duration::from_secs(5); 2]);
        assert_eq!(sleeper.total(), Duration::from_secs(5 * 2));
        assert_eq!(job.waited, sleeper.total());
    }

    #[tokio::test]
    async fn immediate_done_makes_one_poll_and_no_sleep() {
        let (job, sleeper, calls) = run(vec![JobState::Done], 5, 900).await;
        assert_eq!(job.outcome(), Some(PollOutcome::Completed));
        assert_eq!(calls, 1);
        assert!(sleeper.slept().is_empty());
    }

    #[tokio::test]
    async fn never_done_returns_last_state_at_deadline() {
        let (job, sleeper, calls) =
            run(vec![JobState::Waiting, JobState::Reserved], 5, 20).await;

        assert_eq!(
            job.outcome(),
            Some(PollOutcome::TimedOut {
                last_state: JobState::Reserved
            })
        );
        assert!(sleeper.total() >= Duration::from_secs(20));
        assert_eq!(sleeper.total(), Duration::from_secs(20));
        assert_eq!(calls, 4);
        assert_eq!(job.polls, 4);
    }

    #[tokio::test]
    async fn deadline_not_multiple_of_interval_overshoots_once() {
        let (job, sleeper, calls) = run(vec![JobState::Waiting], 5, 12).await;
        assert_eq!(sleeper.total(), Duration::from_secs(15));
        assert_eq!(calls, 3);
        assert!(matches!(job.phase, PollPhase::Terminal(PollOutcome::TimedOut { .. })));
    }

    #[tokio::test]
    async fn zero_deadline_still_polls_once() {
        let (job, sleeper, calls) = run(vec![JobState::Waiting], 5, 0).await;
        assert_eq!(calls, 1);
        assert_eq!(sleeper.slept(), vec![Duration::from_secs(5)]);
        assert_eq!(
            job.outcome(),
            Some(PollOutcome::TimedOut {
                last_state: JobState::Waiting
            })
        );
    }

    #[tokio::test]
    async fn unknown_state_keeps_polling() {
        let (job, _, calls) = run(
            vec![JobState::Unknown(0), JobState::Unknown(99), JobState::Done],
            1,
            60,
        )
        .await;
        assert_eq!(calls, 3);
        assert_eq!(job.outcome(), Some(PollOutcome::Completed));
    }

    #[tokio::test]
    async fn poll_error_aborts_loop() {
        let sleeper = RecordingSleeper::default();
        let policy = PollPolicy::default();
        let calls = RefCell::new(0);

        let err = await_done(JobId(1), Direction::Export, &policy, &sleeper, |_| {
            *calls.borrow_mut() += 1;
            let n = *calls.borrow();
            async move {
                if n < 2 {
                    Ok(JobState::Waiting)
                } else {
                    Err(TmsError::Config("boom".into()))
                }
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(*calls.borrow(), 2);
        assert_eq!(sleeper.slept().len(), 1);
    }
}
