//! Polling until a remote object reaches a target state.
//!
//! XO is eventually consistent: an object created or changed by one call may
//! not be visible to the next. [`StateWait`] re-fetches an object on a
//! schedule and inspects one observable field until it lands in a target
//! state. A missing object reports [`ABSENT`], so the same loop waits for
//! objects to appear or disappear.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::trace;

use crate::error::{ClientError, ClientResult};

/// Pseudo-state of an object that does not exist.
pub const ABSENT: &str = "absent";

/// Pseudo-state of an object that exists, for appear/disappear waits.
pub const PRESENT: &str = "present";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Delay between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSchedule {
    /// Constant delay.
    Fixed(Duration),
    /// Doubling delay, capped at `max`.
    Exponential {
        /// Delay after the first poll.
        initial: Duration,
        /// Upper bound.
        max: Duration,
    },
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::Exponential {
            initial: Duration::from_millis(200),
            max: Duration::from_secs(5),
        }
    }
}

impl PollSchedule {
    /// Delay after poll number `poll` (1-based).
    #[must_use]
    pub fn delay(&self, poll: u32) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Exponential { initial, max } => {
                let factor = 1_u32.checked_shl(poll.saturating_sub(1)).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }
}

/// A polling state machine over pending and target state sets.
#[derive(Debug, Clone)]
pub struct StateWait {
    pending: Vec<String>,
    target: Vec<String>,
    schedule: PollSchedule,
    timeout: Duration,
}

impl StateWait {
    /// Wait until the observed state is one of `target`, tolerating `pending`.
    #[must_use]
    pub fn new(pending: &[&str], target: &[&str]) -> Self {
        Self {
            pending: pending.iter().map(ToString::to_string).collect(),
            target: target.iter().map(ToString::to_string).collect(),
            schedule: PollSchedule::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Wait for an object to become visible.
    #[must_use]
    pub fn appear() -> Self {
        Self::new(&[ABSENT], &[PRESENT])
    }

    /// Wait for an object to be gone.
    #[must_use]
    pub fn disappear() -> Self {
        Self::new(&[PRESENT], &[ABSENT])
    }

    /// Set the poll schedule.
    #[must_use]
    pub const fn schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Set the overall deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn target_list(&self) -> String {
        self.target.join(", ")
    }

    /// Poll until a target state is observed.
    ///
    /// `refresh` fetches the object (`None` when it does not exist) and
    /// `state_of` reads the observable field. Returns the object from the
    /// final poll, `None` when the target was [`ABSENT`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnexpectedState`] for a state outside both
    /// sets, [`ClientError::Timeout`] when the deadline passes, or the
    /// refresh error as soon as one occurs.
    pub async fn run<T, F, Fut, S>(&self, mut refresh: F, state_of: S) -> ClientResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<Option<T>>>,
        S: Fn(&T) -> String,
    {
        let started = Instant::now();
        let mut last_state: Option<String> = None;

        let polling = async {
            let mut poll = 0;
            loop {
                poll += 1;
                let observed = refresh().await?;
                let state = observed
                    .as_ref()
                    .map_or_else(|| ABSENT.to_string(), &state_of);
                trace!(poll, state = %state, "polled object state");

                if self.target.contains(&state) {
                    return Ok::<_, ClientError>(observed);
                }
                if !self.pending.contains(&state) {
                    return Err(ClientError::UnexpectedState {
                        state,
                        target: self.target_list(),
                    });
                }

                last_state = Some(state);
                sleep(self.schedule.delay(poll)).await;
            }
        };

        let outcome = tokio::time::timeout(self.timeout, polling).await;
        outcome.unwrap_or_else(|_| {
            Err(ClientError::Timeout {
                waited: started.elapsed(),
                target: self.target_list(),
                last_state: last_state.unwrap_or_else(|| "none".to_string()),
            })
        })
    }
}
