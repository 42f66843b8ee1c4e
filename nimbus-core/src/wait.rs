//! Wait - Poll a remote object until it reaches a target state
//!
//! A [`StateChangeConf`] drives a [`StateRefresh`] implementation: it waits
//! `delay`, then refreshes with a growing interval until the refreshed state is
//! one of `target`, leaves `pending`, fails, or the timeout passes.

use std::fmt;
use std::time::Duration;

use log::debug;

use crate::clock::Clock;
use crate::provider::BoxFuture;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// First interval between refreshes before backoff kicks in
const INITIAL_WAIT: Duration = Duration::from_millis(100);
/// Upper bound for the doubling backoff
const MAX_WAIT: Duration = Duration::from_secs(10);

/// Source of the current state for a [`StateChangeConf`]
pub trait StateRefresh: Send {
    type State: Copy + PartialEq + fmt::Display + Send;

    fn refresh(&mut self) -> BoxFuture<'_, Result<Self::State, BoxError>>;
}

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error(
        "timeout while waiting for state to become '{}' (last state: '{}', timeout: {timeout:?})",
        expected.join(", "),
        last_state.as_deref().unwrap_or("")
    )]
    Timeout {
        last_state: Option<String>,
        expected: Vec<String>,
        timeout: Duration,
    },

    #[error("unexpected state '{state}', wanted target '{}'", expected.join(", "))]
    UnexpectedState { state: String, expected: Vec<String> },

    #[error("{0}")]
    Refresh(#[source] BoxError),
}

/// Configuration of a wait-for-state loop
#[derive(Debug, Clone)]
pub struct StateChangeConf<S> {
    pub pending: Vec<S>,
    pub target: Vec<S>,
    pub timeout: Duration,
    /// Wait before the first refresh
    pub delay: Duration,
    /// Smallest interval between two refreshes
    pub min_timeout: Duration,
    /// Fixed interval between refreshes, replaces the backoff when set
    pub poll_interval: Option<Duration>,
}

impl<S: Copy + PartialEq + fmt::Display + Send> StateChangeConf<S> {
    pub fn new(pending: Vec<S>, target: Vec<S>, timeout: Duration) -> Self {
        Self {
            pending,
            target,
            timeout,
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = Some(poll_interval);
        self
    }

    fn expected(&self) -> Vec<String> {
        self.target.iter().map(|s| s.to_string()).collect()
    }

    fn next_wait(&self, previous: Duration) -> Duration {
        if let Some(interval) = self.poll_interval {
            return interval;
        }
        let wait = if previous.is_zero() {
            INITIAL_WAIT
        } else {
            (previous * 2).min(MAX_WAIT)
        };
        wait.max(self.min_timeout)
    }

    /// Sleep for `duration` without running past the deadline.
    /// Returns false once the deadline has been reached.
    async fn sleep_within(&self, clock: &dyn Clock, start: Duration, duration: Duration) -> bool {
        let elapsed = clock.now().saturating_sub(start);
        let remaining = self.timeout.saturating_sub(elapsed);
        let step = duration.min(remaining);
        if !step.is_zero() {
            clock.sleep(step).await;
        }
        clock.now().saturating_sub(start) < self.timeout
    }

    /// Run the loop, returning the target state that was reached
    pub async fn wait_for_state<R>(
        &self,
        refresh: &mut R,
        clock: &dyn Clock,
    ) -> Result<S, WaitError>
    where
        R: StateRefresh<State = S>,
    {
        let start = clock.now();
        let mut last_state: Option<S> = None;
        let mut wait = Duration::ZERO;

        let timed_out = |last: Option<S>| WaitError::Timeout {
            last_state: last.map(|s| s.to_string()),
            expected: self.expected(),
            timeout: self.timeout,
        };

        debug!("Waiting {:?} before refreshing state", self.delay);
        if !self.sleep_within(clock, start, self.delay).await {
            return Err(timed_out(last_state));
        }

        let mut polls = 0u32;
        loop {
            if polls > 0 {
                wait = self.next_wait(wait);
                debug!("Waiting {:?} before next try", wait);
                if !self.sleep_within(clock, start, wait).await {
                    return Err(timed_out(last_state));
                }
            }
            polls += 1;

            let state = refresh.refresh().await.map_err(WaitError::Refresh)?;
            debug!("Refresh #{} returned state {}", polls, state);
            last_state = Some(state);

            if self.target.contains(&state) {
                return Ok(state);
            }
            if !self.pending.contains(&state) {
                return Err(WaitError::UnexpectedState {
                    state: state.to_string(),
                    expected: self.expected(),
                });
            }
        }
    }
}
