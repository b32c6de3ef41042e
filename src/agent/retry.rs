use crate::errors::{AttemptFailure, TranslateError};

/// Attempt counter and last failure of one pair's translation loop.
#[derive(Debug)]
pub struct RetryState {
    max_attempts: u32,
    attempt: u32,
    last_failure: Option<AttemptFailure>,
}

impl RetryState {
    /// `retries` extra attempts after the first.
    pub fn new(retries: u32) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            attempt: 0,
            last_failure: None,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Start the next attempt and return its 1-based number.
    pub fn begin(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Message of the previous failure, handed to the next attempt.
    pub fn feedback(&self) -> Option<String> {
        self.last_failure.as_ref().map(ToString::to_string)
    }

    /// Record a failed attempt. Returns the terminal error once the budget is spent.
    pub fn fail(&mut self, failure: AttemptFailure) -> Option<TranslateError> {
        if self.attempt >= self.max_attempts {
            self.last_failure = None;
            return Some(TranslateError::Exhausted {
                attempts: self.attempt,
                last: failure,
            });
        }
        self.last_failure = Some(failure);
        None
    }
}
