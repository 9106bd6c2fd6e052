//! Retry policy for single synthesis calls.

use tracing::warn;

use crate::error::Result;

/// Bounded retry wrapping one provider call. Only transient provider errors
/// are retried; input and voice-mismatch errors propagate immediately. No
/// delay between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { max_attempts: 5 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn run<T>(&self, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(attempt, max_attempts = self.max_attempts, %err, "retrying synthesis");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = RetryPolicy::default().run(|| {
            calls += 1;
            if calls < 3 {
                Err(Error::provider("google", "503"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn gives_up_after_budget() {
        let mut calls = 0;
        let result: Result<()> = RetryPolicy::new(5).run(|| {
            calls += 1;
            Err(Error::provider("google", "503"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 5);
    }

    #[test]
    fn fatal_errors_are_not_retried() {
        let mut calls = 0;
        let result: Result<()> = RetryPolicy::default().run(|| {
            calls += 1;
            Err(Error::VoiceMismatch { expected: "google" })
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
