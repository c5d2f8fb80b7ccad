//! Fixed-delay retry for flaky external operations.
//!
//! Used around yt-dlp runs and cover-art downloads.  No jitter and no
//! backoff: every attempt waits the same delay.

use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Bounded retry policy with a fixed delay between attempts.
pub struct Retry {
    name: String,
    max_attempts: u32,
    delay: Duration,
    sleep: fn(Duration),
}

impl Retry {
    /// Create a retry policy.
    ///
    /// * `name` — label for log messages (e.g. "yt-dlp", "cover art")
    /// * `max_attempts` — total number of attempts, clamped to at least 1
    /// * `delay` — pause between two attempts
    pub fn new(name: &str, max_attempts: u32, delay: Duration) -> Self {
        Retry {
            name: name.to_string(),
            max_attempts: max_attempts.max(1),
            delay,
            sleep: thread::sleep,
        }
    }

    /// Convenience: create a policy from a delay in seconds.
    pub fn from_secs(name: &str, max_attempts: u32, secs: u64) -> Self {
        Self::new(name, max_attempts, Duration::from_secs(secs))
    }

    /// Replace the sleep function (tests use a no-op).
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// On exhaustion the last error is returned inside
    /// [`Error::RetriesExhausted`].
    pub fn run<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(Error::RetriesExhausted {
                        attempts: self.max_attempts,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    log::warn!(
                        "[{}] attempt {}/{} failed: {}; retrying in {:.1}s",
                        self.name,
                        attempt,
                        self.max_attempts,
                        e,
                        self.delay.as_secs_f64()
                    );
                    (self.sleep)(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn no_sleep(_: Duration) {}

    #[test]
    fn test_succeeds_on_third_attempt() {
        let calls = Cell::new(0);
        let retry = Retry::from_secs("test", 3, 2).with_sleep(no_sleep);
        let result = retry.run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(Error::External("not yet".into()))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_exhausts_after_max_attempts() {
        let calls = Cell::new(0);
        let retry = Retry::from_secs("test", 3, 2).with_sleep(no_sleep);
        let result: Result<()> = retry.run(|| {
            calls.set(calls.get() + 1);
            Err(Error::External(format!("failure {}", calls.get())))
        });
        assert_eq!(calls.get(), 3);
        match result {
            Err(Error::RetriesExhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert_eq!(source.to_string(), "failure 3");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_zero_attempts_runs_once() {
        let calls = Cell::new(0);
        let retry = Retry::new("test", 0, Duration::ZERO);
        assert_eq!(retry.max_attempts(), 1);
        let _ = retry.run(|| -> Result<()> {
            calls.set(calls.get() + 1);
            Err(Error::External("nope".into()))
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_first_success_does_not_sleep() {
        fn panicking_sleep(_: Duration) {
            panic!("should not sleep");
        }
        let retry = Retry::from_secs("test", 3, 2).with_sleep(panicking_sleep);
        assert_eq!(retry.run(|| Ok("ok")).unwrap(), "ok");
    }
}
