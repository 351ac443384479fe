use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::ApiError;

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), ApiError> {
        if self.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        Ok(())
    }
}

/// Blocking waits used for rate-limit backoff and write verification.
pub trait Clock: Send + Sync {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), ApiError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), ApiError> {
        let deadline = Instant::now() + duration;
        loop {
            cancel.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

/// Records requested sleeps without waiting.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingClock {
    slept: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl RecordingClock {
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.slept.lock().expect("clock lock").clone()
    }

    pub(crate) fn total(&self) -> Duration {
        self.sleeps().into_iter().sum()
    }
}

#[cfg(test)]
impl Clock for RecordingClock {
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> Result<(), ApiError> {
        cancel.check()?;
        self.slept.lock().expect("clock lock").push(duration);
        Ok(())
    }
}
