use std::time::Duration;

use tracing::{debug, warn};

use super::clock::{CancelToken, Clock};
use super::ApiError;

/// Time given to the desktop app to finish a write it reported as timed out.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Runs `write`. When it fails with the local "Response timeout" error, waits
/// [`SETTLE_DELAY`] and runs `verify`; a `Some` answer means the write landed
/// and is returned as the result. Any other outcome surfaces the original
/// timeout error.
pub fn with_timeout_verification<T>(
    clock: &dyn Clock,
    cancel: &CancelToken,
    operation: &str,
    write: impl FnOnce() -> Result<T, ApiError>,
    verify: impl FnOnce() -> Result<Option<T>, ApiError>,
) -> Result<T, ApiError> {
    match write() {
        Err(err) if err.is_response_timeout() => {
            warn!(operation, "local API timed out; checking whether the write landed");
            clock.sleep(SETTLE_DELAY, cancel)?;
            match verify() {
                Ok(Some(value)) => {
                    debug!(operation, "write confirmed after timeout");
                    Ok(value)
                }
                Ok(None) => Err(err),
                Err(verify_err) => {
                    debug!(operation, error = %verify_err, "verification query failed");
                    Err(err)
                }
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::with_timeout_verification;
    use crate::api::clock::{CancelToken, RecordingClock};
    use crate::api::ApiError;

    fn timeout() -> ApiError {
        ApiError::LocalApi("Response timeout".to_string())
    }

    #[test]
    fn success_skips_verification() {
        let clock = RecordingClock::default();
        let verified = Cell::new(false);
        let result = with_timeout_verification(
            &clock,
            &CancelToken::new(),
            "create block",
            || Ok(7),
            || {
                verified.set(true);
                Ok(Some(0))
            },
        );
        assert_eq!(result.expect("write should succeed"), 7);
        assert!(!verified.get());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn confirmed_timeout_counts_as_success_after_settling() {
        let clock = RecordingClock::default();
        let result = with_timeout_verification(
            &clock,
            &CancelToken::new(),
            "create block",
            || Err(timeout()),
            || Ok(Some("uid-1".to_string())),
        );
        assert_eq!(result.expect("verified write"), "uid-1");
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500)]);
    }

    #[test]
    fn unconfirmed_or_failed_verification_keeps_the_timeout() {
        let clock = RecordingClock::default();
        let missing = with_timeout_verification::<()>(
            &clock,
            &CancelToken::new(),
            "update block",
            || Err(timeout()),
            || Ok(None),
        )
        .expect_err("unverified write should fail");
        assert!(missing.is_response_timeout());

        let broken = with_timeout_verification::<()>(
            &clock,
            &CancelToken::new(),
            "update block",
            || Err(timeout()),
            || Err(ApiError::LocalApi("query failed".to_string())),
        )
        .expect_err("failed verification should fail");
        assert!(broken.is_response_timeout());
    }

    #[test]
    fn other_errors_are_not_verified() {
        let clock = RecordingClock::default();
        let err = with_timeout_verification::<()>(
            &clock,
            &CancelToken::new(),
            "move block",
            || Err(ApiError::LocalApi("Block not found".to_string())),
            || panic!("verification must not run"),
        )
        .expect_err("plain error should surface");
        assert_eq!(err.to_string(), "Block not found");
        assert!(clock.sleeps().is_empty());
    }
}
