/*!
    Effective capture duration.
*/

use std::time::Duration;

use crate::error::CaptureError;

/// The muxing boundary overshoots the wall-clock bound by about this much,
/// so it is taken off the requested duration up front.
pub const OVERSHOOT: Duration = Duration::from_secs(1);

/**
    Validate a requested capture length in seconds.
*/
pub fn requested_duration(seconds: i64) -> Result<Duration, CaptureError> {
    if seconds <= 0 {
        return Err(CaptureError::config(format!(
            "capture duration must be positive, got {seconds}s"
        )));
    }
    Ok(Duration::from_secs(seconds.unsigned_abs()))
}

/**
    Wall-clock bound for the read loop.

    The requested duration less [`OVERSHOOT`], further capped by the input's
    advertised duration when it has one. Live sources advertise none and are
    bounded by the request alone.
*/
pub fn effective_duration(requested: Duration, advertised: Option<Duration>) -> Duration {
    let bound = requested.saturating_sub(OVERSHOOT);
    match advertised {
        Some(advertised) => bound.min(advertised),
        None => bound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn non_positive_requests_are_rejected() {
        assert!(matches!(requested_duration(0), Err(CaptureError::Config(_))));
        assert!(matches!(requested_duration(-5), Err(CaptureError::Config(_))));
        assert_eq!(requested_duration(5).unwrap(), secs(5));
    }

    #[test]
    fn overshoot_is_subtracted() {
        assert_eq!(effective_duration(secs(5), None), secs(4));
        assert_eq!(effective_duration(secs(5), Some(secs(10))), secs(4));
    }

    #[test]
    fn shorter_inputs_win() {
        assert_eq!(effective_duration(secs(5), Some(secs(2))), secs(2));
        assert_eq!(
            effective_duration(secs(60), Some(Duration::from_millis(2500))),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn one_second_requests_capture_nothing() {
        assert_eq!(effective_duration(secs(1), None), Duration::ZERO);
    }
}
