// fc-core/src/units.rs

use std::time::Duration;

use uom::si::f64::Time as UomTime;

use crate::{FcError, FcResult};

// Public canonical unit types (SI, f64)
pub type Time = UomTime;

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn seconds(t: Time) -> f64 {
    use uom::si::time::second;
    t.get::<second>()
}

/// Reject NaN and infinities before they reach a timer.
pub fn ensure_finite(v: f64, what: &'static str) -> FcResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(FcError::NonFinite { what, value: v })
    }
}

/// Convert a requested suspension into a `Duration` for a `Sleeper`.
///
/// Negative values become a zero-length pause. Non-finite values and values
/// beyond what `Duration` can hold are rejected.
pub fn to_sleep_duration(t: Time, what: &'static str) -> FcResult<Duration> {
    let secs = ensure_finite(seconds(t), what)?;
    Duration::try_from_secs_f64(secs.max(0.0)).map_err(|e| FcError::InvalidArg {
        what: format!("{what} of {secs} s cannot be slept: {e}"),
    })
}
