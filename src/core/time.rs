//! Time and sample-position conversions.
//! Durations are carried either as seconds (f64) or as nanoseconds (i64);
//! sample positions are always per-channel frame indices.

/// Time in nanoseconds
pub type Time = i64;

/// Time constants for conversions
pub mod constants {
    use super::Time;

    pub const NANOS_PER_SECOND: Time = 1_000_000_000;
    pub const NANOS_PER_MILLI: Time = 1_000_000;
}

/// Convert seconds (f64) to nanoseconds (i64)
#[inline]
pub fn from_seconds(seconds: f64) -> Time {
    (seconds * constants::NANOS_PER_SECOND as f64) as Time
}

/// Convert nanoseconds (i64) to seconds (f64)
#[inline]
pub fn to_seconds(nanos: Time) -> f64 {
    nanos as f64 / constants::NANOS_PER_SECOND as f64
}

/// Convert nanoseconds to milliseconds
#[inline]
pub fn to_millis(nanos: Time) -> i64 {
    nanos / constants::NANOS_PER_MILLI
}

/// Sample index at `seconds` for the given rate (floored, never negative)
#[inline]
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).floor() as usize
}

/// Seconds spanned by `samples` frames at the given rate
#[inline]
pub fn samples_to_seconds(samples: usize, sample_rate: u32) -> f64 {
    samples as f64 / sample_rate as f64
}

/// Nanoseconds spanned by `samples` frames at the given rate
#[inline]
pub fn samples_to_time(samples: usize, sample_rate: u32) -> Time {
    from_seconds(samples_to_seconds(samples, sample_rate))
}

/// Format time as HH:MM:SS.mmm
pub fn format_time(nanos: Time) -> String {
    let total_seconds = to_seconds(nanos);
    let hours = (total_seconds / 3600.0).floor() as i64;
    let minutes = ((total_seconds % 3600.0) / 60.0).floor() as i64;
    let seconds = (total_seconds % 60.0).floor() as i64;
    let millis = to_millis(nanos) % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
