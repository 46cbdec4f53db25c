//! Product-level constants shared by the decoder, transforms and encoders.

/// Common sample rates
pub const SAMPLE_RATE_LOW: u32 = 22_050;
pub const SAMPLE_RATE_STANDARD: u32 = 44_100;
pub const SAMPLE_RATE_HIGH: u32 = 48_000;

/// Speed change limits offered to users. The resampler accepts any positive factor.
pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 4.0;
pub const DEFAULT_SPEED: f64 = 1.0;

/// Volume limits (dB)
pub const MIN_VOLUME_DB: f64 = -60.0;
pub const MAX_VOLUME_DB: f64 = 20.0;

/// Default normalization target (dBFS)
pub const DEFAULT_NORMALIZE_DB: f64 = -0.3;

/// Fade limits (seconds)
pub const DEFAULT_FADE_SECONDS: f64 = 2.0;
pub const MIN_FADE_SECONDS: f64 = 0.1;
pub const MAX_FADE_SECONDS: f64 = 30.0;

/// Upper bound on loop repetitions
pub const MAX_LOOP_COUNT: u32 = 100;

/// Samples per channel in one MPEG-1 Layer III frame
pub const MP3_FRAME_SAMPLES: usize = 1152;

/// MP3 frames encoded between two progress/cancellation checkpoints
pub const MP3_FRAMES_PER_CHUNK: usize = 32;

/// Inputs above this size are logged as large; they are still decoded.
pub const LARGE_INPUT_BYTES: usize = 100 * 1024 * 1024;

/// Clamp a user-supplied speed factor into the offered range.
pub fn clamp_speed(factor: f64) -> f64 {
    if factor.is_nan() {
        return DEFAULT_SPEED;
    }
    factor.clamp(MIN_SPEED, MAX_SPEED)
}

/// Clamp a user-supplied gain into the offered range.
pub fn clamp_volume_db(gain_db: f64) -> f64 {
    if gain_db.is_nan() {
        return 0.0;
    }
    gain_db.clamp(MIN_VOLUME_DB, MAX_VOLUME_DB)
}

/// Clamp a user-supplied fade length into the offered range.
pub fn clamp_fade_seconds(seconds: f64) -> f64 {
    if seconds.is_nan() {
        return DEFAULT_FADE_SECONDS;
    }
    seconds.clamp(MIN_FADE_SECONDS, MAX_FADE_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_speed() {
        assert_eq!(clamp_speed(0.1), MIN_SPEED);
        assert_eq!(clamp_speed(10.0), MAX_SPEED);
        assert_eq!(clamp_speed(1.5), 1.5);
        assert_eq!(clamp_speed(f64::NAN), DEFAULT_SPEED);
    }

    #[test]
    fn test_clamp_volume() {
        assert_eq!(clamp_volume_db(-100.0), MIN_VOLUME_DB);
        assert_eq!(clamp_volume_db(30.0), MAX_VOLUME_DB);
        assert_eq!(clamp_volume_db(-6.0), -6.0);
    }

    #[test]
    fn test_clamp_fade() {
        assert_eq!(clamp_fade_seconds(0.0), MIN_FADE_SECONDS);
        assert_eq!(clamp_fade_seconds(60.0), MAX_FADE_SECONDS);
        assert_eq!(clamp_fade_seconds(f64::NAN), DEFAULT_FADE_SECONDS);
    }
}
