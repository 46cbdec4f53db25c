//! Level measurement and gain.

use crate::core::constants::DEFAULT_NORMALIZE_DB;
use crate::core::SampleBuffer;

/// Convert decibels to a linear factor
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

#[inline]
fn linear_to_db(linear: f64) -> f64 {
    if linear == 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Apply `gain_db` to every sample, clamping the result to [-1.0, 1.0]
pub fn adjust_volume(buffer: &SampleBuffer, gain_db: f64) -> SampleBuffer {
    let gain = db_to_linear(gain_db) as f32;
    buffer.map_channels(|channel| {
        channel
            .iter()
            .map(|s| (s * gain).clamp(-1.0, 1.0))
            .collect()
    })
}

/// Peak level in dBFS; negative infinity for silence
pub fn peak_level_db(buffer: &SampleBuffer) -> f64 {
    let peak = buffer
        .channels()
        .flat_map(|c| c.iter())
        .fold(0.0f32, |peak, s| peak.max(s.abs()));
    linear_to_db(peak as f64)
}

/// RMS level in dBFS over all channels; negative infinity for silence
pub fn rms_level_db(buffer: &SampleBuffer) -> f64 {
    let total = buffer.length() * buffer.number_of_channels();
    if total == 0 {
        return f64::NEG_INFINITY;
    }
    let sum_squares: f64 = buffer
        .channels()
        .flat_map(|c| c.iter())
        .map(|s| (*s as f64) * (*s as f64))
        .sum();
    linear_to_db((sum_squares / total as f64).sqrt())
}

/// Largest gain (dB) that keeps the peak at or below full scale
pub fn max_gain_without_clipping(buffer: &SampleBuffer) -> f64 {
    -peak_level_db(buffer)
}

/// Scale so the peak lands on `target_db` (use [`DEFAULT_NORMALIZE_DB`] when unsure).
/// Silent buffers are returned unchanged.
pub fn normalize(buffer: &SampleBuffer, target_db: f64) -> SampleBuffer {
    let peak_db = peak_level_db(buffer);
    if !peak_db.is_finite() {
        return buffer.clone();
    }
    adjust_volume(buffer, target_db - peak_db)
}

/// Normalize to the default target
pub fn normalize_default(buffer: &SampleBuffer) -> SampleBuffer {
    normalize(buffer, DEFAULT_NORMALIZE_DB)
}
