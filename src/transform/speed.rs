//! Speed change by resampling.
//!
//! The output is played back at the original sample rate, so pitch and
//! duration change together. Linear interpolation between neighbouring input
//! samples.

use crate::core::SampleBuffer;
use crate::transform::TransformError;

/// Change playback speed by `factor` (> 1.0 faster and higher, < 1.0 slower and lower).
///
/// Output length is `round(length / factor)`. A factor of exactly 1.0 returns
/// the input unchanged.
pub fn change_speed(buffer: &SampleBuffer, factor: f64) -> Result<SampleBuffer, TransformError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(TransformError::InvalidSpeed(factor));
    }
    if factor == 1.0 {
        return Ok(buffer.clone());
    }

    let output_length = (buffer.length() as f64 / factor).round() as usize;
    Ok(buffer.map_channels(|input| resample_linear(input, factor, output_length)))
}

fn resample_linear(input: &[f32], step: f64, output_length: usize) -> Vec<f32> {
    let Some(last) = input.len().checked_sub(1) else {
        return vec![0.0; output_length];
    };

    (0..output_length)
        .map(|i| {
            let position = i as f64 * step;
            let index = (position.floor() as usize).min(last);
            let next = (index + 1).min(last);
            let fraction = (position - index as f64).clamp(0.0, 1.0) as f32;
            input[index] * (1.0 - fraction) + input[next] * fraction
        })
        .collect()
}
