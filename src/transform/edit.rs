//! Editing transforms: trim, fades, looping and sequential merge.

use crate::core::constants::MAX_LOOP_COUNT;
use crate::core::{time, SampleBuffer};
use crate::transform::TransformError;

/// Keep the samples between `start` and `end` seconds
pub fn trim(buffer: &SampleBuffer, start: f64, end: f64) -> Result<SampleBuffer, TransformError> {
    let first = time::seconds_to_samples(start, buffer.sample_rate());
    let last = buffer.frame_count_for(end);
    if last <= first {
        return Err(TransformError::InvalidRange { start, end });
    }
    Ok(buffer.map_channels(|channel| channel[first..last].to_vec()))
}

/// Linear fade from silence over the first `seconds`
pub fn fade_in(buffer: &SampleBuffer, seconds: f64) -> SampleBuffer {
    let fade = buffer.frame_count_for(seconds);
    if fade == 0 {
        return buffer.clone();
    }
    buffer.map_channels(|channel| {
        channel
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if i < fade {
                    s * (i as f32 / fade as f32)
                } else {
                    *s
                }
            })
            .collect()
    })
}

/// Linear fade to silence over the last `seconds`
pub fn fade_out(buffer: &SampleBuffer, seconds: f64) -> SampleBuffer {
    let fade = buffer.frame_count_for(seconds);
    if fade == 0 {
        return buffer.clone();
    }
    let length = buffer.length();
    let fade_start = length - fade;
    buffer.map_channels(|channel| {
        channel
            .iter()
            .enumerate()
            .map(|(i, s)| {
                if i >= fade_start {
                    s * ((length - i) as f32 / fade as f32)
                } else {
                    *s
                }
            })
            .collect()
    })
}

/// Repeat the buffer `count` times (clamped to 1..=100).
///
/// With a crossfade, each repetition starts `crossfade` seconds before the
/// previous one ends and the overlap is blended linearly.
pub fn loop_audio(buffer: &SampleBuffer, count: u32, crossfade: f64) -> SampleBuffer {
    let count = count.clamp(1, MAX_LOOP_COUNT) as usize;
    let length = buffer.length();
    let mut overlap = buffer.frame_count_for(crossfade);
    if overlap >= length {
        overlap = 0;
    }
    let stride = length - overlap;
    let total = stride * count + overlap;

    buffer.map_channels(|input| {
        let mut out = vec![0.0f32; total];
        for repetition in 0..count {
            let offset = repetition * stride;
            for (i, sample) in input.iter().enumerate() {
                let slot = &mut out[offset + i];
                if repetition > 0 && i < overlap {
                    let weight = i as f32 / overlap as f32;
                    *slot = *slot * (1.0 - weight) + sample * weight;
                } else {
                    *slot = *sample;
                }
            }
        }
        out
    })
}

/// Concatenate buffers end to end, optionally overlapping neighbours by `crossfade` seconds.
///
/// All inputs must share a sample rate. The output has as many channels as the
/// widest input; narrower inputs feed their first channel into the missing ones.
pub fn merge(buffers: &[SampleBuffer], crossfade: f64) -> Result<SampleBuffer, TransformError> {
    let (first, rest) = buffers.split_first().ok_or(TransformError::NoBuffers)?;
    if rest.is_empty() {
        return Ok(first.clone());
    }

    let sample_rate = first.sample_rate();
    if let Some(other) = rest.iter().find(|b| b.sample_rate() != sample_rate) {
        return Err(TransformError::SampleRateMismatch {
            expected: sample_rate,
            found: other.sample_rate(),
        });
    }

    let channel_count = buffers
        .iter()
        .map(SampleBuffer::number_of_channels)
        .max()
        .unwrap_or(1);
    let shortest = buffers.iter().map(SampleBuffer::length).min().unwrap_or(0);
    let overlap = time::seconds_to_samples(crossfade, sample_rate).min(shortest);
    let total = buffers.iter().map(SampleBuffer::length).sum::<usize>() - overlap * rest.len();

    let mut out = vec![vec![0.0f32; total]; channel_count];
    let last_index = buffers.len() - 1;
    let mut offset = 0;

    for (index, buffer) in buffers.iter().enumerate() {
        let length = buffer.length();
        for (channel, target) in out.iter_mut().enumerate() {
            let source = if channel < buffer.number_of_channels() {
                buffer.channel(channel)
            } else {
                buffer.channel(0)
            };

            for (i, sample) in source.iter().enumerate() {
                let mut sample = *sample;
                if overlap > 0 && index > 0 && i < overlap {
                    sample *= i as f32 / overlap as f32;
                }
                if overlap > 0 && index < last_index && i >= length - overlap {
                    sample *= (length - i) as f32 / overlap as f32;
                }
                target[offset + i] += sample;
            }
        }
        offset += length - overlap;
    }

    Ok(SampleBuffer::new(sample_rate, out)?)
}
