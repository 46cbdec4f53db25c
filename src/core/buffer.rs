//! In-memory decoded audio.
//! Samples are planar `f32` (one `Vec` per channel), nominally in [-1.0, 1.0].

use std::sync::Arc;

use crate::core::time::{self, Time};

/// Error type for buffer construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("Sample rate must be greater than zero")]
    ZeroSampleRate,
    #[error("Buffer must have at least one channel")]
    NoChannels,
    #[error("Channel {channel} has {found} samples, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        expected: usize,
        found: usize,
    },
    #[error("Interleaved data of {len} samples is not divisible by {channels} channels")]
    InterleavedLength { len: usize, channels: usize },
}

/// Immutable multi-channel sample buffer.
///
/// Every channel holds the same number of samples. Cloning is cheap: channel
/// storage is shared, and no API hands out mutable access to it, so transforms
/// always build a new buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Arc<[Vec<f32>]>,
    length: usize,
}

impl SampleBuffer {
    /// Create a buffer from planar channel data
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        let Some(first) = channels.first() else {
            return Err(BufferError::NoChannels);
        };

        let length = first.len();
        if let Some((channel, data)) = channels
            .iter()
            .enumerate()
            .find(|(_, data)| data.len() != length)
        {
            return Err(BufferError::ChannelLengthMismatch {
                channel,
                expected: length,
                found: data.len(),
            });
        }

        Ok(Self {
            sample_rate,
            channels: channels.into(),
            length,
        })
    }

    /// Create a buffer from interleaved samples (L, R, L, R, ...)
    pub fn from_interleaved(
        sample_rate: u32,
        channel_count: usize,
        samples: &[f32],
    ) -> Result<Self, BufferError> {
        if channel_count == 0 {
            return Err(BufferError::NoChannels);
        }
        if samples.len() % channel_count != 0 {
            return Err(BufferError::InterleavedLength {
                len: samples.len(),
                channels: channel_count,
            });
        }

        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        Self::new(sample_rate, channels)
    }

    /// Create a buffer of digital silence
    pub fn silence(
        sample_rate: u32,
        channel_count: usize,
        length: usize,
    ) -> Result<Self, BufferError> {
        Self::new(sample_rate, vec![vec![0.0; length]; channel_count])
    }

    /// Samples per second
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels (always >= 1)
    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        time::samples_to_seconds(self.length, self.sample_rate)
    }

    /// Duration in nanoseconds
    pub fn duration_time(&self) -> Time {
        time::samples_to_time(self.length, self.sample_rate)
    }

    /// Samples of one channel. Panics if `index` is out of range, like slice indexing.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Iterate over all channels in order
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Number of frames covering `seconds` at this buffer's rate, capped at the length
    pub fn frame_count_for(&self, seconds: f64) -> usize {
        time::seconds_to_samples(seconds, self.sample_rate).min(self.length)
    }

    /// Interleave all channels into a single vector (L, R, L, R, ...)
    pub fn interleaved(&self) -> Vec<f32> {
        let channel_count = self.number_of_channels();
        let mut out = Vec::with_capacity(self.length * channel_count);
        for i in 0..self.length {
            for channel in self.channels.iter() {
                out.push(channel[i]);
            }
        }
        out
    }

    /// Whether both buffers share the same channel storage
    pub fn shares_storage_with(&self, other: &SampleBuffer) -> bool {
        Arc::ptr_eq(&self.channels, &other.channels)
    }

    /// Map every channel through `f`, keeping the sample rate.
    pub(crate) fn map_channels<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&[f32]) -> Vec<f32>,
    {
        let channels: Vec<Vec<f32>> = self.channels().map(|c| f(c)).collect();
        let length = channels.first().map_or(0, Vec::len);
        Self {
            sample_rate: self.sample_rate,
            channels: channels.into(),
            length,
        }
    }
}
