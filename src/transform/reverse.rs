//! Time reversal.

use crate::core::SampleBuffer;

/// Reverse every channel: output sample `i` is input sample `length - 1 - i`.
pub fn reverse(buffer: &SampleBuffer) -> SampleBuffer {
    buffer.map_channels(|channel| channel.iter().rev().copied().collect())
}
