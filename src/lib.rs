//! Audio buffer processing core.
//!
//! Decode user-supplied audio or video files into a [`SampleBuffer`], apply
//! sample-level transforms (reverse, speed change, gain, fades, trimming,
//! looping, merging) and re-encode to WAV or MP3 with progress reporting and
//! cancellation.
//!
//! ```text
//! bytes -> Decoder -> SampleBuffer -> [transform]* -> encode / ExportController -> bytes
//! ```

pub mod core;
pub mod decode;
pub mod encode;
pub mod export;
pub mod toolkit;
pub mod transform;

pub use crate::core::{
    BufferError, CancellationToken, Cancelled, ExportProgress, ProgressSender, SampleBuffer,
};
pub use decode::{DecodeError, DecodeHint, Decoder, PlatformDecoder, RecordingSource};
pub use encode::{BitDepth, EncodeError, ExportFormat, Mp3Bitrate, Mp3Options, WavOptions};
pub use export::{ExportController, ExportError, ExportState};
pub use toolkit::{AudioToolkit, ToolkitError};
pub use transform::{TransformChain, TransformError, TransformStep};
