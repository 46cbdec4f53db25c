//! Core types shared by every stage of the pipeline.
//!
//! The sample buffer, time conversions, product constants, cancellation and
//! progress reporting live here; decoding, transforming and encoding build on them.

pub mod buffer;
pub mod cancel;
pub mod constants;
pub mod progress;
pub mod time;

// Re-export core data structures for easier access.
pub use buffer::{BufferError, SampleBuffer};
pub use cancel::{CancellationToken, Cancelled};
pub use progress::{ExportProgress, ProgressSender};
pub use time::Time;
