//! Pure transforms over `SampleBuffer`.
//!
//! Every function takes a buffer by reference and returns a new one; the
//! input is never modified.

pub mod chain;
pub mod edit;
pub mod gain;
pub mod reverse;
pub mod speed;

use crate::core::BufferError;

pub use chain::{TransformChain, TransformStep};
pub use edit::{fade_in, fade_out, loop_audio, merge, trim};
pub use gain::{
    adjust_volume, db_to_linear, max_gain_without_clipping, normalize, normalize_default,
    peak_level_db, rms_level_db,
};
pub use reverse::reverse;
pub use speed::change_speed;

/// Error type for transform operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    #[error("Speed factor must be a positive finite number, got {0}")]
    InvalidSpeed(f64),
    #[error("Invalid time range {start}s..{end}s")]
    InvalidRange { start: f64, end: f64 },
    #[error("No buffers to merge")]
    NoBuffers,
    #[error("Sample rate mismatch: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
}
