//! Encoding a `SampleBuffer` into WAV or MP3 bytes.

pub mod format;
pub mod frame;
pub mod mp3;
pub mod wav;

use tracing::info;

use crate::core::progress::ProgressSender;
use crate::core::{CancellationToken, Cancelled, SampleBuffer};

pub use format::{BitDepth, ExportFormat, Mp3Bitrate, Mp3Options, WavOptions};
pub use frame::FrameHeader;
pub use mp3::{FrameCodec, LameCodec, Mp3Encoder};
pub use wav::WavHeader;

/// Error type for encoding operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Codec error: {0}")]
    Codec(String),
    #[error("Allocation failed: {0}")]
    Allocation(String),
    #[error("Encoding cancelled")]
    Cancelled,
}

impl EncodeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EncodeError::Cancelled)
    }
}

impl From<Cancelled> for EncodeError {
    fn from(_: Cancelled) -> Self {
        EncodeError::Cancelled
    }
}

/// Encode `buffer` in the requested format.
///
/// WAV is a single synchronous pass and sends no progress. MP3 is chunked and
/// reports progress below 1.0 through `progress`.
pub fn encode(
    buffer: &SampleBuffer,
    format: ExportFormat,
    cancel: &CancellationToken,
    progress: Option<&ProgressSender>,
) -> Result<Vec<u8>, EncodeError> {
    cancel.check()?;
    let bytes = match format {
        ExportFormat::Wav(bit_depth) => wav::encode(buffer, bit_depth)?,
        ExportFormat::Mp3(bitrate) => {
            let options = Mp3Options {
                bitrate,
                ..Default::default()
            };
            Mp3Encoder::encode(buffer, &options, cancel, progress)?
        }
    };
    info!(
        %format,
        frames = buffer.length(),
        bytes = bytes.len(),
        "Encoded audio"
    );
    Ok(bytes)
}
