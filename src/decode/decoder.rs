//! Bytes → `SampleBuffer`.
//!
//! Container and codec parsing is delegated to [`PlatformDecoder`] backends.
//! The [`Decoder`] tries its backends in order, validates what they produce
//! and normalizes every failure into [`DecodeError`].

use tracing::{debug, info, warn};

use crate::core::cancel::{CancellationToken, Cancelled};
use crate::core::constants::LARGE_INPUT_BYTES;
use crate::core::progress::{self, ExportProgress, ProgressSender};
use crate::core::SampleBuffer;
use crate::decode::recording::RecordingSource;
use crate::decode::symphonia_backend::SymphoniaBackend;
use crate::decode::wav::WavPcmBackend;

/// Error type for decoding operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Input is empty")]
    Empty,
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Corrupted file: {0}")]
    Corrupted(String),
    #[error("No audio track found")]
    NoAudioTrack,
    #[error("Decoding cancelled")]
    Cancelled,
}

impl DecodeError {
    /// Human-readable category for display
    pub fn category(&self) -> &'static str {
        match self {
            DecodeError::UnsupportedFormat(_) | DecodeError::NoAudioTrack => "unsupported format",
            DecodeError::Empty | DecodeError::Corrupted(_) => "corrupted file",
            DecodeError::Cancelled => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DecodeError::Cancelled)
    }

    /// Message suitable for showing to end users
    pub fn user_message(&self) -> &'static str {
        match self {
            DecodeError::Cancelled => "Loading was cancelled.",
            _ => "Failed to decode audio file. The file may be corrupted or in an unsupported format.",
        }
    }
}

impl From<Cancelled> for DecodeError {
    fn from(_: Cancelled) -> Self {
        DecodeError::Cancelled
    }
}

/// Optional hints about the input container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeHint {
    pub extension: Option<String>,
    pub mime_type: Option<String>,
}

impl DecodeHint {
    pub fn none() -> Self {
        Self::default()
    }

    /// Hint from a file name such as `take_01.M4A`
    pub fn from_file_name(name: &str) -> Self {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .filter(|ext| !ext.is_empty());
        Self {
            extension,
            mime_type: None,
        }
    }

    /// Hint from a MIME type such as `audio/webm;codecs=opus`
    pub fn from_mime_type(mime_type: &str) -> Self {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let extension = match essence.as_str() {
            "audio/webm" | "video/webm" => Some("webm"),
            "audio/ogg" | "application/ogg" => Some("ogg"),
            "audio/mp4" | "audio/x-m4a" | "audio/aac" => Some("m4a"),
            "video/mp4" | "video/quicktime" => Some("mp4"),
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some("wav"),
            "audio/mpeg" | "audio/mp3" => Some("mp3"),
            "audio/flac" | "audio/x-flac" => Some("flac"),
            _ => None,
        };

        Self {
            extension: extension.map(str::to_string),
            mime_type: (!essence.is_empty()).then_some(essence),
        }
    }
}

/// Raw decoder output: sample rate plus planar `f32` channels
#[derive(Debug, Clone, PartialEq)]
pub struct RawPcm {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl RawPcm {
    fn into_buffer(self) -> Result<SampleBuffer, DecodeError> {
        SampleBuffer::new(self.sample_rate, self.channels)
            .map_err(|e| DecodeError::Corrupted(format!("decoder produced invalid audio: {e}")))
    }
}

/// Everything a backend needs for one decode call
#[derive(Clone, Copy)]
pub struct DecodeRequest<'a> {
    pub bytes: &'a [u8],
    pub hint: &'a DecodeHint,
    pub cancel: &'a CancellationToken,
    pub progress: Option<&'a ProgressSender>,
}

/// Platform audio decode primitive.
///
/// Implementations return [`DecodeError::UnsupportedFormat`] for inputs they do
/// not recognize so the next backend gets a chance.
pub trait PlatformDecoder: Send + Sync {
    fn decode(&self, request: DecodeRequest<'_>) -> Result<RawPcm, DecodeError>;

    /// Name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Decoder front-end with an ordered list of backends
pub struct Decoder {
    backends: Vec<Box<dyn PlatformDecoder>>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Built-in WAV reader first, then Symphonia (then FFmpeg with the `ffmpeg` feature)
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut backends: Vec<Box<dyn PlatformDecoder>> =
            vec![Box::new(WavPcmBackend), Box::new(SymphoniaBackend)];

        #[cfg(feature = "ffmpeg")]
        backends.push(Box::new(crate::decode::ffmpeg_backend::FfmpegBackend::default()));

        Self { backends }
    }

    /// Decoder using a single backend
    pub fn with_backend<B: PlatformDecoder + 'static>(backend: B) -> Self {
        Self {
            backends: vec![Box::new(backend)],
        }
    }

    /// Append a fallback backend
    pub fn push_backend<B: PlatformDecoder + 'static>(mut self, backend: B) -> Self {
        self.backends.push(Box::new(backend));
        self
    }

    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Decode without hint, cancellation or progress
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<SampleBuffer, DecodeError> {
        self.decode(bytes, &DecodeHint::none(), &CancellationToken::new(), None)
    }

    /// Decode a finished microphone recording
    pub fn decode_recording(
        &self,
        recording: &RecordingSource,
        cancel: &CancellationToken,
        progress: Option<&ProgressSender>,
    ) -> Result<SampleBuffer, DecodeError> {
        self.decode(recording.bytes(), &recording.hint(), cancel, progress)
    }

    /// Decode `bytes` into a `SampleBuffer`
    pub fn decode(
        &self,
        bytes: &[u8],
        hint: &DecodeHint,
        cancel: &CancellationToken,
        progress: Option<&ProgressSender>,
    ) -> Result<SampleBuffer, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        if bytes.len() > LARGE_INPUT_BYTES {
            warn!(bytes = bytes.len(), "Decoding a large input");
        }
        cancel.check()?;

        let request = DecodeRequest {
            bytes,
            hint,
            cancel,
            progress,
        };

        let mut last_reason = None;
        for backend in &self.backends {
            cancel.check()?;
            match backend.decode(request) {
                Ok(raw) => {
                    cancel.check()?;
                    let buffer = raw.into_buffer()?;
                    info!(
                        backend = backend.name(),
                        sample_rate = buffer.sample_rate(),
                        channels = buffer.number_of_channels(),
                        frames = buffer.length(),
                        "Decoded audio"
                    );
                    progress::report(progress, ExportProgress::complete("Audio loaded"));
                    return Ok(buffer);
                }
                Err(DecodeError::UnsupportedFormat(reason)) => {
                    debug!(backend = backend.name(), %reason, "Backend rejected input");
                    last_reason = Some(reason);
                }
                Err(e) => return Err(e),
            }
        }

        Err(DecodeError::UnsupportedFormat(
            last_reason.unwrap_or_else(|| "no decoder backend available".to_string()),
        ))
    }
}
