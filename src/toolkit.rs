//! Operation surface used by the audio tools.
//!
//! Decoding and MP3 encoding run on Tokio's blocking pool, so the async
//! methods must be awaited inside a Tokio runtime. Transforms and WAV export
//! are synchronous.

use std::sync::Arc;

use tracing::info;

use crate::core::progress::{report, ExportProgress, ProgressSender};
use crate::core::{CancellationToken, SampleBuffer};
use crate::decode::{DecodeError, DecodeHint, Decoder, RecordingSource};
use crate::encode::{self, EncodeError, ExportFormat, Mp3Encoder, Mp3Options, WavOptions};
use crate::transform::{self, TransformChain, TransformError};

/// Error type for toolkit operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolkitError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),
    #[error("Background worker panicked")]
    WorkerPanicked,
}

impl ToolkitError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            ToolkitError::Decode(e) => e.is_cancelled(),
            ToolkitError::Encode(e) => e.is_cancelled(),
            _ => false,
        }
    }
}

/// Entry point for load / transform / export
#[derive(Clone, Default)]
pub struct AudioToolkit {
    decoder: Arc<Decoder>,
}

impl AudioToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom decoder (for example one with extra backends)
    pub fn with_decoder(decoder: Decoder) -> Self {
        Self {
            decoder: Arc::new(decoder),
        }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Decode a user-supplied file
    pub async fn load_from_bytes(
        &self,
        bytes: Vec<u8>,
        hint: DecodeHint,
        cancel: CancellationToken,
        progress: Option<ProgressSender>,
    ) -> Result<SampleBuffer, ToolkitError> {
        let decoder = Arc::clone(&self.decoder);
        let buffer = tokio::task::spawn_blocking(move || {
            decoder.decode(&bytes, &hint, &cancel, progress.as_ref())
        })
        .await
        .map_err(|_| ToolkitError::WorkerPanicked)??;
        Ok(buffer)
    }

    /// Decode a finished microphone recording
    pub async fn load_recording(
        &self,
        recording: RecordingSource,
        cancel: CancellationToken,
        progress: Option<ProgressSender>,
    ) -> Result<SampleBuffer, ToolkitError> {
        let hint = recording.hint();
        self.load_from_bytes(recording.into_bytes(), hint, cancel, progress)
            .await
    }

    pub fn reverse(&self, buffer: &SampleBuffer) -> SampleBuffer {
        transform::reverse(buffer)
    }

    pub fn change_speed(
        &self,
        buffer: &SampleBuffer,
        factor: f64,
    ) -> Result<SampleBuffer, ToolkitError> {
        Ok(transform::change_speed(buffer, factor)?)
    }

    /// Apply a chain of edits
    pub fn transform(
        &self,
        buffer: &SampleBuffer,
        chain: &TransformChain,
    ) -> Result<SampleBuffer, ToolkitError> {
        Ok(chain.apply(buffer)?)
    }

    pub fn merge(
        &self,
        buffers: &[SampleBuffer],
        crossfade: f64,
    ) -> Result<SampleBuffer, ToolkitError> {
        Ok(transform::merge(buffers, crossfade)?)
    }

    /// Encode as WAV on the calling thread
    pub fn export_to_wav(
        &self,
        buffer: &SampleBuffer,
        options: WavOptions,
    ) -> Result<Vec<u8>, ToolkitError> {
        Ok(encode::wav::encode(buffer, options.bit_depth)?)
    }

    /// Encode as MP3 on the blocking pool.
    ///
    /// Progress stays below 1.0 while encoding; the 1.0 event is sent only
    /// when the bytes are about to be returned.
    pub async fn export_to_mp3(
        &self,
        buffer: SampleBuffer,
        options: Mp3Options,
        cancel: CancellationToken,
        progress: Option<ProgressSender>,
    ) -> Result<Vec<u8>, ToolkitError> {
        self.run_export(buffer, ExportFormat::from(options), cancel, progress, move |b, c, p| {
            Mp3Encoder::encode(b, &options, c, p)
        })
        .await
    }

    /// Encode in any supported format
    pub async fn export(
        &self,
        buffer: SampleBuffer,
        format: ExportFormat,
        cancel: CancellationToken,
        progress: Option<ProgressSender>,
    ) -> Result<Vec<u8>, ToolkitError> {
        self.run_export(buffer, format, cancel, progress, move |b, c, p| {
            encode::encode(b, format, c, p)
        })
        .await
    }

    async fn run_export<F>(
        &self,
        buffer: SampleBuffer,
        format: ExportFormat,
        cancel: CancellationToken,
        progress: Option<ProgressSender>,
        job: F,
    ) -> Result<Vec<u8>, ToolkitError>
    where
        F: FnOnce(
                &SampleBuffer,
                &CancellationToken,
                Option<&ProgressSender>,
            ) -> Result<Vec<u8>, EncodeError>
            + Send
            + 'static,
    {
        let worker_cancel = cancel.clone();
        let worker_progress = progress.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            job(&buffer, &worker_cancel, worker_progress.as_ref())
        })
        .await
        .map_err(|_| ToolkitError::WorkerPanicked)??;

        cancel.check().map_err(EncodeError::from)?;
        report(progress.as_ref(), ExportProgress::complete("Export complete"));
        info!(%format, bytes = bytes.len(), "Export finished");
        Ok(bytes)
    }
}
