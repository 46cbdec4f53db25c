//! Background export with progress and cancellation.
//!
//! ```text
//! ExportController::start()
//!   |
//!   +-- spawn "audiokit-export" thread
//!   |     +-- encode in chunks, sending ExportProgress (< 1.0)
//!   |     +-- on success with the token clear: send 1.0, then the bytes
//!   |
//!   +-- caller: poll_progress() / cancel() / poll() / wait()
//! ```
//!
//! One export at a time per controller; a second `start` is rejected with
//! [`ExportError::Busy`] until the running export has been collected through
//! `poll` or `wait`, or cancelled. A cancel that lands before the bytes were
//! collected always wins, even if the worker already finished.

use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam::channel::{self, Receiver, TryRecvError};
use tracing::{info, warn};

use crate::core::progress::{ExportProgress, ProgressSender};
use crate::core::{CancellationToken, SampleBuffer};
use crate::encode::{self, EncodeError, ExportFormat};
use crate::export::state::ExportState;

/// Error type for export operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("An export is already in progress")]
    Busy,
    #[error("No export has been started")]
    NotStarted,
    #[error("Encode error: {0}")]
    Encode(EncodeError),
    #[error("Export cancelled")]
    Cancelled,
    #[error("Export worker panicked")]
    WorkerPanicked,
    #[error("Failed to spawn export thread: {0}")]
    Spawn(String),
}

impl ExportError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Cancelled)
    }
}

impl From<EncodeError> for ExportError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::Cancelled => ExportError::Cancelled,
            other => ExportError::Encode(other),
        }
    }
}

type EncodeResult = Result<Vec<u8>, EncodeError>;

/// In-flight export
struct ExportJob {
    format: ExportFormat,
    started: Instant,
    cancel: CancellationToken,
    progress_rx: Receiver<ExportProgress>,
    result_rx: Receiver<EncodeResult>,
    handle: Option<JoinHandle<()>>,
}

/// Runs one export at a time on a worker thread
#[derive(Default)]
pub struct ExportController {
    state: ExportState,
    job: Option<ExportJob>,
    last_progress: Option<ExportProgress>,
    /// Outcome of a `cancel` not yet reported through `poll`/`wait`
    cancelled: bool,
}

impl ExportController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start encoding `buffer` in `format`.
    ///
    /// `cancel` is observed between chunks; the controller's own
    /// [`cancel`](Self::cancel) trips the same token.
    pub fn start(
        &mut self,
        buffer: SampleBuffer,
        format: ExportFormat,
        cancel: CancellationToken,
    ) -> Result<(), ExportError> {
        self.start_with(buffer, format, cancel, move |buffer, cancel, progress| {
            encode::encode(buffer, format, cancel, Some(progress))
        })
    }

    /// Start an export that runs `job` instead of the built-in encoders.
    ///
    /// `format` only labels the export. `job` must honour the token and
    /// must not send a progress event with fraction 1.0 itself.
    pub fn start_with<F>(
        &mut self,
        buffer: SampleBuffer,
        format: ExportFormat,
        cancel: CancellationToken,
        job: F,
    ) -> Result<(), ExportError>
    where
        F: FnOnce(&SampleBuffer, &CancellationToken, &ProgressSender) -> EncodeResult
            + Send
            + 'static,
    {
        if !self.state.accepts_request() {
            return Err(ExportError::Busy);
        }

        let (progress_tx, progress_rx) = channel::unbounded::<ExportProgress>();
        let (result_tx, result_rx) = channel::bounded::<EncodeResult>(1);
        let worker_cancel = cancel.clone();

        info!(
            %format,
            frames = buffer.length(),
            channels = buffer.number_of_channels(),
            sample_rate = buffer.sample_rate(),
            "Starting export"
        );

        let handle = std::thread::Builder::new()
            .name("audiokit-export".to_string())
            .spawn(move || {
                let mut result = job(&buffer, &worker_cancel, &progress_tx);
                if result.is_ok() && worker_cancel.is_cancelled() {
                    result = Err(EncodeError::Cancelled);
                }
                if result.is_ok() {
                    let _ = progress_tx.send(ExportProgress::complete("Export complete"));
                }
                let _ = result_tx.send(result);
            })
            .map_err(|e| ExportError::Spawn(e.to_string()))?;

        let started = Instant::now();
        self.state = ExportState::Encoding { format, started };
        self.last_progress = None;
        self.cancelled = false;
        self.job = Some(ExportJob {
            format,
            started,
            cancel,
            progress_rx,
            result_rx,
            handle: Some(handle),
        });
        Ok(())
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_encoding()
    }

    /// Newest progress event since the last call, if any
    pub fn poll_progress(&mut self) -> Option<ExportProgress> {
        let newest = self.job.as_ref()?.progress_rx.try_iter().last()?;
        self.last_progress = Some(newest.clone());
        Some(newest)
    }

    /// All progress events since the last call, oldest first
    pub fn drain_progress(&mut self) -> Vec<ExportProgress> {
        let Some(job) = self.job.as_ref() else {
            return Vec::new();
        };
        let events: Vec<ExportProgress> = job.progress_rx.try_iter().collect();
        if let Some(last) = events.last() {
            self.last_progress = Some(last.clone());
        }
        events
    }

    /// Last event seen through `poll_progress` or `drain_progress`
    pub fn last_progress(&self) -> Option<&ExportProgress> {
        self.last_progress.as_ref()
    }

    /// Subscribe to the current export's progress stream.
    ///
    /// Subscribers share the queue with `poll_progress`: each event is
    /// delivered to exactly one reader.
    pub fn progress_receiver(&self) -> Option<Receiver<ExportProgress>> {
        self.job.as_ref().map(|job| job.progress_rx.clone())
    }

    /// Cancel the running export.
    ///
    /// The controller moves to `Cancelled` right away and accepts a new
    /// request. The worker is detached and stops at its next chunk boundary;
    /// whatever it produced is dropped with its channels. The next `poll` or
    /// `wait` reports [`ExportError::Cancelled`].
    pub fn cancel(&mut self) {
        let Some(job) = self.job.take() else {
            return;
        };
        job.cancel.cancel();
        info!(format = %job.format, "Export cancelled");
        self.state = ExportState::Cancelled;
        self.cancelled = true;
    }

    fn take_cancelled(&mut self) -> Option<Result<Vec<u8>, ExportError>> {
        if std::mem::take(&mut self.cancelled) {
            Some(Err(ExportError::Cancelled))
        } else {
            None
        }
    }

    /// Non-blocking completion check. `None` while encoding or when idle.
    pub fn poll(&mut self) -> Option<Result<Vec<u8>, ExportError>> {
        if let Some(cancelled) = self.take_cancelled() {
            return Some(cancelled);
        }
        let job = self.job.as_ref()?;
        let result = match job.result_rx.try_recv() {
            Ok(result) => Ok(result),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(ExportError::WorkerPanicked),
        };
        Some(self.finish(result))
    }

    /// Block until the running export finishes
    pub fn wait(&mut self) -> Result<Vec<u8>, ExportError> {
        if let Some(cancelled) = self.take_cancelled() {
            return cancelled;
        }
        let job = self.job.as_ref().ok_or(ExportError::NotStarted)?;
        let result = job
            .result_rx
            .recv()
            .map_err(|_| ExportError::WorkerPanicked);
        self.finish(result)
    }

    fn finish(
        &mut self,
        received: Result<EncodeResult, ExportError>,
    ) -> Result<Vec<u8>, ExportError> {
        let Some(mut job) = self.job.take() else {
            return Err(ExportError::NotStarted);
        };
        if let Some(handle) = job.handle.take() {
            if handle.join().is_err() {
                warn!("Export worker panicked");
            }
        }

        let mut outcome = received.and_then(|result| result.map_err(ExportError::from));
        // Token tripped after the worker finished but before collection
        if outcome.is_ok() && job.cancel.is_cancelled() {
            outcome = Err(ExportError::Cancelled);
        }
        match &outcome {
            Ok(bytes) => {
                let elapsed = job.started.elapsed();
                info!(
                    format = %job.format,
                    bytes = bytes.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Export complete"
                );
                self.last_progress = Some(ExportProgress::complete("Export complete"));
                self.state = ExportState::Complete {
                    format: job.format,
                    bytes: bytes.len(),
                    elapsed,
                };
            }
            Err(ExportError::Cancelled) => {
                info!(format = %job.format, "Export cancelled");
                self.state = ExportState::Cancelled;
            }
            Err(err) => {
                warn!(format = %job.format, error = %err, "Export failed");
                self.state = ExportState::Failed {
                    error: err.to_string(),
                };
            }
        }
        outcome
    }
}

impl Drop for ExportController {
    fn drop(&mut self) {
        // Let an orphaned worker stop at its next chunk boundary
        if let Some(job) = &self.job {
            job.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::BitDepth;
    use std::time::Duration;

    fn blocking_job(
        _: &SampleBuffer,
        cancel: &CancellationToken,
        progress: &ProgressSender,
    ) -> EncodeResult {
        let _ = progress.send(ExportProgress::new(0.1, "working"));
        while !cancel.is_cancelled() {
            std::thread::sleep(Duration::from_millis(1));
        }
        Err(EncodeError::Cancelled)
    }

    #[test]
    fn test_wav_export_completes() {
        let mut controller = ExportController::new();
        let buffer = SampleBuffer::silence(8_000, 1, 8_000).unwrap();
        controller
            .start(buffer, ExportFormat::Wav(BitDepth::Int16), CancellationToken::new())
            .unwrap();

        let bytes = controller.wait().unwrap();
        assert_eq!(bytes.len(), 44 + 16_000);
        assert!(controller.state().is_complete());
        assert!(controller.last_progress().is_some_and(|p| p.is_complete()));
    }

    #[test]
    fn test_wait_without_start() {
        let mut controller = ExportController::new();
        assert_eq!(controller.wait(), Err(ExportError::NotStarted));
        assert!(controller.poll().is_none());
        assert!(controller.poll_progress().is_none());
    }

    #[test]
    fn test_busy_then_cancel_then_restart() {
        let mut controller = ExportController::new();
        let buffer = SampleBuffer::silence(8_000, 1, 10).unwrap();
        controller
            .start_with(
                buffer.clone(),
                ExportFormat::default(),
                CancellationToken::new(),
                blocking_job,
            )
            .unwrap();
        assert!(controller.is_busy());
        assert!(controller.poll().is_none());

        let second = controller.start(buffer.clone(), ExportFormat::default(), CancellationToken::new());
        assert_eq!(second, Err(ExportError::Busy));

        controller.cancel();
        assert_eq!(controller.wait(), Err(ExportError::Cancelled));
        assert!(controller.state().is_cancelled());

        controller
            .start(buffer, ExportFormat::default(), CancellationToken::new())
            .unwrap();
        assert!(controller.wait().is_ok());
    }

    #[test]
    fn test_failure_is_reported() {
        let mut controller = ExportController::new();
        controller
            .start_with(
                SampleBuffer::silence(8_000, 1, 10).unwrap(),
                ExportFormat::default(),
                CancellationToken::new(),
                |_, _, _| Err(EncodeError::Codec("broken".to_string())),
            )
            .unwrap();
        let err = controller.wait().unwrap_err();
        assert_eq!(err, ExportError::Encode(EncodeError::Codec("broken".to_string())));
        assert!(controller.state().is_failed());
        assert!(controller.drain_progress().is_empty());
    }

    #[test]
    fn test_panicking_job() {
        let mut controller = ExportController::new();
        controller
            .start_with(
                SampleBuffer::silence(8_000, 1, 10).unwrap(),
                ExportFormat::default(),
                CancellationToken::new(),
                |_, _, _| panic!("worker exploded"),
            )
            .unwrap();
        assert_eq!(controller.wait(), Err(ExportError::WorkerPanicked));
        assert!(controller.state().is_failed());
    }

    #[test]
    fn test_cancel_then_restart_without_wait() {
        let mut controller = ExportController::new();
        let buffer = SampleBuffer::silence(8_000, 1, 10).unwrap();
        controller
            .start_with(
                buffer.clone(),
                ExportFormat::default(),
                CancellationToken::new(),
                blocking_job,
            )
            .unwrap();

        controller.cancel();
        assert!(controller.state().is_cancelled());
        assert!(!controller.is_busy());
        assert!(controller.progress_receiver().is_none());

        controller
            .start(buffer, ExportFormat::Wav(BitDepth::Int16), CancellationToken::new())
            .unwrap();
        assert_eq!(controller.wait().unwrap().len(), 44 + 20);
        assert!(controller.state().is_complete());
    }

    #[test]
    fn test_cancel_after_worker_finished_drops_bytes() {
        let mut controller = ExportController::new();
        controller
            .start(
                SampleBuffer::silence(8_000, 1, 800).unwrap(),
                ExportFormat::Wav(BitDepth::Int16),
                CancellationToken::new(),
            )
            .unwrap();
        std::thread::sleep(Duration::from_millis(200));
        assert!(controller.state().is_encoding());

        controller.cancel();
        assert_eq!(controller.wait(), Err(ExportError::Cancelled));
        assert!(controller.state().is_cancelled());
        assert!(controller.poll().is_none());
        assert_eq!(controller.wait(), Err(ExportError::NotStarted));
    }

    #[test]
    fn test_caller_token_after_worker_finished_drops_bytes() {
        let mut controller = ExportController::new();
        let token = CancellationToken::new();
        controller
            .start(
                SampleBuffer::silence(8_000, 1, 800).unwrap(),
                ExportFormat::Wav(BitDepth::Int16),
                token.clone(),
            )
            .unwrap();
        std::thread::sleep(Duration::from_millis(200));

        token.cancel();
        assert_eq!(controller.wait(), Err(ExportError::Cancelled));
        assert!(controller.state().is_cancelled());
    }

    #[test]
    fn test_cancel_after_encode_suppresses_result() {
        let mut controller = ExportController::new();
        let token = CancellationToken::new();
        let job_token = token.clone();
        controller
            .start_with(
                SampleBuffer::silence(8_000, 1, 10).unwrap(),
                ExportFormat::default(),
                token,
                move |_, _, _| {
                    // cancelled while the last chunk was in flight
                    job_token.cancel();
                    Ok(vec![1, 2, 3])
                },
            )
            .unwrap();
        let receiver = controller.progress_receiver().unwrap();
        assert_eq!(controller.wait(), Err(ExportError::Cancelled));
        assert!(receiver.try_iter().all(|p| !p.is_complete()));
    }
}
