//! Progress events for long-running decode and encode operations.

use crossbeam::channel::Sender;

/// Progress update: completion fraction in [0.0, 1.0] plus a short message.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    pub fraction: f32,
    pub message: String,
}

impl ExportProgress {
    pub fn new(fraction: f32, message: impl Into<String>) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Terminal event sent right before a result is delivered
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(1.0, message)
    }

    pub fn is_complete(&self) -> bool {
        self.fraction >= 1.0
    }
}

/// Sending half of a progress subscription
pub type ProgressSender = Sender<ExportProgress>;

/// Send a progress event if anyone is listening. A dropped receiver is not an error.
pub(crate) fn report(progress: Option<&ProgressSender>, event: ExportProgress) {
    if let Some(tx) = progress {
        let _ = tx.send(event);
    }
}
