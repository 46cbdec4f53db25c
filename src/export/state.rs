//! Export state machine.

use std::time::{Duration, Instant};

use crate::encode::ExportFormat;

/// Export state
#[derive(Debug, Clone, PartialEq)]
pub enum ExportState {
    /// Idle - no export requested yet
    Idle,
    /// Encoding - a worker is producing output
    Encoding {
        format: ExportFormat,
        started: Instant,
    },
    /// Complete - the last export delivered its bytes
    Complete {
        format: ExportFormat,
        bytes: usize,
        elapsed: Duration,
    },
    /// Cancelled - the last export was abandoned without output
    Cancelled,
    /// Failed - the last export stopped with an error
    Failed { error: String },
}

impl Default for ExportState {
    fn default() -> Self {
        ExportState::Idle
    }
}

impl ExportState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ExportState::Idle)
    }

    pub fn is_encoding(&self) -> bool {
        matches!(self, ExportState::Encoding { .. })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ExportState::Complete { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportState::Cancelled)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ExportState::Failed { .. })
    }

    /// Whether the last export has finished, one way or another
    pub fn is_terminal(&self) -> bool {
        self.is_complete() || self.is_cancelled() || self.is_failed()
    }

    /// Whether a new export request may start from this state
    pub fn accepts_request(&self) -> bool {
        !self.is_encoding()
    }

    /// Time spent encoding so far (or in total, once complete)
    pub fn elapsed(&self) -> Duration {
        match self {
            ExportState::Encoding { started, .. } => started.elapsed(),
            ExportState::Complete { elapsed, .. } => *elapsed,
            _ => Duration::ZERO,
        }
    }
}
