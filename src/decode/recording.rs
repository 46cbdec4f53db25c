//! Finished microphone recordings as decoder input.

use crate::decode::decoder::DecodeHint;

/// A completed capture blob plus the MIME type the recorder produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSource {
    bytes: Vec<u8>,
    mime_type: String,
}

impl RecordingSource {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Container hint derived from the MIME type
    pub fn hint(&self) -> DecodeHint {
        DecodeHint::from_mime_type(&self.mime_type)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
