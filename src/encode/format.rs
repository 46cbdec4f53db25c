//! Output formats and per-format options.

use crate::core::constants::MP3_FRAMES_PER_CHUNK;
use crate::encode::EncodeError;

/// Sample representation in an encoded WAV file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    Int16,
    #[default]
    Int24,
    Float32,
}

impl BitDepth {
    /// Parse a bit count (16, 24 or 32). 32 means IEEE float.
    pub fn from_bits(bits: u16) -> Result<Self, EncodeError> {
        match bits {
            16 => Ok(BitDepth::Int16),
            24 => Ok(BitDepth::Int24),
            32 => Ok(BitDepth::Float32),
            other => Err(EncodeError::InvalidParameters(format!(
                "unsupported WAV bit depth {other}"
            ))),
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Int16 => 16,
            BitDepth::Int24 => 24,
            BitDepth::Float32 => 32,
        }
    }

    pub fn bytes_per_sample(self) -> u16 {
        self.bits() / 8
    }

    /// WAVE `fmt ` format code: 1 for integer PCM, 3 for IEEE float
    pub fn format_code(self) -> u16 {
        match self {
            BitDepth::Int16 | BitDepth::Int24 => 1,
            BitDepth::Float32 => 3,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, BitDepth::Float32)
    }
}

/// Constant MP3 bitrate in kbps, restricted to MPEG-1 Layer III rates the codec accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mp3Bitrate(u16);

impl Mp3Bitrate {
    const ALLOWED: [u16; 13] = [32, 40, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];

    /// Bitrates offered to users
    pub const PRESETS: [Mp3Bitrate; 4] = [
        Mp3Bitrate(128),
        Mp3Bitrate(192),
        Mp3Bitrate(256),
        Mp3Bitrate(320),
    ];

    pub fn new(kbps: u16) -> Result<Self, EncodeError> {
        if Self::ALLOWED.contains(&kbps) {
            Ok(Self(kbps))
        } else {
            Err(EncodeError::InvalidParameters(format!(
                "unsupported MP3 bitrate {kbps} kbps"
            )))
        }
    }

    pub fn kbps(self) -> u16 {
        self.0
    }
}

impl Default for Mp3Bitrate {
    fn default() -> Self {
        Self(192)
    }
}

/// Output container and its quality parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Wav(BitDepth),
    Mp3(Mp3Bitrate),
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Wav(_) => "wav",
            ExportFormat::Mp3(_) => "mp3",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Wav(_) => "audio/wav",
            ExportFormat::Mp3(_) => "audio/mpeg",
        }
    }

    /// Whether encoding is slow enough to warrant progress events
    pub fn reports_progress(&self) -> bool {
        matches!(self, ExportFormat::Mp3(_))
    }
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat::Wav(BitDepth::default())
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Wav(depth) => write!(f, "WAV {}-bit", depth.bits()),
            ExportFormat::Mp3(bitrate) => write!(f, "MP3 {} kbps", bitrate.kbps()),
        }
    }
}

/// WAV export settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WavOptions {
    pub bit_depth: BitDepth,
}

/// MP3 export settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp3Options {
    pub bitrate: Mp3Bitrate,
    /// Frames encoded between two progress events / cancellation checks
    pub frames_per_chunk: usize,
}

impl Default for Mp3Options {
    fn default() -> Self {
        Self {
            bitrate: Mp3Bitrate::default(),
            frames_per_chunk: MP3_FRAMES_PER_CHUNK,
        }
    }
}

impl From<WavOptions> for ExportFormat {
    fn from(options: WavOptions) -> Self {
        ExportFormat::Wav(options.bit_depth)
    }
}

impl From<Mp3Options> for ExportFormat {
    fn from(options: Mp3Options) -> Self {
        ExportFormat::Mp3(options.bitrate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_depth() {
        assert_eq!(BitDepth::from_bits(16).unwrap(), BitDepth::Int16);
        assert_eq!(BitDepth::from_bits(32).unwrap().format_code(), 3);
        assert_eq!(BitDepth::Int24.bytes_per_sample(), 3);
        assert!(BitDepth::from_bits(8).is_err());
        assert_eq!(BitDepth::default(), BitDepth::Int24);
    }

    #[test]
    fn test_mp3_bitrate() {
        assert_eq!(Mp3Bitrate::default().kbps(), 192);
        assert_eq!(Mp3Bitrate::new(320).unwrap().kbps(), 320);
        assert!(Mp3Bitrate::new(100).is_err());
        assert!(Mp3Bitrate::new(0).is_err());
        for preset in Mp3Bitrate::PRESETS {
            assert!(Mp3Bitrate::new(preset.kbps()).is_ok());
        }
    }

    #[test]
    fn test_export_format() {
        let wav = ExportFormat::from(WavOptions::default());
        assert_eq!(wav, ExportFormat::Wav(BitDepth::Int24));
        assert_eq!(wav.extension(), "wav");
        assert!(!wav.reports_progress());

        let mp3 = ExportFormat::from(Mp3Options::default());
        assert_eq!(mp3.mime_type(), "audio/mpeg");
        assert_eq!(mp3.to_string(), "MP3 192 kbps");
        assert_eq!(Mp3Options::default().frames_per_chunk, 32);
    }
}
