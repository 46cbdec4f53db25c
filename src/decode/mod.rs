pub mod decoder;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_backend;
pub mod recording;
pub mod symphonia_backend;
pub mod wav;

pub use decoder::{DecodeError, DecodeHint, DecodeRequest, Decoder, PlatformDecoder, RawPcm};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg_backend::FfmpegBackend;
pub use recording::RecordingSource;
pub use symphonia_backend::SymphoniaBackend;
pub use wav::WavPcmBackend;
