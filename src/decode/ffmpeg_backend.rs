//! Decoding via FFmpeg (cargo feature `ffmpeg`).
//!
//! Reaches everything libavformat can demux, including the audio track of
//! arbitrary video containers and Opus-in-WebM recordings. libavformat wants
//! a path, so the input is spilled to a temporary file that is removed again
//! when decoding ends.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ffmpeg_next as ffmpeg;
use ffmpeg::format::sample::Type as SampleLayout;
use ffmpeg::format::Sample;
use ffmpeg::ChannelLayout;
use tracing::debug;

use crate::decode::decoder::{DecodeError, DecodeRequest, PlatformDecoder, RawPcm};

static SPILL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Decoder backend backed by libav*
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    spill_dir: PathBuf,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self {
            spill_dir: std::env::temp_dir(),
        }
    }
}

impl FfmpegBackend {
    /// Use `dir` for temporary input files
    pub fn with_spill_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            spill_dir: dir.as_ref().to_path_buf(),
        }
    }
}

/// Temporary copy of the input, removed on drop
struct SpillFile {
    path: PathBuf,
}

impl SpillFile {
    fn create(dir: &Path, extension: &str, bytes: &[u8]) -> Result<Self, DecodeError> {
        let id = SPILL_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("audiokit-{}-{id}.{extension}", std::process::id()));
        fs::write(&path, bytes)
            .map_err(|e| DecodeError::Corrupted(format!("failed to stage input: {e}")))?;
        Ok(Self { path })
    }
}

impl Drop for SpillFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

impl PlatformDecoder for FfmpegBackend {
    fn decode(&self, request: DecodeRequest<'_>) -> Result<RawPcm, DecodeError> {
        ffmpeg::init().map_err(|e| DecodeError::UnsupportedFormat(format!("FFmpeg init failed: {e}")))?;

        let extension = request.hint.extension.as_deref().unwrap_or("bin");
        let spill = SpillFile::create(&self.spill_dir, extension, request.bytes)?;

        let mut input = ffmpeg::format::input(&spill.path)
            .map_err(|e| DecodeError::UnsupportedFormat(format!("{e}")))?;

        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Audio)
            .ok_or(DecodeError::NoAudioTrack)?;
        let stream_index = stream.index();

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| DecodeError::UnsupportedFormat(format!("{e}")))?;
        let mut decoder = context
            .decoder()
            .audio()
            .map_err(|e| DecodeError::UnsupportedFormat(format!("Codec init failed: {e}")))?;

        let channel_count = decoder.channels() as usize;
        let sample_rate = decoder.rate();
        if channel_count == 0 || sample_rate == 0 {
            return Err(DecodeError::Corrupted(format!(
                "stream reports {channel_count} channels at {sample_rate} Hz"
            )));
        }

        let mut layout = decoder.channel_layout();
        if layout.is_empty() {
            layout = ChannelLayout::default(channel_count as i32);
        }

        // Convert whatever the codec emits into planar f32 at the native rate
        let mut resampler = ffmpeg::software::resampling::Context::get(
            decoder.format(),
            layout,
            sample_rate,
            Sample::F32(SampleLayout::Planar),
            layout,
            sample_rate,
        )
        .map_err(|e| DecodeError::UnsupportedFormat(format!("Resampler init failed: {e}")))?;

        debug!(channels = channel_count, sample_rate, "Opened FFmpeg audio stream");

        let mut channels = vec![Vec::new(); channel_count];

        for (stream, packet) in input.packets() {
            request.cancel.check()?;
            if stream.index() != stream_index {
                continue;
            }
            decoder
                .send_packet(&packet)
                .map_err(|e| DecodeError::Corrupted(format!("{e}")))?;
            drain_frames(&mut decoder, &mut resampler, &mut channels)?;
        }

        decoder
            .send_eof()
            .map_err(|e| DecodeError::Corrupted(format!("{e}")))?;
        drain_frames(&mut decoder, &mut resampler, &mut channels)?;

        Ok(RawPcm {
            sample_rate,
            channels,
        })
    }
}

fn drain_frames(
    decoder: &mut ffmpeg::decoder::Audio,
    resampler: &mut ffmpeg::software::resampling::Context,
    channels: &mut [Vec<f32>],
) -> Result<(), DecodeError> {
    let mut decoded = ffmpeg::frame::Audio::empty();
    while decoder.receive_frame(&mut decoded).is_ok() {
        let mut converted = ffmpeg::frame::Audio::empty();
        resampler
            .run(&decoded, &mut converted)
            .map_err(|e| DecodeError::Corrupted(format!("{e}")))?;

        let samples = converted.samples();
        for (index, channel) in channels.iter_mut().enumerate().take(converted.planes()) {
            let plane = converted.plane::<f32>(index);
            channel.extend_from_slice(&plane[..samples.min(plane.len())]);
        }
    }
    Ok(())
}
