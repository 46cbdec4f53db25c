//! Command-line front end: load a file, apply edits, export WAV or MP3.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use audiokit::core::constants::{clamp_fade_seconds, clamp_speed, clamp_volume_db};
use audiokit::core::time::format_time;
use audiokit::decode::{DecodeHint, Decoder};
use audiokit::encode::{BitDepth, ExportFormat, Mp3Bitrate};
use audiokit::export::ExportController;
use audiokit::transform::TransformChain;
use audiokit::CancellationToken;

/// Decode an audio (or video) file, transform it and re-encode it
#[derive(Parser, Debug)]
#[command(name = "audiokit")]
#[command(about = "Reverse, re-speed and convert audio files", long_about = None)]
struct Args {
    /// Input file (WAV, MP3, FLAC, OGG, M4A, MP4, ...)
    input: PathBuf,

    /// Output file; the extension picks the format (.wav or .mp3)
    output: PathBuf,

    /// Reverse the audio
    #[arg(long)]
    reverse: bool,

    /// Playback speed factor (0.25 - 4.0); changes pitch as well
    #[arg(long)]
    speed: Option<f64>,

    /// Gain in dB (-60 - 20)
    #[arg(long, allow_hyphen_values = true)]
    volume: Option<f64>,

    /// Normalize the peak to this level in dBFS
    #[arg(long, allow_hyphen_values = true)]
    normalize: Option<f64>,

    /// Fade-in length in seconds (0.1 - 30)
    #[arg(long)]
    fade_in: Option<f64>,

    /// Fade-out length in seconds (0.1 - 30)
    #[arg(long)]
    fade_out: Option<f64>,

    /// Keep audio from this many seconds on
    #[arg(long)]
    start: Option<f64>,

    /// Keep audio up to this many seconds
    #[arg(long)]
    end: Option<f64>,

    /// WAV bit depth (16, 24 or 32 for float)
    #[arg(long, default_value_t = 24)]
    bit_depth: u16,

    /// MP3 bitrate in kbps
    #[arg(long, default_value_t = 192)]
    bitrate: u16,
}

impl Args {
    fn chain(&self, duration: f64) -> TransformChain {
        let mut chain = TransformChain::new();
        if self.start.is_some() || self.end.is_some() {
            chain = chain.trim(self.start.unwrap_or(0.0), self.end.unwrap_or(duration));
        }
        if self.reverse {
            chain = chain.reverse();
        }
        if let Some(speed) = self.speed {
            chain = chain.change_speed(clamp_speed(speed));
        }
        if let Some(db) = self.volume {
            chain = chain.volume(clamp_volume_db(db));
        }
        if let Some(db) = self.normalize {
            chain = chain.normalize(db);
        }
        if let Some(seconds) = self.fade_in {
            chain = chain.fade_in(clamp_fade_seconds(seconds));
        }
        if let Some(seconds) = self.fade_out {
            chain = chain.fade_out(clamp_fade_seconds(seconds));
        }
        chain
    }

    fn format(&self) -> Result<ExportFormat, Box<dyn std::error::Error>> {
        let extension = self
            .output
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("wav") => Ok(ExportFormat::Wav(BitDepth::from_bits(self.bit_depth)?)),
            Some("mp3") => Ok(ExportFormat::Mp3(Mp3Bitrate::new(self.bitrate)?)),
            _ => Err(format!("cannot infer format from {}", self.output.display()).into()),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let format = args.format()?;

    let bytes = std::fs::read(&args.input)?;
    let hint = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .map(DecodeHint::from_file_name)
        .unwrap_or_default();

    let cancel = CancellationToken::new();
    let buffer = Decoder::new()
        .decode(&bytes, &hint, &cancel, None)
        .map_err(|e| format!("{} ({e})", e.user_message()))?;
    eprintln!(
        "Loaded {} ({} Hz, {} ch)",
        format_time(buffer.duration_time()),
        buffer.sample_rate(),
        buffer.number_of_channels()
    );

    let edited = args.chain(buffer.duration()).apply(&buffer)?;

    let mut controller = ExportController::new();
    controller.start(edited, format, cancel)?;
    let output = loop {
        if let Some(progress) = controller.poll_progress() {
            eprintln!("{:>5.1}% {}", progress.fraction * 100.0, progress.message);
        }
        if let Some(result) = controller.poll() {
            break result?;
        }
        std::thread::sleep(Duration::from_millis(50));
    };

    std::fs::write(&args.output, &output)?;
    eprintln!("Wrote {} bytes to {}", output.len(), args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_gain_arguments() {
        let args = Args::try_parse_from([
            "audiokit",
            "in.wav",
            "out.mp3",
            "--volume",
            "-6",
            "--normalize",
            "-1.5",
        ])
        .unwrap();
        assert_eq!(args.volume, Some(-6.0));
        assert_eq!(args.normalize, Some(-1.5));
        assert_eq!(args.format().unwrap(), ExportFormat::Mp3(Mp3Bitrate::default()));
        assert_eq!(args.chain(1.0).steps().len(), 2);
    }

    #[test]
    fn test_format_from_extension() {
        let args = Args::try_parse_from(["audiokit", "a.flac", "b.WAV", "--bit-depth", "16"]).unwrap();
        assert_eq!(args.format().unwrap(), ExportFormat::Wav(BitDepth::Int16));

        let args = Args::try_parse_from(["audiokit", "a.flac", "b.ogg"]).unwrap();
        assert!(args.format().is_err());
    }
}
