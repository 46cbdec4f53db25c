use std::time::Duration;

use audiokit::encode::{self, BitDepth, EncodeError, ExportFormat, Mp3Bitrate, Mp3Encoder};
use audiokit::{CancellationToken, ExportController, ExportError, ExportProgress, SampleBuffer};

fn tone(seconds: f64, channels: usize) -> SampleBuffer {
    let length = (seconds * 44_100.0) as usize;
    let data: Vec<f32> = (0..length)
        .map(|i| (i as f32 * 0.0627).sin() * 0.5)
        .collect();
    SampleBuffer::new(44_100, vec![data; channels]).unwrap()
}

#[test]
fn test_mp3_cancel_delivers_nothing() {
    let mut controller = ExportController::new();
    let format = ExportFormat::Mp3(Mp3Bitrate::default());
    controller
        .start(tone(120.0, 2), format, CancellationToken::new())
        .unwrap();
    let progress = controller.progress_receiver().unwrap();

    controller.cancel();
    let result = controller.wait();

    assert_eq!(result, Err(ExportError::Cancelled));
    assert!(controller.state().is_cancelled());
    assert!(progress.try_iter().all(|p| !p.is_complete()));

    // ready for the next request
    controller
        .start(tone(0.1, 1), ExportFormat::Wav(BitDepth::Int16), CancellationToken::new())
        .unwrap();
    let bytes = controller.wait().unwrap();
    assert_eq!(bytes.len(), 44 + 4_410 * 2);
    assert!(controller.state().is_complete());
}

#[test]
fn test_caller_token_cancels() {
    let mut controller = ExportController::new();
    let token = CancellationToken::new();
    controller
        .start(tone(120.0, 1), ExportFormat::Mp3(Mp3Bitrate::default()), token.clone())
        .unwrap();
    token.cancel();
    assert!(controller.wait().unwrap_err().is_cancelled());
}

#[test]
fn test_second_start_is_rejected_while_busy() {
    let mut controller = ExportController::new();
    controller
        .start(tone(120.0, 2), ExportFormat::Mp3(Mp3Bitrate::default()), CancellationToken::new())
        .unwrap();
    assert!(controller.is_busy());

    let second = controller.start(
        tone(0.1, 1),
        ExportFormat::Wav(BitDepth::Int16),
        CancellationToken::new(),
    );
    assert_eq!(second, Err(ExportError::Busy));

    controller.cancel();
    assert!(controller.wait().is_err());
    assert!(!controller.is_busy());
}

#[test]
fn test_mp3_progress_ends_with_completion() {
    let mut controller = ExportController::new();
    controller
        .start(tone(3.0, 2), ExportFormat::Mp3(Mp3Bitrate::new(128).unwrap()), CancellationToken::new())
        .unwrap();
    let progress = controller.progress_receiver().unwrap();

    let bytes = controller.wait().unwrap();
    assert!(encode::frame::count_frames(&bytes) > 100);

    let events: Vec<ExportProgress> = progress.try_iter().collect();
    let (last, rest) = events.split_last().unwrap();
    assert!(last.is_complete());
    assert!(!rest.is_empty());
    assert!(rest.iter().all(|e| e.fraction < 1.0));
    assert!(rest.windows(2).all(|w| w[0].fraction <= w[1].fraction));
}

#[test]
fn test_poll_until_done() {
    let mut controller = ExportController::new();
    controller
        .start(tone(1.0, 1), ExportFormat::Wav(BitDepth::Float32), CancellationToken::new())
        .unwrap();

    let bytes = loop {
        if let Some(result) = controller.poll() {
            break result.unwrap();
        }
        std::thread::sleep(Duration::from_millis(1));
    };
    assert_eq!(bytes.len(), 44 + 44_100 * 4);
    assert!(controller.poll().is_none());
}

#[test]
fn test_custom_codec_job() {
    struct Silent;

    impl encode::FrameCodec for Silent {
        fn encode_frame(&mut self, left: &[i16], _right: Option<&[i16]>) -> Result<Vec<u8>, EncodeError> {
            Ok(vec![0; left.len() / 1152])
        }

        fn flush(&mut self) -> Result<Vec<u8>, EncodeError> {
            Ok(Vec::new())
        }
    }

    let mut controller = ExportController::new();
    controller
        .start_with(
            tone(2.0, 1),
            ExportFormat::Mp3(Mp3Bitrate::default()),
            CancellationToken::new(),
            |buffer, cancel, progress| {
                Mp3Encoder::encode_with(&mut Silent, buffer, 4, cancel, Some(progress))
            },
        )
        .unwrap();
    let bytes = controller.wait().unwrap();
    // 19 full chunks of 4 frames, the short tail rounds down to 0
    assert_eq!(bytes.len(), 19 * 4);

    let events = controller.drain_progress();
    assert!(events.is_empty());
    assert!(controller.last_progress().is_some_and(|p| p.is_complete()));
}

#[test]
fn test_cancel_frees_controller_for_next_export() {
    let mut controller = ExportController::new();
    controller
        .start(tone(120.0, 2), ExportFormat::Mp3(Mp3Bitrate::default()), CancellationToken::new())
        .unwrap();
    controller.cancel();
    assert!(controller.state().is_cancelled());

    controller
        .start(tone(0.1, 1), ExportFormat::Wav(BitDepth::Int16), CancellationToken::new())
        .unwrap();
    assert_eq!(controller.wait().unwrap().len(), 44 + 4_410 * 2);
}
