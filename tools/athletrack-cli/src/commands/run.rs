//! Analyze a landmark recording with a stored calibration.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use athletrack_common::config::AppConfig;
use athletrack_common::error::{AthleteError, AthleteResult};
use athletrack_model::frame::{parse_frames, parse_header};
use athletrack_model::kind::TestKind;
use athletrack_processing_core::{TestEvent, TestRun};

use crate::driver::FrameDriver;
use crate::engine::{video_frames, RecordedBallTrack, RecordedPoseEngine};

pub async fn run(
    config: &AppConfig,
    kind: TestKind,
    recording: PathBuf,
    height_cm: Option<f64>,
    max_fps: u32,
    save: bool,
) -> anyhow::Result<()> {
    println!("Analyzing {kind} recording: {}", recording.display());

    let content = read_recording(&recording)?;
    let header = parse_header(&content)
        .ok_or_else(|| anyhow::anyhow!("Recording has no '#' header line"))?;
    let frames =
        parse_frames(&content).map_err(|e| anyhow::anyhow!("Failed to parse recording: {e}"))?;

    println!(
        "  Loaded {} frames ({}x{} @ {}fps)",
        frames.len(),
        header.image_width,
        header.image_height,
        header.fps
    );

    let mut store = super::open_store(config);
    let stored = store.load_calibration(kind)?.ok_or_else(|| {
        anyhow::anyhow!("No {kind} calibration stored. Run `athletrack calibrate --kind {kind}` first.")
    })?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                TestEvent::Progress(message) => println!("  {message}"),
                TestEvent::CalibrationComplete(model) => {
                    println!("  Calibration: {:.2} px/m", model.pixels_per_meter())
                }
                TestEvent::Complete(_) => {}
            }
        }
    });

    let mut test = TestRun::new(kind, config);
    test.set_observer(tx);
    test.restore_calibration(&stored)?;

    if kind == TestKind::Kick {
        let track = RecordedBallTrack::new(&frames);
        if track.is_empty() {
            anyhow::bail!("Recording has no ball observations");
        }
        println!("  Ball track: {} observations", track.len());
        test.set_ball_detector(track);
    }

    let mut profile = config.athlete.clone();
    if height_cm.is_some() {
        profile.height_cm = height_cm;
    }
    test.start_test(&profile)?;

    let engine = RecordedPoseEngine::new(&frames);
    let mut driver = FrameDriver::new(
        engine,
        test,
        header.image_width,
        header.image_height,
        max_fps,
    )?;

    let stop = driver.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.store(true, Ordering::SeqCst);
        }
    });

    let summary = driver.run(video_frames(&header, &frames)).await?;
    let test = driver.into_run();
    let result = test.result().cloned();
    // Closes the event channel so the printer drains and exits
    drop(test);
    printer.await?;

    println!(
        "  Frames: {} seen, {} analyzed, {} skipped",
        summary.frames_seen, summary.frames_analyzed, summary.frames_skipped
    );

    let Some(result) = result else {
        if summary.stopped {
            println!("\nStopped before the test completed.");
        } else {
            println!("\nRecording ended before the test completed.");
        }
        return Ok(());
    };

    println!();
    println!("Result: {}", result.headline());
    for warning in &result.warnings {
        println!("  [WARN] {warning}");
    }

    if save {
        let id = store.save_result(kind, result)?;
        println!("  Saved as {id}");
    }

    Ok(())
}

/// Read a recording, keeping the underlying I/O error unless the file is
/// simply missing.
fn read_recording(path: &Path) -> AthleteResult<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AthleteError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => AthleteError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_recording_reports_path() {
        let path = std::env::temp_dir().join("athletrack_missing_recording.jsonl");
        let _ = std::fs::remove_file(&path);

        let err = read_recording(&path).unwrap_err();
        assert!(matches!(err, AthleteError::FileNotFound { .. }));
        assert!(err.to_string().contains("athletrack_missing_recording.jsonl"));
    }

    #[test]
    fn test_unreadable_recording_keeps_io_error() {
        // A directory exists but cannot be read as a file
        let dir = std::env::temp_dir().join("athletrack_recording_dir");
        std::fs::create_dir_all(&dir).unwrap();

        let err = read_recording(&dir).unwrap_err();
        assert!(matches!(err, AthleteError::Io(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_non_utf8_recording_keeps_io_error() {
        let path = std::env::temp_dir().join("athletrack_binary_recording.jsonl");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x9f]).unwrap();

        let err = read_recording(&path).unwrap_err();
        assert!(matches!(err, AthleteError::Io(_)));
        assert!(!err.to_string().is_empty());

        std::fs::remove_file(&path).ok();
    }
}
