//! Store a calibration from clicked pixel positions.

use athletrack_common::config::AppConfig;
use athletrack_model::geometry::Point2D;
use athletrack_model::kind::TestKind;
use athletrack_processing_core::{CalibrationProgress, TestEvent, TestRun};

pub fn run(config: &AppConfig, kind: TestKind, points: Vec<Point2D>) -> anyhow::Result<()> {
    let marks = kind.calibration_meters();
    if points.len() != marks.len() {
        anyhow::bail!(
            "{kind} calibration needs {} points ({} m), got {}",
            marks.len(),
            marks
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            points.len()
        );
    }

    println!("Calibrating {kind} test");

    let mut test = TestRun::new(kind, config);
    test.set_observer(|event: &TestEvent| {
        if let TestEvent::Progress(message) = event {
            println!("  {message}");
        }
    });
    test.start_calibration();

    for point in points {
        if let CalibrationProgress::Rejected { reason } = test.add_calibration_click(point)? {
            anyhow::bail!("Calibration rejected: {reason}");
        }
    }

    let stored = test
        .calibration()
        .ok_or_else(|| anyhow::anyhow!("Calibration did not complete"))?;

    println!();
    println!(
        "  Scale: {:.2} px/m ({:.5} m/px)",
        stored.model.pixels_per_meter(),
        stored.model.meters_per_pixel
    );
    for warning in &stored.warnings {
        println!("  [WARN] {warning}");
    }

    let mut store = super::open_store(config);
    store.save_calibration(kind, &stored)?;
    println!(
        "  Calibration saved to: {}",
        config.data_dir.join("calibration").join(format!("{kind}.json")).display()
    );

    Ok(())
}
