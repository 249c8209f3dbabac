//! Print the overlay geometry for a stored calibration.

use athletrack_common::config::AppConfig;
use athletrack_model::kind::TestKind;
use athletrack_processing_core::TestRun;

pub fn run(config: &AppConfig, kind: TestKind, width: u32, height: u32) -> anyhow::Result<()> {
    let store = super::open_store(config);
    let stored = store
        .load_calibration(kind)?
        .ok_or_else(|| anyhow::anyhow!("No {kind} calibration stored"))?;

    let mut test = TestRun::new(kind, config);
    test.restore_calibration(&stored)?;
    let scale = test
        .frame_scale(width as f64, height as f64)
        .ok_or_else(|| anyhow::anyhow!("Calibration could not be applied"))?;

    println!("{}", serde_json::to_string_pretty(&test.overlay(&scale))?);
    Ok(())
}
