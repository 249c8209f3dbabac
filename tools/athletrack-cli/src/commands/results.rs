//! List stored results.

use athletrack_common::config::AppConfig;
use athletrack_model::kind::TestKind;

pub fn run(config: &AppConfig, kind: Option<TestKind>, json: bool) -> anyhow::Result<()> {
    let store = super::open_store(config);
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => TestKind::ALL.to_vec(),
    };

    for kind in kinds {
        let results = store.list_results(kind)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&results)?);
            continue;
        }

        println!("{kind} ({} results)", results.len());
        for result in &results {
            println!(
                "  {}  {}  {}",
                result.id.as_deref().unwrap_or("-"),
                result.created_at,
                result.headline()
            );
            if !result.warnings.is_empty() {
                println!("      {} warning(s)", result.warnings.len());
            }
        }
    }

    Ok(())
}
