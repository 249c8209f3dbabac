//! Show the effective configuration.

use std::path::Path;

use athletrack_common::config::AppConfig;

pub fn run(config: &AppConfig, config_path: &Path, save: bool) -> anyhow::Result<()> {
    println!("# Config file: {}", config_path.display());
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        config.save_to(config_path)?;
        println!("# Saved to {}", config_path.display());
    }

    Ok(())
}
