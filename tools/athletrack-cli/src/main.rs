//! Athletrack CLI: Command-line interface for calibration and test analysis.
//!
//! Usage:
//!   athletrack calibrate --kind <KIND> --point X,Y ...   Store a calibration
//!   athletrack run --kind <KIND> <RECORDING>             Analyze a landmark recording
//!   athletrack results [--kind <KIND>]                   List stored results
//!   athletrack overlay --kind <KIND>                     Print overlay geometry
//!   athletrack config                                    Show the effective configuration

use std::path::PathBuf;

use athletrack_common::config::AppConfig;
use athletrack_model::geometry::Point2D;
use athletrack_model::kind::TestKind;
use clap::{Parser, Subcommand};

mod commands;
mod driver;
mod engine;

#[derive(Parser)]
#[command(
    name = "athletrack",
    about = "Camera-based athletic test analysis",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the standard location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory for calibrations and results
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate a test from clicked pixel positions
    Calibrate {
        /// Test kind: jump|sprint|kick
        #[arg(short, long)]
        kind: TestKind,

        /// Clicked pixel as X,Y, in the order of the test's marks
        #[arg(short, long = "point", value_parser = parse_point, required = true)]
        points: Vec<Point2D>,
    },

    /// Analyze a landmark recording
    Run {
        /// Test kind: jump|sprint|kick
        #[arg(short, long)]
        kind: TestKind,

        /// Path to the JSONL landmark recording
        recording: PathBuf,

        /// Athlete height in centimeters (overrides the config)
        #[arg(long)]
        height_cm: Option<f64>,

        /// Maximum analysis rate in frames per second (0 = every frame)
        #[arg(long, default_value = "0")]
        max_fps: u32,

        /// Do not store the result
        #[arg(long)]
        no_save: bool,
    },

    /// List stored results
    Results {
        /// Only this test kind
        #[arg(short, long)]
        kind: Option<TestKind>,

        /// Print full results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the overlay geometry of a stored calibration as JSON
    Overlay {
        /// Test kind: jump|sprint|kick
        #[arg(short, long)]
        kind: TestKind,

        /// Image width
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Image height
        #[arg(long, default_value = "1080")]
        height: u32,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

fn parse_point(value: &str) -> Result<Point2D, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{value}'"))?;
    let x = x
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid X in '{value}': {e}"))?;
    let y = y
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid Y in '{value}': {e}"))?;
    Ok(Point2D::new(x, y))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(athletrack_common::config::config_file_path);
    let mut config = AppConfig::load_from(&config_path);
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    // Initialize logging
    athletrack_common::logging::init_logging(&config.logging)?;

    match cli.command {
        Commands::Calibrate { kind, points } => commands::calibrate::run(&config, kind, points),
        Commands::Run {
            kind,
            recording,
            height_cm,
            max_fps,
            no_save,
        } => commands::run::run(&config, kind, recording, height_cm, max_fps, !no_save).await,
        Commands::Results { kind, json } => commands::results::run(&config, kind, json),
        Commands::Overlay {
            kind,
            width,
            height,
        } => commands::overlay::run(&config, kind, width, height),
        Commands::Config { save } => commands::config::run(&config, &config_path, save),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("12.5, 40").unwrap(), Point2D::new(12.5, 40.0));
        assert!(parse_point("12.5").is_err());
        assert!(parse_point("a,1").is_err());
    }

    #[test]
    fn test_cli_parses_calibrate() {
        let cli = Cli::try_parse_from([
            "athletrack",
            "calibrate",
            "--kind",
            "sprint",
            "--point",
            "100,500",
            "--point",
            "550,500",
            "--point",
            "1000,500",
        ])
        .unwrap();
        let Commands::Calibrate { kind, points } = cli.command else {
            panic!("expected calibrate");
        };
        assert_eq!(kind, TestKind::Sprint);
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn test_cli_rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["athletrack", "results", "--kind", "swim"]).is_err());
    }
}
