//! Logging and tracing initialization.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::AthleteResult;

/// Initialize the tracing subscriber with the given configuration.
///
/// `RUST_LOG` overrides `config.level` when set. Logs go to stderr unless a
/// file is configured, in which case they are appended to it without ANSI
/// colors. Calling this twice keeps the first subscriber.
pub fn init_logging(config: &LoggingConfig) -> AthleteResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (writer, ansi) = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(ansi);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish()).ok();
    } else {
        let subscriber = builder
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_logging_creates_parent_dirs() {
        let dir = std::env::temp_dir().join("athletrack_test_logging");
        let _ = std::fs::remove_dir_all(&dir);

        let config = LoggingConfig {
            level: "debug".to_string(),
            json: true,
            file: Some(dir.join("nested").join("athletrack.log")),
        };
        init_logging(&config).unwrap();
        assert!(dir.join("nested").join("athletrack.log").exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
