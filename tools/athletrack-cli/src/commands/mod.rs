pub mod calibrate;
pub mod config;
pub mod overlay;
pub mod results;
pub mod run;

use athletrack_common::config::AppConfig;
use athletrack_model::storage::{JsonFileStorage, ResultStore};

/// Result store rooted at the configured data directory.
pub fn open_store(config: &AppConfig) -> ResultStore<JsonFileStorage> {
    ResultStore::new(JsonFileStorage::new(&config.data_dir))
}
