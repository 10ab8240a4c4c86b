pub mod check;
pub mod connectors;
pub mod write;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use sinkbyte_engine::config::{parser, validator, Settings};
use sinkbyte_engine::{Dispatcher, ExecutionOptions, Initializer};

static INITIALIZER: Initializer = Initializer::new();

/// Load and validate settings, then build the dispatcher against Docker.
pub fn dispatcher(settings_path: Option<&Path>) -> Result<Arc<Dispatcher>> {
    let settings = match settings_path {
        Some(path) => parser::parse_settings(path)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?,
        None => Settings::default(),
    };
    validator::validate_settings(&settings)?;
    let dispatcher = INITIALIZER
        .initialize(&settings)
        .context("Failed to initialize destinations")?;
    Ok(dispatcher)
}

/// Read a JSON document from `path`.
pub fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Options bounded by `timeout_secs` when given.
pub fn execution_options(timeout_secs: Option<u64>) -> ExecutionOptions {
    match timeout_secs {
        Some(secs) => ExecutionOptions::with_timeout(Duration::from_secs(secs)),
        None => ExecutionOptions::default(),
    }
}
