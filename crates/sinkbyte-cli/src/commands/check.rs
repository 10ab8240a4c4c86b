use std::path::Path;

use anyhow::{Context, Result};
use sinkbyte_types::state::ConnectorState;

/// Execute the `check` command: test connectivity for one destination.
pub async fn execute(
    settings: Option<&Path>,
    definition: &str,
    config_path: &Path,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let dispatcher = super::dispatcher(settings)?;
    let uid = dispatcher.resolve(definition)?.uid;
    let config = super::read_json(config_path)?;

    let connection = dispatcher
        .dispatch(&uid, config)
        .with_context(|| format!("Failed to connect to '{definition}'"))?;
    let report = connection.test(&super::execution_options(timeout_secs)).await?;

    let status = match report.state {
        ConnectorState::Connected => "OK",
        ConnectorState::Error => "FAILED",
        ConnectorState::Unspecified => "UNKNOWN",
    };
    println!("{:18} {}", format!("{}:", connection.definition().id), status);
    if let Some(failure) = &report.failure {
        println!("  {failure}");
    }

    if report.is_connected() {
        Ok(())
    } else {
        anyhow::bail!("Connectivity check failed")
    }
}
