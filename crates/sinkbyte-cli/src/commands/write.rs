use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sinkbyte_engine::ExecuteOutput;
use sinkbyte_types::payload::DataPayload;

pub struct WriteArgs {
    pub definition: String,
    pub config: PathBuf,
    pub input: PathBuf,
    pub idempotency_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Execute the `write` command: deliver payloads to one destination.
pub async fn execute(settings: Option<&Path>, args: &WriteArgs) -> Result<()> {
    let dispatcher = super::dispatcher(settings)?;
    let uid = dispatcher.resolve(&args.definition)?.uid;
    let config = super::read_json(&args.config)?;
    let items: Vec<DataPayload> = serde_json::from_value(super::read_json(&args.input)?)
        .with_context(|| format!("Invalid payloads in {}", args.input.display()))?;

    let mut opts = super::execution_options(args.timeout_secs);
    if let Some(key) = &args.idempotency_key {
        opts = opts.idempotency_key(key.clone());
    }
    let cancel = opts.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling write");
            cancel.cancel();
        }
    });

    let connection = dispatcher
        .dispatch(&uid, config)
        .with_context(|| format!("Failed to connect to '{}'", args.definition))?;

    tracing::info!(
        definition = %connection.definition().id,
        items = items.len(),
        "Writing payloads"
    );
    let output = connection.execute(&items, &opts).await?;

    match &output {
        ExecuteOutput::Delivered(summary) => {
            println!("Delivered {} record(s) to '{}'.", summary.records, args.definition);
            println!("  Run key: {}", summary.run_key);
        }
        ExecuteOutput::Assets(assets) => {
            let total: usize = assets.values().map(Vec::len).sum();
            println!("Committed {total} asset(s) to '{}'.", args.definition);
            for (index, refs) in assets {
                for asset in refs {
                    println!("  [{index}] {}", asset.asset_url);
                }
            }
        }
    }
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}
