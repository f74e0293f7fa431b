//! Inspect command implementation.

use medialab_store::{RecordStore, StoreConfig, StoreStats};
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Version, collections and log size.
    #[serde(flatten)]
    pub stats: StoreStats,
}

/// Runs the inspect command.
///
/// Opens at whatever version is stored, so no upgrade ever runs.
pub async fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if RecordStore::probe_version(path).await?.is_none() {
        return Err(format!("No store found at {:?}", path).into());
    }

    let config = StoreConfig::default().create_if_missing(false);
    let store = RecordStore::open_with_config(path, config, 0, |_| Ok(())).await?;
    let result = InspectResult {
        path: path.display().to_string(),
        stats: store.stats()?,
    };
    store.close().await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "text" => print_text(&result),
        other => return Err(format!("Unknown format: {other} (expected text or json)").into()),
    }
    Ok(())
}

fn print_text(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!("  Schema version: {}", result.stats.schema_version);
    println!("  Log size:       {} bytes", result.stats.log_bytes);
    println!();
    println!("Collections:");
    for c in &result.stats.collections {
        println!("  {:<12} key {:<6} {:>6} records", c.name, c.key_path, c.records);
    }
}
