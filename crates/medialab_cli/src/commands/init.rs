//! Init command implementation.

use medialab_lab::{Lab, LabConfig, SCHEMA_VERSION};
use medialab_store::RecordStore;
use std::path::Path;

/// Runs the init command.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let before = RecordStore::probe_version(path).await?;

    let config = LabConfig::default();
    let admin = config.admin_email.clone();
    let lab = Lab::open(path, config).await?;
    let version = lab.store().version();
    lab.close().await?;

    match before {
        None => {
            println!("Created store at {:?} (schema v{})", path, version);
            println!("Admin account: {admin}");
        }
        Some(v) if v < SCHEMA_VERSION => {
            println!("Upgraded store at {:?} from v{} to v{}", path, v, version);
        }
        Some(_) => println!("Store at {:?} is already at schema v{}", path, version),
    }
    Ok(())
}
