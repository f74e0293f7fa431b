//! Bundle and verify-archive command implementations.

use super::open_lab;
use medialab_archive::read_archive;
use medialab_lab::Stage;
use std::path::Path;

/// Writes a stage's resources into a ZIP.
pub async fn run(path: &Path, stage: Stage, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let lab = open_lab(path).await?;
    let bytes = lab.stage_bundle(stage).await?;
    lab.close().await?;

    std::fs::write(output, &bytes)?;
    println!("✓ Wrote {} bundle to {:?} ({} bytes)", stage, output, bytes.len());
    Ok(())
}

/// Checks every header and checksum of a ZIP.
pub fn verify(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying archive {:?}", file);
    println!();

    let bytes = std::fs::read(file)?;
    let entries = read_archive(&bytes)?;
    for entry in &entries {
        println!(
            "  {:>8}  {:08x}  @{:<8} {}",
            entry.data.len(),
            entry.crc32,
            entry.offset,
            entry.name
        );
    }
    println!();
    println!("✓ {} entries, {} bytes, all checksums match", entries.len(), bytes.len());
    Ok(())
}
