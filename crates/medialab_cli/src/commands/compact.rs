//! Compact command implementation.

use super::open_lab;
use std::path::Path;

/// Runs the compact command.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Compacting record log at {:?}", path);
    println!();

    let lab = open_lab(path).await?;
    let stats = lab.store().compact().await?;
    lab.close().await?;

    let saved = stats.bytes_before.saturating_sub(stats.bytes_after);
    println!("  Live records: {}", stats.records);
    println!("  Size before:  {} bytes", stats.bytes_before);
    println!("  Size after:   {} bytes", stats.bytes_after);
    println!(
        "  Space saved:  {} bytes ({:.1}%)",
        saved,
        if stats.bytes_before > 0 {
            saved as f64 / stats.bytes_before as f64 * 100.0
        } else {
            0.0
        }
    );
    println!();
    println!("✓ Compaction complete");
    Ok(())
}
