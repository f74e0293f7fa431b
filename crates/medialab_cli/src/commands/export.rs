//! Export command implementations.

use super::{sign_in, Credentials};
use std::path::Path;

/// Writes class progress as CSV.
pub async fn csv(path: &Path, credentials: &Credentials, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (lab, session) = sign_in(path, credentials).await?;
    let csv = lab.export_csv(&session).await?;
    lab.close().await?;

    std::fs::write(output, csv.as_bytes())?;
    println!("✓ Wrote {} student row(s) to {:?}", csv.lines().count().saturating_sub(1), output);
    Ok(())
}
