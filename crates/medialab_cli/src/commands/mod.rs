//! CLI command implementations.

pub mod asset;
pub mod bundle;
pub mod compact;
pub mod export;
pub mod init;
pub mod inspect;
pub mod user;

use medialab_lab::{Lab, LabConfig, Session};
use medialab_store::StoreConfig;
use std::path::Path;
use tracing::debug;

/// Account the CLI signs in as.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Login email.
    pub email: String,
    /// Password.
    pub password: String,
}

/// Opens an existing lab store.
pub async fn open_lab(path: &Path) -> Result<Lab, Box<dyn std::error::Error>> {
    debug!(path = %path.display(), "opening lab store");
    let config = LabConfig::default().store(StoreConfig::default().create_if_missing(false));
    Lab::open(path, config)
        .await
        .map_err(|e| format!("cannot open store at {}: {e}", path.display()).into())
}

/// Opens an existing lab store and signs in.
pub async fn sign_in(
    path: &Path,
    credentials: &Credentials,
) -> Result<(Lab, Session), Box<dyn std::error::Error>> {
    let lab = open_lab(path).await?;
    let session = lab.login(&credentials.email, &credentials.password).await?;
    Ok((lab, session))
}
