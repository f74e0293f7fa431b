//! Asset and stage resource command implementations.

use super::{sign_in, Credentials};
use medialab_lab::settings::ResourceKind;
use medialab_lab::Stage;
use std::path::Path;

/// Uploads a file as a resource asset and prints its id.
pub async fn add(
    path: &Path,
    credentials: &Credentials,
    file: &Path,
    content_type: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(file).map_err(|e| format!("cannot read {:?}: {e}", file))?;
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| format!("not a file name: {:?}", file))?;
    let content_type = content_type.unwrap_or_else(|| guess_content_type(name));

    let (lab, session) = sign_in(path, credentials).await?;
    let asset = lab.save_asset(&session, name, content_type, data).await?;
    lab.close().await?;

    println!("✓ Stored {} ({}, {} bytes)", asset.name, asset.content_type, asset.data.len());
    println!("{}", asset.id);
    Ok(())
}

/// Attaches an asset to a stage slot.
pub async fn set_resource(
    path: &Path,
    credentials: &Credentials,
    stage: Stage,
    kind: ResourceKind,
    asset_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (lab, session) = sign_in(path, credentials).await?;
    lab.set_stage_resource(&session, stage, kind, asset_id).await?;
    lab.close().await?;
    println!("✓ {stage} {kind} now points at {asset_id}");
    Ok(())
}

fn guess_content_type(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("ppt") => "application/vnd.ms-powerpoint",
        Some("pptx") => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
