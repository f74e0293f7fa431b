//! Admin assets, stage resources, student uploads and stage bundles.

use super::{new_id, normalize_email, now_millis, Lab};
use crate::error::{LabError, LabResult};
use crate::model::{Asset, Role, StudentFile};
use crate::schema::{ASSETS, FILES};
use crate::session::Session;
use crate::settings::{ResourceFile, ResourceKind, Resources, Setting, UploadPolicy, RESOURCES_KEY, UPLOADS_KEY};
use crate::stage::Stage;
use medialab_archive::Entry;
use tracing::{debug, info, warn};

impl Lab {
    /// Stores a resource file (admin only).
    pub async fn save_asset(
        &self,
        session: &Session,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> LabResult<Asset> {
        session.require(&[Role::Admin], "upload resources")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(LabError::invalid("asset name is empty"));
        }
        let asset = Asset {
            id: new_id(),
            name: name.to_owned(),
            content_type: content_type.trim().to_owned(),
            data,
            created_at: now_millis(),
        };
        self.store.put_typed(ASSETS, &asset).await?;
        info!(id = %asset.id, name = %asset.name, size = asset.data.len(), "asset saved");
        Ok(asset)
    }

    /// Looks up an asset.
    pub async fn asset(&self, id: &str) -> LabResult<Option<Asset>> {
        Ok(self.store.get_typed(ASSETS, id).await?)
    }

    /// The resources of every stage.
    pub async fn resources(&self) -> LabResult<Resources> {
        match self.setting(RESOURCES_KEY).await? {
            Some(Setting::Resources(resources)) => Ok(resources),
            Some(_) => {
                warn!(key = RESOURCES_KEY, "settings record has the wrong shape, using defaults");
                Ok(Resources::default())
            }
            None => Ok(Resources::default()),
        }
    }

    /// Points a stage's `kind` slot at an asset (admin only).
    ///
    /// The asset must exist; its name becomes the display name.
    pub async fn set_stage_resource(
        &self,
        session: &Session,
        stage: Stage,
        kind: ResourceKind,
        asset_id: &str,
    ) -> LabResult<Resources> {
        session.require(&[Role::Admin], "set stage resources")?;
        let asset = self.asset(asset_id).await?.ok_or_else(|| LabError::MissingAsset {
            id: asset_id.to_owned(),
        })?;

        let mut resources = self.resources().await?;
        resources.stage_mut(stage).files.insert(
            kind,
            ResourceFile {
                asset_id: asset.id,
                name: asset.name,
            },
        );
        self.put_setting(RESOURCES_KEY, Setting::Resources(resources.clone()))
            .await?;
        info!(stage = stage.key(), kind = kind.as_str(), asset_id, "stage resource set");
        Ok(resources)
    }

    /// Clears a stage's `kind` slot (admin only).
    pub async fn clear_stage_resource(&self, session: &Session, stage: Stage, kind: ResourceKind) -> LabResult<()> {
        session.require(&[Role::Admin], "set stage resources")?;
        let mut resources = self.resources().await?;
        if resources.stage_mut(stage).files.remove(&kind).is_some() {
            self.put_setting(RESOURCES_KEY, Setting::Resources(resources))
                .await?;
        }
        Ok(())
    }

    /// Sets a stage's external link and video URL (admin only).
    pub async fn set_stage_link(
        &self,
        session: &Session,
        stage: Stage,
        link: &str,
        video_url: &str,
    ) -> LabResult<()> {
        session.require(&[Role::Admin], "set stage resources")?;
        let mut resources = self.resources().await?;
        let entry = resources.stage_mut(stage);
        entry.link = link.trim().to_owned();
        entry.video_url = video_url.trim().to_owned();
        self.put_setting(RESOURCES_KEY, Setting::Resources(resources))
            .await
    }

    /// The student upload policy.
    pub async fn upload_policy(&self) -> LabResult<UploadPolicy> {
        match self.setting(UPLOADS_KEY).await? {
            Some(Setting::Uploads(policy)) => Ok(policy),
            Some(_) => {
                warn!(key = UPLOADS_KEY, "settings record has the wrong shape, using defaults");
                Ok(UploadPolicy::default())
            }
            None => Ok(UploadPolicy::default()),
        }
    }

    /// Replaces the student upload policy (admin only).
    pub async fn set_upload_policy(&self, session: &Session, policy: UploadPolicy) -> LabResult<()> {
        session.require(&[Role::Admin], "change the upload policy")?;
        self.put_setting(UPLOADS_KEY, Setting::Uploads(policy)).await?;
        info!(pdf = policy.pdf, images = policy.images, video = policy.video, "upload policy changed");
        Ok(())
    }

    /// Returns true if students may upload files of `content_type`.
    pub async fn upload_allowed(&self, content_type: &str) -> LabResult<bool> {
        Ok(self.upload_policy().await?.allows(content_type))
    }

    /// Stores a file the signed-in student uploads for a stage.
    pub async fn upload_file(
        &self,
        session: &Session,
        stage: Stage,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> LabResult<StudentFile> {
        session.require(&[Role::Student], "upload work")?;
        if !self.upload_allowed(content_type).await? {
            return Err(LabError::UploadNotAllowed {
                content_type: content_type.to_owned(),
            });
        }
        let file = StudentFile {
            id: new_id(),
            email: session.email().to_owned(),
            stage,
            name: name.trim().to_owned(),
            content_type: content_type.trim().to_owned(),
            data,
            created_at: now_millis(),
        };
        self.store.put_typed(FILES, &file).await?;
        debug!(email = %file.email, stage = stage.key(), name = %file.name, "student file uploaded");
        Ok(file)
    }

    /// Files a student uploaded for a stage, oldest first.
    pub async fn files_for(&self, session: &Session, email: &str, stage: Stage) -> LabResult<Vec<StudentFile>> {
        let email = normalize_email(email);
        session.require_view(&email, "view uploads")?;
        let mut files: Vec<StudentFile> = self
            .store
            .get_all_typed::<StudentFile>(FILES)
            .await?
            .into_iter()
            .filter(|f| f.email == email && f.stage == stage)
            .collect();
        files.sort_by_key(|f| f.created_at);
        Ok(files)
    }

    /// Packs a stage's Word, PDF and PowerPoint resources into a ZIP.
    ///
    /// Slots with no resource are skipped. A slot whose asset record is
    /// gone fails with `MissingAsset`.
    pub async fn stage_bundle(&self, stage: Stage) -> LabResult<Vec<u8>> {
        let resources = self.resources().await?;
        let mut entries = Vec::new();
        if let Some(stage_resources) = resources.stage(stage) {
            for kind in ResourceKind::ALL {
                let Some(file) = stage_resources.files.get(&kind) else {
                    continue;
                };
                let asset = self.asset(&file.asset_id).await?.ok_or_else(|| LabError::MissingAsset {
                    id: file.asset_id.clone(),
                })?;
                let name = if file.name.is_empty() { asset.name } else { file.name.clone() };
                entries.push(Entry::new(name, asset.data));
            }
        }

        let bytes = medialab_archive::build(&entries)?;
        info!(stage = stage.key(), entries = entries.len(), size = bytes.len(), "stage bundle built");
        Ok(bytes)
    }
}
