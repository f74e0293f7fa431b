//! Typed records of the `settings` collection.
//!
//! Every settings record is a [`SettingRecord`]: the key the collection is
//! indexed by plus one [`Setting`] variant. The key decides the variant:
//!
//! | key                | variant                  |
//! |--------------------|--------------------------|
//! | `uploads`          | [`Setting::Uploads`]     |
//! | `resources`        | [`Setting::Resources`]   |
//! | `prefs:<email>`    | [`Setting::Preferences`] |
//! | `notices:<email>`  | [`Setting::Notices`]     |

use crate::model::Notice;
use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Key of the upload policy record.
pub const UPLOADS_KEY: &str = "uploads";

/// Key of the stage resources record.
pub const RESOURCES_KEY: &str = "resources";

/// Key of a user's preferences record.
#[must_use]
pub fn preferences_key(email: &str) -> String {
    format!("prefs:{email}")
}

/// Key of a user's notices record.
#[must_use]
pub fn notices_key(email: &str) -> String {
    format!("notices:{email}")
}

/// A record in the `settings` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRecord {
    /// Collection key.
    pub key: String,
    /// The typed value.
    pub setting: Setting,
}

/// The shapes a settings record can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    /// Which student upload types are allowed.
    Uploads(UploadPolicy),
    /// Per-stage resources chosen by an admin.
    Resources(Resources),
    /// A user's checklist and display preferences.
    Preferences(Preferences),
    /// A user's notices, newest first.
    Notices(Notices),
}

/// Student upload permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// `application/pdf`.
    pub pdf: bool,
    /// `image/*`.
    pub images: bool,
    /// `video/*`.
    pub video: bool,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            pdf: true,
            images: true,
            video: true,
        }
    }
}

impl UploadPolicy {
    /// Returns true if a file of `content_type` may be uploaded.
    ///
    /// Types outside the three switchable families are always allowed.
    #[must_use]
    pub fn allows(&self, content_type: &str) -> bool {
        let content_type = content_type.trim().to_ascii_lowercase();
        if content_type == "application/pdf" {
            self.pdf
        } else if content_type.starts_with("image/") {
            self.images
        } else if content_type.starts_with("video/") {
            self.video
        } else {
            true
        }
    }
}

/// Kind of downloadable stage resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Word document.
    Word,
    /// PDF.
    Pdf,
    /// PowerPoint deck.
    Pptx,
}

impl ResourceKind {
    /// Every kind, in bundle order.
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Word, ResourceKind::Pdf, ResourceKind::Pptx];

    /// Lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "word" | "docx" => Ok(Self::Word),
            "pdf" => Ok(Self::Pdf),
            "pptx" | "slides" => Ok(Self::Pptx),
            other => Err(format!("unknown resource kind: {other}")),
        }
    }
}

/// A resource file: an asset id and the name shown for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFile {
    /// Key in the `assets` collection.
    pub asset_id: String,
    /// Display name.
    pub name: String,
}

/// Resources for one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResources {
    /// External link (e.g. the source lesson).
    pub link: String,
    /// Video URL.
    pub video_url: String,
    /// Files by kind.
    pub files: BTreeMap<ResourceKind, ResourceFile>,
}

/// Resources for every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// Per stage.
    pub stages: BTreeMap<Stage, StageResources>,
}

impl Resources {
    /// Resources for `stage`, or `None` if nothing was set.
    #[must_use]
    pub fn stage(&self, stage: Stage) -> Option<&StageResources> {
        self.stages.get(&stage)
    }

    /// Mutable resources for `stage`, created if missing.
    pub fn stage_mut(&mut self, stage: Stage) -> &mut StageResources {
        self.stages.entry(stage).or_default()
    }
}

/// Per-user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Show the guided checklist.
    pub guided: bool,
    /// Larger text.
    pub large_text: bool,
    /// `chk:<stage>:<item>` to checked.
    pub checks: BTreeMap<String, bool>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            guided: true,
            large_text: false,
            checks: BTreeMap::new(),
        }
    }
}

impl Preferences {
    /// Checklist key of an item.
    #[must_use]
    pub fn check_key(stage: Stage, item: &str) -> String {
        format!("chk:{}:{item}", stage.key())
    }

    /// Returns true if the item is ticked.
    #[must_use]
    pub fn is_checked(&self, stage: Stage, item: &str) -> bool {
        self.checks
            .get(&Self::check_key(stage, item))
            .copied()
            .unwrap_or(false)
    }

    /// Number of ticked items across every stage.
    #[must_use]
    pub fn checked_count(&self) -> usize {
        self.checks.values().filter(|&&v| v).count()
    }
}

/// A user's notices, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notices {
    /// Notices, newest first.
    pub items: Vec<Notice>,
}

impl Notices {
    /// Puts `notice` first and drops the oldest beyond `cap`.
    pub fn push(&mut self, notice: Notice, cap: usize) {
        self.items.insert(0, notice);
        self.items.truncate(cap);
    }
}
