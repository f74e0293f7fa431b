//! Records kept in the lab store.

use crate::stage::{Badge, Stage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// What a signed-in user may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Works through the stages.
    Student,
    /// Reviews, scores and comments.
    Teacher,
    /// Manages accounts and stage resources.
    Admin,
    /// Read-only view of one linked student.
    Guardian,
}

impl Role {
    /// Lower-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
            Self::Guardian => "guardian",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "admin" => Ok(Self::Admin),
            "guardian" => Ok(Self::Guardian),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An account, keyed by lower-cased email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login and key.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: Role,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Student email a guardian may view.
    #[serde(default)]
    pub guardian_of: Option<String>,
}

/// Progress through one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    /// Marked complete by the student or approved by a teacher.
    pub completed: bool,
    /// Student's own notes.
    pub notes: String,
    /// Teacher feedback.
    pub feedback: String,
    /// Criterion to score (0..=4).
    pub rubric: BTreeMap<String, u8>,
    /// Sum of the rubric scores.
    pub score: u32,
    /// Badge earned by `score`.
    pub badge: Option<Badge>,
}

static NOT_STARTED: StageProgress = StageProgress {
    completed: false,
    notes: String::new(),
    feedback: String::new(),
    rubric: BTreeMap::new(),
    score: 0,
    badge: None,
};

/// A student's project, keyed by the student's email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Student email.
    pub id: String,
    /// Progress per stage.
    pub stages: BTreeMap<Stage, StageProgress>,
}

impl Project {
    /// Creates a project with every stage not started.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: email.into(),
            stages: Stage::ALL
                .into_iter()
                .map(|stage| (stage, StageProgress::default()))
                .collect(),
        }
    }

    /// Progress for `stage`.
    #[must_use]
    pub fn stage(&self, stage: Stage) -> &StageProgress {
        self.stages.get(&stage).unwrap_or(&NOT_STARTED)
    }

    /// Mutable progress for `stage`, created if missing.
    pub fn stage_mut(&mut self, stage: Stage) -> &mut StageProgress {
        self.stages.entry(stage).or_default()
    }

    /// Share of stages completed, rounded to a whole percent.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        let done = Stage::ALL
            .into_iter()
            .filter(|&s| self.stage(s).completed)
            .count();
        ((done * 100 + Stage::ALL.len() / 2) / Stage::ALL.len()) as u8
    }

    /// True when every stage is complete.
    #[must_use]
    pub fn all_complete(&self) -> bool {
        Stage::ALL.into_iter().all(|s| self.stage(s).completed)
    }

    /// Sum of every stage score.
    #[must_use]
    pub fn total_score(&self) -> u32 {
        Stage::ALL.into_iter().map(|s| self.stage(s).score).sum()
    }
}

/// Review state of a worksheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Saved but not handed in.
    #[default]
    Draft,
    /// Handed in for review.
    Submitted,
    /// Reviewed by a teacher.
    Reviewed,
    /// Returned with requested changes.
    NeedsChanges,
}

impl SubmissionStatus {
    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Reviewed => "reviewed",
            Self::NeedsChanges => "needs_changes",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage worksheet; at most one per student and stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Generated id.
    pub id: String,
    /// Student email.
    pub email: String,
    /// Stage.
    pub stage: Stage,
    /// Review state.
    pub status: SubmissionStatus,
    /// Field id to answer.
    pub data: BTreeMap<String, String>,
    /// Last change, milliseconds since the Unix epoch.
    pub updated_at: u64,
}

/// A comment on a student's stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Generated id.
    pub id: String,
    /// Student the thread belongs to.
    pub email: String,
    /// Stage.
    pub stage: Stage,
    /// Role of the author.
    pub author_role: Role,
    /// Author display name.
    pub author: String,
    /// Body.
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// A message shown to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Generated id.
    pub id: String,
    /// Body.
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// A resource file uploaded by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Generated id.
    pub id: String,
    /// Original file name.
    pub name: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    #[serde(with = "bytes")]
    pub data: Vec<u8>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// A file a student uploaded for a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFile {
    /// Generated id.
    pub id: String,
    /// Student email.
    pub email: String,
    /// Stage.
    pub stage: Stage,
    /// Original file name.
    pub name: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    #[serde(with = "bytes")]
    pub data: Vec<u8>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// Byte buffers as CBOR byte strings instead of integer arrays.
mod bytes {
    use serde::de::{Error, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub(super) fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(data)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        deserializer.deserialize_byte_buf(BytesVisitor)
    }

    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a byte string")
        }

        fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(byte) = seq.next_element()? {
                out.push(byte);
            }
            Ok(out)
        }
    }
}
