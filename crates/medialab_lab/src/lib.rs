//! # MediaLab
//!
//! A classroom film-project tracker. Students work through four production
//! stages (development, pre-production, production, post-production),
//! filling in worksheets and ticking checklists. Teachers score each stage
//! against a rubric and leave feedback; admins manage accounts and the
//! resource files each stage offers as a downloadable ZIP bundle; guardians
//! get a read-only view of one linked student.
//!
//! Everything is kept in a [`medialab_store::RecordStore`] at schema
//! version [`SCHEMA_VERSION`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use medialab_lab::{Lab, LabConfig, LabResult, NewUser, Role, Stage};
//!
//! # async fn run() -> LabResult<()> {
//! let lab = Lab::open("lab-data", LabConfig::default()).await?;
//! let admin = lab.login("admin@oakhill.local", "admin123").await?;
//!
//! lab.save_user(
//!     &admin,
//!     NewUser {
//!         email: "ada@oakhill.local".into(),
//!         name: "Ada".into(),
//!         role: Role::Student,
//!         password: "changeme".into(),
//!         guardian_of: None,
//!     },
//! )
//! .await?;
//!
//! let ada = lab.login("ada@oakhill.local", "changeme").await?;
//! lab.mark_stage_complete(&ada, "ada@oakhill.local", Stage::Development, true)
//!     .await?;
//! assert_eq!(lab.progress_percent(&ada, "ada@oakhill.local").await?, 25);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod lab;
mod model;
mod password;
mod schema;
mod session;
pub mod settings;
mod stage;
pub mod worksheets;

pub use config::LabConfig;
pub use error::{LabError, LabResult};
pub use lab::{GuardianStage, GuardianView, Lab, NewUser, StudentSummary};
pub use model::{Asset, Comment, Notice, Project, Role, StageProgress, StudentFile, Submission, SubmissionStatus, User};
pub use password::{hash_password, verify_password};
pub use schema::{lab_schema, ASSETS, COMMENTS, FILES, PROJECTS, SCHEMA_VERSION, SETTINGS, SUBMISSIONS, USERS};
pub use session::Session;
pub use stage::{Award, Badge, Stage, UnknownStage, MAX_CRITERION_SCORE};
