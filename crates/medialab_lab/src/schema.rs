//! Collections of the lab store.

use medialab_store::Schema;

/// Schema version of this build.
pub const SCHEMA_VERSION: u64 = 12;

/// Accounts, keyed by `email`.
pub const USERS: &str = "users";
/// Typed settings, keyed by `key`.
pub const SETTINGS: &str = "settings";
/// Projects, keyed by `id` (the student email).
pub const PROJECTS: &str = "projects";
/// Student uploads, keyed by `id`.
pub const FILES: &str = "files";
/// Comments, keyed by `id`.
pub const COMMENTS: &str = "comments";
/// Worksheets, keyed by `id`.
pub const SUBMISSIONS: &str = "submissions";
/// Admin resource files, keyed by `id`.
pub const ASSETS: &str = "assets";

/// The lab schema.
#[must_use]
pub fn lab_schema() -> Schema {
    Schema::new(SCHEMA_VERSION)
        .collection(USERS, "email")
        .collection(SETTINGS, "key")
        .collection(PROJECTS, "id")
        .collection(FILES, "id")
        .collection(COMMENTS, "id")
        .collection(SUBMISSIONS, "id")
        .collection(ASSETS, "id")
}
