//! Comments, notices and checklist preferences.

use super::{new_id, normalize_email, now_millis, Lab};
use crate::error::{LabError, LabResult};
use crate::model::{Comment, Notice, Role};
use crate::schema::COMMENTS;
use crate::session::Session;
use crate::settings::{notices_key, preferences_key, Notices, Preferences, Setting};
use crate::stage::Stage;
use tracing::{debug, warn};

impl Lab {
    /// Adds a comment to a student's stage thread.
    ///
    /// Students may only comment on their own work; guardians never. The
    /// target must be an existing student, who gets a notice when someone
    /// else comments.
    pub async fn add_comment(
        &self,
        session: &Session,
        email: &str,
        stage: Stage,
        text: &str,
    ) -> LabResult<Comment> {
        session.require(&[Role::Student, Role::Teacher, Role::Admin], "comment")?;
        let email = normalize_email(email);
        session.require_view(&email, "comment on this project")?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LabError::invalid("comment is empty"));
        }
        self.student_project(&email).await?;

        let comment = Comment {
            id: new_id(),
            email: email.clone(),
            stage,
            author_role: session.role(),
            author: session.name().to_owned(),
            text: text.to_owned(),
            created_at: now_millis(),
        };
        self.store.put_typed(COMMENTS, &comment).await?;

        if session.email() != email {
            self.push_notice(&email, &format!("New comment on {stage} from {}", session.name()))
                .await?;
        }
        debug!(email = %email, stage = stage.key(), author = %comment.author, "comment added");
        Ok(comment)
    }

    /// A stage thread, oldest first.
    pub async fn comments_for(&self, session: &Session, email: &str, stage: Stage) -> LabResult<Vec<Comment>> {
        let email = normalize_email(email);
        session.require_view(&email, "read comments")?;
        let mut comments: Vec<Comment> = self
            .comments_of(&email)
            .await?
            .into_iter()
            .filter(|c| c.stage == stage)
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    pub(crate) async fn comments_of(&self, email: &str) -> LabResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .store
            .get_all_typed::<Comment>(COMMENTS)
            .await?
            .into_iter()
            .filter(|c| c.email == email)
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    /// Puts a notice at the top of a user's list, keeping the newest
    /// `notice_cap`.
    pub async fn push_notice(&self, email: &str, message: &str) -> LabResult<()> {
        let email = normalize_email(email);
        let key = notices_key(&email);
        let mut notices = self.notices(&key).await?;
        notices.push(
            Notice {
                id: new_id(),
                message: message.to_owned(),
                created_at: now_millis(),
            },
            self.config.notice_cap,
        );
        self.put_setting(&key, Setting::Notices(notices)).await
    }

    /// The signed-in user's notices, newest first.
    pub async fn pull_notices(&self, session: &Session) -> LabResult<Vec<Notice>> {
        Ok(self.notices(&notices_key(session.email())).await?.items)
    }

    async fn notices(&self, key: &str) -> LabResult<Notices> {
        match self.setting(key).await? {
            Some(Setting::Notices(notices)) => Ok(notices),
            Some(_) => {
                warn!(key, "settings record has the wrong shape, starting over");
                Ok(Notices::default())
            }
            None => Ok(Notices::default()),
        }
    }

    /// Ticks or unticks a guided checklist item for the signed-in user.
    pub async fn set_checklist_item(
        &self,
        session: &Session,
        stage: Stage,
        item: &str,
        checked: bool,
    ) -> LabResult<Preferences> {
        if !stage.checklist().iter().any(|(id, _)| *id == item) {
            return Err(LabError::invalid(format!("{item:?} is not on the {stage} checklist")));
        }
        let key = preferences_key(session.email());
        let mut prefs = self.preferences(&key).await?;
        prefs.checks.insert(Preferences::check_key(stage, item), checked);
        self.put_setting(&key, Setting::Preferences(prefs.clone()))
            .await?;
        Ok(prefs)
    }

    /// The signed-in user's preferences, defaults if never saved.
    pub async fn checklist(&self, session: &Session) -> LabResult<Preferences> {
        self.preferences(&preferences_key(session.email())).await
    }

    async fn preferences(&self, key: &str) -> LabResult<Preferences> {
        match self.setting(key).await? {
            Some(Setting::Preferences(prefs)) => Ok(prefs),
            Some(_) => {
                warn!(key, "settings record has the wrong shape, starting over");
                Ok(Preferences::default())
            }
            None => Ok(Preferences::default()),
        }
    }
}
