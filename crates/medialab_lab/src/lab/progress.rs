//! Projects, worksheets and grading.

use super::{new_id, normalize_email, now_millis, Lab};
use crate::error::{LabError, LabResult};
use crate::model::{Project, Role, StageProgress, Submission, SubmissionStatus};
use crate::schema::{PROJECTS, SUBMISSIONS};
use crate::session::Session;
use crate::stage::{Badge, Stage, MAX_CRITERION_SCORE};
use crate::worksheets::{missing_required, normalize_answers};
use std::collections::BTreeMap;
use tracing::{debug, info};

impl Lab {
    /// A student's project, as visible to `session`.
    pub async fn project(&self, session: &Session, email: &str) -> LabResult<Project> {
        let email = normalize_email(email);
        session.require_view(&email, "view this project")?;
        self.student_project(&email).await
    }

    /// Share of the student's stages that are complete.
    pub async fn progress_percent(&self, session: &Session, email: &str) -> LabResult<u8> {
        Ok(self.project(session, email).await?.progress_percent())
    }

    /// Marks a stage complete or not.
    ///
    /// Students may change their own project; teachers and admins any.
    pub async fn mark_stage_complete(
        &self,
        session: &Session,
        email: &str,
        stage: Stage,
        completed: bool,
    ) -> LabResult<Project> {
        let email = normalize_email(email);
        if !(session.is_staff() || (session.role() == Role::Student && session.email() == email)) {
            return Err(LabError::Forbidden {
                role: session.role(),
                action: "change stage completion",
            });
        }
        let mut project = self.student_project(&email).await?;
        project.stage_mut(stage).completed = completed;
        self.store.put_typed(PROJECTS, &project).await?;
        info!(email = %email, stage = stage.key(), completed, "stage completion changed");
        Ok(project)
    }

    /// Saves the signed-in student's notes for a stage.
    pub async fn set_stage_notes(&self, session: &Session, stage: Stage, notes: &str) -> LabResult<()> {
        session.require(&[Role::Student], "write stage notes")?;
        let mut project = self.ensure_project(session.email()).await?;
        project.stage_mut(stage).notes = notes.to_owned();
        self.store.put_typed(PROJECTS, &project).await?;
        Ok(())
    }

    /// Saves the signed-in student's worksheet for a stage.
    ///
    /// Answers are trimmed and unknown fields dropped. With `submit` every
    /// required answer must be present, otherwise `IncompleteWorksheet`. A
    /// draft save keeps the status the worksheet already had.
    pub async fn save_submission(
        &self,
        session: &Session,
        stage: Stage,
        answers: BTreeMap<String, String>,
        submit: bool,
    ) -> LabResult<Submission> {
        session.require(&[Role::Student], "fill in worksheets")?;
        let data = normalize_answers(stage, answers);

        if submit {
            let missing = missing_required(stage, &data);
            if !missing.is_empty() {
                return Err(LabError::IncompleteWorksheet {
                    stage,
                    missing: missing.into_iter().map(str::to_owned).collect(),
                });
            }
        }

        let existing = self.find_submission(session.email(), stage).await?;
        let submission = match existing {
            Some(mut sub) => {
                sub.data = data;
                sub.updated_at = now_millis();
                if submit {
                    sub.status = SubmissionStatus::Submitted;
                }
                sub
            }
            None => Submission {
                id: new_id(),
                email: session.email().to_owned(),
                stage,
                status: if submit {
                    SubmissionStatus::Submitted
                } else {
                    SubmissionStatus::Draft
                },
                data,
                updated_at: now_millis(),
            },
        };
        self.store.put_typed(SUBMISSIONS, &submission).await?;
        debug!(
            email = %submission.email,
            stage = stage.key(),
            status = %submission.status,
            "worksheet saved"
        );
        Ok(submission)
    }

    /// The worksheet a student saved for a stage, if any.
    pub async fn get_submission(
        &self,
        session: &Session,
        email: &str,
        stage: Stage,
    ) -> LabResult<Option<Submission>> {
        let email = normalize_email(email);
        session.require_view(&email, "view worksheets")?;
        self.find_submission(&email, stage).await
    }

    /// Returns true if every required answer is filled in.
    #[must_use]
    pub fn validate_submission(submission: &Submission) -> bool {
        missing_required(submission.stage, &submission.data).is_empty()
    }

    /// Scores a stage against its rubric (teachers and admins).
    ///
    /// Every criterion must belong to the stage rubric and score at most
    /// four. The stage total and badge are recomputed from the new scores.
    pub async fn score_rubric(
        &self,
        session: &Session,
        email: &str,
        stage: Stage,
        scores: BTreeMap<String, u8>,
    ) -> LabResult<StageProgress> {
        session.require(&[Role::Teacher, Role::Admin], "score rubrics")?;
        let criteria = stage.rubric();
        for (criterion, &score) in &scores {
            if !criteria.contains(&criterion.as_str()) {
                return Err(LabError::invalid(format!(
                    "{criterion:?} is not a {stage} criterion"
                )));
            }
            if score > MAX_CRITERION_SCORE {
                return Err(LabError::invalid(format!(
                    "{criterion:?} scored {score}, above {MAX_CRITERION_SCORE}"
                )));
            }
        }

        let email = normalize_email(email);
        let mut project = self.student_project(&email).await?;
        let progress = project.stage_mut(stage);
        progress.score = scores.values().map(|&s| u32::from(s)).sum();
        progress.badge = Badge::for_score(progress.score);
        progress.rubric = scores;
        let progress = progress.clone();
        self.store.put_typed(PROJECTS, &project).await?;

        info!(
            email = %email,
            stage = stage.key(),
            score = progress.score,
            badge = progress.badge.map(Badge::label),
            "rubric scored"
        );
        Ok(progress)
    }

    /// Records teacher feedback and the review outcome.
    ///
    /// `status` must be `Reviewed` or `NeedsChanges`. The student is sent a
    /// notice unless they wrote the feedback themselves.
    pub async fn set_feedback(
        &self,
        session: &Session,
        email: &str,
        stage: Stage,
        feedback: &str,
        status: SubmissionStatus,
    ) -> LabResult<()> {
        session.require(&[Role::Teacher, Role::Admin], "give feedback")?;
        if !matches!(status, SubmissionStatus::Reviewed | SubmissionStatus::NeedsChanges) {
            return Err(LabError::invalid(format!(
                "feedback status must be reviewed or needs_changes, not {status}"
            )));
        }

        let email = normalize_email(email);
        let mut project = self.student_project(&email).await?;
        project.stage_mut(stage).feedback = feedback.to_owned();
        self.store.put_typed(PROJECTS, &project).await?;

        if let Some(mut sub) = self.find_submission(&email, stage).await? {
            sub.status = status;
            sub.updated_at = now_millis();
            self.store.put_typed(SUBMISSIONS, &sub).await?;
        }

        if session.email() != email {
            let message = match status {
                SubmissionStatus::NeedsChanges => format!("Feedback: please improve your {stage}"),
                _ => format!("Your {stage} has been reviewed"),
            };
            self.push_notice(&email, &message).await?;
        }
        info!(email = %email, stage = stage.key(), status = %status, "feedback saved");
        Ok(())
    }

    pub(crate) async fn find_submission(&self, email: &str, stage: Stage) -> LabResult<Option<Submission>> {
        Ok(self
            .submissions_of(email)
            .await?
            .into_iter()
            .find(|s| s.stage == stage))
    }

    pub(crate) async fn submissions_of(&self, email: &str) -> LabResult<Vec<Submission>> {
        let mut subs: Vec<Submission> = self
            .store
            .get_all_typed::<Submission>(SUBMISSIONS)
            .await?
            .into_iter()
            .filter(|s| s.email == email)
            .collect();
        subs.sort_by_key(|s| s.stage);
        Ok(subs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabConfig;
    use crate::lab::NewUser;
    use crate::schema::SETTINGS;

    async fn classroom() -> (Lab, Session, Session) {
        let lab = Lab::in_memory(LabConfig::default()).await.unwrap();
        let admin = lab.login("admin@oakhill.local", "admin123").await.unwrap();
        lab.save_user(
            &admin,
            NewUser {
                email: "ada@oakhill.local".into(),
                name: "Ada".into(),
                role: Role::Student,
                password: "pw".into(),
                guardian_of: None,
            },
        )
        .await
        .unwrap();
        let ada = lab.login("ada@oakhill.local", "pw").await.unwrap();
        (lab, admin, ada)
    }

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[tokio::test]
    async fn submit_requires_every_required_answer() {
        let (lab, _, ada) = classroom().await;
        let err = lab
            .save_submission(&ada, Stage::Development, answers(&[("idea", "Robots")]), true)
            .await
            .unwrap_err();
        match err {
            LabError::IncompleteWorksheet { stage, missing } => {
                assert_eq!(stage, Stage::Development);
                assert_eq!(missing, vec!["outline".to_owned()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let draft = lab
            .save_submission(&ada, Stage::Development, answers(&[("idea", "Robots")]), false)
            .await
            .unwrap();
        assert_eq!(draft.status, SubmissionStatus::Draft);
        assert!(!Lab::validate_submission(&draft));
    }

    #[tokio::test]
    async fn one_submission_per_stage() {
        let (lab, admin, ada) = classroom().await;
        let first = lab
            .save_submission(&ada, Stage::Development, answers(&[("idea", "Robots")]), false)
            .await
            .unwrap();
        let second = lab
            .save_submission(
                &ada,
                Stage::Development,
                answers(&[("idea", " Robots "), ("outline", "Lost, found, home"), ("bogus", "x")]),
                true,
            )
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, SubmissionStatus::Submitted);
        assert_eq!(second.data.get("idea").map(String::as_str), Some("Robots"));
        assert!(!second.data.contains_key("bogus"));

        let stored = lab
            .get_submission(&admin, "ada@oakhill.local", Stage::Development)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, second);
        assert_eq!(lab.store().get_all(SUBMISSIONS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rubric_sets_score_and_badge() {
        let (lab, admin, _) = classroom().await;
        let scores: BTreeMap<String, u8> = Stage::Production
            .rubric()
            .iter()
            .map(|c| ((*c).to_owned(), 3))
            .collect();
        let progress = lab
            .score_rubric(&admin, "ada@oakhill.local", Stage::Production, scores)
            .await
            .unwrap();
        assert_eq!(progress.score, 9);
        assert_eq!(progress.badge, Some(Badge::Silver));

        let bad = BTreeMap::from([("Teamwork".to_owned(), 5)]);
        assert!(matches!(
            lab.score_rubric(&admin, "ada@oakhill.local", Stage::Production, bad).await,
            Err(LabError::InvalidInput(_))
        ));
        let foreign = BTreeMap::from([("Editing".to_owned(), 2)]);
        assert!(matches!(
            lab.score_rubric(&admin, "ada@oakhill.local", Stage::Production, foreign).await,
            Err(LabError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn students_cannot_grade() {
        let (lab, _, ada) = classroom().await;
        assert!(matches!(
            lab.score_rubric(&ada, "ada@oakhill.local", Stage::Production, BTreeMap::new()).await,
            Err(LabError::Forbidden { .. })
        ));
        assert!(matches!(
            lab.set_feedback(&ada, "ada@oakhill.local", Stage::Production, "great", SubmissionStatus::Reviewed)
                .await,
            Err(LabError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn feedback_updates_status_and_notifies() {
        let (lab, admin, ada) = classroom().await;
        lab.save_submission(
            &ada,
            Stage::Development,
            answers(&[("idea", "Robots"), ("outline", "Lost, found, home")]),
            true,
        )
        .await
        .unwrap();

        lab.set_feedback(
            &admin,
            "ada@oakhill.local",
            Stage::Development,
            "Add a twist",
            SubmissionStatus::NeedsChanges,
        )
        .await
        .unwrap();

        let sub = lab
            .get_submission(&ada, "ada@oakhill.local", Stage::Development)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.status, SubmissionStatus::NeedsChanges);
        let project = lab.project(&ada, "ada@oakhill.local").await.unwrap();
        assert_eq!(project.stage(Stage::Development).feedback, "Add a twist");

        let notices = lab.pull_notices(&ada).await.unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Feedback: please improve your Development");

        assert!(matches!(
            lab.set_feedback(&admin, "ada@oakhill.local", Stage::Development, "", SubmissionStatus::Draft)
                .await,
            Err(LabError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn completion_is_owner_or_staff() {
        let (lab, admin, ada) = classroom().await;
        lab.mark_stage_complete(&ada, "ada@oakhill.local", Stage::Development, true)
            .await
            .unwrap();
        lab.mark_stage_complete(&admin, "ada@oakhill.local", Stage::PreProduction, true)
            .await
            .unwrap();
        assert_eq!(lab.progress_percent(&ada, "ada@oakhill.local").await.unwrap(), 50);

        assert!(matches!(
            lab.mark_stage_complete(&ada, "bo@oakhill.local", Stage::Development, true).await,
            Err(LabError::Forbidden { .. })
        ));
        assert!(matches!(
            lab.project(&ada, "bo@oakhill.local").await,
            Err(LabError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn staff_cannot_touch_unknown_students() {
        let (lab, admin, _) = classroom().await;
        let projects = lab.store().get_all(PROJECTS).await.unwrap().len();
        let settings = lab.store().get_all(SETTINGS).await.unwrap().len();
        let typo = "typo@oakhill.local";
        let is_not_found = |r: &LabError| matches!(r, LabError::NotFound { .. });

        assert!(is_not_found(&lab.project(&admin, typo).await.unwrap_err()));
        assert!(is_not_found(&lab.progress_percent(&admin, typo).await.unwrap_err()));
        assert!(is_not_found(
            &lab.mark_stage_complete(&admin, typo, Stage::Development, true)
                .await
                .unwrap_err()
        ));
        let scores = BTreeMap::from([("Idea clarity".to_owned(), 3)]);
        assert!(is_not_found(
            &lab.score_rubric(&admin, typo, Stage::Development, scores)
                .await
                .unwrap_err()
        ));
        assert!(is_not_found(
            &lab.set_feedback(&admin, typo, Stage::Development, "ok", SubmissionStatus::Reviewed)
                .await
                .unwrap_err()
        ));
        // Staff accounts have no project either.
        assert!(is_not_found(
            &lab.score_rubric(&admin, "admin@oakhill.local", Stage::Development, BTreeMap::new())
                .await
                .unwrap_err()
        ));

        assert_eq!(lab.store().get_all(PROJECTS).await.unwrap().len(), projects);
        assert_eq!(lab.store().get_all(SETTINGS).await.unwrap().len(), settings);
    }

    #[tokio::test]
    async fn notes_are_saved() {
        let (lab, _, ada) = classroom().await;
        lab.set_stage_notes(&ada, Stage::Production, "bring batteries")
            .await
            .unwrap();
        let project = lab.project(&ada, "ada@oakhill.local").await.unwrap();
        assert_eq!(project.stage(Stage::Production).notes, "bring batteries");
    }
}
