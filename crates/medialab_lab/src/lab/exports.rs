//! Class exports, personal data, certificates and the guardian view.

use super::{normalize_email, now_millis, Lab};
use crate::error::{LabError, LabResult};
use crate::model::{Comment, Project, Role, Submission, SubmissionStatus};
use crate::session::Session;
use crate::stage::{Award, Badge, Stage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// A row of the class overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    /// Display name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Stages complete, in percent.
    pub percent: u8,
}

/// What a guardian sees of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardianStage {
    /// Stage.
    pub stage: Stage,
    /// Marked complete.
    pub completed: bool,
    /// Badge earned.
    pub badge: Option<Badge>,
    /// Worksheet state, `None` if never started.
    pub submission_status: Option<SubmissionStatus>,
    /// Teacher feedback.
    pub feedback: String,
}

/// Read-only summary of the student linked to a guardian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardianView {
    /// Student display name.
    pub student_name: String,
    /// Student email.
    pub student_email: String,
    /// Stages complete, in percent.
    pub percent: u8,
    /// Every stage in order.
    pub stages: Vec<GuardianStage>,
}

#[derive(Serialize)]
struct ExportedUser<'a> {
    email: &'a str,
    name: &'a str,
    role: Role,
}

#[derive(Serialize)]
struct PersonalData<'a> {
    user: ExportedUser<'a>,
    project: Option<Project>,
    submissions: Vec<Submission>,
    comments: Vec<Comment>,
    exported_at: u64,
}

impl Lab {
    /// Students matching `query` by name or email, sorted by name
    /// (teachers and admins).
    pub async fn student_overview(&self, session: &Session, query: &str) -> LabResult<Vec<StudentSummary>> {
        session.require(&[Role::Teacher, Role::Admin], "view the class")?;
        let query = query.trim().to_lowercase();
        let mut out = Vec::new();
        for student in self.students().await? {
            if !query.is_empty()
                && !student.name.to_lowercase().contains(&query)
                && !student.email.contains(&query)
            {
                continue;
            }
            let project = self.ensure_project(&student.email).await?;
            out.push(StudentSummary {
                name: student.name,
                email: student.email,
                percent: project.progress_percent(),
            });
        }
        Ok(out)
    }

    /// Class progress as CSV (teachers and admins).
    ///
    /// One row per student sorted by name. Columns are name, email, then
    /// every stage's completion, every stage's score, every stage's badge.
    /// Every field is quoted.
    pub async fn export_csv(&self, session: &Session) -> LabResult<String> {
        session.require(&[Role::Teacher, Role::Admin], "export class progress")?;

        let mut header = vec!["Name".to_owned(), "Email".to_owned()];
        header.extend(Stage::ALL.iter().map(|s| format!("{s} Complete")));
        header.extend(Stage::ALL.iter().map(|s| format!("{s} Score")));
        header.extend(Stage::ALL.iter().map(|s| format!("{s} Badge")));

        let mut rows = vec![header];
        for student in self.students().await? {
            let project = self.ensure_project(&student.email).await?;
            let mut row = vec![student.name, student.email];
            row.extend(Stage::ALL.iter().map(|&s| {
                let done = if project.stage(s).completed { "Yes" } else { "No" };
                done.to_owned()
            }));
            row.extend(Stage::ALL.iter().map(|&s| project.stage(s).score.to_string()));
            row.extend(
                Stage::ALL
                    .iter()
                    .map(|&s| project.stage(s).badge.map_or("", Badge::label).to_owned()),
            );
            rows.push(row);
        }

        let csv = rows
            .iter()
            .map(|row| row.iter().map(|v| csv_field(v)).collect::<Vec<_>>().join(","))
            .collect::<Vec<_>>()
            .join("\n");
        info!(students = rows.len() - 1, "class progress exported");
        Ok(csv)
    }

    /// Everything stored about the signed-in user, as pretty JSON.
    pub async fn export_my_data(&self, session: &Session) -> LabResult<String> {
        let email = session.email();
        let project = if session.role() == Role::Student {
            Some(self.ensure_project(email).await?)
        } else {
            None
        };
        let data = PersonalData {
            user: ExportedUser {
                email,
                name: session.name(),
                role: session.role(),
            },
            project,
            submissions: self.submissions_of(email).await?,
            comments: self.comments_of(email).await?,
            exported_at: now_millis(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// A printable completion certificate for the signed-in student.
    ///
    /// Fails with `ProjectIncomplete` until every stage is complete.
    pub async fn certificate_html(&self, session: &Session) -> LabResult<String> {
        session.require(&[Role::Student], "print a certificate")?;
        let project = self.ensure_project(session.email()).await?;
        if !project.all_complete() {
            return Err(LabError::ProjectIncomplete {
                email: session.email().to_owned(),
            });
        }
        let total = project.total_score();
        let award = Award::for_total(total);
        let date = certificate_date(now_millis());

        let html = format!(
            concat!(
                "<!doctype html><html><head><meta charset=\"utf-8\"><title>Certificate</title>",
                "<style>body{{font-family:Arial,sans-serif;padding:40px;text-align:center}}",
                ".card{{border:6px solid #ffcc00;padding:40px;border-radius:20px}}",
                "h1{{font-size:40px;margin:0 0 10px}} h2{{margin:6px 0}} .muted{{color:#555}}</style></head>",
                "<body onload=\"window.print()\"><div class=\"card\"><h1>Oak Hill Media Lab</h1>",
                "<h2>Certificate of Completion</h2><p>This certifies that</p>",
                "<h2><strong>{name}</strong></h2>",
                "<p class=\"muted\">has successfully completed the Filmmaking Project ",
                "(Development to Post-Production).</p>",
                "<p><strong>Total Score:</strong> {total} &nbsp; <strong>Award:</strong> {award}</p>",
                "<p>Date: {date}</p></div></body></html>"
            ),
            name = escape_html(session.name()),
            total = total,
            award = award,
            date = date,
        );
        info!(email = session.email(), total, award = %award, "certificate issued");
        Ok(html)
    }

    /// The linked student's progress, for a guardian.
    pub async fn guardian_view(&self, session: &Session) -> LabResult<GuardianView> {
        session.require(&[Role::Guardian], "use the guardian view")?;
        let email = session
            .guardian_of()
            .map(normalize_email)
            .ok_or_else(|| LabError::not_found("linked student", ""))?;
        let student = self
            .user(&email)
            .await?
            .filter(|u| u.role == Role::Student)
            .ok_or_else(|| LabError::not_found("linked student", email.clone()))?;

        let project = self.ensure_project(&email).await?;
        let submissions = self.submissions_of(&email).await?;
        let stages = Stage::ALL
            .into_iter()
            .map(|stage| {
                let progress = project.stage(stage);
                GuardianStage {
                    stage,
                    completed: progress.completed,
                    badge: progress.badge,
                    submission_status: submissions.iter().find(|s| s.stage == stage).map(|s| s.status),
                    feedback: progress.feedback.clone(),
                }
            })
            .collect();

        Ok(GuardianView {
            student_name: student.name,
            student_email: email,
            percent: project.progress_percent(),
            stages,
        })
    }
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Escapes text for HTML element content and attribute values.
pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `YYYY-MM-DD` (UTC) of a Unix timestamp in milliseconds.
fn certificate_date(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabConfig;
    use crate::lab::NewUser;
    use std::collections::BTreeMap;

    async fn classroom() -> (Lab, Session) {
        let lab = Lab::in_memory(LabConfig::default()).await.unwrap();
        let admin = lab.login("admin@oakhill.local", "admin123").await.unwrap();
        for (email, name, role, link) in [
            ("zed@oakhill.local", "Zed \"Z\" Smith", Role::Student, None),
            ("ada@oakhill.local", "Ada", Role::Student, None),
            ("mum@oakhill.local", "Mum", Role::Guardian, Some("ada@oakhill.local")),
        ] {
            lab.save_user(
                &admin,
                NewUser {
                    email: email.into(),
                    name: name.into(),
                    role,
                    password: "pw".into(),
                    guardian_of: link.map(str::to_owned),
                },
            )
            .await
            .unwrap();
        }
        (lab, admin)
    }

    #[test]
    fn certificate_dates() {
        assert_eq!(certificate_date(0), "1970-01-01");
        assert_eq!(certificate_date(951_782_400_000), "2000-02-29");
        assert_eq!(certificate_date(1_704_067_199_999), "2023-12-31");
        assert_eq!(certificate_date(u64::MAX), "1970-01-01");
    }

    #[test]
    fn html_escaping() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[tokio::test]
    async fn csv_rows_sorted_and_quoted() {
        let (lab, admin) = classroom().await;
        lab.mark_stage_complete(&admin, "ada@oakhill.local", Stage::Development, true)
            .await
            .unwrap();
        let scores: BTreeMap<String, u8> = Stage::Development
            .rubric()
            .iter()
            .map(|c| ((*c).to_owned(), 4))
            .collect();
        lab.score_rubric(&admin, "ada@oakhill.local", Stage::Development, scores)
            .await
            .unwrap();

        let csv = lab.export_csv(&admin).await.unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(
            "\"Name\",\"Email\",\"Development Complete\",\"Pre-Production Complete\""
        ));
        assert!(lines[0].ends_with("\"Post-Production Badge\""));
        assert_eq!(
            lines[1],
            "\"Ada\",\"ada@oakhill.local\",\"Yes\",\"No\",\"No\",\"No\",\"12\",\"0\",\"0\",\"0\",\"Gold\",\"\",\"\",\"\""
        );
        assert!(lines[2].starts_with("\"Zed \"\"Z\"\" Smith\""));
    }

    #[tokio::test]
    async fn overview_filters() {
        let (lab, admin) = classroom().await;
        let all = lab.student_overview(&admin, "").await.unwrap();
        assert_eq!(all.len(), 2);
        let ada = lab.student_overview(&admin, "ADA").await.unwrap();
        assert_eq!(ada.len(), 1);
        assert_eq!(ada[0].email, "ada@oakhill.local");
        assert_eq!(ada[0].percent, 0);
    }

    #[tokio::test]
    async fn certificate_needs_every_stage() {
        let (lab, admin) = classroom().await;
        let ada = lab.login("ada@oakhill.local", "pw").await.unwrap();
        assert!(matches!(
            lab.certificate_html(&ada).await,
            Err(LabError::ProjectIncomplete { .. })
        ));
        for stage in Stage::ALL {
            lab.mark_stage_complete(&admin, "ada@oakhill.local", stage, true)
                .await
                .unwrap();
        }
        let html = lab.certificate_html(&ada).await.unwrap();
        assert!(html.contains("<strong>Ada</strong>"));
        assert!(html.contains("<strong>Award:</strong> Participant"));
    }

    #[tokio::test]
    async fn guardian_sees_linked_student() {
        let (lab, admin) = classroom().await;
        lab.set_feedback(
            &admin,
            "ada@oakhill.local",
            Stage::Production,
            "Steady shots",
            SubmissionStatus::Reviewed,
        )
        .await
        .unwrap();

        let mum = lab.login("mum@oakhill.local", "pw").await.unwrap();
        let view = lab.guardian_view(&mum).await.unwrap();
        assert_eq!(view.student_name, "Ada");
        assert_eq!(view.stages.len(), 4);
        assert_eq!(view.stages[2].feedback, "Steady shots");
        assert_eq!(view.stages[2].submission_status, None);

        assert!(matches!(
            lab.guardian_view(&admin).await,
            Err(LabError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn personal_data_is_json() {
        let (lab, _) = classroom().await;
        let ada = lab.login("ada@oakhill.local", "pw").await.unwrap();
        lab.add_comment(&ada, "ada@oakhill.local", Stage::Development, "started")
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&lab.export_my_data(&ada).await.unwrap()).unwrap();
        assert_eq!(json["user"]["email"], "ada@oakhill.local");
        assert_eq!(json["user"]["role"], "student");
        assert_eq!(json["comments"][0]["text"], "started");
        assert_eq!(json["project"]["id"], "ada@oakhill.local");
    }
}
