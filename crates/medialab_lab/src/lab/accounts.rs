//! Accounts and sign-in.

use super::{normalize_email, Lab};
use crate::error::{LabError, LabResult};
use crate::model::{Project, Role, User};
use crate::password::{hash_password, verify_password};
use crate::schema::{PROJECTS, USERS};
use crate::session::Session;
use tracing::{info, warn};

/// Account details entered by an admin.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login email; stored lower-cased.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: Role,
    /// Initial password.
    pub password: String,
    /// Linked student, kept only for guardians.
    pub guardian_of: Option<String>,
}

impl Lab {
    /// Signs in and returns a session.
    ///
    /// Unknown emails and wrong passwords both yield `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> LabResult<Session> {
        let email = normalize_email(email);
        let Some(user) = self.store.get_typed::<User>(USERS, &email).await? else {
            warn!(email = %email, "sign-in for unknown account");
            return Err(LabError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash) {
            warn!(email = %email, "sign-in with wrong password");
            return Err(LabError::InvalidCredentials);
        }
        info!(email = %email, role = %user.role, "signed in");
        Ok(Session::new(&user))
    }

    /// Looks up an account.
    pub async fn user(&self, email: &str) -> LabResult<Option<User>> {
        Ok(self.store.get_typed(USERS, &normalize_email(email)).await?)
    }

    /// Creates or replaces an account (admin only).
    ///
    /// Students get an empty project if they don't have one yet.
    pub async fn save_user(&self, session: &Session, new: NewUser) -> LabResult<User> {
        session.require(&[Role::Admin], "manage accounts")?;

        let email = normalize_email(&new.email);
        if email.is_empty() || !email.contains('@') {
            return Err(LabError::invalid(format!("not an email address: {}", new.email)));
        }
        let name = new.name.trim();
        if name.is_empty() {
            return Err(LabError::invalid("name is empty"));
        }
        if new.password.is_empty() {
            return Err(LabError::invalid("password is empty"));
        }

        let guardian_of = match new.role {
            Role::Guardian => new
                .guardian_of
                .as_deref()
                .map(normalize_email)
                .filter(|e| !e.is_empty()),
            _ => None,
        };

        let user = User {
            email,
            name: name.to_owned(),
            role: new.role,
            password_hash: hash_password(&new.password)?,
            guardian_of,
        };
        self.store.put_typed(USERS, &user).await?;
        if user.role == Role::Student {
            self.ensure_project(&user.email).await?;
        }

        info!(email = %user.email, role = %user.role, "account saved");
        Ok(user)
    }

    /// Deletes an account and its project (admin only).
    pub async fn delete_user(&self, session: &Session, email: &str) -> LabResult<()> {
        session.require(&[Role::Admin], "manage accounts")?;
        let email = normalize_email(email);
        if email == session.email() {
            return Err(LabError::invalid("cannot delete the signed-in account"));
        }
        self.store.delete(USERS, &email).await?;
        self.store.delete(PROJECTS, &email).await?;
        info!(email = %email, "account deleted");
        Ok(())
    }

    /// Sets a new password (admin only).
    pub async fn reset_password(&self, session: &Session, email: &str, password: &str) -> LabResult<()> {
        session.require(&[Role::Admin], "reset passwords")?;
        if password.is_empty() {
            return Err(LabError::invalid("password is empty"));
        }
        let email = normalize_email(email);
        let mut user: User = self
            .store
            .get_typed(USERS, &email)
            .await?
            .ok_or_else(|| LabError::not_found("user", email.clone()))?;
        user.password_hash = hash_password(password)?;
        self.store.put_typed(USERS, &user).await?;
        info!(email = %email, "password reset");
        Ok(())
    }

    /// Every account, sorted by role then name (admin only).
    pub async fn list_users(&self, session: &Session) -> LabResult<Vec<User>> {
        session.require(&[Role::Admin], "list accounts")?;
        let mut users: Vec<User> = self.store.get_all_typed(USERS).await?;
        users.sort_by(|a, b| {
            a.role
                .as_str()
                .cmp(b.role.as_str())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(users)
    }

    /// Every student account, sorted by name.
    pub(crate) async fn students(&self) -> LabResult<Vec<User>> {
        let mut students: Vec<User> = self
            .store
            .get_all_typed::<User>(USERS)
            .await?
            .into_iter()
            .filter(|u| u.role == Role::Student)
            .collect();
        students.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        Ok(students)
    }

    /// The project of an existing student account.
    ///
    /// Unknown emails and non-student accounts are `NotFound`, so a typo
    /// never creates records.
    pub(crate) async fn student_project(&self, email: &str) -> LabResult<Project> {
        let email = normalize_email(email);
        match self.user(&email).await? {
            Some(user) if user.role == Role::Student => self.ensure_project(&email).await,
            _ => Err(LabError::not_found("student", email)),
        }
    }

    /// Returns the student's project, creating an empty one if missing.
    pub async fn ensure_project(&self, email: &str) -> LabResult<Project> {
        let email = normalize_email(email);
        if let Some(project) = self.store.get_typed(PROJECTS, &email).await? {
            return Ok(project);
        }
        let project = Project::new(email);
        self.store.put_typed(PROJECTS, &project).await?;
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabConfig;

    async fn admin_lab() -> (Lab, Session) {
        let lab = Lab::in_memory(LabConfig::default()).await.unwrap();
        let admin = lab.login("admin@oakhill.local", "admin123").await.unwrap();
        (lab, admin)
    }

    fn student(email: &str, name: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: name.into(),
            role: Role::Student,
            password: "pw".into(),
            guardian_of: None,
        }
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let (lab, _) = admin_lab().await;
        assert!(matches!(
            lab.login("admin@oakhill.local", "nope").await,
            Err(LabError::InvalidCredentials)
        ));
        assert!(matches!(
            lab.login("ghost@oakhill.local", "admin123").await,
            Err(LabError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn saving_student_creates_project_and_lowercases_email() {
        let (lab, admin) = admin_lab().await;
        let user = lab.save_user(&admin, student(" Ada@OakHill.Local ", "Ada")).await.unwrap();
        assert_eq!(user.email, "ada@oakhill.local");

        let project: Option<Project> = lab.store().get_typed(PROJECTS, "ada@oakhill.local").await.unwrap();
        assert_eq!(project.unwrap().stages.len(), 4);

        let session = lab.login("ADA@oakhill.local", "pw").await.unwrap();
        assert_eq!(session.role(), Role::Student);
    }

    #[tokio::test]
    async fn guardian_link_kept_only_for_guardians() {
        let (lab, admin) = admin_lab().await;
        let mut teacher = student("t@oakhill.local", "Teach");
        teacher.role = Role::Teacher;
        teacher.guardian_of = Some("ada@oakhill.local".into());
        assert_eq!(lab.save_user(&admin, teacher).await.unwrap().guardian_of, None);

        let mut parent = student("p@oakhill.local", "Parent");
        parent.role = Role::Guardian;
        parent.guardian_of = Some("ADA@oakhill.local".into());
        assert_eq!(
            lab.save_user(&admin, parent).await.unwrap().guardian_of.as_deref(),
            Some("ada@oakhill.local")
        );
    }

    #[tokio::test]
    async fn delete_removes_project() {
        let (lab, admin) = admin_lab().await;
        lab.save_user(&admin, student("ada@oakhill.local", "Ada")).await.unwrap();
        lab.delete_user(&admin, "ada@oakhill.local").await.unwrap();
        assert!(lab.user("ada@oakhill.local").await.unwrap().is_none());
        assert!(lab.store().get(PROJECTS, "ada@oakhill.local").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_password_changes_login() {
        let (lab, admin) = admin_lab().await;
        lab.save_user(&admin, student("ada@oakhill.local", "Ada")).await.unwrap();
        lab.reset_password(&admin, "ada@oakhill.local", "new-pw").await.unwrap();
        assert!(lab.login("ada@oakhill.local", "pw").await.is_err());
        assert!(lab.login("ada@oakhill.local", "new-pw").await.is_ok());
        assert!(matches!(
            lab.reset_password(&admin, "ghost@oakhill.local", "x").await,
            Err(LabError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_sorted_by_role_then_name() {
        let (lab, admin) = admin_lab().await;
        lab.save_user(&admin, student("zed@oakhill.local", "Zed")).await.unwrap();
        lab.save_user(&admin, student("amy@oakhill.local", "Amy")).await.unwrap();

        let names: Vec<String> = lab
            .list_users(&admin)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, ["Admin", "Amy", "Zed"]);
    }

    #[tokio::test]
    async fn students_cannot_manage_accounts() {
        let (lab, admin) = admin_lab().await;
        lab.save_user(&admin, student("ada@oakhill.local", "Ada")).await.unwrap();
        let ada = lab.login("ada@oakhill.local", "pw").await.unwrap();
        assert!(matches!(
            lab.list_users(&ada).await,
            Err(LabError::Forbidden { role: Role::Student, .. })
        ));
        assert!(matches!(
            lab.save_user(&ada, student("bo@oakhill.local", "Bo")).await,
            Err(LabError::Forbidden { .. })
        ));
    }
}
