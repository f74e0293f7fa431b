//! Signed-in sessions.

use crate::error::{LabError, LabResult};
use crate::model::{Role, User};
use tracing::info;

/// Proof that a user signed in.
///
/// Only [`crate::Lab::login`] creates one; role-restricted operations take
/// `&Session`. [`Session::logout`] consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    email: String,
    name: String,
    role: Role,
    guardian_of: Option<String>,
}

impl Session {
    pub(crate) fn new(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            guardian_of: user.guardian_of.clone(),
        }
    }

    /// Signed-in email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Linked student, for guardians.
    #[must_use]
    pub fn guardian_of(&self) -> Option<&str> {
        self.guardian_of.as_deref()
    }

    /// Fails with `Forbidden` unless the session has one of `roles`.
    pub fn require(&self, roles: &[Role], action: &'static str) -> LabResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(LabError::Forbidden {
                role: self.role,
                action,
            })
        }
    }

    /// Teachers and admins see every student.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Teacher | Role::Admin)
    }

    /// Returns true if this session may read `student`'s work.
    #[must_use]
    pub fn can_view(&self, student: &str) -> bool {
        self.is_staff() || self.email == student || self.guardian_of.as_deref() == Some(student)
    }

    pub(crate) fn require_view(&self, student: &str, action: &'static str) -> LabResult<()> {
        if self.can_view(student) {
            Ok(())
        } else {
            Err(LabError::Forbidden {
                role: self.role,
                action,
            })
        }
    }

    /// Ends the session.
    pub fn logout(self) {
        info!(email = %self.email, "signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role, guardian_of: Option<&str>) -> Session {
        Session::new(&User {
            email: "me@oakhill.local".into(),
            name: "Me".into(),
            role,
            password_hash: String::new(),
            guardian_of: guardian_of.map(str::to_owned),
        })
    }

    #[test]
    fn require_checks_role() {
        let student = session(Role::Student, None);
        assert!(student.require(&[Role::Student], "work").is_ok());
        assert!(matches!(
            student.require(&[Role::Admin], "manage users"),
            Err(LabError::Forbidden {
                role: Role::Student,
                ..
            })
        ));
    }

    #[test]
    fn visibility() {
        assert!(session(Role::Teacher, None).can_view("kid@oakhill.local"));
        assert!(session(Role::Student, None).can_view("me@oakhill.local"));
        assert!(!session(Role::Student, None).can_view("kid@oakhill.local"));
        assert!(session(Role::Guardian, Some("kid@oakhill.local")).can_view("kid@oakhill.local"));
        assert!(!session(Role::Guardian, Some("kid@oakhill.local")).can_view("other@oakhill.local"));
    }
}
