use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::UserId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessError {
    #[error("forbidden: requires {required}, caller is {actual}")]
    Forbidden { required: Role, actual: Role },
}

//
// ─── ROLE ──────────────────────────────────────────────────────────────────────
//

/// Portal role, ordered by privilege.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Teacher,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    /// Resolve the effective role of a stored profile.
    ///
    /// The admin flag wins over the role text; unknown text falls back to
    /// `Student`.
    #[must_use]
    pub fn from_profile(role: &str, is_admin: bool) -> Self {
        if is_admin {
            return Role::Admin;
        }
        role.parse().unwrap_or(Role::Student)
    }

    #[must_use]
    pub fn is_staff(self) -> bool {
        self >= Role::Teacher
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseRoleError(s.to_owned())),
        }
    }
}

//
// ─── REQUEST CONTEXT ───────────────────────────────────────────────────────────
//

/// Identity of the caller, passed explicitly into every service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    user_id: UserId,
    role: Role,
}

impl RequestContext {
    #[must_use]
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    #[must_use]
    pub fn student(user_id: UserId) -> Self {
        Self::new(user_id, Role::Student)
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// Ensure the caller holds at least `min`.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Forbidden` when the caller's role is lower.
    pub fn require_role(&self, min: Role) -> Result<(), AccessError> {
        if self.role >= min {
            Ok(())
        } else {
            Err(AccessError::Forbidden {
                required: min,
                actual: self.role,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_privilege() {
        assert!(Role::Student < Role::Teacher);
        assert!(Role::Teacher < Role::Admin);
        assert!(!Role::Student.is_staff());
        assert!(Role::Teacher.is_staff());
    }

    #[test]
    fn admin_flag_overrides_role_text() {
        assert_eq!(Role::from_profile("student", true), Role::Admin);
        assert_eq!(Role::from_profile("Teacher", false), Role::Teacher);
        assert_eq!(Role::from_profile("", false), Role::Student);
        assert_eq!(Role::from_profile("janitor", false), Role::Student);
    }

    #[test]
    fn require_role_allows_equal_or_higher() {
        let teacher = RequestContext::new(UserId::new(1), Role::Teacher);
        assert!(teacher.require_role(Role::Student).is_ok());
        assert!(teacher.require_role(Role::Teacher).is_ok());
        assert_eq!(
            teacher.require_role(Role::Admin),
            Err(AccessError::Forbidden {
                required: Role::Admin,
                actual: Role::Teacher,
            })
        );
    }

    #[test]
    fn forbidden_message_names_both_roles() {
        let err = RequestContext::student(UserId::new(9))
            .require_role(Role::Admin)
            .unwrap_err();
        assert_eq!(err.to_string(), "forbidden: requires admin, caller is student");
    }
}
