//! User accounts.

use crate::error::{DomainError, Result};
use crate::role::Role;
use crate::types::{SchoolId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account on the platform.
///
/// Users are never hard-deleted by workflow operations; deactivation flips
/// `active` and invalidates future logins while keeping the identity
/// resolvable for old records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique account identifier
    pub id: UserId,
    /// Login email, unique across the platform
    pub email: String,
    /// Display name
    pub name: String,
    /// Closed role controlling every guarded operation
    pub role: Role,
    /// School this account belongs to, if any
    pub school_id: Option<SchoolId>,
    /// Deactivated accounts cannot log in
    pub active: bool,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new active account.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for an invalid email or empty name.
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let email = email.into();
        let name = name.into();
        validate_email(&email)?;
        if name.trim().is_empty() {
            return Err(DomainError::validation("Name is required"));
        }
        Ok(Self {
            id,
            email,
            name,
            role,
            school_id: None,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Minimal structural email validation.
///
/// Deliverability is the mailer's problem; this only rejects values that
/// cannot be an address at all.
///
/// # Errors
///
/// Returns [`DomainError::Validation`] when the value is not of the form
/// `local@domain` with a dot in the domain.
pub fn validate_email(email: &str) -> Result<()> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    });
    if valid && !email.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(DomainError::validation("Invalid email address"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn new_user_is_active_and_unaffiliated() {
        let user = User::new(UserId::new(), "ada@school.edu", "Ada", Role::Student, now())
            .expect("valid user");
        assert!(user.active);
        assert_eq!(user.school_id, None);
    }

    #[test]
    fn rejects_bad_emails() {
        for email in ["", "nodomain", "@school.edu", "a b@school.edu", "a@nodot", "a@.edu", "a@edu."] {
            assert!(
                validate_email(email).is_err(),
                "{email:?} should be rejected"
            );
        }
        assert!(validate_email("ada@school.edu").is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        let err = User::new(UserId::new(), "ada@school.edu", "   ", Role::Student, now())
            .expect_err("blank name");
        assert_eq!(err, DomainError::Validation("Name is required".to_string()));
    }
}
