//! Schools, the tenant entity.

use crate::error::{DomainError, Result};
use crate::types::{SchoolId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant: owns events and event requests.
///
/// Every school has exactly one primary admin and any number of additional
/// admins; all of them may act for the school in workflow operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    /// Unique school identifier
    pub id: SchoolId,
    /// School name
    pub name: String,
    /// Free-text description
    pub description: Option<String>,
    /// Primary administrator
    pub admin: UserId,
    /// Further administrators with the same workflow powers
    pub additional_admins: Vec<UserId>,
    /// When the school was registered
    pub created_at: DateTime<Utc>,
    /// When the school was last modified
    pub updated_at: DateTime<Utc>,
}

impl School {
    /// Creates a new school with its primary admin.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] when the name is blank.
    pub fn new(
        id: SchoolId,
        name: impl Into<String>,
        description: Option<String>,
        admin: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("School name is required"));
        }
        Ok(Self {
            id,
            name,
            description,
            admin,
            additional_admins: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether the user is the primary admin or one of the additional admins.
    #[must_use]
    pub fn is_administered_by(&self, user: UserId) -> bool {
        self.admin == user || self.additional_admins.contains(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_admin_kinds_administer() {
        let primary = UserId::new();
        let extra = UserId::new();
        let outsider = UserId::new();
        let mut school = School::new(SchoolId::new(), "Northside High", None, primary, Utc::now())
            .expect("valid school");
        school.additional_admins.push(extra);

        assert!(school.is_administered_by(primary));
        assert!(school.is_administered_by(extra));
        assert!(!school.is_administered_by(outsider));
    }
}
