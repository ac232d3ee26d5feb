//! Roles and the capability table.
//!
//! Roles form a closed enum rather than free-form strings, so an invalid
//! role is unrepresentable and the capability table below is exhaustive:
//! adding a role or a capability forces every match arm to be revisited.

use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role of an authenticated principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Attends events and leaves feedback
    Student,
    /// Applies to present at published events
    Speaker,
    /// Administers one school: proposes events, reviews speakers for them
    SchoolAdmin,
    /// Platform administrator: reviews proposals, manages tenants and users
    SuperAdmin,
}

impl Role {
    /// Wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Speaker => "speaker",
            Self::SchoolAdmin => "school_admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Whether this role holds the given capability.
    #[must_use]
    pub const fn can(self, capability: Capability) -> bool {
        allows(self, capability)
    }

    /// Fail with [`DomainError::Authorization`] unless this role holds the
    /// capability.
    ///
    /// # Errors
    ///
    /// Returns `Authorization` carrying the capability's denial message.
    pub fn require(self, capability: Capability) -> Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(DomainError::authorization(capability.denial_message()))
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "student" => Ok(Self::Student),
            "speaker" => Ok(Self::Speaker),
            "school_admin" => Ok(Self::SchoolAdmin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(DomainError::validation(format!("Invalid role: {other}"))),
        }
    }
}

/// Operations guarded by a role check.
///
/// Finer-grained ownership checks (a school admin editing only their own
/// request, an organizer reviewing only their own event's speakers) are
/// applied by the workflow functions after the role check passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Propose an event on behalf of a school
    SubmitEventRequest,
    /// Approve, reject, or send back an event proposal
    ReviewEventRequest,
    /// Create, update, or delete materialized events
    ManageEvents,
    /// Apply to present at a published event
    ApplyAsSpeaker,
    /// Review speaker applications (further restricted to the organizer)
    ReviewSpeakerRequest,
    /// Register to attend an event
    RegisterForEvent,
    /// Rate and review an attended event
    LeaveFeedback,
    /// Create or update school (tenant) records
    ManageSchools,
    /// Platform administration: dashboards, admin accounts, user management
    ManagePlatform,
}

impl Capability {
    /// Message surfaced when a role lacks this capability.
    #[must_use]
    pub const fn denial_message(self) -> &'static str {
        match self {
            Self::SubmitEventRequest => "Only school administrators can submit event requests",
            Self::ReviewEventRequest => "Only platform administrators can review event requests",
            Self::ManageEvents => "You do not have permission to manage events",
            Self::ApplyAsSpeaker => "Only speakers can apply to present at events",
            Self::ReviewSpeakerRequest => {
                "Only the event organizer or a platform administrator can review speaker applications"
            }
            Self::RegisterForEvent => "Only students can register for events",
            Self::LeaveFeedback => "Only students can leave feedback",
            Self::ManageSchools => "Only platform administrators can manage schools",
            Self::ManagePlatform => "Only platform administrators can access this resource",
        }
    }
}

/// The capability table.
///
/// One row per (role, capability) pair; `SuperAdmin` additionally holds
/// every capability except the self-service ones that make no sense for a
/// platform account (applying as a speaker, registering as an attendee,
/// leaving feedback).
const fn allows(role: Role, capability: Capability) -> bool {
    match capability {
        Capability::SubmitEventRequest => matches!(role, Role::SchoolAdmin),
        Capability::ReviewEventRequest => matches!(role, Role::SuperAdmin),
        Capability::ManageEvents => matches!(role, Role::SchoolAdmin | Role::SuperAdmin),
        Capability::ApplyAsSpeaker => matches!(role, Role::Speaker),
        Capability::ReviewSpeakerRequest => {
            matches!(role, Role::SchoolAdmin | Role::SuperAdmin)
        }
        Capability::RegisterForEvent => matches!(role, Role::Student),
        Capability::LeaveFeedback => matches!(role, Role::Student),
        Capability::ManageSchools => matches!(role, Role::SuperAdmin),
        Capability::ManagePlatform => matches!(role, Role::SuperAdmin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_super_admin_reviews_event_requests() {
        assert!(Role::SuperAdmin.can(Capability::ReviewEventRequest));
        assert!(!Role::SchoolAdmin.can(Capability::ReviewEventRequest));
        assert!(!Role::Speaker.can(Capability::ReviewEventRequest));
        assert!(!Role::Student.can(Capability::ReviewEventRequest));
    }

    #[test]
    fn only_school_admin_submits_event_requests() {
        assert!(Role::SchoolAdmin.can(Capability::SubmitEventRequest));
        assert!(!Role::SuperAdmin.can(Capability::SubmitEventRequest));
    }

    #[test]
    fn speaker_review_is_shared_between_organizer_and_platform() {
        assert!(Role::SchoolAdmin.can(Capability::ReviewSpeakerRequest));
        assert!(Role::SuperAdmin.can(Capability::ReviewSpeakerRequest));
        assert!(!Role::Speaker.can(Capability::ReviewSpeakerRequest));
    }

    #[test]
    fn self_service_capabilities_stay_with_their_role() {
        assert!(Role::Student.can(Capability::RegisterForEvent));
        assert!(!Role::SuperAdmin.can(Capability::RegisterForEvent));
        assert!(Role::Speaker.can(Capability::ApplyAsSpeaker));
        assert!(!Role::Student.can(Capability::ApplyAsSpeaker));
    }

    #[test]
    fn require_surfaces_the_denial_message() {
        let err = Role::SchoolAdmin
            .require(Capability::ReviewEventRequest)
            .expect_err("school_admin must not review");
        assert_eq!(
            err,
            DomainError::Authorization(
                "Only platform administrators can review event requests".to_string()
            )
        );
    }

    #[test]
    fn roles_round_trip_through_wire_strings() {
        for role in [
            Role::Student,
            Role::Speaker,
            Role::SchoolAdmin,
            Role::SuperAdmin,
        ] {
            assert_eq!(role.as_str().parse::<Role>().expect("round trip"), role);
        }
        assert!("guest".parse::<Role>().is_err());
    }
}
