//! Materialized events and their child records.
//!
//! Speakers and registrations are normalized child entities referencing the
//! event by identifier, not embedded arrays, so the capacity invariants can
//! be enforced atomically at the storage layer and the children can be
//! queried independently.

use crate::error::{DomainError, Result};
use crate::role::{Capability, Role};
use crate::types::{Capacity, EventId, SchoolId, UserId};
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Being configured, not visible to the public
    Draft,
    /// Visible; registration and speaker applications are open
    Published,
    /// Called off
    Cancelled,
    /// Took place
    Completed,
}

impl EventStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::validation(format!(
                "Invalid event status: {other}"
            ))),
        }
    }
}

/// The schedulable entity, materialized from an approved proposal or created
/// directly by an administrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Event title
    pub title: String,
    /// Free-text description
    pub description: String,
    /// School hosting the event
    pub host_school: SchoolId,
    /// User responsible for the event (reviews its speaker applications)
    pub organizer: UserId,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Where the event takes place
    pub location: String,
    /// Attendee ceiling
    pub capacity: Capacity,
    /// Ticket price in cents; zero means free
    pub price_cents: i64,
    /// Speaker-slot ceiling
    pub max_speakers: u32,
    /// Free-text requirements for attendees or speakers
    pub requirements: Option<String>,
    /// Lifecycle status
    pub status: EventStatus,
    /// Whether the event is listed publicly
    pub is_public: bool,
    /// Mean of current feedback ratings, rounded to one decimal
    pub average_rating: f64,
    /// Number of current feedback ratings
    pub total_ratings: u32,
    /// When the event was created
    pub created_at: DateTime<Utc>,
    /// When the event was last modified
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether the event accepts registrations and speaker applications.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self.status, EventStatus::Published)
    }

    /// Whether one more attendee fits.
    #[must_use]
    pub const fn has_seat_for(&self, registered: u32) -> bool {
        self.capacity.admits(registered)
    }

    /// Whether one more approved speaker fits.
    #[must_use]
    pub const fn has_speaker_slot_for(&self, approved: u32) -> bool {
        approved < self.max_speakers
    }

    /// Fail unless the principal may manage this event.
    ///
    /// Requires the [`Capability::ManageEvents`] role check to pass, plus
    /// ownership: a school admin manages only events they organize, while a
    /// platform administrator manages any event.
    ///
    /// # Errors
    ///
    /// Returns `Authorization` on role mismatch and `Ownership` when a
    /// school admin targets an event organized by someone else.
    pub fn authorize_manage(&self, principal: &User) -> Result<()> {
        principal.role.require(Capability::ManageEvents)?;
        if principal.role == Role::SuperAdmin || self.organizer == principal.id {
            Ok(())
        } else {
            Err(DomainError::ownership(
                "You can only manage events you organize",
            ))
        }
    }

    /// Fail unless the principal may review this event's speaker slots.
    ///
    /// Same rule as [`Self::authorize_manage`] but with the speaker-review
    /// denial message.
    ///
    /// # Errors
    ///
    /// Returns `Authorization` on role mismatch, `Ownership` when a school
    /// admin targets an event they do not organize.
    pub fn authorize_speaker_review(&self, principal: &User) -> Result<()> {
        principal.role.require(Capability::ReviewSpeakerRequest)?;
        if principal.role == Role::SuperAdmin || self.organizer == principal.id {
            Ok(())
        } else {
            Err(DomainError::ownership(
                "You can only review speaker applications for events you organize",
            ))
        }
    }
}

/// Status of a speaker slot on an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerSlotStatus {
    /// Applied through the legacy in-event path, awaiting organizer review
    Pending,
    /// Confirmed; counts against `max_speakers`
    Approved,
    /// Turned down
    Rejected,
}

impl SpeakerSlotStatus {
    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for SpeakerSlotStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::validation(format!(
                "Invalid speaker status: {other}"
            ))),
        }
    }
}

/// A speaker slot: one user presenting at one event.
///
/// Unique per (event, user). Only `Approved` slots count against the
/// event's speaker ceiling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpeaker {
    /// Event being presented at
    pub event_id: EventId,
    /// The presenting user
    pub user_id: UserId,
    /// Talk topic
    pub topic: String,
    /// Talk length in minutes
    pub duration_minutes: u32,
    /// Slot status
    pub status: SpeakerSlotStatus,
    /// When the slot was created
    pub added_at: DateTime<Utc>,
}

/// An attendee registration. Unique per (event, user).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRegistration {
    /// Event registered for
    pub event_id: EventId,
    /// The attending user
    pub user_id: UserId,
    /// When the registration was made
    pub registered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Capacity, EventId, SchoolId, UserId};

    fn event(organizer: UserId) -> Event {
        let now = Utc::now();
        Event {
            id: EventId::new(),
            title: "Science Fair".to_string(),
            description: "Annual fair".to_string(),
            host_school: SchoolId::new(),
            organizer,
            date: now,
            location: "Main hall".to_string(),
            capacity: Capacity::new(2),
            price_cents: 0,
            max_speakers: 1,
            requirements: None,
            status: EventStatus::Published,
            is_public: true,
            average_rating: 0.0,
            total_ratings: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(role: Role) -> User {
        User::new(UserId::new(), "a@b.edu", "A", role, Utc::now()).expect("valid user")
    }

    #[test]
    fn seat_and_speaker_ceilings() {
        let e = event(UserId::new());
        assert!(e.has_seat_for(1));
        assert!(!e.has_seat_for(2));
        assert!(e.has_speaker_slot_for(0));
        assert!(!e.has_speaker_slot_for(1));
    }

    #[test]
    fn organizer_manages_their_event() {
        let organizer = user(Role::SchoolAdmin);
        let mut e = event(organizer.id);
        assert!(e.authorize_manage(&organizer).is_ok());

        e.organizer = UserId::new();
        assert!(matches!(
            e.authorize_manage(&organizer),
            Err(DomainError::Ownership(_))
        ));
    }

    #[test]
    fn super_admin_manages_any_event() {
        let e = event(UserId::new());
        assert!(e.authorize_manage(&user(Role::SuperAdmin)).is_ok());
    }

    #[test]
    fn students_cannot_manage_events() {
        let e = event(UserId::new());
        assert!(matches!(
            e.authorize_manage(&user(Role::Student)),
            Err(DomainError::Authorization(_))
        ));
    }

    #[test]
    fn statuses_round_trip() {
        for status in [
            EventStatus::Draft,
            EventStatus::Published,
            EventStatus::Cancelled,
            EventStatus::Completed,
        ] {
            assert_eq!(
                status.as_str().parse::<EventStatus>().expect("round trip"),
                status
            );
        }
    }
}
