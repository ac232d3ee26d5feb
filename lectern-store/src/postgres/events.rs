//! PostgreSQL event store.

use super::{as_i32, as_u32, db_err, unique_conflict, PgStore};
use crate::traits::{EventFilter, EventStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::workflow::speaker_request::{
    Application, DUPLICATE_APPLICATION, SPEAKER_LIMIT_REACHED,
};
use lectern_core::{
    Capability, Capacity, DomainError, Event, EventId, EventRegistration, EventSpeaker,
    EventStatus, Page, Paginated, Result, SchoolId, SpeakerSlotStatus, User, UserId,
};
use sqlx::{FromRow, PgExecutor, Postgres, Transaction};
use uuid::Uuid;

#[derive(FromRow)]
pub(crate) struct EventRow {
    id: Uuid,
    title: String,
    description: String,
    host_school: Uuid,
    organizer: Uuid,
    date: DateTime<Utc>,
    location: String,
    capacity: i32,
    price_cents: i64,
    max_speakers: i32,
    requirements: Option<String>,
    status: String,
    is_public: bool,
    average_rating: f64,
    total_ratings: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EventRow {
    pub(crate) fn into_event(self) -> Result<Event> {
        Ok(Event {
            id: EventId::from_uuid(self.id),
            title: self.title,
            description: self.description,
            host_school: SchoolId::from_uuid(self.host_school),
            organizer: UserId::from_uuid(self.organizer),
            date: self.date,
            location: self.location,
            capacity: Capacity::new(as_u32(self.capacity, "capacity")?),
            price_cents: self.price_cents,
            max_speakers: as_u32(self.max_speakers, "max_speakers")?,
            requirements: self.requirements,
            status: self.status.parse::<EventStatus>().map_err(|_| {
                DomainError::unexpected(format!("Invalid event status in database: {}", self.status))
            })?,
            is_public: self.is_public,
            average_rating: self.average_rating,
            total_ratings: as_u32(self.total_ratings, "total_ratings")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct SpeakerSlotRow {
    event_id: Uuid,
    user_id: Uuid,
    topic: String,
    duration_minutes: i32,
    status: String,
    added_at: DateTime<Utc>,
}

impl SpeakerSlotRow {
    fn into_slot(self) -> Result<EventSpeaker> {
        Ok(EventSpeaker {
            event_id: EventId::from_uuid(self.event_id),
            user_id: UserId::from_uuid(self.user_id),
            topic: self.topic,
            duration_minutes: as_u32(self.duration_minutes, "duration_minutes")?,
            status: self.status.parse::<SpeakerSlotStatus>().map_err(|_| {
                DomainError::unexpected(format!(
                    "Invalid speaker status in database: {}",
                    self.status
                ))
            })?,
            added_at: self.added_at,
        })
    }
}

pub(crate) const EVENT_COLUMNS: &str = "id, title, description, host_school, organizer, date, \
     location, capacity, price_cents, max_speakers, requirements, status, is_public, \
     average_rating, total_ratings, created_at, updated_at";

/// Load an event row, taking a row lock when called inside a transaction
/// with `FOR UPDATE` appended by the caller.
pub(crate) async fn fetch_event<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    for_update: bool,
) -> Result<Event> {
    let suffix = if for_update { " FOR UPDATE" } else { "" };
    let row: Option<EventRow> = sqlx::query_as(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1{suffix}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(db_err)?;
    row.ok_or(DomainError::not_found("Event"))?.into_event()
}

/// Count approved speaker slots for an event.
pub(crate) async fn count_approved_slots<'e, E: PgExecutor<'e>>(
    executor: E,
    event: Uuid,
) -> Result<u32> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM event_speakers WHERE event_id = $1 AND status = 'approved'",
    )
    .bind(event)
    .fetch_one(executor)
    .await
    .map_err(db_err)?;
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

/// Insert an event row inside a transaction.
pub(crate) async fn insert_event(tx: &mut Transaction<'_, Postgres>, event: &Event) -> Result<()> {
    sqlx::query(
        "INSERT INTO events (id, title, description, host_school, organizer, date, location,
                             capacity, price_cents, max_speakers, requirements, status,
                             is_public, average_rating, total_ratings, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
    )
    .bind(event.id.as_uuid())
    .bind(&event.title)
    .bind(&event.description)
    .bind(event.host_school.as_uuid())
    .bind(event.organizer.as_uuid())
    .bind(event.date)
    .bind(&event.location)
    .bind(as_i32(event.capacity.value(), "capacity")?)
    .bind(event.price_cents)
    .bind(as_i32(event.max_speakers, "max_speakers")?)
    .bind(&event.requirements)
    .bind(event.status.as_str())
    .bind(event.is_public)
    .bind(event.average_rating)
    .bind(as_i32(event.total_ratings, "total_ratings")?)
    .bind(event.created_at)
    .bind(event.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl EventStore for PgStore {
    async fn create_event(&self, event: &Event) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        insert_event(&mut tx, event).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn event(&self, id: EventId) -> Result<Event> {
        fetch_event(self.pool(), *id.as_uuid(), false).await
    }

    async fn update_event(&self, event: &Event) -> Result<()> {
        let result = sqlx::query(
            "UPDATE events
             SET title = $2, description = $3, date = $4, location = $5, capacity = $6,
                 price_cents = $7, max_speakers = $8, requirements = $9, status = $10,
                 is_public = $11, average_rating = $12, total_ratings = $13, updated_at = $14
             WHERE id = $1",
        )
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(as_i32(event.capacity.value(), "capacity")?)
        .bind(event.price_cents)
        .bind(as_i32(event.max_speakers, "max_speakers")?)
        .bind(&event.requirements)
        .bind(event.status.as_str())
        .bind(event.is_public)
        .bind(event.average_rating)
        .bind(as_i32(event.total_ratings, "total_ratings")?)
        .bind(event.updated_at)
        .execute(self.pool())
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Event"));
        }
        Ok(())
    }

    async fn delete_event(&self, id: EventId) -> Result<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Event"));
        }
        Ok(())
    }

    async fn list_events(&self, filter: EventFilter, page: Page) -> Result<Paginated<Event>> {
        let status = filter.status.map(EventStatus::as_str);
        let school = filter.school.map(|s| *s.as_uuid());
        let organizer = filter.organizer.map(|o| *o.as_uuid());

        let conditions = "($1::text IS NULL OR status = $1)
               AND ($2::uuid IS NULL OR host_school = $2)
               AND ($3::uuid IS NULL OR organizer = $3)
               AND (NOT $4 OR is_public)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM events WHERE {conditions}"
        ))
        .bind(status)
        .bind(school)
        .bind(organizer)
        .bind(filter.public_only)
        .fetch_one(self.pool())
        .await
        .map_err(db_err)?;

        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE {conditions}
             ORDER BY date, id
             LIMIT $5 OFFSET $6"
        ))
        .bind(status)
        .bind(school)
        .bind(organizer)
        .bind(filter.public_only)
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let events = rows
            .into_iter()
            .map(EventRow::into_event)
            .collect::<Result<Vec<_>>>()?;
        Ok(Paginated::new(events, u64::try_from(total).unwrap_or(0), page))
    }

    async fn register_attendee(
        &self,
        event_id: EventId,
        student: UserId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;

        // Row lock on the event serializes concurrent registrations for
        // the same event, closing the check-then-insert race.
        let event = fetch_event(&mut *tx, *event_id.as_uuid(), true).await?;
        if !event.is_published() {
            return Err(DomainError::invalid_state(
                "Registration is only open for published events",
            ));
        }

        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM event_registrations WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id.as_uuid())
        .bind(student.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        if duplicate {
            return Err(DomainError::conflict(
                "You are already registered for this event",
            ));
        }

        let registered: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM event_registrations WHERE event_id = $1")
                .bind(event_id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
        if !event.has_seat_for(u32::try_from(registered).unwrap_or(u32::MAX)) {
            return Err(DomainError::capacity("This event is at full capacity"));
        }

        sqlx::query(
            "INSERT INTO event_registrations (event_id, user_id, registered_at)
             VALUES ($1, $2, $3)",
        )
        .bind(event_id.as_uuid())
        .bind(student.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, "You are already registered for this event"))?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn unregister_attendee(&self, event_id: EventId, student: UserId) -> Result<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id.as_uuid())
            .fetch_one(self.pool())
            .await
            .map_err(db_err)?;
        if !exists {
            return Err(DomainError::not_found("Event"));
        }
        let result =
            sqlx::query("DELETE FROM event_registrations WHERE event_id = $1 AND user_id = $2")
                .bind(event_id.as_uuid())
                .bind(student.as_uuid())
                .execute(self.pool())
                .await
                .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Registration"));
        }
        Ok(())
    }

    async fn registrations(&self, event_id: EventId) -> Result<Vec<EventRegistration>> {
        fetch_event(self.pool(), *event_id.as_uuid(), false).await?;
        let rows: Vec<(Uuid, Uuid, DateTime<Utc>)> = sqlx::query_as(
            "SELECT event_id, user_id, registered_at FROM event_registrations
             WHERE event_id = $1 ORDER BY registered_at",
        )
        .bind(event_id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;
        Ok(rows
            .into_iter()
            .map(|(event, user, registered_at)| EventRegistration {
                event_id: EventId::from_uuid(event),
                user_id: UserId::from_uuid(user),
                registered_at,
            })
            .collect())
    }

    async fn speakers(&self, event_id: EventId) -> Result<Vec<EventSpeaker>> {
        fetch_event(self.pool(), *event_id.as_uuid(), false).await?;
        let rows: Vec<SpeakerSlotRow> = sqlx::query_as(
            "SELECT event_id, user_id, topic, duration_minutes, status, added_at
             FROM event_speakers WHERE event_id = $1 ORDER BY added_at",
        )
        .bind(event_id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;
        rows.into_iter().map(SpeakerSlotRow::into_slot).collect()
    }

    async fn approved_speaker_count(&self, event_id: EventId) -> Result<u32> {
        count_approved_slots(self.pool(), *event_id.as_uuid()).await
    }

    async fn apply_speaker_slot(
        &self,
        event_id: EventId,
        speaker: &User,
        application: Application,
        now: DateTime<Utc>,
    ) -> Result<EventSpeaker> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let event = fetch_event(&mut *tx, *event_id.as_uuid(), true).await?;

        speaker.role.require(Capability::ApplyAsSpeaker)?;
        if !event.is_published() {
            return Err(DomainError::invalid_state(
                "Speaker applications are only open for published events",
            ));
        }
        application.validate()?;
        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM event_speakers WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id.as_uuid())
        .bind(speaker.id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        if duplicate {
            return Err(DomainError::conflict(DUPLICATE_APPLICATION));
        }
        let approved = count_approved_slots(&mut *tx, *event_id.as_uuid()).await?;
        if !event.has_speaker_slot_for(approved) {
            return Err(DomainError::capacity(SPEAKER_LIMIT_REACHED));
        }

        let slot = EventSpeaker {
            event_id,
            user_id: speaker.id,
            topic: application.topic,
            duration_minutes: application.duration_minutes,
            status: SpeakerSlotStatus::Pending,
            added_at: now,
        };
        sqlx::query(
            "INSERT INTO event_speakers (event_id, user_id, topic, duration_minutes, status, added_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(slot.event_id.as_uuid())
        .bind(slot.user_id.as_uuid())
        .bind(&slot.topic)
        .bind(as_i32(slot.duration_minutes, "duration_minutes")?)
        .bind(slot.status.as_str())
        .bind(slot.added_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, DUPLICATE_APPLICATION))?;

        tx.commit().await.map_err(db_err)?;
        Ok(slot)
    }

    async fn review_speaker_slot(
        &self,
        event_id: EventId,
        speaker: UserId,
        reviewer: &User,
        target: SpeakerSlotStatus,
    ) -> Result<EventSpeaker> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let event = fetch_event(&mut *tx, *event_id.as_uuid(), true).await?;
        event.authorize_speaker_review(reviewer)?;
        if target == SpeakerSlotStatus::Pending {
            return Err(DomainError::validation(
                "Review status must be one of: approved, rejected",
            ));
        }

        let row: Option<SpeakerSlotRow> = sqlx::query_as(
            "SELECT event_id, user_id, topic, duration_minutes, status, added_at
             FROM event_speakers WHERE event_id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(event_id.as_uuid())
        .bind(speaker.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        let mut slot = row
            .ok_or(DomainError::not_found("Speaker application"))?
            .into_slot()?;
        if slot.status != SpeakerSlotStatus::Pending {
            return Err(DomainError::invalid_state(
                "This application has already been reviewed",
            ));
        }
        if target == SpeakerSlotStatus::Approved {
            let approved = count_approved_slots(&mut *tx, *event_id.as_uuid()).await?;
            if !event.has_speaker_slot_for(approved) {
                return Err(DomainError::capacity(SPEAKER_LIMIT_REACHED));
            }
        }

        sqlx::query(
            "UPDATE event_speakers SET status = $3 WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event_id.as_uuid())
        .bind(speaker.as_uuid())
        .bind(target.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        slot.status = target;
        Ok(slot)
    }
}
