//! PostgreSQL workflow stores.

use super::events::{count_approved_slots, fetch_event, insert_event};
use super::{as_i32, as_u32, db_err, unique_conflict, PgStore};
use crate::traits::{EventRequestFilter, EventRequestStore, SpeakerRequestFilter, SpeakerRequestStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::workflow::event_request::{
    EventRequest, EventRequestStatus, Proposal, ProposalPatch, ReviewDecision,
};
use lectern_core::workflow::speaker_request::{
    Application, ApplicationPatch, SpeakerRequest, SpeakerRequestStatus, SpeakerReviewDecision,
    DUPLICATE_APPLICATION, SPEAKER_LIMIT_REACHED,
};
use lectern_core::{
    Capability, Capacity, DomainError, Event, EventId, EventRequestId, Page, Paginated, Result,
    SchoolId, SpeakerRequestId, User, UserId,
};
use sqlx::{FromRow, PgExecutor, Postgres, Transaction};
use uuid::Uuid;

// ═══════════════════════════════════════════════════════════════════════
// Event requests
// ═══════════════════════════════════════════════════════════════════════

#[derive(FromRow)]
struct EventRequestRow {
    id: Uuid,
    school_id: Uuid,
    requested_by: Uuid,
    title: String,
    description: String,
    date: DateTime<Utc>,
    location: String,
    expected_capacity: i32,
    price_cents: i64,
    max_speakers: i32,
    requirements: Option<String>,
    justification: Option<String>,
    status: String,
    review_note: Option<String>,
    approved_event: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EventRequestRow {
    fn into_request(self) -> Result<EventRequest> {
        Ok(EventRequest {
            id: EventRequestId::from_uuid(self.id),
            school_id: SchoolId::from_uuid(self.school_id),
            requested_by: UserId::from_uuid(self.requested_by),
            proposal: Proposal {
                title: self.title,
                description: self.description,
                date: self.date,
                location: self.location,
                expected_capacity: Capacity::new(as_u32(
                    self.expected_capacity,
                    "expected_capacity",
                )?),
                price_cents: self.price_cents,
                max_speakers: as_u32(self.max_speakers, "max_speakers")?,
                requirements: self.requirements,
                justification: self.justification,
            },
            status: self.status.parse::<EventRequestStatus>().map_err(|_| {
                DomainError::unexpected(format!(
                    "Invalid request status in database: {}",
                    self.status
                ))
            })?,
            review_note: self.review_note,
            approved_event: self.approved_event.map(EventId::from_uuid),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const EVENT_REQUEST_COLUMNS: &str = "id, school_id, requested_by, title, description, date, \
     location, expected_capacity, price_cents, max_speakers, requirements, justification, \
     status, review_note, approved_event, created_at, updated_at";

async fn fetch_request<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    for_update: bool,
) -> Result<EventRequest> {
    let suffix = if for_update { " FOR UPDATE" } else { "" };
    let row: Option<EventRequestRow> = sqlx::query_as(&format!(
        "SELECT {EVENT_REQUEST_COLUMNS} FROM event_requests WHERE id = $1{suffix}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(db_err)?;
    row.ok_or(DomainError::not_found("Event request"))?
        .into_request()
}

async fn persist_request(
    tx: &mut Transaction<'_, Postgres>,
    request: &EventRequest,
) -> Result<()> {
    sqlx::query(
        "UPDATE event_requests
         SET title = $2, description = $3, date = $4, location = $5, expected_capacity = $6,
             price_cents = $7, max_speakers = $8, requirements = $9, justification = $10,
             status = $11, review_note = $12, approved_event = $13, updated_at = $14
         WHERE id = $1",
    )
    .bind(request.id.as_uuid())
    .bind(&request.proposal.title)
    .bind(&request.proposal.description)
    .bind(request.proposal.date)
    .bind(&request.proposal.location)
    .bind(as_i32(request.proposal.expected_capacity.value(), "expected_capacity")?)
    .bind(request.proposal.price_cents)
    .bind(as_i32(request.proposal.max_speakers, "max_speakers")?)
    .bind(&request.proposal.requirements)
    .bind(&request.proposal.justification)
    .bind(request.status.as_str())
    .bind(&request.review_note)
    .bind(request.approved_event.map(|e| *e.as_uuid()))
    .bind(request.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl EventRequestStore for PgStore {
    async fn submit_request(
        &self,
        id: EventRequestId,
        requester: &User,
        proposal: Proposal,
        now: DateTime<Utc>,
    ) -> Result<EventRequest> {
        requester.role.require(Capability::SubmitEventRequest)?;
        let school = crate::traits::SchoolStore::school_for_admin(self, requester.id)
            .await?
            .ok_or_else(|| DomainError::validation("You are not associated with any school"))?;
        let request = EventRequest::submit(id, &school, requester, proposal, now)?;

        sqlx::query(
            "INSERT INTO event_requests
                 (id, school_id, requested_by, title, description, date, location,
                  expected_capacity, price_cents, max_speakers, requirements, justification,
                  status, review_note, approved_event, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(request.id.as_uuid())
        .bind(request.school_id.as_uuid())
        .bind(request.requested_by.as_uuid())
        .bind(&request.proposal.title)
        .bind(&request.proposal.description)
        .bind(request.proposal.date)
        .bind(&request.proposal.location)
        .bind(as_i32(request.proposal.expected_capacity.value(), "expected_capacity")?)
        .bind(request.proposal.price_cents)
        .bind(as_i32(request.proposal.max_speakers, "max_speakers")?)
        .bind(&request.proposal.requirements)
        .bind(&request.proposal.justification)
        .bind(request.status.as_str())
        .bind(&request.review_note)
        .bind(request.approved_event.map(|e| *e.as_uuid()))
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(self.pool())
        .await
        .map_err(db_err)?;
        Ok(request)
    }

    async fn request(&self, id: EventRequestId) -> Result<EventRequest> {
        fetch_request(self.pool(), *id.as_uuid(), false).await
    }

    async fn edit_request(
        &self,
        id: EventRequestId,
        editor: &User,
        patch: ProposalPatch,
        now: DateTime<Utc>,
    ) -> Result<EventRequest> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let mut request = fetch_request(&mut *tx, *id.as_uuid(), true).await?;
        request.apply_edit(editor, patch, now)?;
        persist_request(&mut tx, &request).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(request)
    }

    async fn review_request(
        &self,
        id: EventRequestId,
        reviewer: &User,
        decision: ReviewDecision,
        note: Option<String>,
        new_event_id: EventId,
        now: DateTime<Utc>,
    ) -> Result<(EventRequest, Option<Event>)> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;

        // The row lock makes reviews single-shot under concurrency: the
        // second reviewer blocks here, then fails the pending-status guard.
        let mut request = fetch_request(&mut *tx, *id.as_uuid(), true).await?;
        request.review(reviewer, decision, note, now)?;

        let event = if decision == ReviewDecision::Approve {
            let event = request.materialize(new_event_id, now)?;
            request.link_approved_event(event.id)?;
            insert_event(&mut tx, &event).await?;
            Some(event)
        } else {
            None
        };

        persist_request(&mut tx, &request).await?;
        tx.commit().await.map_err(db_err)?;
        Ok((request, event))
    }

    async fn delete_request(&self, id: EventRequestId, principal: &User) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let request = fetch_request(&mut *tx, *id.as_uuid(), true).await?;
        request.authorize_delete(principal)?;
        sqlx::query("DELETE FROM event_requests WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn list_requests(
        &self,
        filter: EventRequestFilter,
        page: Page,
    ) -> Result<Paginated<EventRequest>> {
        let school = filter.school.map(|s| *s.as_uuid());
        let requested_by = filter.requested_by.map(|u| *u.as_uuid());
        let status = filter.status.map(EventRequestStatus::as_str);

        let conditions = "($1::uuid IS NULL OR school_id = $1)
               AND ($2::uuid IS NULL OR requested_by = $2)
               AND ($3::text IS NULL OR status = $3)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM event_requests WHERE {conditions}"
        ))
        .bind(school)
        .bind(requested_by)
        .bind(status)
        .fetch_one(self.pool())
        .await
        .map_err(db_err)?;

        let rows: Vec<EventRequestRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_REQUEST_COLUMNS} FROM event_requests
             WHERE {conditions}
             ORDER BY created_at DESC, id
             LIMIT $4 OFFSET $5"
        ))
        .bind(school)
        .bind(requested_by)
        .bind(status)
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let requests = rows
            .into_iter()
            .map(EventRequestRow::into_request)
            .collect::<Result<Vec<_>>>()?;
        Ok(Paginated::new(requests, u64::try_from(total).unwrap_or(0), page))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Speaker requests
// ═══════════════════════════════════════════════════════════════════════

#[derive(FromRow)]
struct SpeakerRequestRow {
    id: Uuid,
    event_id: Uuid,
    speaker_id: Uuid,
    topic: String,
    bio: Option<String>,
    duration_minutes: i32,
    status: String,
    review_note: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SpeakerRequestRow {
    fn into_request(self) -> Result<SpeakerRequest> {
        Ok(SpeakerRequest {
            id: SpeakerRequestId::from_uuid(self.id),
            event_id: EventId::from_uuid(self.event_id),
            speaker_id: UserId::from_uuid(self.speaker_id),
            application: Application {
                topic: self.topic,
                bio: self.bio,
                duration_minutes: as_u32(self.duration_minutes, "duration_minutes")?,
            },
            status: self.status.parse::<SpeakerRequestStatus>().map_err(|_| {
                DomainError::unexpected(format!(
                    "Invalid application status in database: {}",
                    self.status
                ))
            })?,
            review_note: self.review_note,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SPEAKER_REQUEST_COLUMNS: &str = "id, event_id, speaker_id, topic, bio, duration_minutes, \
     status, review_note, created_at, updated_at";

async fn fetch_application<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    for_update: bool,
) -> Result<SpeakerRequest> {
    let suffix = if for_update { " FOR UPDATE" } else { "" };
    let row: Option<SpeakerRequestRow> = sqlx::query_as(&format!(
        "SELECT {SPEAKER_REQUEST_COLUMNS} FROM speaker_requests WHERE id = $1{suffix}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
    .map_err(db_err)?;
    row.ok_or(DomainError::not_found("Speaker request"))?
        .into_request()
}

async fn persist_application(
    tx: &mut Transaction<'_, Postgres>,
    request: &SpeakerRequest,
) -> Result<()> {
    sqlx::query(
        "UPDATE speaker_requests
         SET topic = $2, bio = $3, duration_minutes = $4, status = $5, review_note = $6,
             updated_at = $7
         WHERE id = $1",
    )
    .bind(request.id.as_uuid())
    .bind(&request.application.topic)
    .bind(&request.application.bio)
    .bind(as_i32(request.application.duration_minutes, "duration_minutes")?)
    .bind(request.status.as_str())
    .bind(&request.review_note)
    .bind(request.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[async_trait]
impl SpeakerRequestStore for PgStore {
    async fn submit_application(
        &self,
        id: SpeakerRequestId,
        event_id: EventId,
        speaker: &User,
        application: Application,
        now: DateTime<Utc>,
    ) -> Result<SpeakerRequest> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let event = fetch_event(&mut *tx, *event_id.as_uuid(), true).await?;

        // Pre-check for a friendlier error; the unique constraint below is
        // the backstop and surfaces the same conflict.
        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM speaker_requests WHERE event_id = $1 AND speaker_id = $2)",
        )
        .bind(event_id.as_uuid())
        .bind(speaker.id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        if duplicate {
            return Err(DomainError::conflict(DUPLICATE_APPLICATION));
        }

        // Approved slots on the event are the capacity source of truth;
        // they cover both workflow approvals and the legacy in-event path.
        let approved = count_approved_slots(&mut *tx, *event_id.as_uuid()).await?;
        let request = SpeakerRequest::submit(id, &event, speaker, application, approved, now)?;

        sqlx::query(
            "INSERT INTO speaker_requests
                 (id, event_id, speaker_id, topic, bio, duration_minutes, status, review_note,
                  created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(request.id.as_uuid())
        .bind(request.event_id.as_uuid())
        .bind(request.speaker_id.as_uuid())
        .bind(&request.application.topic)
        .bind(&request.application.bio)
        .bind(as_i32(request.application.duration_minutes, "duration_minutes")?)
        .bind(request.status.as_str())
        .bind(&request.review_note)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_conflict(e, DUPLICATE_APPLICATION))?;

        tx.commit().await.map_err(db_err)?;
        Ok(request)
    }

    async fn application(&self, id: SpeakerRequestId) -> Result<SpeakerRequest> {
        fetch_application(self.pool(), *id.as_uuid(), false).await
    }

    async fn edit_application(
        &self,
        id: SpeakerRequestId,
        editor: &User,
        patch: ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<SpeakerRequest> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let mut request = fetch_application(&mut *tx, *id.as_uuid(), true).await?;
        request.apply_edit(editor, patch, now)?;
        persist_application(&mut tx, &request).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(request)
    }

    async fn review_application(
        &self,
        id: SpeakerRequestId,
        reviewer: &User,
        decision: SpeakerReviewDecision,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SpeakerRequest> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let mut request = fetch_application(&mut *tx, *id.as_uuid(), true).await?;

        // Lock the event row first: concurrent approvals for the same
        // event serialize here, so the ceiling re-check below cannot race.
        let event = fetch_event(&mut *tx, *request.event_id.as_uuid(), true).await?;
        request.review(reviewer, &event, decision, note, now)?;

        if decision == SpeakerReviewDecision::Approve {
            let approved = count_approved_slots(&mut *tx, *event.id.as_uuid()).await?;
            if !event.has_speaker_slot_for(approved) {
                return Err(DomainError::capacity(SPEAKER_LIMIT_REACHED));
            }
            let slot = request.to_event_speaker(now)?;
            sqlx::query(
                "INSERT INTO event_speakers
                     (event_id, user_id, topic, duration_minutes, status, added_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (event_id, user_id)
                 DO UPDATE SET topic = EXCLUDED.topic,
                               duration_minutes = EXCLUDED.duration_minutes,
                               status = EXCLUDED.status",
            )
            .bind(slot.event_id.as_uuid())
            .bind(slot.user_id.as_uuid())
            .bind(&slot.topic)
            .bind(as_i32(slot.duration_minutes, "duration_minutes")?)
            .bind(slot.status.as_str())
            .bind(slot.added_at)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        persist_application(&mut tx, &request).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(request)
    }

    async fn delete_application(&self, id: SpeakerRequestId, principal: &User) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;
        let request = fetch_application(&mut *tx, *id.as_uuid(), true).await?;
        request.authorize_delete(principal)?;
        sqlx::query("DELETE FROM speaker_requests WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn list_applications(
        &self,
        filter: SpeakerRequestFilter,
        page: Page,
    ) -> Result<Paginated<SpeakerRequest>> {
        let event = filter.event.map(|e| *e.as_uuid());
        let speaker = filter.speaker.map(|s| *s.as_uuid());
        let organizer = filter.organizer.map(|o| *o.as_uuid());
        let status = filter.status.map(SpeakerRequestStatus::as_str);

        let conditions = "($1::uuid IS NULL OR event_id = $1)
               AND ($2::uuid IS NULL OR speaker_id = $2)
               AND ($3::uuid IS NULL OR event_id IN (SELECT id FROM events WHERE organizer = $3))
               AND ($4::text IS NULL OR status = $4)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM speaker_requests WHERE {conditions}"
        ))
        .bind(event)
        .bind(speaker)
        .bind(organizer)
        .bind(status)
        .fetch_one(self.pool())
        .await
        .map_err(db_err)?;

        let rows: Vec<SpeakerRequestRow> = sqlx::query_as(&format!(
            "SELECT {SPEAKER_REQUEST_COLUMNS} FROM speaker_requests
             WHERE {conditions}
             ORDER BY created_at DESC, id
             LIMIT $5 OFFSET $6"
        ))
        .bind(event)
        .bind(speaker)
        .bind(organizer)
        .bind(status)
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let requests = rows
            .into_iter()
            .map(SpeakerRequestRow::into_request)
            .collect::<Result<Vec<_>>>()?;
        Ok(Paginated::new(requests, u64::try_from(total).unwrap_or(0), page))
    }
}
