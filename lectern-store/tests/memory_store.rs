//! Invariant tests against the in-memory store.
//!
//! These drive the store traits directly, below the HTTP layer, pinning
//! the behaviors both backends must share: terminal statuses are
//! immutable, uniqueness violations conflict, and the speaker ceiling
//! holds across interleaved reviews.

use chrono::Utc;
use lectern_core::workflow::event_request::{Proposal, ReviewDecision};
use lectern_core::workflow::speaker_request::Application;
use lectern_core::{
    Capacity, DomainError, EventId, EventRequestId, Role, School, SchoolId, SpeakerRequestId, User,
    UserId,
};
use lectern_store::{
    EventRequestStore, EventStore, FeedbackStore, MemoryStore, SchoolStore, SpeakerRequestStore,
    UserStore,
};

fn user(role: Role, email: &str) -> User {
    User::new(UserId::new(), email, "Someone", role, Utc::now()).expect("valid user")
}

async fn seed_school(store: &MemoryStore) -> (School, User) {
    let admin = user(Role::SchoolAdmin, "principal@school.edu");
    store.create_user(&admin).await.expect("admin inserts");
    let school = School::new(SchoolId::new(), "Test School", None, admin.id, Utc::now())
        .expect("valid school");
    store.create_school(&school).await.expect("school inserts");
    (school, admin)
}

fn proposal(max_speakers: u32) -> Proposal {
    Proposal {
        title: "Science Fair".to_string(),
        description: "Annual fair".to_string(),
        date: Utc::now(),
        location: "Main hall".to_string(),
        expected_capacity: Capacity::new(40),
        price_cents: 0,
        max_speakers,
        requirements: None,
        justification: None,
    }
}

fn application(topic: &str) -> Application {
    Application {
        topic: topic.to_string(),
        bio: None,
        duration_minutes: 30,
    }
}

/// Approve a fresh proposal and return the materialized event's id.
async fn approved_event(store: &MemoryStore, admin: &User, max_speakers: u32) -> EventId {
    let reviewer = user(Role::SuperAdmin, "root@platform.dev");
    let request = store
        .submit_request(EventRequestId::new(), admin, proposal(max_speakers), Utc::now())
        .await
        .expect("submit succeeds");
    let (_, event) = store
        .review_request(
            request.id,
            &reviewer,
            ReviewDecision::Approve,
            None,
            EventId::new(),
            Utc::now(),
        )
        .await
        .expect("review succeeds");
    event.expect("approval materializes an event").id
}

#[tokio::test]
async fn approval_is_single_shot_and_links_exactly_one_event() {
    let store = MemoryStore::new();
    let (_, admin) = seed_school(&store).await;
    let reviewer = user(Role::SuperAdmin, "root@platform.dev");

    let request = store
        .submit_request(EventRequestId::new(), &admin, proposal(2), Utc::now())
        .await
        .expect("submit succeeds");

    let (reviewed, event) = store
        .review_request(
            request.id,
            &reviewer,
            ReviewDecision::Approve,
            None,
            EventId::new(),
            Utc::now(),
        )
        .await
        .expect("first review succeeds");
    let event = event.expect("event materialized");
    assert_eq!(reviewed.approved_event, Some(event.id));

    // The materialized event is persisted with the proposed fields.
    let stored = store.event(event.id).await.expect("event stored");
    assert_eq!(stored.capacity, Capacity::new(40));
    assert_eq!(stored.max_speakers, 2);

    // A second review of any kind fails and creates nothing.
    let err = store
        .review_request(
            request.id,
            &reviewer,
            ReviewDecision::Reject,
            None,
            EventId::new(),
            Utc::now(),
        )
        .await
        .expect_err("second review must fail");
    assert!(matches!(err, DomainError::InvalidState(_)));
}

#[tokio::test]
async fn the_speaker_ceiling_survives_interleaved_reviews() {
    let store = MemoryStore::new();
    let (_, admin) = seed_school(&store).await;
    let event_id = approved_event(&store, &admin, 1).await;

    let first = user(Role::Speaker, "first@speakers.dev");
    let second = user(Role::Speaker, "second@speakers.dev");
    for speaker in [&first, &second] {
        store.create_user(speaker).await.expect("speaker inserts");
    }

    // Both applications land while the event has zero approved slots.
    let a = store
        .submit_application(
            SpeakerRequestId::new(),
            event_id,
            &first,
            application("Topic A"),
            Utc::now(),
        )
        .await
        .expect("first application");
    let b = store
        .submit_application(
            SpeakerRequestId::new(),
            event_id,
            &second,
            application("Topic B"),
            Utc::now(),
        )
        .await
        .expect("second application");

    use lectern_core::SpeakerReviewDecision::Approve;
    store
        .review_application(a.id, &admin, Approve, None, Utc::now())
        .await
        .expect("first approval fits");

    let err = store
        .review_application(b.id, &admin, Approve, None, Utc::now())
        .await
        .expect_err("second approval exceeds the ceiling");
    assert!(matches!(err, DomainError::Capacity(_)));

    // The failed approval changed nothing: still one approved slot and
    // the second application is still reviewable.
    assert_eq!(store.approved_speaker_count(event_id).await.expect("count"), 1);
    let b_after = store.application(b.id).await.expect("still there");
    assert!(b_after.status.is_reviewable());
}

#[tokio::test]
async fn duplicate_applications_conflict_even_after_rejection() {
    let store = MemoryStore::new();
    let (_, admin) = seed_school(&store).await;
    let event_id = approved_event(&store, &admin, 3).await;

    let speaker = user(Role::Speaker, "speaker@speakers.dev");
    store.create_user(&speaker).await.expect("speaker inserts");

    let request = store
        .submit_application(
            SpeakerRequestId::new(),
            event_id,
            &speaker,
            application("Topic"),
            Utc::now(),
        )
        .await
        .expect("application lands");
    store
        .review_application(
            request.id,
            &admin,
            lectern_core::SpeakerReviewDecision::Reject,
            None,
            Utc::now(),
        )
        .await
        .expect("rejection succeeds");

    // One application per (event, speaker), whatever its status.
    let err = store
        .submit_application(
            SpeakerRequestId::new(),
            event_id,
            &speaker,
            application("Second try"),
            Utc::now(),
        )
        .await
        .expect_err("duplicate must conflict");
    assert!(matches!(err, DomainError::Conflict(_)));
}

#[tokio::test]
async fn registrations_respect_capacity_and_uniqueness() {
    let store = MemoryStore::new();
    let (_, admin) = seed_school(&store).await;
    let event_id = approved_event(&store, &admin, 1).await;

    // Shrink the event to a single seat.
    let mut event = store.event(event_id).await.expect("event");
    event.capacity = Capacity::new(1);
    store.update_event(&event).await.expect("update");

    let first = UserId::new();
    let second = UserId::new();
    store
        .register_attendee(event_id, first, Utc::now())
        .await
        .expect("first registration");

    let dup = store
        .register_attendee(event_id, first, Utc::now())
        .await
        .expect_err("duplicate registration");
    assert!(matches!(dup, DomainError::Conflict(_)));

    let full = store
        .register_attendee(event_id, second, Utc::now())
        .await
        .expect_err("capacity reached");
    assert!(matches!(full, DomainError::Capacity(_)));

    store
        .unregister_attendee(event_id, first)
        .await
        .expect("cancellation");
    store
        .register_attendee(event_id, second, Utc::now())
        .await
        .expect("freed seat is usable");
}

#[tokio::test]
async fn feedback_rollup_matches_remaining_ratings() {
    let store = MemoryStore::new();
    let (_, admin) = seed_school(&store).await;
    let event_id = approved_event(&store, &admin, 1).await;

    let alice = UserId::new();
    let bob = UserId::new();
    let a = store
        .submit_feedback(
            lectern_core::FeedbackId::new(),
            event_id,
            alice,
            5,
            None,
            Utc::now(),
        )
        .await
        .expect("first feedback");
    store
        .submit_feedback(
            lectern_core::FeedbackId::new(),
            event_id,
            bob,
            4,
            None,
            Utc::now(),
        )
        .await
        .expect("second feedback");

    let event = store.event(event_id).await.expect("event");
    assert_eq!(event.average_rating, 4.5);
    assert_eq!(event.total_ratings, 2);

    store
        .delete_feedback(a.id, alice, false)
        .await
        .expect("author deletes");
    let event = store.event(event_id).await.expect("event");
    assert_eq!(event.average_rating, 4.0);
    assert_eq!(event.total_ratings, 1);
}
