//! End-to-end tests for the speaker-application workflow, including the
//! capacity ceiling and the legacy in-event path.

use http::StatusCode;
use lectern_core::Role;
use lectern_testing::{auth_header, TestPlatform, TestUser};
use serde_json::{json, Value};

/// Create a published event organized by the fixture school admin.
async fn published_event(platform: &TestPlatform, max_speakers: u32) -> String {
    let (name, value) = auth_header(&platform.school_admin.token);
    let res = platform
        .server
        .post("/api/events")
        .add_header(name, value)
        .json(&json!({
            "title": "Career Day",
            "description": "Industry speakers present to students",
            "date": "2031-09-01T10:00:00Z",
            "location": "Auditorium",
            "capacity": 100,
            "maxSpeakers": max_speakers,
            "status": "published"
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()["event"]["id"]
        .as_str()
        .expect("event id")
        .to_string()
}

async fn apply(platform: &TestPlatform, speaker: &TestUser, event_id: &str) -> (StatusCode, Value) {
    let (name, value) = auth_header(&speaker.token);
    let res = platform
        .server
        .post("/api/speaker-requests")
        .add_header(name, value)
        .json(&json!({
            "eventId": event_id,
            "topic": "Careers in engineering",
            "durationMinutes": 30
        }))
        .await;
    (res.status_code(), res.json::<Value>())
}

async fn review(
    platform: &TestPlatform,
    reviewer: &TestUser,
    request_id: &str,
    status: &str,
) -> (StatusCode, Value) {
    let (name, value) = auth_header(&reviewer.token);
    let res = platform
        .server
        .put(&format!("/api/speaker-requests/{request_id}/review"))
        .add_header(name, value)
        .json(&json!({ "status": status }))
        .await;
    (res.status_code(), res.json::<Value>())
}

#[tokio::test]
async fn applications_start_pending() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 3).await;

    let (status, body) = apply(&platform, &platform.speaker, &event_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["speakerRequest"]["status"], "pending");
    assert_eq!(body["speakerRequest"]["eventId"], event_id.as_str());
}

#[tokio::test]
async fn only_speakers_apply() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 3).await;

    let (status, body) = apply(&platform, &platform.student, &event_id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Only speakers can apply to present at events");
}

#[tokio::test]
async fn duplicate_applications_conflict() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 3).await;

    let (first, _) = apply(&platform, &platform.speaker, &event_id).await;
    assert_eq!(first, StatusCode::CREATED);

    let (second, body) = apply(&platform, &platform.speaker, &event_id).await;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "You have already applied to present at this event"
    );
}

#[tokio::test]
async fn draft_events_refuse_applications() {
    let platform = TestPlatform::new().await;
    let (name, value) = auth_header(&platform.school_admin.token);
    let res = platform
        .server
        .post("/api/events")
        .add_header(name, value)
        .json(&json!({
            "title": "Unannounced Event",
            "description": "Still in planning",
            "date": "2031-09-01T10:00:00Z",
            "location": "TBD",
            "capacity": 10,
            "maxSpeakers": 2
        }))
        .await;
    let event_id = res.json::<Value>()["event"]["id"]
        .as_str()
        .expect("event id")
        .to_string();

    let (status, body) = apply(&platform, &platform.speaker, &event_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Speaker applications are only open for published events"
    );
}

#[tokio::test]
async fn organizer_approval_appends_a_speaker_slot() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 3).await;
    let (_, body) = apply(&platform, &platform.speaker, &event_id).await;
    let request_id = body["speakerRequest"]["id"].as_str().expect("id");

    let (status, body) = review(&platform, &platform.school_admin, request_id, "approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["speakerRequest"]["status"], "approved");

    let speakers = platform
        .server
        .get(&format!("/api/events/{event_id}/speakers"))
        .await
        .json::<Value>();
    let slots = speakers.as_array().expect("slots");
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0]["status"], "approved");
    assert_eq!(
        slots[0]["userId"],
        platform.speaker.user.id.to_string().as_str()
    );
}

#[tokio::test]
async fn the_capacity_ceiling_holds_at_submit_time() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 1).await;

    let (_, body) = apply(&platform, &platform.speaker, &event_id).await;
    let request_id = body["speakerRequest"]["id"].as_str().expect("id");
    review(&platform, &platform.school_admin, request_id, "approved").await;

    // One slot, one approved speaker: the next application bounces.
    let second = platform
        .create_user("second.speaker@lectern.dev", "Second Speaker", Role::Speaker)
        .await;
    let (status, body) = apply(&platform, &second, &event_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This event has reached its speaker limit");
}

#[tokio::test]
async fn the_capacity_ceiling_holds_at_review_time() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 1).await;

    // Both apply while zero slots are taken.
    let second = platform
        .create_user("second.speaker@lectern.dev", "Second Speaker", Role::Speaker)
        .await;
    let (_, first_body) = apply(&platform, &platform.speaker, &event_id).await;
    let (_, second_body) = apply(&platform, &second, &event_id).await;
    let first_id = first_body["speakerRequest"]["id"].as_str().expect("id");
    let second_id = second_body["speakerRequest"]["id"].as_str().expect("id");

    let (first_status, _) = review(&platform, &platform.school_admin, first_id, "approved").await;
    assert_eq!(first_status, StatusCode::OK);

    // The ceiling is re-derived at review time, so the second approval
    // fails even though the application predates the first approval.
    let (second_status, body) =
        review(&platform, &platform.school_admin, second_id, "approved").await;
    assert_eq!(second_status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This event has reached its speaker limit");

    // The failed approval left the application reviewable.
    let (waitlist_status, _) =
        review(&platform, &platform.school_admin, second_id, "waitlisted").await;
    assert_eq!(waitlist_status, StatusCode::OK);
}

#[tokio::test]
async fn only_the_organizer_or_platform_admin_reviews() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 3).await;
    let (_, body) = apply(&platform, &platform.speaker, &event_id).await;
    let request_id = body["speakerRequest"]["id"].as_str().expect("id");

    let (_, other_admin) = platform
        .create_school("Southside High", "principal@southside.edu")
        .await;
    let (status, _) = review(&platform, &other_admin, request_id, "approved").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = review(&platform, &platform.super_admin, request_id, "approved").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn waitlisted_applications_stay_reviewable() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 2).await;
    let (_, body) = apply(&platform, &platform.speaker, &event_id).await;
    let request_id = body["speakerRequest"]["id"].as_str().expect("id");

    let (status, body) = review(&platform, &platform.school_admin, request_id, "waitlisted").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["speakerRequest"]["status"], "waitlisted");

    // A waitlisted application can be picked up again later.
    let (status, body) = review(&platform, &platform.school_admin, request_id, "approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["speakerRequest"]["status"], "approved");
}

#[tokio::test]
async fn approved_and_rejected_applications_are_terminal() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 2).await;
    let (_, body) = apply(&platform, &platform.speaker, &event_id).await;
    let request_id = body["speakerRequest"]["id"].as_str().expect("id");
    review(&platform, &platform.school_admin, request_id, "rejected").await;

    let (status, body) = review(&platform, &platform.school_admin, request_id, "approved").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This application has already been reviewed");

    // Terminal applications refuse edits too.
    let (name, value) = auth_header(&platform.speaker.token);
    let edit = platform
        .server
        .put(&format!("/api/speaker-requests/{request_id}"))
        .add_header(name, value)
        .json(&json!({ "topic": "A new topic" }))
        .await;
    assert_eq!(edit.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn editing_a_waitlisted_application_returns_it_to_pending() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 2).await;
    let (_, body) = apply(&platform, &platform.speaker, &event_id).await;
    let request_id = body["speakerRequest"]["id"].as_str().expect("id");
    review(&platform, &platform.school_admin, request_id, "waitlisted").await;

    let (name, value) = auth_header(&platform.speaker.token);
    let edit = platform
        .server
        .put(&format!("/api/speaker-requests/{request_id}"))
        .add_header(name, value)
        .json(&json!({ "topic": "Careers in robotics" }))
        .await;
    assert_eq!(edit.status_code(), StatusCode::OK);
    let body = edit.json::<Value>();
    assert_eq!(body["speakerRequest"]["status"], "pending");
    assert_eq!(body["speakerRequest"]["topic"], "Careers in robotics");
}

#[tokio::test]
async fn approved_applications_cannot_be_withdrawn() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 2).await;
    let (_, body) = apply(&platform, &platform.speaker, &event_id).await;
    let request_id = body["speakerRequest"]["id"].as_str().expect("id");
    review(&platform, &platform.school_admin, request_id, "approved").await;

    let (name, value) = auth_header(&platform.speaker.token);
    let res = platform
        .server
        .delete(&format!("/api/speaker-requests/{request_id}"))
        .add_header(name, value)
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json::<Value>()["message"],
        "Approved applications cannot be withdrawn"
    );
}

#[tokio::test]
async fn legacy_in_event_path_shares_the_ceiling() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 1).await;

    // Apply through the legacy path.
    let (name, value) = auth_header(&platform.speaker.token);
    let applied = platform
        .server
        .post(&format!("/api/events/{event_id}/apply-speaker"))
        .add_header(name, value)
        .json(&json!({ "topic": "Engineering careers", "durationMinutes": 25 }))
        .await;
    assert_eq!(applied.status_code(), StatusCode::CREATED);
    assert_eq!(applied.json::<Value>()["speaker"]["status"], "pending");

    // Organizer approves through the legacy path.
    let speaker_id = platform.speaker.user.id.to_string();
    let (name, value) = auth_header(&platform.school_admin.token);
    let approved = platform
        .server
        .put(&format!("/api/events/{event_id}/speakers/{speaker_id}"))
        .add_header(name, value)
        .json(&json!({ "status": "approved" }))
        .await;
    assert_eq!(approved.status_code(), StatusCode::OK);

    // The slot consumed the only opening, so the workflow path now
    // reports the ceiling as reached.
    let second = platform
        .create_user("second.speaker@lectern.dev", "Second Speaker", Role::Speaker)
        .await;
    let (status, body) = apply(&platform, &second, &event_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This event has reached its speaker limit");
}

#[tokio::test]
async fn speakers_see_only_their_own_applications() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 3).await;
    apply(&platform, &platform.speaker, &event_id).await;

    let second = platform
        .create_user("second.speaker@lectern.dev", "Second Speaker", Role::Speaker)
        .await;
    apply(&platform, &second, &event_id).await;

    let (name, value) = auth_header(&second.token);
    let list = platform
        .server
        .get("/api/speaker-requests")
        .add_header(name, value)
        .await;
    let body = list.json::<Value>();
    assert_eq!(body["total"], 1);
    assert_eq!(
        body["items"][0]["speakerId"],
        second.user.id.to_string().as_str()
    );

    // The organizer sees both.
    let (name, value) = auth_header(&platform.school_admin.token);
    let list = platform
        .server
        .get("/api/speaker-requests")
        .add_header(name, value)
        .await;
    assert_eq!(list.json::<Value>()["total"], 2);
}
