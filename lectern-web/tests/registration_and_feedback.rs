//! End-to-end tests for attendee registration and the feedback rollup.

use http::StatusCode;
use lectern_core::Role;
use lectern_testing::{auth_header, TestPlatform, TestUser};
use serde_json::{json, Value};

async fn published_event(platform: &TestPlatform, capacity: u32) -> String {
    let (name, value) = auth_header(&platform.school_admin.token);
    let res = platform
        .server
        .post("/api/events")
        .add_header(name, value)
        .json(&json!({
            "title": "Open House",
            "description": "Campus tour and talks",
            "date": "2031-10-01T10:00:00Z",
            "location": "Campus",
            "capacity": capacity,
            "maxSpeakers": 2,
            "status": "published"
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()["event"]["id"]
        .as_str()
        .expect("event id")
        .to_string()
}

async fn register(platform: &TestPlatform, user: &TestUser, event_id: &str) -> (StatusCode, Value) {
    let (name, value) = auth_header(&user.token);
    let res = platform
        .server
        .post(&format!("/api/events/{event_id}/register"))
        .add_header(name, value)
        .await;
    (res.status_code(), res.json::<Value>())
}

async fn submit_feedback(
    platform: &TestPlatform,
    user: &TestUser,
    event_id: &str,
    rating: u8,
) -> (StatusCode, Value) {
    let (name, value) = auth_header(&user.token);
    let res = platform
        .server
        .post("/api/feedback")
        .add_header(name, value)
        .json(&json!({ "eventId": event_id, "rating": rating, "comment": "Nice event" }))
        .await;
    (res.status_code(), res.json::<Value>())
}

async fn event_rating(platform: &TestPlatform, event_id: &str) -> (f64, u64) {
    let event = platform
        .server
        .get(&format!("/api/events/{event_id}"))
        .await
        .json::<Value>();
    (
        event["averageRating"].as_f64().expect("average"),
        event["totalRatings"].as_u64().expect("count"),
    )
}

#[tokio::test]
async fn students_register_once_per_event() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 10).await;

    let (first, _) = register(&platform, &platform.student, &event_id).await;
    assert_eq!(first, StatusCode::OK);

    let (second, body) = register(&platform, &platform.student, &event_id).await;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You are already registered for this event");
}

#[tokio::test]
async fn only_students_register() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 10).await;

    let (status, body) = register(&platform, &platform.speaker, &event_id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Only students can register for events");
}

#[tokio::test]
async fn the_attendee_ceiling_holds() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 1).await;

    let (first, _) = register(&platform, &platform.student, &event_id).await;
    assert_eq!(first, StatusCode::OK);

    let second = platform
        .create_user("second.student@northside.edu", "Second Student", Role::Student)
        .await;
    let (status, body) = register(&platform, &second, &event_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This event is at full capacity");

    // Cancelling frees the seat.
    let (name, value) = auth_header(&platform.student.token);
    let cancelled = platform
        .server
        .delete(&format!("/api/events/{event_id}/register"))
        .add_header(name, value)
        .await;
    assert_eq!(cancelled.status_code(), StatusCode::OK);

    let (retry, _) = register(&platform, &second, &event_id).await;
    assert_eq!(retry, StatusCode::OK);
}

#[tokio::test]
async fn draft_events_refuse_registration() {
    let platform = TestPlatform::new().await;
    let (name, value) = auth_header(&platform.school_admin.token);
    let res = platform
        .server
        .post("/api/events")
        .add_header(name, value)
        .json(&json!({
            "title": "Secret Event",
            "description": "Not announced yet",
            "date": "2031-10-01T10:00:00Z",
            "location": "Campus",
            "capacity": 10
        }))
        .await;
    let event_id = res.json::<Value>()["event"]["id"]
        .as_str()
        .expect("event id")
        .to_string();

    let (status, body) = register(&platform, &platform.student, &event_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Registration is only open for published events"
    );
}

#[tokio::test]
async fn feedback_is_unique_per_event_and_user() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 10).await;

    let (first, _) = submit_feedback(&platform, &platform.student, &event_id, 4).await;
    assert_eq!(first, StatusCode::CREATED);

    let (second, body) = submit_feedback(&platform, &platform.student, &event_id, 5).await;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You have already reviewed this event");
}

#[tokio::test]
async fn the_rating_rollup_tracks_every_mutation() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 10).await;
    let second = platform
        .create_user("second.student@northside.edu", "Second Student", Role::Student)
        .await;
    let third = platform
        .create_user("third.student@northside.edu", "Third Student", Role::Student)
        .await;

    submit_feedback(&platform, &platform.student, &event_id, 5).await;
    assert_eq!(event_rating(&platform, &event_id).await, (5.0, 1));

    submit_feedback(&platform, &second, &event_id, 4).await;
    assert_eq!(event_rating(&platform, &event_id).await, (4.5, 2));

    // (5 + 4 + 4) / 3 = 4.333... rounds to one decimal.
    let (_, body) = submit_feedback(&platform, &third, &event_id, 4).await;
    let third_feedback_id = body["feedback"]["id"].as_str().expect("id").to_string();
    assert_eq!(event_rating(&platform, &event_id).await, (4.3, 3));

    // Updating a rating recomputes the mean: (5 + 4 + 1) / 3 = 3.3.
    let (name, value) = auth_header(&third.token);
    let updated = platform
        .server
        .put(&format!("/api/feedback/{third_feedback_id}"))
        .add_header(name, value)
        .json(&json!({ "rating": 1 }))
        .await;
    assert_eq!(updated.status_code(), StatusCode::OK);
    assert_eq!(event_rating(&platform, &event_id).await, (3.3, 3));

    // Deleting one leaves the mean of the remaining ratings.
    let (name, value) = auth_header(&third.token);
    let deleted = platform
        .server
        .delete(&format!("/api/feedback/{third_feedback_id}"))
        .add_header(name, value)
        .await;
    assert_eq!(deleted.status_code(), StatusCode::OK);
    assert_eq!(event_rating(&platform, &event_id).await, (4.5, 2));
}

#[tokio::test]
async fn feedback_stats_break_down_by_star() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 10).await;
    let second = platform
        .create_user("second.student@northside.edu", "Second Student", Role::Student)
        .await;

    submit_feedback(&platform, &platform.student, &event_id, 5).await;
    submit_feedback(&platform, &second, &event_id, 3).await;

    let stats = platform
        .server
        .get(&format!("/api/feedback/stats/event/{event_id}"))
        .await
        .json::<Value>();
    assert_eq!(stats["averageRating"], 4.0);
    assert_eq!(stats["totalRatings"], 2);
    assert_eq!(stats["distribution"], json!([0, 0, 1, 0, 1]));
}

#[tokio::test]
async fn only_the_author_or_admin_mutates_feedback() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 10).await;
    let (_, body) = submit_feedback(&platform, &platform.student, &event_id, 4).await;
    let feedback_id = body["feedback"]["id"].as_str().expect("id").to_string();

    let second = platform
        .create_user("second.student@northside.edu", "Second Student", Role::Student)
        .await;
    let (name, value) = auth_header(&second.token);
    let forbidden = platform
        .server
        .delete(&format!("/api/feedback/{feedback_id}"))
        .add_header(name, value)
        .await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(
        forbidden.json::<Value>()["message"],
        "You can only modify your own feedback"
    );

    // Platform administrators may moderate.
    let (name, value) = auth_header(&platform.super_admin.token);
    let moderated = platform
        .server
        .delete(&format!("/api/feedback/{feedback_id}"))
        .add_header(name, value)
        .await;
    assert_eq!(moderated.status_code(), StatusCode::OK);
    assert_eq!(event_rating(&platform, &event_id).await, (0.0, 0));
}

#[tokio::test]
async fn non_students_cannot_leave_feedback() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 10).await;

    let (status, body) = submit_feedback(&platform, &platform.speaker, &event_id, 4).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Only students can leave feedback");
}

#[tokio::test]
async fn out_of_range_ratings_are_rejected() {
    let platform = TestPlatform::new().await;
    let event_id = published_event(&platform, 10).await;

    let (status, body) = submit_feedback(&platform, &platform.student, &event_id, 6).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Rating must be between 1 and 5");
}
