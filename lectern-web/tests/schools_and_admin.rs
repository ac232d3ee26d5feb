//! End-to-end tests for tenant management and the admin surface.

use http::StatusCode;
use lectern_core::Role;
use lectern_testing::{auth_header, TestPlatform};
use serde_json::{json, Value};

#[tokio::test]
async fn only_platform_admins_create_schools() {
    let platform = TestPlatform::new().await;
    let principal = platform
        .create_user("newprincipal@eastside.edu", "Eastside Principal", Role::SchoolAdmin)
        .await;

    let (name, value) = auth_header(&platform.school_admin.token);
    let forbidden = platform
        .server
        .post("/api/schools")
        .add_header(name, value)
        .json(&json!({ "name": "Eastside High", "adminId": principal.user.id.to_string() }))
        .await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = auth_header(&platform.super_admin.token);
    let created = platform
        .server
        .post("/api/schools")
        .add_header(name, value)
        .json(&json!({ "name": "Eastside High", "adminId": principal.user.id.to_string() }))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    let body = created.json::<Value>();
    assert_eq!(body["school"]["name"], "Eastside High");
    assert_eq!(
        body["school"]["admin"],
        principal.user.id.to_string().as_str()
    );
}

#[tokio::test]
async fn school_names_are_unique() {
    let platform = TestPlatform::new().await;
    let principal = platform
        .create_user("newprincipal@eastside.edu", "Eastside Principal", Role::SchoolAdmin)
        .await;

    let (name, value) = auth_header(&platform.super_admin.token);
    let duplicate = platform
        .server
        .post("/api/schools")
        .add_header(name, value)
        .json(&json!({ "name": "Northside High", "adminId": principal.user.id.to_string() }))
        .await;
    assert_eq!(duplicate.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        duplicate.json::<Value>()["message"],
        "A school with this name already exists"
    );
}

#[tokio::test]
async fn the_school_admin_must_hold_the_role() {
    let platform = TestPlatform::new().await;
    let (name, value) = auth_header(&platform.super_admin.token);
    let res = platform
        .server
        .post("/api/schools")
        .add_header(name, value)
        .json(&json!({
            "name": "Eastside High",
            "adminId": platform.student.user.id.to_string()
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json::<Value>()["message"],
        "The school administrator must hold the school_admin role"
    );
}

#[tokio::test]
async fn schools_are_updated_by_their_own_admins_only() {
    let platform = TestPlatform::new().await;
    let school_id = platform.school.id.to_string();

    let (_, other_admin) = platform
        .create_school("Southside High", "principal@southside.edu")
        .await;
    let (name, value) = auth_header(&other_admin.token);
    let forbidden = platform
        .server
        .put(&format!("/api/schools/{school_id}"))
        .add_header(name, value)
        .json(&json!({ "description": "Hijacked" }))
        .await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

    let (name, value) = auth_header(&platform.school_admin.token);
    let updated = platform
        .server
        .put(&format!("/api/schools/{school_id}"))
        .add_header(name, value)
        .json(&json!({ "description": "The north side's finest" }))
        .await;
    assert_eq!(updated.status_code(), StatusCode::OK);
    assert_eq!(
        updated.json::<Value>()["school"]["description"],
        "The north side's finest"
    );
}

#[tokio::test]
async fn additional_admins_gain_workflow_powers() {
    let platform = TestPlatform::new().await;
    let school_id = platform.school.id.to_string();
    let co_admin = platform
        .create_user("coadmin@northside.edu", "Co Admin", Role::SchoolAdmin)
        .await;

    let (name, value) = auth_header(&platform.school_admin.token);
    let updated = platform
        .server
        .put(&format!("/api/schools/{school_id}"))
        .add_header(name, value)
        .json(&json!({ "additionalAdmins": [co_admin.user.id.to_string()] }))
        .await;
    assert_eq!(updated.status_code(), StatusCode::OK);

    // The co-admin can now submit event requests for the school.
    let (name, value) = auth_header(&co_admin.token);
    let submitted = platform
        .server
        .post("/api/event-requests")
        .add_header(name, value)
        .json(&json!({
            "title": "Co-admin event",
            "description": "Submitted by an additional admin",
            "date": "2031-06-01T09:00:00Z",
            "location": "Gym",
            "expectedCapacity": 30
        }))
        .await;
    assert_eq!(submitted.status_code(), StatusCode::CREATED);
    assert_eq!(
        submitted.json::<Value>()["eventRequest"]["schoolId"],
        school_id.as_str()
    );
}

#[tokio::test]
async fn schools_hosting_events_cannot_be_deleted() {
    let platform = TestPlatform::new().await;
    let school_id = platform.school.id.to_string();

    let (name, value) = auth_header(&platform.school_admin.token);
    platform
        .server
        .post("/api/events")
        .add_header(name, value)
        .json(&json!({
            "title": "Blocking Event",
            "description": "Keeps the school alive",
            "date": "2031-10-01T10:00:00Z",
            "location": "Campus",
            "capacity": 10
        }))
        .await;

    let (name, value) = auth_header(&platform.super_admin.token);
    let res = platform
        .server
        .delete(&format!("/api/schools/{school_id}"))
        .add_header(name, value)
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        res.json::<Value>()["message"],
        "Schools hosting events cannot be deleted"
    );
}

#[tokio::test]
async fn student_listing_is_scoped_to_school_admins() {
    let platform = TestPlatform::new().await;
    let school_id = platform.school.id.to_string();

    let (name, value) = auth_header(&platform.school_admin.token);
    let own = platform
        .server
        .get(&format!("/api/schools/{school_id}/students"))
        .add_header(name, value)
        .await;
    assert_eq!(own.status_code(), StatusCode::OK);
    let body = own.json::<Value>();
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["email"], "student@northside.edu");

    let (_, other_admin) = platform
        .create_school("Southside High", "principal@southside.edu")
        .await;
    let (name, value) = auth_header(&other_admin.token);
    let foreign = platform
        .server
        .get(&format!("/api/schools/{school_id}/students"))
        .add_header(name, value)
        .await;
    assert_eq!(foreign.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn school_listing_is_paginated() {
    let platform = TestPlatform::new().await;
    platform
        .create_school("Southside High", "principal@southside.edu")
        .await;
    platform
        .create_school("Westside High", "principal@westside.edu")
        .await;

    let res = platform
        .server
        .get("/api/schools")
        .add_query_param("page", 1)
        .add_query_param("limit", 2)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let body = res.json::<Value>();
    assert_eq!(body["total"], 3);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["items"].as_array().expect("items").len(), 2);
}

#[tokio::test]
async fn the_dashboard_reports_live_counts() {
    let platform = TestPlatform::new().await;

    // One pending proposal and one published event.
    let (name, value) = auth_header(&platform.school_admin.token);
    platform
        .server
        .post("/api/event-requests")
        .add_header(name, value)
        .json(&json!({
            "title": "Pending Proposal",
            "description": "Awaiting review",
            "date": "2031-06-01T09:00:00Z",
            "location": "Hall",
            "expectedCapacity": 20
        }))
        .await;
    let (name, value) = auth_header(&platform.school_admin.token);
    platform
        .server
        .post("/api/events")
        .add_header(name, value)
        .json(&json!({
            "title": "Existing Event",
            "description": "Already live",
            "date": "2031-10-01T10:00:00Z",
            "location": "Campus",
            "capacity": 10,
            "status": "published"
        }))
        .await;

    let (name, value) = auth_header(&platform.super_admin.token);
    let res = platform
        .server
        .get("/api/admin/dashboard")
        .add_header(name, value)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let body = res.json::<Value>();
    assert_eq!(body["stats"]["totalSchools"], 1);
    assert_eq!(body["stats"]["totalEvents"], 1);
    assert_eq!(body["stats"]["upcomingEvents"], 1);
    assert_eq!(body["stats"]["pendingEventRequests"], 1);
    assert_eq!(body["eventRequestsByStatus"][0]["status"], "pending");
    assert_eq!(body["eventRequestsByStatus"][0]["count"], 1);
    assert_eq!(body["topSchools"][0]["name"], "Northside High");
    assert_eq!(body["topSchools"][0]["eventCount"], 1);

    // The dashboard is administrator-only.
    let (name, value) = auth_header(&platform.school_admin.token);
    let forbidden = platform
        .server
        .get("/api/admin/dashboard")
        .add_header(name, value)
        .await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_provisions_and_deactivates_accounts() {
    let platform = TestPlatform::new().await;

    let (name, value) = auth_header(&platform.super_admin.token);
    let created = platform
        .server
        .post("/api/admin/users")
        .add_header(name, value)
        .json(&json!({
            "email": "newadmin@lectern.dev",
            "name": "New Admin",
            "role": "school_admin"
        }))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    assert_eq!(created.json::<Value>()["user"]["role"], "school_admin");

    // Deactivating an account kills its sessions.
    let target = platform
        .create_user("victim@lectern.dev", "Victim", Role::Student)
        .await;
    let target_id = target.user.id.to_string();
    let (name, value) = auth_header(&platform.super_admin.token);
    let deactivated = platform
        .server
        .delete(&format!("/api/admin/users/{target_id}"))
        .add_header(name, value)
        .await;
    assert_eq!(deactivated.status_code(), StatusCode::OK);

    let (name, value) = auth_header(&target.token);
    let me = platform.server.get("/api/auth/me").add_header(name, value).await;
    assert_eq!(me.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        me.json::<Value>()["message"],
        "This account has been deactivated"
    );

    // Deactivated accounts cannot request new login codes either.
    let login = platform
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "victim@lectern.dev" }))
        .await;
    assert!(login.json::<Value>()["loginCode"].is_null());
}

#[tokio::test]
async fn admins_cannot_deactivate_themselves() {
    let platform = TestPlatform::new().await;
    let own_id = platform.super_admin.user.id.to_string();

    let (name, value) = auth_header(&platform.super_admin.token);
    let res = platform
        .server
        .delete(&format!("/api/admin/users/{own_id}"))
        .add_header(name, value)
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}
