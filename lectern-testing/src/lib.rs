//! Test harness for the Lectern platform.
//!
//! [`TestPlatform`] boots the full HTTP API on the in-memory store behind
//! an `axum_test::TestServer`, seeds one account of every role plus a
//! school for the school administrator, and issues real bearer sessions
//! for each. HTTP tests drive the same router production serves; only the
//! storage backend differs.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_panics_doc)]

use axum_test::TestServer;
use chrono::{Duration, Utc};
use http::{HeaderName, HeaderValue};
use lectern_core::{Role, School, SchoolId, User, UserId};
use lectern_store::{SchoolStore, Session, SessionStore, UserStore};
use lectern_web::config::{AuthConfig, Config, DatabaseConfig, ServerConfig};
use lectern_web::{build_router, tokens, AppState};

/// A seeded account with a live bearer session.
#[derive(Clone, Debug)]
pub struct TestUser {
    /// The account
    pub user: User,
    /// A valid bearer token for it
    pub token: String,
}

/// A running test instance of the platform.
pub struct TestPlatform {
    /// The HTTP server under test
    pub server: TestServer,
    /// The state behind it, for direct store access in assertions
    pub state: AppState,
    /// Seeded platform administrator
    pub super_admin: TestUser,
    /// Seeded school administrator (primary admin of [`Self::school`])
    pub school_admin: TestUser,
    /// Seeded speaker
    pub speaker: TestUser,
    /// Seeded student (member of [`Self::school`])
    pub student: TestUser,
    /// Seeded school
    pub school: School,
}

impl TestPlatform {
    /// Boot the platform on the in-memory store with the standard fixture
    /// set.
    pub async fn new() -> Self {
        let config = test_config();
        let state = AppState::with_memory_store(&config);
        let server =
            TestServer::new(build_router(state.clone())).expect("router builds into a test server");

        let super_admin = seed_user(&state, "root@lectern.dev", "Platform Admin", Role::SuperAdmin)
            .await;
        let school_admin = seed_user(
            &state,
            "principal@northside.edu",
            "Northside Principal",
            Role::SchoolAdmin,
        )
        .await;
        let speaker = seed_user(&state, "speaker@lectern.dev", "Sam Speaker", Role::Speaker).await;
        let student = seed_user(&state, "student@northside.edu", "Sasha Student", Role::Student)
            .await;

        let school = School::new(
            SchoolId::new(),
            "Northside High",
            Some("Fixture school".to_string()),
            school_admin.user.id,
            Utc::now(),
        )
        .expect("fixture school is valid");
        state
            .schools
            .create_school(&school)
            .await
            .expect("fixture school inserts");

        attach_to_school(&state, &school_admin.user, school.id).await;
        attach_to_school(&state, &student.user, school.id).await;

        Self {
            server,
            state,
            super_admin,
            school_admin,
            speaker,
            student,
            school,
        }
    }

    /// Seed one more account with a live session.
    pub async fn create_user(&self, email: &str, name: &str, role: Role) -> TestUser {
        seed_user(&self.state, email, name, role).await
    }

    /// Seed one more school administered by a fresh account.
    pub async fn create_school(&self, name: &str, admin_email: &str) -> (School, TestUser) {
        let admin = self
            .create_user(admin_email, "Another Principal", Role::SchoolAdmin)
            .await;
        let school = School::new(SchoolId::new(), name, None, admin.user.id, Utc::now())
            .expect("school is valid");
        self.state
            .schools
            .create_school(&school)
            .await
            .expect("school inserts");
        attach_to_school(&self.state, &admin.user, school.id).await;
        (school, admin)
    }
}

/// Build the `Authorization: Bearer` header pair for a token.
#[must_use]
pub fn auth_header(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {token}")).expect("token is header-safe"),
    )
}

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
            connect_timeout: 1,
        },
        auth: AuthConfig {
            session_ttl: 3600,
            login_code_ttl: 900,
            expose_login_codes: true,
            bootstrap_admin_email: None,
        },
    }
}

async fn seed_user(state: &AppState, email: &str, name: &str, role: Role) -> TestUser {
    let user = User::new(UserId::new(), email, name, role, Utc::now()).expect("fixture user is valid");
    state
        .users
        .create_user(&user)
        .await
        .expect("fixture user inserts");

    let now = Utc::now();
    let session = Session {
        token: tokens::session_token(),
        user_id: user.id,
        created_at: now,
        expires_at: now + Duration::hours(1),
    };
    state
        .sessions
        .create_session(&session)
        .await
        .expect("fixture session inserts");

    TestUser {
        user,
        token: session.token,
    }
}

async fn attach_to_school(state: &AppState, user: &User, school: SchoolId) {
    let mut user = user.clone();
    user.school_id = Some(school);
    state
        .users
        .update_user(&user)
        .await
        .expect("school membership updates");
}
