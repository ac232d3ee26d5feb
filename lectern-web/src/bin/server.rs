//! Lectern server.
//!
//! Binds the HTTP API on the configured address, backed by PostgreSQL when
//! `DATABASE_URL` is set and by the in-memory store otherwise.
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/lectern cargo run --bin lectern-server
//! ```

use chrono::Utc;
use lectern_core::{Role, User, UserId};
use lectern_store::UserStore;
use lectern_web::{build_router, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lectern_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        database = %config.database.url.as_deref().unwrap_or("<in-memory>"),
        "Configuration loaded"
    );

    let state = match &config.database.url {
        Some(url) => {
            let store = lectern_store::PgStore::connect(
                url,
                config.database.max_connections,
                config.database.connect_timeout,
            )
            .await?;
            store.migrate().await?;
            tracing::info!("Database connected and migrated");
            AppState::with_pg_store(store, &config)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, running on the in-memory store");
            AppState::with_memory_store(&config)
        }
    };

    if let Some(email) = &config.auth.bootstrap_admin_email {
        bootstrap_admin(&state, email).await?;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Lectern server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

/// Seed a platform administrator unless the email is already registered.
async fn bootstrap_admin(
    state: &AppState,
    email: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if state.users.user_by_email(email).await.is_ok() {
        return Ok(());
    }
    let admin = User::new(
        UserId::new(),
        email.to_lowercase(),
        "Platform Administrator",
        Role::SuperAdmin,
        Utc::now(),
    )?;
    state.users.create_user(&admin).await?;
    tracing::info!(email = %email, "Bootstrapped platform administrator");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
    }
}
