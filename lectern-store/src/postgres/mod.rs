//! PostgreSQL store.
//!
//! `sqlx` with the runtime query API, so the workspace builds without a
//! live database. Workflow transitions that span several rows run inside
//! one transaction with `SELECT ... FOR UPDATE` on the parent row:
//! concurrent reviewers serialize on the row lock, so a request cannot be
//! double-reviewed and a speaker ceiling cannot be overrun.

mod events;
mod feedback;
mod reports;
mod requests;
mod schools;
mod sessions;
mod users;

use lectern_core::{DomainError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// PostgreSQL implementation of every store trait.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database.
    ///
    /// # Errors
    ///
    /// Returns `Unexpected` when the pool cannot be established.
    pub async fn connect(url: &str, max_connections: u32, connect_timeout: u64) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout))
            .connect(url)
            .await
            .map_err(|e| DomainError::unexpected(format!("Failed to connect to database: {e}")))?;
        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns `Unexpected` when a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::unexpected(format!("Migration failed: {e}")))?;
        tracing::debug!("Database migrations applied");
        Ok(())
    }

    pub(crate) const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a storage failure to the domain taxonomy.
pub(crate) fn db_err(e: sqlx::Error) -> DomainError {
    DomainError::unexpected(format!("Database error: {e}"))
}

/// Map a unique violation to `Conflict` with the given message; everything
/// else stays `Unexpected`. This is the constraint backstop behind the
/// pre-checks, surfaced as the same conflict the pre-check produces.
pub(crate) fn unique_conflict(e: sqlx::Error, message: &str) -> DomainError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return DomainError::conflict(message);
        }
    }
    db_err(e)
}

/// Convert a database integer to the domain's unsigned counts.
pub(crate) fn as_u32(value: i32, field: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| DomainError::unexpected(format!("Invalid {field} value in database: {value}")))
}

/// Convert a domain count for storage.
pub(crate) fn as_i32(value: u32, field: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| DomainError::unexpected(format!("{field} value too large to store: {value}")))
}
