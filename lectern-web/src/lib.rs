//! HTTP API for the Lectern event platform.
//!
//! The web layer is a thin imperative shell over `lectern-core` and
//! `lectern-store`: handlers parse the request, resolve the principal
//! explicitly through an extractor, call one store operation, and project
//! the result to JSON. All list endpoints accept `page`/`limit` and answer
//! with `{ items, totalPages, currentPage, total }`; mutations answer with
//! `{ message, <entity> }` and failures with `{ message }` plus a 4xx/5xx
//! status.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mailer;
pub mod router;
pub mod state;
pub mod tokens;

pub use config::Config;
pub use error::AppError;
pub use router::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
