//! HTTP handlers, one module per resource.

pub mod admin;
pub mod auth;
pub mod event_requests;
pub mod events;
pub mod feedback;
pub mod health;
pub mod schools;
pub mod speaker_requests;

use lectern_core::Page;
use serde::{Deserialize, Serialize};

/// Query parameters accepted by every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// 1-indexed page number
    pub page: Option<u32>,
    /// Page size
    pub limit: Option<u32>,
}

impl PageQuery {
    /// Normalize into pagination parameters.
    #[must_use]
    pub fn to_page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

/// A bare `{ message }` response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,
}

impl MessageResponse {
    /// Wrap a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
