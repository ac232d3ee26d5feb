//! In-memory session store.

use super::MemoryStore;
use crate::traits::{LoginCode, Session, SessionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::Result;

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_login_code(&self, code: &LoginCode) -> Result<()> {
        self.write()
            .login_codes
            .insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn consume_login_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let mut state = self.write();
        match state.login_codes.remove(code) {
            Some(entry) if now < entry.expires_at => Ok(Some(entry.email)),
            _ => Ok(None),
        }
    }

    async fn create_session(&self, session: &Session) -> Result<()> {
        self.write()
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn session(&self, token: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        Ok(self
            .read()
            .sessions
            .get(token)
            .filter(|s| s.is_valid(now))
            .cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        self.write().sessions.remove(token);
        Ok(())
    }
}
