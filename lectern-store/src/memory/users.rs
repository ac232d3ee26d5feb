//! In-memory user store.

use super::{paginate, MemoryStore};
use crate::traits::{UserFilter, UserStore};
use async_trait::async_trait;
use lectern_core::{DomainError, Page, Paginated, Result, User, UserId};

fn email_taken<'a>(mut users: impl Iterator<Item = &'a User>, email: &str, except: UserId) -> bool {
    users.any(|u| u.id != except && u.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<()> {
        let mut state = self.write();
        if email_taken(state.users.values(), &user.email, user.id) {
            return Err(DomainError::conflict("Email already registered"));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user(&self, id: UserId) -> Result<User> {
        self.read()
            .users
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("User"))
    }

    async fn user_by_email(&self, email: &str) -> Result<User> {
        self.read()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or(DomainError::not_found("User"))
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut state = self.write();
        if !state.users.contains_key(&user.id) {
            return Err(DomainError::not_found("User"));
        }
        if email_taken(state.users.values(), &user.email, user.id) {
            return Err(DomainError::conflict("Email already registered"));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn list_users(&self, filter: UserFilter, page: Page) -> Result<Paginated<User>> {
        let state = self.read();
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| filter.role.is_none_or(|role| u.role == role))
            .filter(|u| filter.school.is_none_or(|school| u.school_id == Some(school)))
            .filter(|u| !filter.active_only || u.active)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.to_string().cmp(&b.id.to_string())));
        Ok(paginate(&users, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lectern_core::Role;

    fn student(email: &str) -> User {
        User::new(UserId::new(), email, "Student", Role::Student, Utc::now()).expect("valid user")
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store
            .create_user(&student("ada@school.edu"))
            .await
            .expect("first insert");
        let err = store
            .create_user(&student("ADA@school.edu"))
            .await
            .expect_err("second insert must fail");
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn lookup_by_email_is_case_insensitive() {
        let store = MemoryStore::new();
        let user = student("ada@school.edu");
        store.create_user(&user).await.expect("insert");
        let found = store.user_by_email("Ada@School.edu").await.expect("found");
        assert_eq!(found.id, user.id);
    }
}
