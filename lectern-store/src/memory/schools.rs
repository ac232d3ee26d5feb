//! In-memory school store.

use super::{paginate, MemoryStore};
use crate::traits::SchoolStore;
use async_trait::async_trait;
use lectern_core::{DomainError, Page, Paginated, Result, Role, School, SchoolId, User, UserId};

fn name_taken<'a>(mut schools: impl Iterator<Item = &'a School>, name: &str, except: SchoolId) -> bool {
    schools.any(|s| s.id != except && s.name.eq_ignore_ascii_case(name))
}

#[async_trait]
impl SchoolStore for MemoryStore {
    async fn create_school(&self, school: &School) -> Result<()> {
        let mut state = self.write();
        if name_taken(state.schools.values(), &school.name, school.id) {
            return Err(DomainError::conflict("A school with this name already exists"));
        }
        state.schools.insert(school.id, school.clone());
        Ok(())
    }

    async fn school(&self, id: SchoolId) -> Result<School> {
        self.read()
            .schools
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("School"))
    }

    async fn update_school(&self, school: &School) -> Result<()> {
        let mut state = self.write();
        if !state.schools.contains_key(&school.id) {
            return Err(DomainError::not_found("School"));
        }
        if name_taken(state.schools.values(), &school.name, school.id) {
            return Err(DomainError::conflict("A school with this name already exists"));
        }
        state.schools.insert(school.id, school.clone());
        Ok(())
    }

    async fn delete_school(&self, id: SchoolId) -> Result<()> {
        let mut state = self.write();
        if !state.schools.contains_key(&id) {
            return Err(DomainError::not_found("School"));
        }
        if state.events.values().any(|e| e.host_school == id) {
            return Err(DomainError::invalid_state(
                "Schools hosting events cannot be deleted",
            ));
        }
        state.schools.remove(&id);
        Ok(())
    }

    async fn list_schools(&self, page: Page) -> Result<Paginated<School>> {
        let state = self.read();
        let mut schools: Vec<School> = state.schools.values().cloned().collect();
        schools.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.id.to_string().cmp(&b.id.to_string()))
        });
        Ok(paginate(&schools, page))
    }

    async fn school_for_admin(&self, user: UserId) -> Result<Option<School>> {
        Ok(self
            .read()
            .schools
            .values()
            .find(|s| s.is_administered_by(user))
            .cloned())
    }

    async fn school_students(&self, id: SchoolId, page: Page) -> Result<Paginated<User>> {
        let state = self.read();
        if !state.schools.contains_key(&id) {
            return Err(DomainError::not_found("School"));
        }
        let mut students: Vec<User> = state
            .users
            .values()
            .filter(|u| u.role == Role::Student && u.school_id == Some(id))
            .cloned()
            .collect();
        students.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.id.to_string().cmp(&b.id.to_string()))
        });
        Ok(paginate(&students, page))
    }
}
