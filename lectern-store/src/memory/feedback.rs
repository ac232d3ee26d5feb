//! In-memory feedback store.

use super::{paginate, MemoryStore, State};
use crate::traits::{FeedbackStats, FeedbackStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lectern_core::feedback::{rating_rollup, validate_rating};
use lectern_core::{DomainError, EventId, Feedback, FeedbackId, Page, Paginated, Result, UserId};

fn ratings_for(state: &State, event_id: EventId) -> Vec<u8> {
    state
        .feedback
        .values()
        .filter(|f| f.event_id == event_id)
        .map(|f| f.rating)
        .collect()
}

fn refresh_rollup(state: &mut State, event_id: EventId, now: DateTime<Utc>) {
    let (average, total) = rating_rollup(&ratings_for(state, event_id));
    if let Some(event) = state.events.get_mut(&event_id) {
        event.average_rating = average;
        event.total_ratings = total;
        event.updated_at = now;
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn submit_feedback(
        &self,
        id: FeedbackId,
        event_id: EventId,
        user: UserId,
        rating: u8,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Feedback> {
        let mut state = self.write();
        if !state.events.contains_key(&event_id) {
            return Err(DomainError::not_found("Event"));
        }
        if state
            .feedback
            .values()
            .any(|f| f.event_id == event_id && f.user_id == user)
        {
            return Err(DomainError::conflict("You have already reviewed this event"));
        }
        let feedback = Feedback::new(id, event_id, user, rating, comment, now)?;
        state.feedback.insert(id, feedback.clone());
        refresh_rollup(&mut state, event_id, now);
        Ok(feedback)
    }

    async fn feedback(&self, id: FeedbackId) -> Result<Feedback> {
        self.read()
            .feedback
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Feedback"))
    }

    async fn update_feedback(
        &self,
        id: FeedbackId,
        principal: UserId,
        is_super_admin: bool,
        rating: Option<u8>,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Feedback> {
        let mut state = self.write();
        let mut feedback = state
            .feedback
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Feedback"))?;
        feedback.authorize_mutate(principal, is_super_admin)?;
        if let Some(rating) = rating {
            validate_rating(rating)?;
            feedback.rating = rating;
        }
        if let Some(comment) = comment {
            feedback.comment = Some(comment);
        }
        feedback.updated_at = now;
        let event_id = feedback.event_id;
        state.feedback.insert(id, feedback.clone());
        refresh_rollup(&mut state, event_id, now);
        Ok(feedback)
    }

    async fn delete_feedback(
        &self,
        id: FeedbackId,
        principal: UserId,
        is_super_admin: bool,
    ) -> Result<()> {
        let mut state = self.write();
        let feedback = state
            .feedback
            .get(&id)
            .ok_or(DomainError::not_found("Feedback"))?;
        feedback.authorize_mutate(principal, is_super_admin)?;
        let event_id = feedback.event_id;
        state.feedback.remove(&id);
        refresh_rollup(&mut state, event_id, Utc::now());
        Ok(())
    }

    async fn list_for_event(&self, event_id: EventId, page: Page) -> Result<Paginated<Feedback>> {
        let state = self.read();
        if !state.events.contains_key(&event_id) {
            return Err(DomainError::not_found("Event"));
        }
        let mut feedback: Vec<Feedback> = state
            .feedback
            .values()
            .filter(|f| f.event_id == event_id)
            .cloned()
            .collect();
        feedback.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.id.to_string().cmp(&b.id.to_string()))
        });
        Ok(paginate(&feedback, page))
    }

    async fn list_for_user(&self, user: UserId, page: Page) -> Result<Paginated<Feedback>> {
        let state = self.read();
        let mut feedback: Vec<Feedback> = state
            .feedback
            .values()
            .filter(|f| f.user_id == user)
            .cloned()
            .collect();
        feedback.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(a.id.to_string().cmp(&b.id.to_string()))
        });
        Ok(paginate(&feedback, page))
    }

    async fn stats_for_event(&self, event_id: EventId) -> Result<FeedbackStats> {
        let state = self.read();
        if !state.events.contains_key(&event_id) {
            return Err(DomainError::not_found("Event"));
        }
        let ratings = ratings_for(&state, event_id);
        let (average_rating, total_ratings) = rating_rollup(&ratings);
        let mut distribution = [0u32; 5];
        for rating in ratings {
            distribution[usize::from(rating) - 1] += 1;
        }
        Ok(FeedbackStats {
            average_rating,
            total_ratings,
            distribution,
        })
    }
}
