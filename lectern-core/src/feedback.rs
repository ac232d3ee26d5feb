//! Event feedback and the rating rollup.

use crate::error::{DomainError, Result};
use crate::types::{EventId, FeedbackId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// One user's rating and review of one event. Unique per (event, user).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    /// Unique feedback identifier
    pub id: FeedbackId,
    /// Event being rated
    pub event_id: EventId,
    /// The rating user
    pub user_id: UserId,
    /// Rating between [`MIN_RATING`] and [`MAX_RATING`]
    pub rating: u8,
    /// Optional review text
    pub comment: Option<String>,
    /// When the feedback was created
    pub created_at: DateTime<Utc>,
    /// When the feedback was last modified
    pub updated_at: DateTime<Utc>,
}

impl Feedback {
    /// Creates a new feedback record.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] when the rating is out of range.
    pub fn new(
        id: FeedbackId,
        event_id: EventId,
        user_id: UserId,
        rating: u8,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        validate_rating(rating)?;
        Ok(Self {
            id,
            event_id,
            user_id,
            rating,
            comment,
            created_at: now,
            updated_at: now,
        })
    }

    /// Fail unless the principal may change or delete this record.
    ///
    /// The author owns edits; a platform administrator may moderate.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Ownership`] otherwise.
    pub fn authorize_mutate(&self, principal_id: UserId, is_super_admin: bool) -> Result<()> {
        if is_super_admin || self.user_id == principal_id {
            Ok(())
        } else {
            Err(DomainError::ownership(
                "You can only modify your own feedback",
            ))
        }
    }
}

/// Check a rating is within the accepted range.
///
/// # Errors
///
/// Returns [`DomainError::Validation`] when out of range.
pub fn validate_rating(rating: u8) -> Result<()> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(DomainError::validation("Rating must be between 1 and 5"))
    }
}

/// Recompute an event's rating rollup from the ratings that remain.
///
/// Returns `(average, count)`, the average rounded to one decimal and 0.0
/// when no ratings remain. Called by the store inside the same operation
/// that mutates a feedback record, so the rollup can never drift from the
/// records themselves.
#[must_use]
pub fn rating_rollup(ratings: &[u8]) -> (f64, u32) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let sum: u32 = ratings.iter().map(|&r| u32::from(r)).sum();
    let count = u32::try_from(ratings.len()).unwrap_or(u32::MAX);
    let mean = f64::from(sum) / f64::from(count);
    let rounded = (mean * 10.0).round() / 10.0;
    (rounded, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rollup_of_nothing_is_zero() {
        assert_eq!(rating_rollup(&[]), (0.0, 0));
    }

    #[test]
    fn rollup_rounds_to_one_decimal() {
        // (5 + 4 + 4) / 3 = 4.333... -> 4.3
        assert_eq!(rating_rollup(&[5, 4, 4]), (4.3, 3));
        // (5 + 4) / 2 = 4.5 stays exact
        assert_eq!(rating_rollup(&[5, 4]), (4.5, 2));
        // (2 + 3 + 3) / 3 = 2.666... -> 2.7
        assert_eq!(rating_rollup(&[2, 3, 3]), (2.7, 3));
    }

    #[test]
    fn ratings_outside_range_rejected() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
    }

    #[test]
    fn author_and_super_admin_may_mutate() {
        let author = UserId::new();
        let fb = Feedback::new(
            FeedbackId::new(),
            EventId::new(),
            author,
            4,
            None,
            Utc::now(),
        )
        .expect("valid feedback");

        assert!(fb.authorize_mutate(author, false).is_ok());
        assert!(fb.authorize_mutate(UserId::new(), true).is_ok());
        assert!(fb.authorize_mutate(UserId::new(), false).is_err());
    }

    proptest! {
        #[test]
        fn rollup_is_a_one_decimal_mean(ratings in proptest::collection::vec(1u8..=5, 0..64)) {
            let (avg, count) = rating_rollup(&ratings);
            prop_assert_eq!(count as usize, ratings.len());
            // One decimal: scaling by 10 yields an integer (within float noise).
            let scaled = avg * 10.0;
            prop_assert!((scaled - scaled.round()).abs() < 1e-9);
            if ratings.is_empty() {
                prop_assert_eq!(avg, 0.0);
            } else {
                let sum: u32 = ratings.iter().map(|&r| u32::from(r)).sum();
                let exact = f64::from(sum) / ratings.len() as f64;
                prop_assert!((avg - exact).abs() <= 0.05 + 1e-9);
                prop_assert!((1.0..=5.0).contains(&avg));
            }
        }
    }
}
