/// Task reviews
///
/// A task has at most one review, enforced by `reviews_task_id_key`. Review
/// images are stored as [`Image`](super::image::Image)s owned by
/// `ImageOwner::Review`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Lowest accepted rating
pub const MIN_RATING: i16 = 1;

/// Highest accepted rating
pub const MAX_RATING: i16 = 5;

/// Review row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub task_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for reviewing a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReview {
    pub task_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
}

impl CreateReview {
    pub fn rating_in_range(&self) -> bool {
        (MIN_RATING..=MAX_RATING).contains(&self.rating)
    }
}

impl Review {
    /// Creates the review for a task
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `reviews_task_id_key` if the task
    /// already has a review.
    pub async fn create<'e, E>(executor: E, data: CreateReview) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (task_id, rating, comment)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, rating, comment, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.rating)
        .bind(data.comment)
        .fetch_one(executor)
        .await?;

        Ok(review)
    }

    pub async fn find_by_task<'e, E>(executor: E, task_id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let review = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, task_id, rating, comment, created_at
            FROM reviews
            WHERE task_id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(executor)
        .await?;

        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_range() {
        let review = |rating| CreateReview {
            task_id: Uuid::new_v4(),
            rating,
            comment: None,
        };

        assert!(review(1).rating_in_range());
        assert!(review(5).rating_in_range());
        assert!(!review(0).rating_in_range());
        assert!(!review(6).rating_in_range());
    }
}
