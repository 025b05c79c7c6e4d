use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::{PAGE_SIZE, PublicUser, page_offset};
use crate::error::{AppError, AppResult, is_foreign_key_violation};

/// Directed friend edge: the owner added the target. Reciprocity is not
/// enforced by the data model.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Friend {
    pub id: String,
    pub user_id: String,
    pub friend_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FriendRequest {
    pub friend_id: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct FoundUser {
    pub id: String,
    pub username: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl Friend {
    /// Idempotent: re-adding an existing friend is a silent success. A
    /// foreign-key violation means the target user does not exist.
    pub async fn add_for_user(pool: &PgPool, user_id: &str, friend_id: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO friends (id, user_id, friend_id) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, friend_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(friend_id)
        .execute(pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::NotFound("User not found")
            } else {
                AppError::from(e)
            }
        })?;

        Ok(())
    }

    /// Removes one direction of the edge only.
    pub async fn remove_for_user(pool: &PgPool, user_id: &str, friend_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM friends WHERE user_id = $1 AND friend_id = $2")
            .bind(user_id)
            .bind(friend_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Friends of a user, skipping accounts that never picked a username.
    pub async fn friends_of(pool: &PgPool, user_id: &str) -> AppResult<Vec<PublicUser>> {
        let friends = sqlx::query_as::<_, PublicUser>(
            "SELECT u.id, u.username, u.image
             FROM friends f
             JOIN users u ON u.id = f.friend_id
             WHERE f.user_id = $1 AND u.username IS NOT NULL",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(friends)
    }

    pub async fn find_users(pool: &PgPool, search: &str, page: i64) -> AppResult<Vec<FoundUser>> {
        let pattern = format!("%{}%", search);

        let users = sqlx::query_as::<_, FoundUser>(
            "SELECT id, username, image, description
             FROM users
             WHERE username ILIKE $1
             ORDER BY username ASC
             LIMIT $2 OFFSET $3",
        )
        .bind(pattern)
        .bind(PAGE_SIZE)
        .bind(page_offset(page))
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}
