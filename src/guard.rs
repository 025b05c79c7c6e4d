//! Membership guard shared by the game and group engines.
//!
//! A missing membership row is reported as "not found" rather than as a
//! permissions error, so non-members cannot tell a hidden entity from a
//! nonexistent one. Admin checks only run once membership is established,
//! which makes the forbidden message safe to return.

use sqlx::PgPool;

use crate::error::{AppError, AppResult};

pub async fn ensure_game_member(pool: &PgPool, user_id: &str, game_id: &str) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM game_members WHERE game_id = $1 AND user_id = $2)",
    )
    .bind(game_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    if !exists {
        return Err(AppError::NotFound("Game not found"));
    }

    Ok(())
}

/// Membership row for a group, if any: `Some(is_admin)` or `None`.
pub async fn group_member_role(
    pool: &PgPool,
    user_id: &str,
    group_id: &str,
) -> AppResult<Option<bool>> {
    let role: Option<bool> = sqlx::query_scalar(
        "SELECT is_admin FROM group_members WHERE group_id = $1 AND user_id = $2",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(role)
}

pub async fn ensure_group_admin(pool: &PgPool, user_id: &str, group_id: &str) -> AppResult<()> {
    match group_member_role(pool, user_id, group_id).await? {
        None => Err(AppError::NotFound("Group not found")),
        Some(false) => Err(AppError::Forbidden("Only admins can update a group")),
        Some(true) => Ok(()),
    }
}
