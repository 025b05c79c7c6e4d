use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct List {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub game: String,
    pub army: String,
    pub points: i32,
    pub actual_points: i32,
    pub image: Option<String>,
    pub description: Option<String>,
    pub is_deleted: bool,
    pub groups: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub name: String,
    pub game: String,
    pub army: String,
    pub points: i32,
    pub actual_points: i32,
    pub image: Option<String>,
    pub description: Option<String>,
    pub groups: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct UpdateListRequest {
    pub list_id: String,
    pub name: Option<String>,
    pub army: Option<String>,
    pub points: Option<i32>,
    pub actual_points: Option<i32>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub groups: Option<serde_json::Value>,
}

const LIST_COLUMNS: &str = "id, user_id, name, game, army, points, actual_points, \
                            image, description, is_deleted, groups, created_at, updated_at";

impl List {
    pub async fn for_user(pool: &PgPool, user_id: &str) -> AppResult<Vec<Self>> {
        let lists = sqlx::query_as::<_, List>(&format!(
            "SELECT {LIST_COLUMNS} FROM lists WHERE user_id = $1 AND is_deleted = FALSE
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(lists)
    }

    pub async fn get_for_user(pool: &PgPool, user_id: &str, list_id: &str) -> AppResult<Self> {
        let list = sqlx::query_as::<_, List>(&format!(
            "SELECT {LIST_COLUMNS} FROM lists WHERE user_id = $1 AND id = $2"
        ))
        .bind(user_id)
        .bind(list_id)
        .fetch_optional(pool)
        .await?;

        list.ok_or(AppError::NotFound("List not found"))
    }

    pub async fn create_for_user(
        pool: &PgPool,
        user_id: &str,
        req: &CreateListRequest,
    ) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO lists (id, user_id, name, game, army, points, actual_points,
                                image, description, groups)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(&req.name)
        .bind(&req.game)
        .bind(&req.army)
        .bind(req.points)
        .bind(req.actual_points)
        .bind(&req.image)
        .bind(&req.description)
        .bind(&req.groups)
        .execute(pool)
        .await?;

        Ok(id)
    }

    pub async fn update_for_user(
        pool: &PgPool,
        user_id: &str,
        req: &UpdateListRequest,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE lists SET
                 name = COALESCE($3, name),
                 army = COALESCE($4, army),
                 points = COALESCE($5, points),
                 actual_points = COALESCE($6, actual_points),
                 image = COALESCE($7, image),
                 description = COALESCE($8, description),
                 groups = COALESCE($9, groups),
                 updated_at = NOW()
             WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(&req.list_id)
        .bind(&req.name)
        .bind(&req.army)
        .bind(req.points)
        .bind(req.actual_points)
        .bind(&req.image)
        .bind(&req.description)
        .bind(&req.groups)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("List not found"));
        }

        Ok(())
    }

    /// Soft delete: the row stays and every read filters it out.
    pub async fn delete_for_user(pool: &PgPool, user_id: &str, list_id: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE lists SET is_deleted = TRUE, updated_at = NOW()
             WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(list_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("List not found"));
        }

        Ok(())
    }
}
