use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult, is_unique_violation};
use crate::utils::generate_login_code;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

const USER_COLUMNS: &str =
    "id, email, username, image, description, last_login, created_at, updated_at";

impl User {
    pub async fn find_by_id(pool: &PgPool, id: &str) -> AppResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> AppResult<Option<Self>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn create(pool: &PgPool, email: &str) -> AppResult<Self> {
        let id = Uuid::new_v4().to_string();

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, last_login) VALUES ($1, $2, NOW())
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&id)
        .bind(email)
        .fetch_one(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User already exists")
            } else {
                e.into()
            }
        })?;

        Ok(user)
    }

    pub async fn update(pool: &PgPool, id: &str, req: &UpdateUserRequest) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET
                 username = COALESCE($2, username),
                 image = COALESCE($3, image),
                 description = COALESCE($4, description),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&req.username)
        .bind(&req.image)
        .bind(&req.description)
        .execute(pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Username already taken")
            } else {
                AppError::from(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found"));
        }

        Ok(())
    }

    /// Stores a fresh six digit login code for the address and returns it.
    /// The delivery channel lives outside this service.
    pub async fn create_login_code(pool: &PgPool, email: &str) -> AppResult<String> {
        let code = generate_login_code();

        sqlx::query("INSERT INTO user_logins (id, email, code) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4().to_string())
            .bind(email)
            .bind(&code)
            .execute(pool)
            .await?;

        Ok(code)
    }

    /// Consumes a pending login code. The newest code for the address wins;
    /// codes older than the configured TTL are rejected and cleaned up lazily.
    pub async fn use_login_code(
        pool: &PgPool,
        email: &str,
        code: &str,
        ttl: chrono::Duration,
    ) -> AppResult<()> {
        #[derive(sqlx::FromRow)]
        struct LoginRow {
            id: String,
            created_at: DateTime<Utc>,
        }

        let record = sqlx::query_as::<_, LoginRow>(
            "SELECT id, created_at FROM user_logins
             WHERE email = $1 AND code = $2
             ORDER BY created_at DESC",
        )
        .bind(email)
        .bind(code)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::Client("Invalid code"))?;

        if Utc::now() > record.created_at + ttl {
            return Err(AppError::Client("Code expired"));
        }

        sqlx::query("DELETE FROM user_logins WHERE id = $1")
            .bind(&record.id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// First login creates the account; later logins stamp `last_login`.
    pub async fn login_with_email(pool: &PgPool, email: &str) -> AppResult<Self> {
        if let Some(user) = Self::find_by_email(pool, email).await? {
            sqlx::query("UPDATE users SET last_login = NOW(), updated_at = NOW() WHERE id = $1")
                .bind(&user.id)
                .execute(pool)
                .await?;
            return Ok(user);
        }

        Self::create(pool, email).await
    }

    pub async fn clear_stale_login_codes(pool: &PgPool, ttl: chrono::Duration) -> AppResult<u64> {
        let cutoff = Utc::now() - ttl;
        let result = sqlx::query("DELETE FROM user_logins WHERE created_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
