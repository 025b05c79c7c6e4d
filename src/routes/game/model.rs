use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::{ListBody, PublicUser};
use crate::error::{AppError, AppResult};
use crate::guard::ensure_game_member;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Game {
    pub id: String,
    pub created_by_user_id: String,
    pub game: String,
    pub points: i32,
    pub invite_code: String,
    pub is_started: bool,
    pub is_complete: bool,
    pub description: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub game: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub points: i32,
    pub invite_code: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGameRequest {
    pub game_id: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub points: Option<i32>,
    pub is_started: Option<bool>,
    pub is_complete: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct GameInviteRequest {
    pub game_id: String,
    pub friend_id: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinGameRequest {
    pub game_id: String,
    pub invite_code: String,
}

#[derive(Debug, Deserialize)]
pub struct SetGameListRequest {
    pub game_id: String,
    pub list: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGameMemberRequest {
    pub game_id: String,
    pub member_id: String,
    pub points: Option<i32>,
    pub model_count: Option<i32>,
    pub model_count_remaining: Option<i32>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStateFilter {
    Active,
    Complete,
}

#[derive(Debug, Serialize)]
pub struct GameMemberResponse {
    pub user: PublicUser,
    pub list: Option<serde_json::Value>,
    pub points: Option<i32>,
    pub is_winner: bool,
    pub model_count: Option<i32>,
    pub model_count_remaining: Option<i32>,
}

/// Full game projection. `invite_code` is nulled out for non-members before
/// this leaves the engine.
#[derive(Debug, Serialize)]
pub struct GameResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub game: String,
    pub points: i32,
    pub image: Option<String>,
    pub description: Option<String>,
    pub is_started: bool,
    pub is_complete: bool,
    pub invite_code: Option<String>,
    pub created_by: PublicUser,
    pub members: Vec<GameMemberResponse>,
    pub invites: Vec<PublicUser>,
}

impl GameResponse {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user.id == user_id)
    }

    /// Non-members may see the game but never its invite code.
    pub fn redact_for(&mut self, user_id: &str) {
        if !self.is_member(user_id) {
            self.invite_code = None;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GameListMember {
    pub id: String,
    pub username: Option<String>,
    pub image: Option<String>,
    pub army: Option<String>,
    pub is_winner: bool,
}

/// Reduced listing used on the games overview: no list payloads, no scores.
#[derive(Debug, Serialize)]
pub struct GameListResponse {
    pub id: String,
    pub game: String,
    pub created_at: DateTime<Utc>,
    pub points: i32,
    pub members: Vec<GameListMember>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct GameInviteResponse {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub game: String,
    pub points: i32,
    #[sqlx(flatten)]
    pub invited_by: InvitedBy,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InvitedBy {
    #[sqlx(rename = "invited_by_id")]
    pub id: String,
    #[sqlx(rename = "invited_by_username")]
    pub username: Option<String>,
    #[sqlx(rename = "invited_by_image")]
    pub image: Option<String>,
}

/// User ids holding the maximum score; missing scores count as zero, ties
/// all win.
pub fn winning_user_ids(members: &[(String, Option<i32>)]) -> Vec<String> {
    let max_points = members
        .iter()
        .map(|(_, p)| p.unwrap_or(0))
        .max()
        .unwrap_or(0);

    members
        .iter()
        .filter(|(_, p)| p.unwrap_or(0) == max_points)
        .map(|(id, _)| id.clone())
        .collect()
}

#[derive(sqlx::FromRow)]
struct GameDetailRow {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    game: String,
    points: i32,
    image: Option<String>,
    description: Option<String>,
    is_started: bool,
    is_complete: bool,
    invite_code: String,
    created_by_id: String,
    created_by_username: Option<String>,
    created_by_image: Option<String>,
}

#[derive(sqlx::FromRow)]
struct MemberDetailRow {
    user_id: String,
    username: Option<String>,
    image: Option<String>,
    list: Option<serde_json::Value>,
    points: Option<i32>,
    is_winner: bool,
    model_count: Option<i32>,
    model_count_remaining: Option<i32>,
}

#[derive(sqlx::FromRow)]
struct MemberListRow {
    member_id: String,
    list: Option<serde_json::Value>,
}

#[derive(sqlx::FromRow)]
struct GameSummaryRow {
    id: String,
    game: String,
    points: i32,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct GameListMemberRow {
    game_id: String,
    user_id: String,
    username: Option<String>,
    image: Option<String>,
    list: Option<serde_json::Value>,
    is_winner: bool,
}

impl Game {
    /// Creates the game and the creator's membership row in one transaction:
    /// a game without members must never exist.
    pub async fn create_for_user(
        pool: &PgPool,
        user_id: &str,
        req: &CreateGameRequest,
    ) -> AppResult<String> {
        let game_id = Uuid::new_v4().to_string();

        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO games (id, created_by_user_id, game, points, invite_code,
                                description, image)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&game_id)
        .bind(user_id)
        .bind(&req.game)
        .bind(req.points)
        .bind(&req.invite_code)
        .bind(&req.description)
        .bind(&req.image)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO game_members (id, game_id, user_id) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4().to_string())
            .bind(&game_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(game_id)
    }

    pub async fn get_for_user(
        pool: &PgPool,
        user_id: &str,
        game_id: &str,
    ) -> AppResult<GameResponse> {
        let game = sqlx::query_as::<_, GameDetailRow>(
            "SELECT g.id, g.created_at, g.updated_at, g.game, g.points, g.image,
                    g.description, g.is_started, g.is_complete, g.invite_code,
                    u.id AS created_by_id, u.username AS created_by_username,
                    u.image AS created_by_image
             FROM games g
             JOIN users u ON u.id = g.created_by_user_id
             WHERE g.id = $1",
        )
        .bind(game_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Game not found"))?;

        let members = sqlx::query_as::<_, MemberDetailRow>(
            "SELECT u.id AS user_id, u.username, u.image, gm.list, gm.points,
                    gm.is_winner, gm.model_count, gm.model_count_remaining
             FROM game_members gm
             JOIN users u ON u.id = gm.user_id
             WHERE gm.game_id = $1
             ORDER BY gm.created_at ASC",
        )
        .bind(game_id)
        .fetch_all(pool)
        .await?;

        let invites = sqlx::query_as::<_, PublicUser>(
            "SELECT u.id, u.username, u.image
             FROM game_invites gi
             JOIN users u ON u.id = gi.user_id
             WHERE gi.game_id = $1
             ORDER BY gi.created_at ASC",
        )
        .bind(game_id)
        .fetch_all(pool)
        .await?;

        let mut response = GameResponse {
            id: game.id,
            created_at: game.created_at,
            updated_at: game.updated_at,
            game: game.game,
            points: game.points,
            image: game.image,
            description: game.description,
            is_started: game.is_started,
            is_complete: game.is_complete,
            invite_code: Some(game.invite_code),
            created_by: PublicUser {
                id: game.created_by_id,
                username: game.created_by_username,
                image: game.created_by_image,
            },
            members: members
                .into_iter()
                .map(|m| GameMemberResponse {
                    user: PublicUser {
                        id: m.user_id,
                        username: m.username,
                        image: m.image,
                    },
                    list: m.list,
                    points: m.points,
                    is_winner: m.is_winner,
                    model_count: m.model_count,
                    model_count_remaining: m.model_count_remaining,
                })
                .collect(),
            invites,
        };

        response.redact_for(user_id);

        Ok(response)
    }

    pub async fn update_for_user(
        pool: &PgPool,
        user_id: &str,
        req: &UpdateGameRequest,
    ) -> AppResult<()> {
        ensure_game_member(pool, user_id, &req.game_id).await?;

        sqlx::query(
            "UPDATE games SET
                 description = COALESCE($2, description),
                 image = COALESCE($3, image),
                 points = COALESCE($4, points),
                 is_started = COALESCE($5, is_started),
                 is_complete = COALESCE($6, is_complete),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(&req.game_id)
        .bind(&req.description)
        .bind(&req.image)
        .bind(req.points)
        .bind(req.is_started)
        .bind(req.is_complete)
        .execute(pool)
        .await?;

        if req.is_started == Some(true) {
            Self::on_game_start(pool, &req.game_id).await?;
        }

        if req.is_complete == Some(true) {
            Self::on_game_complete(pool, &req.game_id).await?;
        }

        Ok(())
    }

    /// Starting a game locks in every member's list: the unit composition is
    /// counted and stored as the pool of models that can later be marked
    /// destroyed. Fails if any member has not submitted a list.
    async fn on_game_start(pool: &PgPool, game_id: &str) -> AppResult<()> {
        let members = sqlx::query_as::<_, MemberListRow>(
            "SELECT id AS member_id, list FROM game_members WHERE game_id = $1",
        )
        .bind(game_id)
        .fetch_all(pool)
        .await?;

        for member in &members {
            let list = member
                .list
                .as_ref()
                .and_then(ListBody::parse)
                .ok_or(AppError::Client(
                    "All members must have a list to start a game",
                ))?;

            let count = list.count_models();

            sqlx::query(
                "UPDATE game_members
                 SET model_count = $2, model_count_remaining = $2, updated_at = NOW()
                 WHERE id = $1",
            )
            .bind(&member.member_id)
            .bind(count)
            .execute(pool)
            .await?;
        }

        Ok(())
    }

    /// Re-derives winners from current member scores. Not a one-time
    /// snapshot: toggling completion again recomputes from scratch.
    async fn on_game_complete(pool: &PgPool, game_id: &str) -> AppResult<()> {
        let members: Vec<(String, Option<i32>)> =
            sqlx::query_as("SELECT user_id, points FROM game_members WHERE game_id = $1")
                .bind(game_id)
                .fetch_all(pool)
                .await?;

        let winners = winning_user_ids(&members);

        sqlx::query(
            "UPDATE game_members SET is_winner = TRUE, updated_at = NOW()
             WHERE game_id = $1 AND user_id = ANY($2)",
        )
        .bind(game_id)
        .bind(&winners)
        .execute(pool)
        .await?;

        sqlx::query(
            "UPDATE game_members SET is_winner = FALSE, updated_at = NOW()
             WHERE game_id = $1 AND NOT (user_id = ANY($2))",
        )
        .bind(game_id)
        .bind(&winners)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Deleting an already-gone game is a success, unlike the strict
    /// not-found behaviour elsewhere.
    pub async fn delete_for_user(pool: &PgPool, user_id: &str, game_id: &str) -> AppResult<()> {
        match ensure_game_member(pool, user_id, game_id).await {
            Err(AppError::NotFound(_)) => return Ok(()),
            other => other?,
        }

        sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(game_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Idempotent: inviting an existing member or re-inviting is a no-op.
    pub async fn invite(
        pool: &PgPool,
        user_id: &str,
        game_id: &str,
        friend_id: &str,
    ) -> AppResult<()> {
        ensure_game_member(pool, user_id, game_id).await?;

        let already_member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM game_members WHERE game_id = $1 AND user_id = $2)",
        )
        .bind(game_id)
        .bind(friend_id)
        .fetch_one(pool)
        .await?;

        if already_member {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO game_invites (id, game_id, user_id, created_by_user_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (game_id, user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(game_id)
        .bind(friend_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn cancel_invite(
        pool: &PgPool,
        user_id: &str,
        game_id: &str,
        friend_id: &str,
    ) -> AppResult<()> {
        ensure_game_member(pool, user_id, game_id).await?;

        sqlx::query("DELETE FROM game_invites WHERE game_id = $1 AND user_id = $2")
            .bind(game_id)
            .bind(friend_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Accepting claims a specific pending offer, so a missing invite is an
    /// error here. The invite is consumed and the membership created in one
    /// transaction.
    pub async fn accept_invite_for_user(
        pool: &PgPool,
        user_id: &str,
        game_id: &str,
    ) -> AppResult<()> {
        let invite_id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM game_invites WHERE game_id = $1 AND user_id = $2",
        )
        .bind(game_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        let invite_id = invite_id.ok_or(AppError::NotFound("Invite not found"))?;

        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM game_invites WHERE id = $1")
            .bind(&invite_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO game_members (id, game_id, user_id) VALUES ($1, $2, $3)
             ON CONFLICT (game_id, user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(game_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn decline_invite_for_user(
        pool: &PgPool,
        user_id: &str,
        game_id: &str,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM game_invites WHERE game_id = $1 AND user_id = $2")
            .bind(game_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Joining matches the (id, invite_code) pair. A wrong code looks exactly
    /// like a missing game so codes cannot be probed.
    pub async fn join_by_code_for_user(
        pool: &PgPool,
        user_id: &str,
        req: &JoinGameRequest,
    ) -> AppResult<()> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM games WHERE id = $1 AND invite_code = $2)",
        )
        .bind(&req.game_id)
        .bind(&req.invite_code)
        .fetch_one(pool)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Game not found"));
        }

        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM game_invites WHERE game_id = $1 AND user_id = $2")
            .bind(&req.game_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO game_members (id, game_id, user_id) VALUES ($1, $2, $3)
             ON CONFLICT (game_id, user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&req.game_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Removes the membership; the last member out deletes the game itself.
    pub async fn leave_for_user(pool: &PgPool, user_id: &str, game_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM game_members WHERE game_id = $1 AND user_id = $2")
            .bind(game_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM game_members WHERE game_id = $1")
                .bind(game_id)
                .fetch_one(pool)
                .await?;

        if remaining == 0 {
            sqlx::query("DELETE FROM games WHERE id = $1")
                .bind(game_id)
                .execute(pool)
                .await?;
        }

        Ok(())
    }

    pub async fn set_list_for_user(
        pool: &PgPool,
        user_id: &str,
        req: &SetGameListRequest,
    ) -> AppResult<()> {
        ensure_game_member(pool, user_id, &req.game_id).await?;

        sqlx::query(
            "UPDATE game_members SET list = $3, updated_at = NOW()
             WHERE game_id = $1 AND user_id = $2",
        )
        .bind(&req.game_id)
        .bind(user_id)
        .bind(&req.list)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Any member may record another member's score or remaining models,
    /// e.g. keeping track for an opponent without the app.
    pub async fn update_member(
        pool: &PgPool,
        user_id: &str,
        req: &UpdateGameMemberRequest,
    ) -> AppResult<()> {
        ensure_game_member(pool, user_id, &req.game_id).await?;

        sqlx::query(
            "UPDATE game_members SET
                 points = COALESCE($3, points),
                 model_count = COALESCE($4, model_count),
                 model_count_remaining = COALESCE($5, model_count_remaining),
                 updated_at = NOW()
             WHERE game_id = $1 AND user_id = $2",
        )
        .bind(&req.game_id)
        .bind(&req.member_id)
        .bind(req.points)
        .bind(req.model_count)
        .bind(req.model_count_remaining)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn user_games(
        pool: &PgPool,
        user_id: &str,
        state: Option<GameStateFilter>,
    ) -> AppResult<Vec<GameListResponse>> {
        let complete_filter = state.map(|s| s == GameStateFilter::Complete);

        let games = sqlx::query_as::<_, GameSummaryRow>(
            "SELECT g.id, g.game, g.points, g.created_at
             FROM game_members gm
             JOIN games g ON g.id = gm.game_id
             WHERE gm.user_id = $1
               AND ($2::BOOLEAN IS NULL OR g.is_complete = $2)
             ORDER BY g.created_at DESC",
        )
        .bind(user_id)
        .bind(complete_filter)
        .fetch_all(pool)
        .await?;

        let game_ids: Vec<String> = games.iter().map(|g| g.id.clone()).collect();

        let members = sqlx::query_as::<_, GameListMemberRow>(
            "SELECT gm.game_id, u.id AS user_id, u.username, u.image, gm.list, gm.is_winner
             FROM game_members gm
             JOIN users u ON u.id = gm.user_id
             WHERE gm.game_id = ANY($1)",
        )
        .bind(&game_ids)
        .fetch_all(pool)
        .await?;

        let results = games
            .into_iter()
            .map(|g| GameListResponse {
                members: members
                    .iter()
                    .filter(|m| m.game_id == g.id)
                    .map(|m| GameListMember {
                        id: m.user_id.clone(),
                        username: m.username.clone(),
                        image: m.image.clone(),
                        army: m.list.as_ref().and_then(ListBody::army_of),
                        is_winner: m.is_winner,
                    })
                    .collect(),
                id: g.id,
                game: g.game,
                created_at: g.created_at,
                points: g.points,
            })
            .collect();

        Ok(results)
    }

    pub async fn invites_for_user(
        pool: &PgPool,
        user_id: &str,
    ) -> AppResult<Vec<GameInviteResponse>> {
        let invites = sqlx::query_as::<_, GameInviteResponse>(
            "SELECT g.id, g.created_at, g.game, g.points,
                    u.id AS invited_by_id, u.username AS invited_by_username,
                    u.image AS invited_by_image
             FROM game_invites gi
             JOIN games g ON g.id = gi.game_id
             JOIN users u ON u.id = gi.created_by_user_id
             WHERE gi.user_id = $1
             ORDER BY gi.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(invites)
    }
}
