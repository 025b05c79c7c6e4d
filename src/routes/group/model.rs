use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::common::{PAGE_SIZE, PublicUser, page_offset};
use crate::error::{AppError, AppResult};
use crate::guard::{ensure_group_admin, group_member_role};

const SEARCH_CACHE_PREFIX: &str = "group:search:";
const SEARCH_CACHE_EXPIRE: u64 = 120;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Group {
    pub id: String,
    pub created_by_user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_public: bool,
    pub is_deleted: bool,
    pub members_can_invite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_public: Option<bool>,
    pub members_can_invite: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub group_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_public: Option<bool>,
    pub members_can_invite: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct GroupInviteRequest {
    pub group_id: String,
    pub friend_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupMemberRequest {
    pub group_id: String,
    pub member_id: String,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveGroupMemberRequest {
    pub group_id: String,
    pub member_id: String,
}

#[derive(Debug, Serialize)]
pub struct GroupMemberResponse {
    pub id: String,
    pub username: Option<String>,
    pub image: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct GroupInviteResponse {
    pub user: PublicUser,
    pub created_by: PublicUser,
}

/// Full group projection, only ever produced for public groups or members.
#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_public: bool,
    pub members_can_invite: bool,
    pub created_by: PublicUser,
    pub members: Vec<GroupMemberResponse>,
    pub invites: Vec<GroupInviteResponse>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserGroup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_public: bool,
    pub members_can_invite: bool,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserGroupInvite {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub created_by: InvitedBy,
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

/// Fields safe to show without authentication.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupSearchResult {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(sqlx::FromRow)]
struct GroupDetailRow {
    id: String,
    name: String,
    description: Option<String>,
    image: Option<String>,
    is_public: bool,
    members_can_invite: bool,
    created_by_id: String,
    created_by_username: Option<String>,
    created_by_image: Option<String>,
}

#[derive(sqlx::FromRow)]
struct GroupMemberRow {
    user_id: String,
    username: Option<String>,
    image: Option<String>,
    is_admin: bool,
}

#[derive(sqlx::FromRow)]
struct GroupInviteRow {
    user_id: String,
    user_username: Option<String>,
    user_image: Option<String>,
    inviter_id: String,
    inviter_username: Option<String>,
    inviter_image: Option<String>,
}

impl Group {
    /// Creates the group and the creator's admin membership in one
    /// transaction.
    pub async fn create_for_user(
        pool: &PgPool,
        user_id: &str,
        req: &CreateGroupRequest,
    ) -> AppResult<String> {
        let group_id = Uuid::new_v4().to_string();

        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO groups (id, created_by_user_id, name, description, image,
                                 is_public, members_can_invite)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&group_id)
        .bind(user_id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.image)
        .bind(req.is_public.unwrap_or(false))
        .bind(req.members_can_invite.unwrap_or(false))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO group_members (id, group_id, user_id, is_admin)
             VALUES ($1, $2, $3, TRUE)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(group_id)
    }

    async fn find(pool: &PgPool, group_id: &str) -> AppResult<Self> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, created_by_user_id, name, description, image, is_public,
                    is_deleted, members_can_invite, created_at, updated_at
             FROM groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(pool)
        .await?;

        group.ok_or(AppError::NotFound("Group not found"))
    }

    pub async fn update_for_user(
        pool: &PgPool,
        user_id: &str,
        req: &UpdateGroupRequest,
    ) -> AppResult<()> {
        ensure_group_admin(pool, user_id, &req.group_id).await?;

        sqlx::query(
            "UPDATE groups SET
                 name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 image = COALESCE($4, image),
                 is_public = COALESCE($5, is_public),
                 members_can_invite = COALESCE($6, members_can_invite),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(&req.group_id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(&req.image)
        .bind(req.is_public)
        .bind(req.members_can_invite)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Soft delete: the group disappears from search but stays readable for
    /// its members.
    pub async fn delete_for_user(pool: &PgPool, user_id: &str, group_id: &str) -> AppResult<()> {
        ensure_group_admin(pool, user_id, group_id).await?;

        sqlx::query("UPDATE groups SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(group_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn remove_member_for_user(
        pool: &PgPool,
        user_id: &str,
        group_id: &str,
        member_id: &str,
    ) -> AppResult<()> {
        ensure_group_admin(pool, user_id, group_id).await?;

        sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(member_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn update_member_for_user(
        pool: &PgPool,
        user_id: &str,
        req: &UpdateGroupMemberRequest,
    ) -> AppResult<()> {
        ensure_group_admin(pool, user_id, &req.group_id).await?;

        sqlx::query(
            "UPDATE group_members SET
                 is_admin = COALESCE($3, is_admin),
                 updated_at = NOW()
             WHERE group_id = $1 AND user_id = $2",
        )
        .bind(&req.group_id)
        .bind(&req.member_id)
        .bind(req.is_admin)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Public groups can be joined directly; invite-only groups require and
    /// consume a pending invite. Already-a-member is a silent success.
    pub async fn join_for_user(pool: &PgPool, user_id: &str, group_id: &str) -> AppResult<()> {
        if group_member_role(pool, user_id, group_id).await?.is_some() {
            return Ok(());
        }

        let group = Self::find(pool, group_id).await?;

        let mut tx = pool.begin().await?;

        if !group.is_public {
            let invite_id: Option<String> = sqlx::query_scalar(
                "SELECT id FROM group_invites WHERE group_id = $1 AND user_id = $2",
            )
            .bind(group_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

            let invite_id = invite_id.ok_or(AppError::Client("Group is invite only"))?;

            sqlx::query("DELETE FROM group_invites WHERE id = $1")
                .bind(&invite_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO group_members (id, group_id, user_id) VALUES ($1, $2, $3)
             ON CONFLICT (group_id, user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(group_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Removes the membership; the last member out deletes the group row.
    pub async fn leave_for_user(pool: &PgPool, user_id: &str, group_id: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM group_members WHERE group_id = $1")
                .bind(group_id)
                .fetch_one(pool)
                .await?;

        if remaining == 0 {
            sqlx::query("DELETE FROM groups WHERE id = $1")
                .bind(group_id)
                .execute(pool)
                .await?;
        }

        Ok(())
    }

    /// Private groups are fully invisible to non-members: the lookup fails
    /// with the same "not found" a nonexistent group produces.
    pub async fn get_for_user(
        pool: &PgPool,
        user_id: &str,
        group_id: &str,
    ) -> AppResult<GroupResponse> {
        let group = sqlx::query_as::<_, GroupDetailRow>(
            "SELECT g.id, g.name, g.description, g.image, g.is_public,
                    g.members_can_invite,
                    u.id AS created_by_id, u.username AS created_by_username,
                    u.image AS created_by_image
             FROM groups g
             JOIN users u ON u.id = g.created_by_user_id
             WHERE g.id = $1",
        )
        .bind(group_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Group not found"))?;

        let members = sqlx::query_as::<_, GroupMemberRow>(
            "SELECT u.id AS user_id, u.username, u.image, gm.is_admin
             FROM group_members gm
             JOIN users u ON u.id = gm.user_id
             WHERE gm.group_id = $1
             ORDER BY gm.created_at ASC",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        let is_member = members.iter().any(|m| m.user_id == user_id);

        if !group.is_public && !is_member {
            return Err(AppError::NotFound("Group not found"));
        }

        let invites = sqlx::query_as::<_, GroupInviteRow>(
            "SELECT iu.id AS user_id, iu.username AS user_username, iu.image AS user_image,
                    cu.id AS inviter_id, cu.username AS inviter_username,
                    cu.image AS inviter_image
             FROM group_invites gi
             JOIN users iu ON iu.id = gi.user_id
             JOIN users cu ON cu.id = gi.created_by_user_id
             WHERE gi.group_id = $1
             ORDER BY gi.created_at ASC",
        )
        .bind(group_id)
        .fetch_all(pool)
        .await?;

        Ok(GroupResponse {
            id: group.id,
            name: group.name,
            description: group.description,
            image: group.image,
            is_public: group.is_public,
            members_can_invite: group.members_can_invite,
            created_by: PublicUser {
                id: group.created_by_id,
                username: group.created_by_username,
                image: group.created_by_image,
            },
            members: members
                .into_iter()
                .map(|m| GroupMemberResponse {
                    id: m.user_id,
                    username: m.username,
                    image: m.image,
                    is_admin: m.is_admin,
                })
                .collect(),
            invites: invites
                .into_iter()
                .map(|i| GroupInviteResponse {
                    user: PublicUser {
                        id: i.user_id,
                        username: i.user_username,
                        image: i.user_image,
                    },
                    created_by: PublicUser {
                        id: i.inviter_id,
                        username: i.inviter_username,
                        image: i.inviter_image,
                    },
                })
                .collect(),
        })
    }

    pub async fn groups_for_user(pool: &PgPool, user_id: &str) -> AppResult<Vec<UserGroup>> {
        let groups = sqlx::query_as::<_, UserGroup>(
            "SELECT g.id, g.name, g.description, g.image, g.is_public, g.members_can_invite
             FROM group_members gm
             JOIN groups g ON g.id = gm.group_id
             WHERE gm.user_id = $1
             ORDER BY gm.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(groups)
    }

    pub async fn invites_for_user(pool: &PgPool, user_id: &str) -> AppResult<Vec<UserGroupInvite>> {
        let invites = sqlx::query_as::<_, UserGroupInvite>(
            "SELECT g.id, g.name, g.description, g.image, gi.created_at,
                    u.id AS invited_by_id, u.username AS invited_by_username,
                    u.image AS invited_by_image
             FROM group_invites gi
             JOIN groups g ON g.id = gi.group_id
             JOIN users u ON u.id = gi.created_by_user_id
             WHERE gi.user_id = $1
             ORDER BY gi.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(invites)
    }

    /// Case-insensitive name search over public, non-deleted groups.
    /// Results are cached briefly; a cold or failing cache falls through to
    /// the database.
    pub async fn find_groups(
        pool: &PgPool,
        redis: &Arc<RedisClient>,
        search: &str,
        page: i64,
    ) -> AppResult<Vec<GroupSearchResult>> {
        let cache_key = format!("{}{}:{}", SEARCH_CACHE_PREFIX, search.to_lowercase(), page);

        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            let cached: redis::RedisResult<String> = conn.get(&cache_key).await;

            if let Ok(json_str) = cached {
                if let Ok(groups) = serde_json::from_str::<Vec<GroupSearchResult>>(&json_str) {
                    tracing::debug!("Group search served from cache: {}", cache_key);
                    return Ok(groups);
                }
            }
        }

        let pattern = format!("%{}%", search);

        let groups = sqlx::query_as::<_, GroupSearchResult>(
            "SELECT id, name, description, image
             FROM groups
             WHERE name ILIKE $1 AND is_public = TRUE AND is_deleted = FALSE
             ORDER BY name ASC
             LIMIT $2 OFFSET $3",
        )
        .bind(pattern)
        .bind(PAGE_SIZE)
        .bind(page_offset(page))
        .fetch_all(pool)
        .await?;

        if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
            if let Ok(json_str) = serde_json::to_string(&groups) {
                let _: Result<(), redis::RedisError> =
                    conn.set_ex(&cache_key, json_str, SEARCH_CACHE_EXPIRE).await;
            }
        }

        Ok(groups)
    }

    /// Inviting requires membership; non-admins additionally need the
    /// group's members_can_invite flag. Inviting an existing member or an
    /// already-invited user is a no-op.
    pub async fn invite_for_user(
        pool: &PgPool,
        user_id: &str,
        group_id: &str,
        friend_id: &str,
    ) -> AppResult<()> {
        let is_admin = group_member_role(pool, user_id, group_id)
            .await?
            .ok_or(AppError::NotFound("Group not found"))?;

        if !is_admin {
            let group = Self::find(pool, group_id).await?;

            if !group.members_can_invite {
                return Err(AppError::Forbidden("Only admins can invite to this group"));
            }
        }

        let already_member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(friend_id)
        .fetch_one(pool)
        .await?;

        if already_member {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO group_invites (id, group_id, user_id, created_by_user_id)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (group_id, user_id) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(group_id)
        .bind(friend_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn decline_invite_for_user(
        pool: &PgPool,
        user_id: &str,
        group_id: &str,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM group_invites WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn cancel_invite_for_user(
        pool: &PgPool,
        user_id: &str,
        group_id: &str,
        friend_id: &str,
    ) -> AppResult<()> {
        ensure_group_admin(pool, user_id, group_id).await?;

        sqlx::query("DELETE FROM group_invites WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(friend_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
