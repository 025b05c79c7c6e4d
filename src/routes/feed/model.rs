use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::routes::friend::model::Friend;

/// Each sub-stream contributes at most this many candidate rows, newest
/// first, before classification and the final merge.
pub const STREAM_LIMIT: i64 = 20;

/// The merged feed is truncated to this many items.
pub const FEED_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedItemType {
    #[serde(rename = "Game Started")]
    GameStarted,
    #[serde(rename = "Game Completed")]
    GameCompleted,
    #[serde(rename = "Group Joined")]
    GroupJoined,
    #[serde(rename = "Group Created")]
    GroupCreated,
    #[serde(rename = "Friend Added")]
    FriendAdded,
}

/// A normalized, dated, human readable record of friend, group or game
/// activity.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: FeedItemType,
    pub date: DateTime<Utc>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct FriendAddedRow {
    pub friend_id: String,
    pub created_at: DateTime<Utc>,
    pub adder_username: Option<String>,
    pub added_username: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct GroupJoinedRow {
    pub group_id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    pub username: Option<String>,
    pub group_name: String,
    pub group_image: Option<String>,
    pub group_created_by: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct FriendGameRow {
    pub game_id: String,
    pub game: String,
    pub points: i32,
    pub is_complete: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct GameFeedMemberRow {
    pub game_id: String,
    pub user_id: String,
    pub username: Option<String>,
    pub is_winner: bool,
}

fn display_name(username: &Option<String>) -> &str {
    username.as_deref().unwrap_or("")
}

/// "@{adder} added @{added} as a friend" items, one per edge.
pub fn friend_added_items(rows: &[FriendAddedRow]) -> Vec<FeedItem> {
    rows.iter()
        .map(|row| FeedItem {
            id: row.friend_id.clone(),
            item_type: FeedItemType::FriendAdded,
            date: row.created_at,
            title: format!(
                "@{} added @{} as a friend",
                display_name(&row.adder_username),
                display_name(&row.added_username)
            ),
            sub_title: None,
            image: None,
        })
        .collect()
}

/// Joins by the group's creator classify as "created", everyone else as
/// "joined" - same data, derived tag.
pub fn group_joined_items(rows: &[GroupJoinedRow]) -> Vec<FeedItem> {
    rows.iter()
        .map(|row| {
            let created_the_group = row.user_id == row.group_created_by;

            FeedItem {
                id: row.group_id.clone(),
                item_type: if created_the_group {
                    FeedItemType::GroupCreated
                } else {
                    FeedItemType::GroupJoined
                },
                date: row.created_at,
                title: format!(
                    "@{} {} the {} group",
                    display_name(&row.username),
                    if created_the_group { "created" } else { "joined" },
                    row.group_name
                ),
                sub_title: None,
                image: row.group_image.clone(),
            }
        })
        .collect()
}

/// One item per unique game. The actor phrase joins every friend-member
/// with " & "; completed games carry a winner subtitle when any member is
/// marked a winner.
pub fn friend_game_items(
    games: &[FriendGameRow],
    members: &[GameFeedMemberRow],
    friend_ids: &[String],
) -> Vec<FeedItem> {
    let mut seen: Vec<&str> = Vec::new();

    games
        .iter()
        .filter(|g| {
            if seen.contains(&g.game_id.as_str()) {
                false
            } else {
                seen.push(&g.game_id);
                true
            }
        })
        .map(|game| {
            let game_members: Vec<&GameFeedMemberRow> =
                members.iter().filter(|m| m.game_id == game.game_id).collect();

            let friend_players = game_members
                .iter()
                .filter(|m| friend_ids.contains(&m.user_id))
                .map(|m| display_name(&m.username).to_string())
                .collect::<Vec<_>>()
                .join(" & ");

            let winners: Vec<&&GameFeedMemberRow> =
                game_members.iter().filter(|m| m.is_winner).collect();

            let verb = if game.is_complete { "completed" } else { "started" };
            let sub_title = if game.is_complete && !winners.is_empty() {
                Some(format!(
                    "Winner{}: {}",
                    if winners.len() > 1 { "s" } else { "" },
                    winners
                        .iter()
                        .map(|m| format!("@{}", display_name(&m.username)))
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            } else {
                None
            };

            FeedItem {
                id: game.game_id.clone(),
                item_type: if game.is_complete {
                    FeedItemType::GameCompleted
                } else {
                    FeedItemType::GameStarted
                },
                date: game.updated_at,
                title: format!(
                    "@{} {} a {} of {}pts",
                    friend_players, verb, game.game, game.points
                ),
                sub_title,
                image: None,
            }
        })
        .collect()
}

/// Flattens the sub-streams, newest first, capped at FEED_LIMIT.
pub fn merge_feed(items: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut items = items;
    items.sort_by(|a, b| b.date.cmp(&a.date));
    items.truncate(FEED_LIMIT);
    items
}

async fn fetch_friends_added(
    pool: &PgPool,
    user_id: &str,
    friend_ids: &[String],
) -> AppResult<Vec<FeedItem>> {
    let rows = sqlx::query_as::<_, FriendAddedRow>(
        "SELECT f.friend_id, f.created_at,
                au.username AS adder_username, fu.username AS added_username
         FROM friends f
         JOIN users au ON au.id = f.user_id
         JOIN users fu ON fu.id = f.friend_id
         WHERE f.user_id = ANY($1) AND f.friend_id <> $2
         ORDER BY f.created_at DESC
         LIMIT $3",
    )
    .bind(friend_ids)
    .bind(user_id)
    .bind(STREAM_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(friend_added_items(&rows))
}

async fn fetch_groups_joined(pool: &PgPool, friend_ids: &[String]) -> AppResult<Vec<FeedItem>> {
    // Private group activity never reaches a feed
    let rows = sqlx::query_as::<_, GroupJoinedRow>(
        "SELECT gm.group_id, gm.created_at, gm.user_id, u.username,
                g.name AS group_name, g.image AS group_image,
                g.created_by_user_id AS group_created_by
         FROM group_members gm
         JOIN users u ON u.id = gm.user_id
         JOIN groups g ON g.id = gm.group_id
         WHERE gm.user_id = ANY($1) AND g.is_public = TRUE
         ORDER BY gm.created_at DESC
         LIMIT $2",
    )
    .bind(friend_ids)
    .bind(STREAM_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(group_joined_items(&rows))
}

async fn fetch_friends_games(
    pool: &PgPool,
    user_id: &str,
    friend_ids: &[String],
) -> AppResult<Vec<FeedItem>> {
    // Games the caller plays in are their own activity, not feed material
    let games = sqlx::query_as::<_, FriendGameRow>(
        "SELECT gm.game_id, g.game, g.points, g.is_complete, g.updated_at
         FROM game_members gm
         JOIN games g ON g.id = gm.game_id
         WHERE gm.user_id = ANY($1)
           AND g.is_started = TRUE
           AND NOT EXISTS (
               SELECT 1 FROM game_members me
               WHERE me.game_id = g.id AND me.user_id = $2
           )
         ORDER BY gm.created_at DESC
         LIMIT $3",
    )
    .bind(friend_ids)
    .bind(user_id)
    .bind(STREAM_LIMIT)
    .fetch_all(pool)
    .await?;

    let game_ids: Vec<String> = games.iter().map(|g| g.game_id.clone()).collect();

    let members = sqlx::query_as::<_, GameFeedMemberRow>(
        "SELECT gm.game_id, u.id AS user_id, u.username, gm.is_winner
         FROM game_members gm
         JOIN users u ON u.id = gm.user_id
         WHERE gm.game_id = ANY($1)",
    )
    .bind(&game_ids)
    .fetch_all(pool)
    .await?;

    Ok(friend_game_items(&games, &members, friend_ids))
}

/// Gathers the three activity streams concurrently, then merges them into
/// a single recency-ordered feed. This is the only fan-out point in the
/// backend; everything else is sequential by data dependency.
pub async fn get_feed_for_user(pool: &PgPool, user_id: &str) -> AppResult<Vec<FeedItem>> {
    let friends = Friend::friends_of(pool, user_id).await?;
    let friend_ids: Vec<String> = friends.into_iter().map(|f| f.id).collect();

    let (added, joined, games) = futures_util::try_join!(
        fetch_friends_added(pool, user_id, &friend_ids),
        fetch_groups_joined(pool, &friend_ids),
        fetch_friends_games(pool, user_id, &friend_ids),
    )?;

    Ok(merge_feed([added, joined, games].concat()))
}
