use axum::{
    Json,
    extract::{Extension, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    AppState,
    error::AppResult,
    utils::{Claims, success_to_api_response},
};

use super::model::{Friend, FriendRequest};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: String,
    pub page: Option<i64>,
}

#[axum::debug_handler]
pub async fn add_friend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FriendRequest>,
) -> AppResult<impl IntoResponse> {
    Friend::add_for_user(&state.pool, &claims.sub, &req.friend_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn remove_friend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FriendRequest>,
) -> AppResult<impl IntoResponse> {
    Friend::remove_for_user(&state.pool, &claims.sub, &req.friend_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn get_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<impl IntoResponse> {
    let friends = Friend::friends_of(&state.pool, &claims.sub).await?;

    Ok(success_to_api_response(friends))
}

#[axum::debug_handler]
pub async fn find_friends(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<impl IntoResponse> {
    let users = Friend::find_users(&state.pool, &query.search, query.page.unwrap_or(1)).await?;

    Ok(success_to_api_response(users))
}
