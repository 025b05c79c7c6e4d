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

use super::model::{
    CreateGroupRequest, Group, GroupInviteRequest, RemoveGroupMemberRequest, UpdateGroupRequest,
    UpdateGroupMemberRequest,
};

#[derive(Debug, Deserialize)]
pub struct GroupIdQuery {
    pub group_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: String,
    pub page: Option<i64>,
}

#[axum::debug_handler]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> AppResult<impl IntoResponse> {
    let id = Group::create_for_user(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({ "id": id })))
}

#[axum::debug_handler]
pub async fn get_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<GroupIdQuery>,
) -> AppResult<impl IntoResponse> {
    let group = Group::get_for_user(&state.pool, &claims.sub, &query.group_id).await?;

    Ok(success_to_api_response(group))
}

#[axum::debug_handler]
pub async fn get_my_groups(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<impl IntoResponse> {
    let groups = Group::groups_for_user(&state.pool, &claims.sub).await?;

    Ok(success_to_api_response(groups))
}

/// Public search endpoint, no authentication required.
#[axum::debug_handler]
pub async fn find_groups(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<impl IntoResponse> {
    let groups = Group::find_groups(
        &state.pool,
        &state.redis,
        &query.search,
        query.page.unwrap_or(1),
    )
    .await?;

    Ok(success_to_api_response(groups))
}

#[axum::debug_handler]
pub async fn update_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateGroupRequest>,
) -> AppResult<impl IntoResponse> {
    Group::update_for_user(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GroupIdQuery>,
) -> AppResult<impl IntoResponse> {
    Group::delete_for_user(&state.pool, &claims.sub, &req.group_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn join_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GroupIdQuery>,
) -> AppResult<impl IntoResponse> {
    Group::join_for_user(&state.pool, &claims.sub, &req.group_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn leave_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GroupIdQuery>,
) -> AppResult<impl IntoResponse> {
    Group::leave_for_user(&state.pool, &claims.sub, &req.group_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn invite_to_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GroupInviteRequest>,
) -> AppResult<impl IntoResponse> {
    Group::invite_for_user(&state.pool, &claims.sub, &req.group_id, &req.friend_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn cancel_group_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GroupInviteRequest>,
) -> AppResult<impl IntoResponse> {
    Group::cancel_invite_for_user(&state.pool, &claims.sub, &req.group_id, &req.friend_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn decline_group_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GroupIdQuery>,
) -> AppResult<impl IntoResponse> {
    Group::decline_invite_for_user(&state.pool, &claims.sub, &req.group_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn get_group_invites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<impl IntoResponse> {
    let invites = Group::invites_for_user(&state.pool, &claims.sub).await?;

    Ok(success_to_api_response(invites))
}

#[axum::debug_handler]
pub async fn update_group_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateGroupMemberRequest>,
) -> AppResult<impl IntoResponse> {
    Group::update_member_for_user(&state.pool, &claims.sub, &req).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn remove_group_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RemoveGroupMemberRequest>,
) -> AppResult<impl IntoResponse> {
    Group::remove_member_for_user(&state.pool, &claims.sub, &req.group_id, &req.member_id).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}
